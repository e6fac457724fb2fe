//! Generation runs
//!
//! The orchestration of layout, resolution, rendering, upload and the final
//! database update for one book.

mod generator;
mod outcome;
mod stage;

pub use generator::*;
pub use outcome::*;
pub use stage::{GenerationStage, GenerationUpdate};

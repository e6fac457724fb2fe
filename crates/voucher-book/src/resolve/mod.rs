//! Content resolution
//!
//! Turns stored placement content into everything the renderer needs,
//! batching the upstream lookups of a whole book.

mod catalog;
mod codes;
mod resolver;
mod services;

pub use catalog::*;
pub use codes::*;
pub use resolver::*;
pub use services::*;

//! Layout calculation for voucher book pages
//!
//! This module handles all the geometric work of a book:
//! - Slot assignment (which page and unit each placement occupies)
//! - Slot geometry (where a run of units sits on the printed page)

mod grid;
mod placement;
mod types;

pub use grid::*;
pub use placement::*;
pub use types::*;

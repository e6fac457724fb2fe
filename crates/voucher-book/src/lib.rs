pub mod constants;
mod error;
pub mod generate;
pub mod layout;
pub mod memory;
mod options;
pub mod rate_limit;
pub mod render;
pub mod resolve;
mod stats;
pub mod storage;
pub mod store;
mod types;

pub use error::*;
pub use generate::{
    BookPdfGenerator, GenerateOptions, GenerationOutcome, GenerationRequest, GenerationStage,
    GenerationUpdate, Priority,
};
pub use layout::{LayoutItem, LayoutPlan, PageSpec, SlotRef, plan_layout};
pub use memory::MemoryBookRepository;
pub use options::*;
pub use render::{RenderInput, RenderedPdf, render_book, render_book_async};
pub use resolve::{ContentServices, ResolvedBlock, resolve_content};
pub use stats::{LayoutStatistics, calculate_statistics};
pub use storage::{FileStorage, LocalFileStorage, MemoryFileStorage, StoredFile};
pub use store::{BookRepository, PdfCommit};
pub use types::*;

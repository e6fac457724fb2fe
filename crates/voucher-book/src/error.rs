use crate::types::{BookId, BookStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse failure category, for callers that map failures to status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Precondition,
    RateLimited,
    Resolution,
    Layout,
    Render,
    Storage,
    Persistence,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Precondition => "precondition",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Resolution => "resolution",
            ErrorKind::Layout => "layout",
            ErrorKind::Render => "render",
            ErrorKind::Storage => "storage",
            ErrorKind::Persistence => "persistence",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Placement {index} needs {units} units but a page holds {capacity}")]
    ItemTooLarge { index: usize, units: u8, capacity: u8 },
    #[error(
        "Placement on page {page_number} at position {position} spans {units} units past the page capacity of {capacity}"
    )]
    SlotOutOfBounds {
        page_number: u32,
        position: u8,
        units: u8,
        capacity: u8,
    },
    #[error("Placement on page {page_number} at position {position} overlaps another placement")]
    Overlap { page_number: u32, position: u8 },
    #[error("Placement refers to page {page_number}, which the book does not have")]
    UnknownPage { page_number: u32 },
    #[error("Page number {page_number} appears more than once")]
    DuplicatePage { page_number: u32 },
    #[error("Page {page_number} is outside the book's {total_pages} pages")]
    PageOutOfRange { page_number: u32, total_pages: u32 },
    #[error("Insufficient pages: content does not fit in {total_pages} page(s)")]
    InsufficientPages { total_pages: u32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("No vouchers found")]
    NoVouchers,
    #[error("Vouchers not found: {}", .0.join(", "))]
    MissingVouchers(Vec<String>),
    /// Upstream message, passed through unchanged
    #[error("{0}")]
    Upstream(String),
}

/// Error reported by an upstream collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct UpstreamError(pub String);

impl UpstreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<UpstreamError> for ResolveError {
    fn from(err: UpstreamError) -> Self {
        ResolveError::Upstream(err.0)
    }
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("Voucher code on page {page_number} at position {position} could not be rendered: {message}")]
    VoucherCode {
        page_number: u32,
        position: u8,
        message: String,
    },
    #[error("No pages to render")]
    NoPages,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Upload(String),
    #[error("Not a stored file URL: {0}")]
    InvalidUrl(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("Corrupt record: {0}")]
    Corrupt(String),
    #[error("Database error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything that can stop a generation run
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("Voucher book {0} not found")]
    BookNotFound(BookId),
    #[error("Voucher book is {status}; only draft or ready_for_print books can be generated")]
    NotEligible { status: BookStatus },
    #[error("Voucher book already has a PDF; use force to regenerate")]
    PdfExists,
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("PDF upload failed: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Persistence(RepositoryError),
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::RateLimited { .. } => ErrorKind::RateLimited,
            GenerationError::BookNotFound(_)
            | GenerationError::NotEligible { .. }
            | GenerationError::PdfExists
            | GenerationError::Conflict(_) => ErrorKind::Precondition,
            GenerationError::Layout(_) => ErrorKind::Layout,
            GenerationError::Resolve(_) => ErrorKind::Resolution,
            GenerationError::Render(_) => ErrorKind::Render,
            GenerationError::Storage(_) => ErrorKind::Storage,
            GenerationError::Persistence(_) => ErrorKind::Persistence,
        }
    }
}

impl From<RepositoryError> for GenerationError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(message) => GenerationError::Conflict(message),
            other => GenerationError::Persistence(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;

//! Persistence seams of the generator
//!
//! [`BookRepository`] is implemented in memory by
//! [`MemoryBookRepository`](crate::memory::MemoryBookRepository) and on
//! Postgres by the `voucher-book-store` crate.

use async_trait::async_trait;

use crate::error::RepositoryError;
use crate::types::{
    AdPlacement, BookDistribution, BookId, BookStatus, DistributionId, DistributionStatus,
    PdfArtifact, VoucherBook, VoucherBookPage,
};

pub type RepoResult<T> = std::result::Result<T, RepositoryError>;

/// Guarded update that attaches a freshly generated PDF to a book.
///
/// Applies only while the book is still eligible for generation and its PDF
/// URL still equals `expected_pdf_url`. The status becomes `ready_for_print`
/// and URL and timestamp are written together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfCommit {
    pub book_id: BookId,
    /// PDF URL observed when the run started
    pub expected_pdf_url: Option<String>,
    pub artifact: PdfArtifact,
    pub updated_by: Option<String>,
}

/// Message used when a [`PdfCommit`] guard fails
pub const COMMIT_CONFLICT: &str = "Voucher book changed while its PDF was being generated";

#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn find_book(&self, id: BookId) -> RepoResult<Option<VoucherBook>>;

    /// Pages ordered by page number
    async fn list_pages(&self, book_id: BookId) -> RepoResult<Vec<VoucherBookPage>>;

    /// Placements of every page, active or not, ordered by page number,
    /// display order, then position (unpinned last)
    async fn list_placements(&self, book_id: BookId) -> RepoResult<Vec<AdPlacement>>;

    /// Apply a [`PdfCommit`] atomically. A failed guard is
    /// [`RepositoryError::Conflict`].
    async fn commit_pdf(&self, commit: PdfCommit) -> RepoResult<VoucherBook>;

    /// Move a book to `status`. Backward moves need `admin_override`.
    async fn update_status(
        &self,
        id: BookId,
        status: BookStatus,
        actor: Option<&str>,
        admin_override: bool,
    ) -> RepoResult<VoucherBook>;

    async fn list_distributions(&self, book_id: BookId) -> RepoResult<Vec<BookDistribution>>;

    async fn update_distribution_status(
        &self,
        id: DistributionId,
        status: DistributionStatus,
    ) -> RepoResult<BookDistribution>;

    /// Delete a book with its pages, placements and distributions.
    async fn delete_book(&self, id: BookId) -> RepoResult<()>;
}

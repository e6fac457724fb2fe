//! In-memory book repository

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::RepositoryError;
use crate::store::{BookRepository, COMMIT_CONFLICT, PdfCommit, RepoResult};
use crate::types::{
    AdPlacement, BookDistribution, BookId, BookStatus, DistributionId, DistributionStatus,
    VoucherBook, VoucherBookPage,
};

#[derive(Default)]
struct State {
    books: HashMap<BookId, VoucherBook>,
    pages: Vec<VoucherBookPage>,
    placements: Vec<AdPlacement>,
    distributions: Vec<BookDistribution>,
}

/// Repository over plain collections behind one lock.
///
/// Every operation takes the lock once, so `commit_pdf` is atomic with respect
/// to concurrent callers.
#[derive(Default)]
pub struct MemoryBookRepository {
    state: RwLock<State>,
}

impl MemoryBookRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_book(&self, book: VoucherBook) {
        self.state.write().await.books.insert(book.id, book);
    }

    pub async fn insert_page(&self, page: VoucherBookPage) {
        self.state.write().await.pages.push(page);
    }

    pub async fn insert_placement(&self, placement: AdPlacement) {
        self.state.write().await.placements.push(placement);
    }

    pub async fn insert_distribution(&self, distribution: BookDistribution) {
        self.state.write().await.distributions.push(distribution);
    }
}

#[async_trait]
impl BookRepository for MemoryBookRepository {
    async fn find_book(&self, id: BookId) -> RepoResult<Option<VoucherBook>> {
        Ok(self.state.read().await.books.get(&id).cloned())
    }

    async fn list_pages(&self, book_id: BookId) -> RepoResult<Vec<VoucherBookPage>> {
        let state = self.state.read().await;
        let mut pages: Vec<VoucherBookPage> = state
            .pages
            .iter()
            .filter(|page| page.book_id == book_id)
            .cloned()
            .collect();
        pages.sort_by_key(|page| page.page_number);
        Ok(pages)
    }

    async fn list_placements(&self, book_id: BookId) -> RepoResult<Vec<AdPlacement>> {
        let state = self.state.read().await;
        let page_numbers: HashMap<_, _> = state
            .pages
            .iter()
            .filter(|page| page.book_id == book_id)
            .map(|page| (page.id, page.page_number))
            .collect();

        let mut placements: Vec<(u32, AdPlacement)> = state
            .placements
            .iter()
            .filter_map(|placement| {
                let page_number = *page_numbers.get(&placement.page_id)?;
                Some((page_number, placement.clone()))
            })
            .collect();
        placements.sort_by_key(|(page_number, placement)| {
            (
                *page_number,
                placement.display_order,
                placement.position.is_none(),
                placement.position,
            )
        });
        Ok(placements.into_iter().map(|(_, placement)| placement).collect())
    }

    async fn commit_pdf(&self, commit: PdfCommit) -> RepoResult<VoucherBook> {
        let mut state = self.state.write().await;
        let book = state
            .books
            .get_mut(&commit.book_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Voucher book {}", commit.book_id)))?;

        if !book.status.is_eligible_for_generation()
            || book.pdf_url() != commit.expected_pdf_url.as_deref()
        {
            return Err(RepositoryError::Conflict(COMMIT_CONFLICT.to_string()));
        }

        book.status = BookStatus::ReadyForPrint;
        book.updated_at = commit.artifact.generated_at;
        book.pdf = Some(commit.artifact);
        book.updated_by = commit.updated_by;
        Ok(book.clone())
    }

    async fn update_status(
        &self,
        id: BookId,
        status: BookStatus,
        actor: Option<&str>,
        admin_override: bool,
    ) -> RepoResult<VoucherBook> {
        let mut state = self.state.write().await;
        let book = state
            .books
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Voucher book {id}")))?;

        if !book.status.can_transition_to(status, admin_override) {
            return Err(RepositoryError::InvalidTransition {
                from: book.status.to_string(),
                to: status.to_string(),
            });
        }

        book.status = status;
        book.updated_at = Utc::now();
        book.updated_by = actor.map(str::to_string);
        Ok(book.clone())
    }

    async fn list_distributions(&self, book_id: BookId) -> RepoResult<Vec<BookDistribution>> {
        let state = self.state.read().await;
        let mut distributions: Vec<BookDistribution> = state
            .distributions
            .iter()
            .filter(|d| d.book_id == book_id)
            .cloned()
            .collect();
        distributions.sort_by_key(|d| d.created_at);
        Ok(distributions)
    }

    async fn update_distribution_status(
        &self,
        id: DistributionId,
        status: DistributionStatus,
    ) -> RepoResult<BookDistribution> {
        let mut state = self.state.write().await;
        let distribution = state
            .distributions
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Distribution {id}")))?;

        let from = distribution.status;
        if !distribution.advance(status, Utc::now()) {
            return Err(RepositoryError::InvalidTransition {
                from: from.as_str().to_string(),
                to: status.as_str().to_string(),
            });
        }
        Ok(distribution.clone())
    }

    async fn delete_book(&self, id: BookId) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if state.books.remove(&id).is_none() {
            return Err(RepositoryError::NotFound(format!("Voucher book {id}")));
        }

        let page_ids: Vec<_> = state
            .pages
            .iter()
            .filter(|page| page.book_id == id)
            .map(|page| page.id)
            .collect();
        state.placements.retain(|p| !page_ids.contains(&p.page_id));
        state.pages.retain(|page| page.book_id != id);
        state.distributions.retain(|d| d.book_id != id);
        Ok(())
    }
}

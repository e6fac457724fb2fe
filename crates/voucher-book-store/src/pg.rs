//! Postgres book repository

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use voucher_book::store::{BookRepository, COMMIT_CONFLICT, PdfCommit, RepoResult};
use voucher_book::{
    AdPlacement, BookDistribution, BookId, BookStatus, DistributionId, DistributionStatus,
    RepositoryError, VoucherBook, VoucherBookPage,
};

use crate::rows::{
    BOOK_COLUMNS, BookRow, DISTRIBUTION_COLUMNS, DistributionRow, PAGE_COLUMNS, PLACEMENT_COLUMNS,
    PageRow, PlacementRow, map_rows,
};

/// Connections kept by [`PgBookRepository::connect`].
const MAX_CONNECTIONS: u32 = 10;

fn backend(err: sqlx::Error) -> RepositoryError {
    RepositoryError::Backend(err.to_string())
}

fn db_int(column: &str, value: u32) -> RepoResult<i32> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::Backend(format!("{column} {value} does not fit the column")))
}

fn not_found(what: &str, id: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::NotFound(format!("{what} {id}"))
}

/// [`BookRepository`] over a Postgres pool.
///
/// Queries are built at runtime from the column lists in [`crate::rows`].
/// Status changes lock the row they read inside a transaction; the PDF commit
/// is a single conditional `UPDATE`.
#[derive(Debug, Clone)]
pub struct PgBookRepository {
    pool: PgPool,
}

impl PgBookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a connection pool from a database URL.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Apply pending migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Voucher book schema is up to date");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // -----------------------------------------------------------------------
    // Inserts
    // -----------------------------------------------------------------------

    pub async fn insert_book(&self, book: &VoucherBook) -> RepoResult<()> {
        let query = "INSERT INTO voucher_books (\
                id, title, edition, book_type, year, month, status, total_pages, \
                pdf_url, pdf_generated_at, created_by, updated_by, \
                created_at, updated_at, metadata\
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)";
        sqlx::query(query)
            .bind(book.id)
            .bind(&book.title)
            .bind(book.edition.as_deref())
            .bind(book.book_type.as_str())
            .bind(book.year)
            .bind(book.month.map(i16::from))
            .bind(book.status.as_str())
            .bind(db_int("total_pages", book.total_pages)?)
            .bind(book.pdf.as_ref().map(|pdf| pdf.url.as_str()))
            .bind(book.pdf.as_ref().map(|pdf| pdf.generated_at))
            .bind(book.created_by.as_deref())
            .bind(book.updated_by.as_deref())
            .bind(book.created_at)
            .bind(book.updated_at)
            .bind(Json(&book.metadata))
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    pub async fn insert_page(&self, page: &VoucherBookPage) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO voucher_book_pages (id, book_id, page_number, layout) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(page.id)
        .bind(page.book_id)
        .bind(db_int("page_number", page.page_number)?)
        .bind(page.layout.as_str())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    pub async fn insert_placement(&self, placement: &AdPlacement) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO ad_placements (\
                id, page_id, position, size, content_type, content, active, display_order\
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(placement.id)
        .bind(placement.page_id)
        .bind(placement.position.map(i16::from))
        .bind(placement.size.as_str())
        .bind(placement.content.kind().as_str())
        .bind(Json(&placement.content))
        .bind(placement.active)
        .bind(placement.display_order)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    pub async fn insert_distribution(&self, distribution: &BookDistribution) -> RepoResult<()> {
        let query = format!(
            "INSERT INTO book_distributions ({DISTRIBUTION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        );
        sqlx::query(&query)
            .bind(distribution.id)
            .bind(distribution.book_id)
            .bind(&distribution.business_location_id)
            .bind(db_int("quantity", distribution.quantity)?)
            .bind(distribution.status.as_str())
            .bind(distribution.shipped_at)
            .bind(distribution.delivered_at)
            .bind(distribution.created_at)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn book_exists(&self, id: BookId) -> RepoResult<bool> {
        let found: Option<(uuid::Uuid,)> =
            sqlx::query_as("SELECT id FROM voucher_books WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl BookRepository for PgBookRepository {
    async fn find_book(&self, id: BookId) -> RepoResult<Option<VoucherBook>> {
        let query = format!("SELECT {BOOK_COLUMNS} FROM voucher_books WHERE id = $1");
        let row = sqlx::query_as::<_, BookRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.map(VoucherBook::try_from).transpose()
    }

    async fn list_pages(&self, book_id: BookId) -> RepoResult<Vec<VoucherBookPage>> {
        let query = format!(
            "SELECT {PAGE_COLUMNS} FROM voucher_book_pages \
             WHERE book_id = $1 ORDER BY page_number"
        );
        let rows = sqlx::query_as::<_, PageRow>(&query)
            .bind(book_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        map_rows(rows)
    }

    async fn list_placements(&self, book_id: BookId) -> RepoResult<Vec<AdPlacement>> {
        let query = format!(
            "SELECT {PLACEMENT_COLUMNS} FROM ad_placements p \
             JOIN voucher_book_pages pg ON pg.id = p.page_id \
             WHERE pg.book_id = $1 \
             ORDER BY pg.page_number, p.display_order, p.position ASC NULLS LAST, p.id"
        );
        let rows = sqlx::query_as::<_, PlacementRow>(&query)
            .bind(book_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        map_rows(rows)
    }

    async fn commit_pdf(&self, commit: PdfCommit) -> RepoResult<VoucherBook> {
        let query = format!(
            "UPDATE voucher_books SET \
                status = $2, pdf_url = $3, pdf_generated_at = $4, \
                updated_at = $4, updated_by = $5 \
             WHERE id = $1 \
               AND status IN ($6, $7) \
               AND pdf_url IS NOT DISTINCT FROM $8 \
             RETURNING {BOOK_COLUMNS}"
        );
        let row = sqlx::query_as::<_, BookRow>(&query)
            .bind(commit.book_id)
            .bind(BookStatus::ReadyForPrint.as_str())
            .bind(&commit.artifact.url)
            .bind(commit.artifact.generated_at)
            .bind(commit.updated_by.as_deref())
            .bind(BookStatus::Draft.as_str())
            .bind(BookStatus::ReadyForPrint.as_str())
            .bind(commit.expected_pdf_url.as_deref())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match row {
            Some(row) => {
                debug!("Book {}: PDF committed", commit.book_id);
                VoucherBook::try_from(row)
            }
            None if self.book_exists(commit.book_id).await? => {
                Err(RepositoryError::Conflict(COMMIT_CONFLICT.to_string()))
            }
            None => Err(not_found("Voucher book", commit.book_id)),
        }
    }

    async fn update_status(
        &self,
        id: BookId,
        status: BookStatus,
        actor: Option<&str>,
        admin_override: bool,
    ) -> RepoResult<VoucherBook> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let current: Option<(String,)> =
            sqlx::query_as("SELECT status FROM voucher_books WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(backend)?;
        let (current,) = current.ok_or_else(|| not_found("Voucher book", id))?;
        let current: BookStatus = current
            .parse()
            .map_err(|e: String| RepositoryError::Corrupt(format!("voucher_books {id}: {e}")))?;

        if !current.can_transition_to(status, admin_override) {
            return Err(RepositoryError::InvalidTransition {
                from: current.to_string(),
                to: status.to_string(),
            });
        }

        let query = format!(
            "UPDATE voucher_books SET status = $2, updated_at = $3, updated_by = $4 \
             WHERE id = $1 RETURNING {BOOK_COLUMNS}"
        );
        let row = sqlx::query_as::<_, BookRow>(&query)
            .bind(id)
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(actor)
            .fetch_one(&mut *tx)
            .await
            .map_err(backend)?;
        tx.commit().await.map_err(backend)?;

        VoucherBook::try_from(row)
    }

    async fn list_distributions(&self, book_id: BookId) -> RepoResult<Vec<BookDistribution>> {
        let query = format!(
            "SELECT {DISTRIBUTION_COLUMNS} FROM book_distributions \
             WHERE book_id = $1 ORDER BY created_at"
        );
        let rows = sqlx::query_as::<_, DistributionRow>(&query)
            .bind(book_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        map_rows(rows)
    }

    async fn update_distribution_status(
        &self,
        id: DistributionId,
        status: DistributionStatus,
    ) -> RepoResult<BookDistribution> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let query = format!(
            "SELECT {DISTRIBUTION_COLUMNS} FROM book_distributions WHERE id = $1 FOR UPDATE"
        );
        let row = sqlx::query_as::<_, DistributionRow>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend)?
            .ok_or_else(|| not_found("Distribution", id))?;
        let mut distribution = BookDistribution::try_from(row)?;

        let from = distribution.status;
        if !distribution.advance(status, Utc::now()) {
            return Err(RepositoryError::InvalidTransition {
                from: from.as_str().to_string(),
                to: status.as_str().to_string(),
            });
        }

        sqlx::query(
            "UPDATE book_distributions SET status = $2, shipped_at = $3, delivered_at = $4 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(distribution.status.as_str())
        .bind(distribution.shipped_at)
        .bind(distribution.delivered_at)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;
        tx.commit().await.map_err(backend)?;

        Ok(distribution)
    }

    async fn delete_book(&self, id: BookId) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        // Distributions go first and explicitly; pages and placements cascade.
        let distributions = sqlx::query("DELETE FROM book_distributions WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?
            .rows_affected();
        let deleted = sqlx::query("DELETE FROM voucher_books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?
            .rows_affected();
        if deleted == 0 {
            return Err(not_found("Voucher book", id));
        }
        tx.commit().await.map_err(backend)?;

        info!("Book {id}: deleted with {distributions} distributions");
        Ok(())
    }
}

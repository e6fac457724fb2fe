//! Database rows and their mapping to domain types
//!
//! Rows hold what Postgres returns; the `TryFrom` conversions reject values the
//! domain types cannot represent as [`RepositoryError::Corrupt`].

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;
use voucher_book::{
    AdPlacement, BookDistribution, BookMetadata, PdfArtifact, PlacementContent, RepositoryError,
    VoucherBook, VoucherBookPage,
};

/// Column list for `voucher_books` queries.
pub(crate) const BOOK_COLUMNS: &str = "\
    id, title, edition, book_type, year, month, status, total_pages, \
    pdf_url, pdf_generated_at, created_by, updated_by, \
    created_at, updated_at, metadata";

/// Column list for `voucher_book_pages` queries.
pub(crate) const PAGE_COLUMNS: &str = "id, book_id, page_number, layout";

/// Column list for `ad_placements` queries, aliased `p`.
pub(crate) const PLACEMENT_COLUMNS: &str = "\
    p.id, p.page_id, p.position, p.size, p.content_type, p.content, \
    p.active, p.display_order";

/// Column list for `book_distributions` queries.
pub(crate) const DISTRIBUTION_COLUMNS: &str = "\
    id, book_id, business_location_id, quantity, status, \
    shipped_at, delivered_at, created_at";

/// A row from the `voucher_books` table.
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    pub id: Uuid,
    pub title: String,
    pub edition: Option<String>,
    pub book_type: String,
    pub year: i32,
    pub month: Option<i16>,
    pub status: String,
    pub total_pages: i32,
    pub pdf_url: Option<String>,
    pub pdf_generated_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

/// A row from the `voucher_book_pages` table.
#[derive(Debug, Clone, FromRow)]
pub struct PageRow {
    pub id: Uuid,
    pub book_id: Uuid,
    pub page_number: i32,
    pub layout: String,
}

/// A row from the `ad_placements` table.
///
/// `content` holds the tagged [`PlacementContent`]; `content_type` repeats
/// its tag for filtering in SQL.
#[derive(Debug, Clone, FromRow)]
pub struct PlacementRow {
    pub id: Uuid,
    pub page_id: Uuid,
    pub position: Option<i16>,
    pub size: String,
    pub content_type: String,
    pub content: serde_json::Value,
    pub active: bool,
    pub display_order: i32,
}

/// A row from the `book_distributions` table.
#[derive(Debug, Clone, FromRow)]
pub struct DistributionRow {
    pub id: Uuid,
    pub book_id: Uuid,
    pub business_location_id: String,
    pub quantity: i32,
    pub status: String,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

fn corrupt(table: &str, id: Uuid, detail: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Corrupt(format!("{table} {id}: {detail}"))
}

fn parse<T>(table: &str, id: Uuid, value: &str) -> Result<T, RepositoryError>
where
    T: FromStr<Err = String>,
{
    value.parse().map_err(|e: String| corrupt(table, id, e))
}

fn convert<S, T>(table: &str, id: Uuid, column: &str, value: S) -> Result<T, RepositoryError>
where
    S: Copy + std::fmt::Display,
    T: TryFrom<S>,
{
    T::try_from(value).map_err(|_| corrupt(table, id, format!("{column} {value} is out of range")))
}

impl TryFrom<BookRow> for VoucherBook {
    type Error = RepositoryError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        const TABLE: &str = "voucher_books";
        let pdf = match (row.pdf_url, row.pdf_generated_at) {
            (Some(url), Some(generated_at)) => Some(PdfArtifact { url, generated_at }),
            (None, None) => None,
            _ => {
                return Err(corrupt(
                    TABLE,
                    row.id,
                    "pdf_url and pdf_generated_at must be set together",
                ));
            }
        };
        let metadata: BookMetadata = serde_json::from_value(row.metadata)
            .map_err(|e| corrupt(TABLE, row.id, format!("metadata: {e}")))?;
        let month = match row.month {
            Some(month) => Some(convert(TABLE, row.id, "month", month)?),
            None => None,
        };

        Ok(VoucherBook {
            id: row.id,
            title: row.title,
            edition: row.edition,
            book_type: parse(TABLE, row.id, &row.book_type)?,
            year: row.year,
            month,
            status: parse(TABLE, row.id, &row.status)?,
            total_pages: convert(TABLE, row.id, "total_pages", row.total_pages)?,
            pdf,
            created_by: row.created_by,
            updated_by: row.updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            metadata,
        })
    }
}

impl TryFrom<PageRow> for VoucherBookPage {
    type Error = RepositoryError;

    fn try_from(row: PageRow) -> Result<Self, Self::Error> {
        const TABLE: &str = "voucher_book_pages";
        Ok(VoucherBookPage {
            id: row.id,
            book_id: row.book_id,
            page_number: convert(TABLE, row.id, "page_number", row.page_number)?,
            layout: parse(TABLE, row.id, &row.layout)?,
        })
    }
}

impl TryFrom<PlacementRow> for AdPlacement {
    type Error = RepositoryError;

    fn try_from(row: PlacementRow) -> Result<Self, Self::Error> {
        const TABLE: &str = "ad_placements";
        let content: PlacementContent = serde_json::from_value(row.content)
            .map_err(|e| corrupt(TABLE, row.id, format!("content: {e}")))?;
        if content.kind().as_str() != row.content_type {
            return Err(corrupt(
                TABLE,
                row.id,
                format!(
                    "content_type {} does not match content of type {}",
                    row.content_type,
                    content.kind().as_str()
                ),
            ));
        }
        let position = match row.position {
            Some(position) => Some(convert(TABLE, row.id, "position", position)?),
            None => None,
        };

        Ok(AdPlacement {
            id: row.id,
            page_id: row.page_id,
            position,
            size: parse(TABLE, row.id, &row.size)?,
            content,
            active: row.active,
            display_order: row.display_order,
        })
    }
}

impl TryFrom<DistributionRow> for BookDistribution {
    type Error = RepositoryError;

    fn try_from(row: DistributionRow) -> Result<Self, Self::Error> {
        const TABLE: &str = "book_distributions";
        Ok(BookDistribution {
            id: row.id,
            book_id: row.book_id,
            business_location_id: row.business_location_id,
            quantity: convert(TABLE, row.id, "quantity", row.quantity)?,
            status: parse(TABLE, row.id, &row.status)?,
            shipped_at: row.shipped_at,
            delivered_at: row.delivered_at,
            created_at: row.created_at,
        })
    }
}

/// Map every row, stopping at the first corrupt one
pub(crate) fn map_rows<R, T>(rows: Vec<R>) -> Result<Vec<T>, RepositoryError>
where
    T: TryFrom<R, Error = RepositoryError>,
{
    rows.into_iter().map(T::try_from).collect()
}

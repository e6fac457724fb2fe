//! Postgres persistence for voucher books
//!
//! Implements [`voucher_book::store::BookRepository`] with `sqlx`. The schema
//! lives in `migrations/` and is applied by [`PgBookRepository::migrate`].

mod pg;
pub mod rows;

pub use pg::PgBookRepository;

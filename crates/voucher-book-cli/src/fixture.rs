//! JSON fixtures read by the CLI

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use voucher_book::resolve::StaticCatalog;
use voucher_book::{
    AdPlacement, ContentKind, LayoutItem, MemoryBookRepository, PageLayout, PageSpec,
    PlacementSize, SlotRef, VoucherBook, VoucherBookPage,
};
use voucher_book_store::PgBookRepository;

async fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse {}", path.display()))
}

// =============================================================================
// Book Bundle
// =============================================================================

/// A book with its pages, placements and the upstream catalog it refers to
#[derive(Debug, Deserialize)]
pub struct Bundle {
    pub book: VoucherBook,
    #[serde(default)]
    pub pages: Vec<VoucherBookPage>,
    #[serde(default)]
    pub placements: Vec<AdPlacement>,
    #[serde(default)]
    pub catalog: StaticCatalog,
}

impl Bundle {
    pub async fn load(path: &Path) -> Result<Self> {
        let bundle: Self = read_json(path).await?;
        bundle.check()?;
        Ok(bundle)
    }

    fn check(&self) -> Result<()> {
        if let Some(page) = self.pages.iter().find(|p| p.book_id != self.book.id) {
            bail!("Page {} belongs to book {}, not {}", page.id, page.book_id, self.book.id);
        }
        for placement in &self.placements {
            if !self.pages.iter().any(|p| p.id == placement.page_id) {
                bail!(
                    "Placement {} refers to unknown page {}",
                    placement.id,
                    placement.page_id
                );
            }
        }
        Ok(())
    }

    /// Seed an in-memory repository with the book. The catalog stays behind.
    pub async fn seed_memory(&self, repo: &MemoryBookRepository) {
        repo.insert_book(self.book.clone()).await;
        for page in &self.pages {
            repo.insert_page(page.clone()).await;
        }
        for placement in &self.placements {
            repo.insert_placement(placement.clone()).await;
        }
    }

    /// Insert the book into Postgres.
    pub async fn import(&self, repo: &PgBookRepository) -> Result<()> {
        repo.insert_book(&self.book).await?;
        for page in &self.pages {
            repo.insert_page(page).await?;
        }
        for placement in &self.placements {
            repo.insert_placement(placement).await?;
        }
        Ok(())
    }
}

// =============================================================================
// Layout Input
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LayoutPage {
    pub page_number: u32,
    #[serde(default)]
    pub layout: PageLayout,
}

#[derive(Debug, Deserialize)]
pub struct LayoutEntry {
    pub size: PlacementSize,
    #[serde(default = "default_kind")]
    pub kind: ContentKind,
    /// Pin to this page; needs `position` too
    #[serde(default)]
    pub page_number: Option<u32>,
    #[serde(default)]
    pub position: Option<u8>,
}

fn default_kind() -> ContentKind {
    ContentKind::Voucher
}

/// Input of `vbk layout`
#[derive(Debug, Deserialize)]
pub struct LayoutInput {
    pub total_pages: u32,
    #[serde(default)]
    pub pages: Vec<LayoutPage>,
    pub items: Vec<LayoutEntry>,
}

impl LayoutInput {
    pub async fn load(path: &Path) -> Result<Self> {
        read_json(path).await
    }

    pub fn items(&self) -> Result<Vec<LayoutItem>> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let pin = match (entry.page_number, entry.position) {
                    (Some(page), Some(position)) => Some(SlotRef::new(page, position)),
                    (None, None) => None,
                    _ => bail!("Item {index}: page_number and position go together"),
                };
                Ok(LayoutItem {
                    size: entry.size,
                    pin,
                })
            })
            .collect()
    }

    pub fn page_specs(&self, capacity: impl Fn(PageLayout) -> u8) -> Vec<PageSpec> {
        self.pages
            .iter()
            .map(|page| PageSpec {
                page_number: page.page_number,
                layout: page.layout,
                capacity: capacity(page.layout),
            })
            .collect()
    }

    pub fn kinds(&self) -> Vec<ContentKind> {
        self.items.iter().map(|entry| entry.kind).collect()
    }
}

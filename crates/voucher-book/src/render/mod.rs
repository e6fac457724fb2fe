//! PDF rendering
//!
//! Pages are drawn strictly one at a time in ascending page number, with
//! placements in ascending slot position. Nothing time- or run-dependent is
//! embedded, so identical input renders to identical bytes.

mod blocks;
mod page;
mod qr;
mod raster;
mod text;

pub use qr::qr_ops;
pub use raster::{DecodedImage, decode_image, fit_within};
pub use text::{pdf_string, wrap_text};

use std::fmt;

use lopdf::{Dictionary, Document, Object};
use log::debug;

use crate::error::RenderError;
use crate::layout::{LayoutPlan, SlotGeometry};
use crate::options::GeneratorOptions;
use crate::resolve::ResolvedBlock;
use crate::types::{PageLayout, PlacementSize, VoucherBook};

use page::{SharedResources, render_page};

// =============================================================================
// Render Input
// =============================================================================

/// Title block of the cover page
#[derive(Debug, Clone, PartialEq)]
pub struct CoverInfo {
    pub title: String,
    pub edition: Option<String>,
    /// e.g. "March 2026"
    pub issue: String,
    pub subtitle: Option<String>,
}

impl CoverInfo {
    pub fn from_book(book: &VoucherBook) -> Self {
        Self {
            title: book.title.clone(),
            edition: book.edition.clone(),
            issue: book.issue_label(),
            subtitle: book.metadata.subtitle.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderBlock {
    pub position: u8,
    pub units: u8,
    pub content: ResolvedBlock,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPage {
    pub page_number: u32,
    pub layout: PageLayout,
    pub blocks: Vec<RenderBlock>,
}

/// Everything the renderer needs, already resolved
#[derive(Debug, Clone, PartialEq)]
pub struct RenderInput {
    pub cover: CoverInfo,
    pub pages: Vec<RenderPage>,
}

impl RenderInput {
    /// Combine a layout plan with resolved content.
    ///
    /// `sizes` and `blocks` are aligned with the items the plan was made for.
    pub fn assemble(
        book: &VoucherBook,
        plan: &LayoutPlan,
        sizes: &[PlacementSize],
        blocks: Vec<ResolvedBlock>,
    ) -> Self {
        let mut blocks: Vec<Option<ResolvedBlock>> = blocks.into_iter().map(Some).collect();

        let pages = plan
            .pages
            .iter()
            .map(|planned| RenderPage {
                page_number: planned.page_number,
                layout: planned.layout,
                blocks: plan
                    .items_on_page(planned.page_number)
                    .into_iter()
                    .filter_map(|index| {
                        let content = blocks.get_mut(index)?.take()?;
                        Some(RenderBlock {
                            position: plan.slots[index].position,
                            units: sizes.get(index)?.units(),
                            content,
                        })
                    })
                    .collect(),
            })
            .collect();

        Self {
            cover: CoverInfo::from_book(book),
            pages,
        }
    }
}

// =============================================================================
// Render Output
// =============================================================================

/// An asset that was skipped during rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderWarning {
    pub page_number: u32,
    pub position: u8,
    pub message: String,
}

impl fmt::Display for RenderWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "page {} position {}: {}",
            self.page_number, self.position, self.message
        )
    }
}

#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub warnings: Vec<RenderWarning>,
}

// =============================================================================
// Rendering
// =============================================================================

/// Render a book to PDF bytes.
pub fn render_book(input: &RenderInput, options: &GeneratorOptions) -> Result<RenderedPdf, RenderError> {
    if input.pages.is_empty() {
        return Err(RenderError::NoPages);
    }

    let geometry = SlotGeometry::from_options(options);
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let shared = SharedResources {
        pages_id,
        regular_font: doc.add_object(font_dict(b"Helvetica")),
        bold_font: doc.add_object(font_dict(b"Helvetica-Bold")),
    };

    let mut pages: Vec<&RenderPage> = input.pages.iter().collect();
    pages.sort_by_key(|page| page.page_number);

    let mut page_refs = Vec::with_capacity(pages.len());
    let mut warnings = Vec::new();
    for page in pages {
        debug!(
            "Rendering page {} ({} blocks)",
            page.page_number,
            page.blocks.len()
        );
        let (page_id, page_warnings) = render_page(
            &mut doc,
            &shared,
            &geometry,
            page,
            &input.cover,
            options.add_page_numbers,
        )?;
        page_refs.push(Object::Reference(page_id));
        warnings.extend(page_warnings);
    }

    let page_count = page_refs.len();
    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(page_refs)),
        ("Count", Object::Integer(page_count as i64)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    if options.compress_streams {
        doc.compress();
    }

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;

    Ok(RenderedPdf {
        bytes,
        page_count,
        warnings,
    })
}

/// Render on the blocking pool.
pub async fn render_book_async(
    input: RenderInput,
    options: GeneratorOptions,
) -> Result<RenderedPdf, RenderError> {
    tokio::task::spawn_blocking(move || render_book(&input, &options)).await?
}

fn font_dict(base_font: &[u8]) -> Dictionary {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(base_font.to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    font
}

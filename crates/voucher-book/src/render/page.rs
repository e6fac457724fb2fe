//! Page rendering
//!
//! Each page gets a single content stream built from formatted operator
//! strings, plus a resource dictionary naming the shared fonts and any
//! images drawn on the page.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use log::warn;

use crate::constants::{
    COVER_SUBTITLE_FONT_SIZE, COVER_TITLE_FONT_SIZE, PAGE_NUMBER_FONT_SIZE, WARNING_FONT_SIZE,
};
use crate::error::RenderError;
use crate::layout::{Rect, SlotGeometry};
use crate::types::PageLayout;

use super::blocks::draw_block;
use super::raster::{DecodedImage, add_image_xobject};
use super::text::{FONT_BOLD, FONT_REGULAR, centered_text_op, fit_font_size, line_height, text_op, wrap_text};
use super::{CoverInfo, RenderPage, RenderWarning};

/// Objects shared by every page of a document
pub(crate) struct SharedResources {
    pub pages_id: ObjectId,
    pub regular_font: ObjectId,
    pub bold_font: ObjectId,
}

// =============================================================================
// Canvas
// =============================================================================

/// Content of the page being drawn
pub(crate) struct PageCanvas<'a> {
    doc: &'a mut Document,
    pub page_number: u32,
    ops: String,
    xobjects: Dictionary,
    image_count: usize,
    warnings: Vec<RenderWarning>,
}

impl<'a> PageCanvas<'a> {
    fn new(doc: &'a mut Document, page_number: u32) -> Self {
        Self {
            doc,
            page_number,
            ops: String::new(),
            xobjects: Dictionary::new(),
            image_count: 0,
            warnings: Vec::new(),
        }
    }

    pub fn push(&mut self, op: impl AsRef<str>) {
        self.ops.push_str(op.as_ref());
    }

    /// Register an image on this page and return its resource name.
    pub fn add_image(&mut self, image: DecodedImage) -> String {
        let id = add_image_xobject(self.doc, image);
        self.image_count += 1;
        let name = format!("Im{}", self.image_count);
        self.xobjects.set(name.as_bytes(), Object::Reference(id));
        name
    }

    /// Record a degraded asset and mark `area` with a visible note.
    pub fn warn(&mut self, position: u8, area: &Rect, message: String) {
        warn!(
            "Page {} position {}: {}",
            self.page_number, position, message
        );

        self.ops.push_str(&format!(
            "q 0.8 0 0 RG 0.8 0 0 rg [3 2] 0 d 0.75 w {:.2} {:.2} {:.2} {:.2} re S\n",
            area.x, area.y, area.width, area.height
        ));
        let inner = area.inset(4.0);
        let lh = line_height(WARNING_FONT_SIZE);
        let max_lines = (inner.height / lh).floor() as usize;
        let mut y = inner.top() - WARNING_FONT_SIZE;
        for line in wrap_text(&format!("[!] {message}"), WARNING_FONT_SIZE, inner.width, max_lines) {
            self.ops
                .push_str(&text_op(FONT_REGULAR, WARNING_FONT_SIZE, inner.x, y, &line));
            y -= lh;
        }
        self.ops.push_str("Q\n");

        self.warnings.push(RenderWarning {
            page_number: self.page_number,
            position,
            message,
        });
    }
}

// =============================================================================
// Pages
// =============================================================================

/// Render one book page and add it to `doc`.
pub(crate) fn render_page(
    doc: &mut Document,
    shared: &SharedResources,
    geometry: &SlotGeometry,
    page: &RenderPage,
    cover: &CoverInfo,
    add_page_numbers: bool,
) -> Result<(ObjectId, Vec<RenderWarning>), RenderError> {
    let mut page_dict = Dictionary::new();
    page_dict.set("Type", Object::Name(b"Page".to_vec()));
    page_dict.set("Parent", Object::Reference(shared.pages_id));
    page_dict.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(geometry.page_width),
            Object::Real(geometry.page_height),
        ]),
    );

    let mut canvas = PageCanvas::new(doc, page.page_number);

    if page.layout == PageLayout::Cover {
        draw_cover(&mut canvas, &geometry.cover_title_area(), cover);
    }

    let mut blocks: Vec<_> = page.blocks.iter().collect();
    blocks.sort_by_key(|block| block.position);
    for block in blocks {
        let bounds = geometry.slot_bounds(page.layout, block.position, block.units);
        draw_block(&mut canvas, block.position, &bounds, &block.content)?;
    }

    if add_page_numbers {
        let y = ((geometry.content.y - PAGE_NUMBER_FONT_SIZE) / 2.0).max(2.0);
        canvas.push(centered_text_op(
            FONT_REGULAR,
            PAGE_NUMBER_FONT_SIZE,
            geometry.page_width / 2.0,
            y,
            &page.page_number.to_string(),
        ));
    }

    let PageCanvas {
        ops,
        xobjects,
        warnings,
        ..
    } = canvas;

    let mut fonts = Dictionary::new();
    fonts.set(FONT_REGULAR, Object::Reference(shared.regular_font));
    fonts.set(FONT_BOLD, Object::Reference(shared.bold_font));

    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));
    if !xobjects.is_empty() {
        resources.set("XObject", Object::Dictionary(xobjects));
    }

    let content_id = doc.add_object(Stream::new(Dictionary::new(), ops.into_bytes()));
    page_dict.set("Contents", Object::Reference(content_id));
    page_dict.set("Resources", Object::Dictionary(resources));

    Ok((doc.add_object(page_dict), warnings))
}

/// Title block in the upper half of a cover page
fn draw_cover(canvas: &mut PageCanvas<'_>, area: &Rect, cover: &CoverInfo) {
    let center_x = area.center_x();
    let title_size = fit_font_size(&cover.title, area.width, COVER_SUBTITLE_FONT_SIZE, COVER_TITLE_FONT_SIZE);
    let mut y = area.y + area.height * 0.6;

    for line in wrap_text(&cover.title, title_size, area.width, 2) {
        canvas.push(centered_text_op(FONT_BOLD, title_size, center_x, y, &line));
        y -= line_height(title_size);
    }

    y -= COVER_SUBTITLE_FONT_SIZE * 0.5;
    let issue = match &cover.edition {
        Some(edition) => format!("{edition} \u{2022} {}", cover.issue),
        None => cover.issue.clone(),
    };
    canvas.push(centered_text_op(
        FONT_REGULAR,
        COVER_SUBTITLE_FONT_SIZE,
        center_x,
        y,
        &issue,
    ));

    if let Some(subtitle) = &cover.subtitle {
        y -= line_height(COVER_SUBTITLE_FONT_SIZE) * 1.5;
        for line in wrap_text(subtitle, COVER_SUBTITLE_FONT_SIZE, area.width, 2) {
            canvas.push(centered_text_op(
                FONT_REGULAR,
                COVER_SUBTITLE_FONT_SIZE,
                center_x,
                y,
                &line,
            ));
            y -= line_height(COVER_SUBTITLE_FONT_SIZE);
        }
    }
}

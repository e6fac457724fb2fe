//! Slot geometry
//!
//! Each grid unit is a full-width horizontal band of the content area, so any
//! contiguous run of units is a rectangle. Cover pages keep their upper half
//! for the title block and split the lower half into `cover_units` bands.

use crate::constants::{
    BLOCK_PADDING_PT, LINE_HEIGHT_FACTOR, QR_MAX_SIZE_PT, SHORT_CODE_FONT_SIZE, SLOT_GUTTER_PT,
    mm_to_pt,
};
use crate::options::GeneratorOptions;
use crate::types::PageLayout;

use super::Rect;

// =============================================================================
// Geometry
// =============================================================================

/// Page geometry in points, derived once per render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotGeometry {
    pub page_width: f32,
    pub page_height: f32,
    /// Area inside the margins
    pub content: Rect,
    pub standard_units: u8,
    pub cover_units: u8,
    pub gutter: f32,
}

impl SlotGeometry {
    pub fn from_options(options: &GeneratorOptions) -> Self {
        let (page_width, page_height) = options.page_size_pt();
        let m = &options.margins;
        let content = Rect::new(
            mm_to_pt(m.left_mm),
            mm_to_pt(m.bottom_mm),
            page_width - mm_to_pt(m.left_mm + m.right_mm),
            page_height - mm_to_pt(m.top_mm + m.bottom_mm),
        );

        Self {
            page_width,
            page_height,
            content,
            standard_units: options.units_per_page,
            cover_units: options.cover_units,
            gutter: SLOT_GUTTER_PT,
        }
    }

    /// Upper half of a cover page's content area
    pub fn cover_title_area(&self) -> Rect {
        let half = self.content.height / 2.0;
        Rect::new(self.content.x, self.content.y + half, self.content.width, half)
    }

    /// Lower half of a cover page's content area
    pub fn cover_slot_area(&self) -> Rect {
        Rect::new(
            self.content.x,
            self.content.y,
            self.content.width,
            self.content.height / 2.0,
        )
    }

    /// Bounds of `units` units starting at `position`, gutter removed.
    ///
    /// Position 0 is the top band of the slot area.
    pub fn slot_bounds(&self, layout: PageLayout, position: u8, units: u8) -> Rect {
        let (area, capacity) = match layout {
            PageLayout::Standard => (self.content, self.standard_units),
            PageLayout::Cover => (self.cover_slot_area(), self.cover_units),
        };

        let band = area.height / f32::from(capacity.max(1));
        let top = area.top() - f32::from(position) * band;
        let height = f32::from(units) * band;
        let gutter = self.gutter.min(height / 2.0);

        Rect::new(
            area.x,
            top - height + gutter / 2.0,
            area.width,
            height - gutter,
        )
    }

    /// The shortest one-unit slot of any page layout
    pub fn smallest_slot(&self) -> Rect {
        let standard = self.slot_bounds(PageLayout::Standard, 0, 1);
        if self.cover_units == 0 {
            return standard;
        }
        let cover = self.slot_bounds(PageLayout::Cover, 0, 1);
        if cover.height < standard.height { cover } else { standard }
    }
}

/// Edge of the QR code drawn in a voucher block of `bounds` (points).
///
/// The code sits in the top right corner with its short code printed below.
pub fn voucher_qr_size(bounds: &Rect) -> f32 {
    let inner = bounds.inset(BLOCK_PADDING_PT);
    (inner.height - SHORT_CODE_FONT_SIZE * LINE_HEIGHT_FACTOR)
        .min(inner.width * 0.4)
        .min(QR_MAX_SIZE_PT)
}

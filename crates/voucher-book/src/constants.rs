//! Shared constants for voucher book generation
//!
//! This module centralizes magic numbers used by layout and rendering.

// =============================================================================
// Unit Conversion
// =============================================================================

/// Points per millimeter (1 inch = 72 points, 1 inch = 25.4mm)
pub const POINTS_PER_MM: f32 = 72.0 / 25.4; // ≈ 2.83465

/// Convert millimeters to points
#[inline]
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * POINTS_PER_MM
}

// =============================================================================
// Grid
// =============================================================================

/// Units on a standard page
pub const STANDARD_PAGE_UNITS: u8 = 8;

/// Units on a cover page (lower half only)
pub const COVER_PAGE_UNITS: u8 = 4;

/// Largest page capacity the unit bitmap can hold
pub const MAX_PAGE_UNITS: u8 = 32;

/// Vertical gap between neighbouring slots (points)
pub const SLOT_GUTTER_PT: f32 = 4.0;

// =============================================================================
// Blocks
// =============================================================================

/// Inner padding of a placement block (points)
pub const BLOCK_PADDING_PT: f32 = 6.0;

/// Border line width of a placement block (points)
pub const BLOCK_BORDER_WIDTH: f32 = 0.5;

/// Title font size bounds (points)
pub const TITLE_FONT_MIN: f32 = 8.0;
pub const TITLE_FONT_MAX: f32 = 18.0;

/// Body font size (points)
pub const BODY_FONT_SIZE: f32 = 8.0;

/// Font size of warning annotations (points)
pub const WARNING_FONT_SIZE: f32 = 7.0;

/// Line height as a multiple of font size
pub const LINE_HEIGHT_FACTOR: f32 = 1.25;

/// Approximate character width ratio for Helvetica
pub const HELVETICA_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Largest edge of a rendered QR code (points)
pub const QR_MAX_SIZE_PT: f32 = 110.0;

/// Smallest QR edge that still scans reliably (points)
pub const QR_MIN_SIZE_PT: f32 = 24.0;

/// Font size of the short code under the QR code (points)
pub const SHORT_CODE_FONT_SIZE: f32 = 9.0;

// =============================================================================
// Cover
// =============================================================================

pub const COVER_TITLE_FONT_SIZE: f32 = 28.0;
pub const COVER_SUBTITLE_FONT_SIZE: f32 = 14.0;

// =============================================================================
// Page Numbers
// =============================================================================

/// Default font size for page numbers (points)
pub const PAGE_NUMBER_FONT_SIZE: f32 = 8.0;

// =============================================================================
// Output
// =============================================================================

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Storage prefix under which book PDFs are filed
pub const DEFAULT_STORAGE_PREFIX: &str = "voucher-books";

pub const DEFAULT_LOCALE: &str = "en";

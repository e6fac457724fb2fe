use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type BookId = Uuid;
pub type PageId = Uuid;
pub type PlacementId = Uuid;
pub type DistributionId = Uuid;

// =============================================================================
// Voucher Books
// =============================================================================

/// Lifecycle status of a voucher book
///
/// Statuses are ordered: a book only moves forward through them unless an
/// administrator overrides the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    Draft,
    ReadyForPrint,
    Published,
    Archived,
}

impl BookStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookStatus::Draft => "draft",
            BookStatus::ReadyForPrint => "ready_for_print",
            BookStatus::Published => "published",
            BookStatus::Archived => "archived",
        }
    }

    /// Whether a PDF may be generated from this status
    pub fn is_eligible_for_generation(self) -> bool {
        matches!(self, BookStatus::Draft | BookStatus::ReadyForPrint)
    }

    /// Check a transition. Forward moves are always allowed; anything else
    /// needs `admin_override`.
    pub fn can_transition_to(self, next: BookStatus, admin_override: bool) -> bool {
        admin_override || next > self
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(BookStatus::Draft),
            "ready_for_print" => Ok(BookStatus::ReadyForPrint),
            "published" => Ok(BookStatus::Published),
            "archived" => Ok(BookStatus::Archived),
            other => Err(format!("unknown book status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookType {
    Monthly,
    SpecialEdition,
    Regional,
}

impl BookType {
    pub fn as_str(self) -> &'static str {
        match self {
            BookType::Monthly => "monthly",
            BookType::SpecialEdition => "special_edition",
            BookType::Regional => "regional",
        }
    }
}

impl FromStr for BookType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(BookType::Monthly),
            "special_edition" => Ok(BookType::SpecialEdition),
            "regional" => Ok(BookType::Regional),
            other => Err(format!("unknown book type '{other}'")),
        }
    }
}

/// A generated PDF. URL and timestamp only ever exist together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfArtifact {
    pub url: String,
    pub generated_at: DateTime<Utc>,
}

/// Typed book metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetadata {
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Preferred language for multilingual voucher text
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherBook {
    pub id: BookId,
    pub title: String,
    #[serde(default)]
    pub edition: Option<String>,
    pub book_type: BookType,
    pub year: i32,
    #[serde(default)]
    pub month: Option<u8>,
    pub status: BookStatus,
    pub total_pages: u32,
    #[serde(default)]
    pub pdf: Option<PdfArtifact>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BookMetadata,
}

impl VoucherBook {
    /// A fresh draft book
    pub fn draft(title: impl Into<String>, year: i32, month: Option<u8>, total_pages: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            edition: None,
            book_type: BookType::Monthly,
            year,
            month,
            status: BookStatus::Draft,
            total_pages,
            pdf: None,
            created_by: None,
            updated_by: None,
            created_at: now,
            updated_at: now,
            metadata: BookMetadata::default(),
        }
    }

    pub fn pdf_url(&self) -> Option<&str> {
        self.pdf.as_ref().map(|pdf| pdf.url.as_str())
    }

    /// "March 2026", or just the year for books without a month
    pub fn issue_label(&self) -> String {
        match self.month.and_then(month_name) {
            Some(month) => format!("{} {}", month, self.year),
            None => self.year.to_string(),
        }
    }
}

fn month_name(month: u8) -> Option<&'static str> {
    const MONTHS: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    MONTHS.get(usize::from(month).checked_sub(1)?).copied()
}

// =============================================================================
// Pages
// =============================================================================

/// Page layout type. Cover pages reserve their top half for the title block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageLayout {
    Cover,
    #[default]
    Standard,
}

impl PageLayout {
    pub fn as_str(self) -> &'static str {
        match self {
            PageLayout::Cover => "cover",
            PageLayout::Standard => "standard",
        }
    }
}

impl FromStr for PageLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cover" => Ok(PageLayout::Cover),
            "standard" => Ok(PageLayout::Standard),
            other => Err(format!("unknown page layout '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherBookPage {
    pub id: PageId,
    pub book_id: BookId,
    /// 1-based, unique within the book
    pub page_number: u32,
    #[serde(default)]
    pub layout: PageLayout,
}

// =============================================================================
// Placements
// =============================================================================

/// Size class of a placement, in grid units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlacementSize {
    Single,
    Quarter,
    Half,
    Full,
}

impl PlacementSize {
    pub fn units(self) -> u8 {
        match self {
            PlacementSize::Single => 1,
            PlacementSize::Quarter => 2,
            PlacementSize::Half => 4,
            PlacementSize::Full => 8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlacementSize::Single => "SINGLE",
            PlacementSize::Quarter => "QUARTER",
            PlacementSize::Half => "HALF",
            PlacementSize::Full => "FULL",
        }
    }
}

impl FromStr for PlacementSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SINGLE" => Ok(PlacementSize::Single),
            "QUARTER" => Ok(PlacementSize::Quarter),
            "HALF" => Ok(PlacementSize::Half),
            "FULL" => Ok(PlacementSize::Full),
            other => Err(format!("unknown placement size '{other}'")),
        }
    }
}

/// What a placement shows. Each variant carries only its own fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "content_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlacementContent {
    Voucher {
        voucher_id: String,
    },
    Image {
        image_url: String,
        #[serde(default)]
        caption: Option<String>,
    },
    Ad {
        title: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        image_url: Option<String>,
    },
    Sponsored {
        provider_id: String,
        title: String,
        #[serde(default)]
        description: Option<String>,
    },
}

impl PlacementContent {
    pub fn kind(&self) -> ContentKind {
        match self {
            PlacementContent::Voucher { .. } => ContentKind::Voucher,
            PlacementContent::Image { .. } => ContentKind::Image,
            PlacementContent::Ad { .. } => ContentKind::Ad,
            PlacementContent::Sponsored { .. } => ContentKind::Sponsored,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentKind {
    Voucher,
    Image,
    Ad,
    Sponsored,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Voucher => "VOUCHER",
            ContentKind::Image => "IMAGE",
            ContentKind::Ad => "AD",
            ContentKind::Sponsored => "SPONSORED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdPlacement {
    pub id: PlacementId,
    pub page_id: PageId,
    /// Starting unit. `None` lets the layout engine choose the slot.
    #[serde(default)]
    pub position: Option<u8>,
    pub size: PlacementSize,
    pub content: PlacementContent,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub display_order: i32,
}

fn default_active() -> bool {
    true
}

// =============================================================================
// Distributions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionStatus {
    Pending,
    Shipped,
    Delivered,
    Cancelled,
}

impl DistributionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DistributionStatus::Pending => "pending",
            DistributionStatus::Shipped => "shipped",
            DistributionStatus::Delivered => "delivered",
            DistributionStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(self, next: DistributionStatus) -> bool {
        use DistributionStatus::*;
        matches!(
            (self, next),
            (Pending, Shipped) | (Shipped, Delivered) | (Pending, Cancelled) | (Shipped, Cancelled)
        )
    }
}

impl FromStr for DistributionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DistributionStatus::Pending),
            "shipped" => Ok(DistributionStatus::Shipped),
            "delivered" => Ok(DistributionStatus::Delivered),
            "cancelled" => Ok(DistributionStatus::Cancelled),
            other => Err(format!("unknown distribution status '{other}'")),
        }
    }
}

/// Shipment of printed books to a business location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDistribution {
    pub id: DistributionId,
    pub book_id: BookId,
    pub business_location_id: String,
    pub quantity: u32,
    pub status: DistributionStatus,
    #[serde(default)]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl BookDistribution {
    /// Apply a status change, stamping shipment timestamps.
    pub fn advance(&mut self, next: DistributionStatus, at: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        match next {
            DistributionStatus::Shipped => self.shipped_at = Some(at),
            DistributionStatus::Delivered => self.delivered_at = Some(at),
            _ => {}
        }
        self.status = next;
        true
    }
}

// =============================================================================
// Paper
// =============================================================================

/// Paper orientation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Orientation {
    /// Portrait: height > width (default for most paper sizes)
    #[default]
    Portrait,
    /// Landscape: width > height
    Landscape,
}

/// Standard paper sizes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A5,
    Letter,
    Legal,
    Custom { width_mm: f32, height_mm: f32 },
}

impl PaperSize {
    /// Get base dimensions (always portrait: width < height for standard sizes)
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::A5 => (148.0, 210.0),
            PaperSize::Letter => (215.9, 279.4),
            PaperSize::Legal => (215.9, 355.6),
            PaperSize::Custom {
                width_mm,
                height_mm,
            } => (width_mm, height_mm),
        }
    }

    /// Get dimensions with orientation applied
    pub fn dimensions_with_orientation(self, orientation: Orientation) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }
}

/// Page margins in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageMargins {
    pub top_mm: f32,
    pub bottom_mm: f32,
    pub left_mm: f32,
    pub right_mm: f32,
}

impl Default for PageMargins {
    fn default() -> Self {
        Self::uniform(12.0)
    }
}

impl PageMargins {
    /// Create uniform margins on all sides
    pub fn uniform(margin_mm: f32) -> Self {
        Self {
            top_mm: margin_mm,
            bottom_mm: margin_mm,
            left_mm: margin_mm,
            right_mm: margin_mm,
        }
    }
}

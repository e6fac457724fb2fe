//! Layout data types
//!
//! These types sit between the stored book structure and PDF rendering.

use crate::types::{PageLayout, PlacementSize};

/// A page slot: page number plus starting unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct SlotRef {
    pub page_number: u32,
    pub position: u8,
}

impl SlotRef {
    pub fn new(page_number: u32, position: u8) -> Self {
        Self {
            page_number,
            position,
        }
    }
}

/// Something to place: a size class, optionally pinned to a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutItem {
    pub size: PlacementSize,
    pub pin: Option<SlotRef>,
}

impl LayoutItem {
    pub fn floating(size: PlacementSize) -> Self {
        Self { size, pin: None }
    }

    pub fn pinned(size: PlacementSize, page_number: u32, position: u8) -> Self {
        Self {
            size,
            pin: Some(SlotRef::new(page_number, position)),
        }
    }
}

/// A page that exists before layout starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    pub page_number: u32,
    pub layout: PageLayout,
    pub capacity: u8,
}

/// A page in the finished plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedPage {
    pub page_number: u32,
    pub layout: PageLayout,
    pub capacity: u8,
    pub used_units: u8,
    /// Created by the layout engine rather than taken from the book
    pub allocated: bool,
}

/// Result of layout: one slot per input item, in input order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPlan {
    /// Pages in ascending page number order
    pub pages: Vec<PlannedPage>,
    pub slots: Vec<SlotRef>,
}

impl LayoutPlan {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Indices of items on a page, in ascending position order
    pub fn items_on_page(&self, page_number: u32) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.page_number == page_number)
            .map(|(idx, _)| idx)
            .collect();
        indices.sort_by_key(|&idx| (self.slots[idx].position, idx));
        indices
    }
}

/// Occupancy bitmap of one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitMap {
    bits: u64,
    capacity: u8,
}

impl UnitMap {
    pub fn new(capacity: u8) -> Self {
        Self { bits: 0, capacity }
    }

    pub fn capacity(&self) -> u8 {
        self.capacity
    }

    pub fn used(&self) -> u8 {
        self.bits.count_ones() as u8
    }

    /// Whether `units` units starting at `position` lie on the page
    pub fn fits(&self, position: u8, units: u8) -> bool {
        u16::from(position) + u16::from(units) <= u16::from(self.capacity)
    }

    pub fn is_free(&self, position: u8, units: u8) -> bool {
        self.fits(position, units) && self.bits & run_mask(position, units) == 0
    }

    pub fn reserve(&mut self, position: u8, units: u8) {
        self.bits |= run_mask(position, units);
    }

    /// Lowest position with `units` contiguous free units
    pub fn first_fit(&self, units: u8) -> Option<u8> {
        if units == 0 || units > self.capacity {
            return None;
        }
        (0..=self.capacity - units).find(|&pos| self.is_free(pos, units))
    }
}

fn run_mask(position: u8, units: u8) -> u64 {
    if units == 0 {
        return 0;
    }
    let run = if units >= 64 {
        u64::MAX
    } else {
        (1u64 << units) - 1
    };
    run.checked_shl(u32::from(position)).unwrap_or(0)
}

/// A rectangular area in points
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// X position (left edge)
    pub x: f32,
    /// Y position (bottom edge)
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge x coordinate
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Top edge y coordinate
    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    /// Center x coordinate
    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    /// Shrink by `amount` on every side
    pub fn inset(&self, amount: f32) -> Rect {
        Rect::new(
            self.x + amount,
            self.y + amount,
            (self.width - 2.0 * amount).max(0.0),
            (self.height - 2.0 * amount).max(0.0),
        )
    }
}

//! Slot assignment
//!
//! Pinned items are reserved first, then floating items are packed greedy
//! first-fit in input order. Pages are walked in ascending page number; when
//! nothing fits, the lowest unused page number up to `total_pages` is
//! allocated as a standard page.

use std::collections::BTreeMap;

use crate::error::LayoutError;
use crate::types::PageLayout;

use super::{LayoutItem, LayoutPlan, PageSpec, PlannedPage, SlotRef, UnitMap};

/// Assign every item a slot.
///
/// # Arguments
/// * `items` - Items in placement order
/// * `pages` - Pages the book already has
/// * `total_pages` - Highest page number the book may use
/// * `standard_capacity` - Units on a standard page
pub fn plan_layout(
    items: &[LayoutItem],
    pages: &[PageSpec],
    total_pages: u32,
    standard_capacity: u8,
) -> Result<LayoutPlan, LayoutError> {
    for (index, item) in items.iter().enumerate() {
        let units = item.size.units();
        if units > standard_capacity {
            return Err(LayoutError::ItemTooLarge {
                index,
                units,
                capacity: standard_capacity,
            });
        }
    }

    let mut grid = BookGrid::new(pages, total_pages, standard_capacity)?;
    let mut slots = vec![SlotRef::default(); items.len()];

    for (index, item) in items.iter().enumerate() {
        if let Some(pin) = item.pin {
            grid.reserve(pin, item.size.units())?;
            slots[index] = pin;
        }
    }

    for (index, item) in items.iter().enumerate() {
        if item.pin.is_none() {
            slots[index] = grid.first_fit(item.size.units())?;
        }
    }

    Ok(LayoutPlan {
        pages: grid.into_pages(),
        slots,
    })
}

struct GridPage {
    layout: PageLayout,
    map: UnitMap,
    allocated: bool,
}

struct BookGrid {
    pages: BTreeMap<u32, GridPage>,
    total_pages: u32,
    standard_capacity: u8,
}

impl BookGrid {
    fn new(specs: &[PageSpec], total_pages: u32, standard_capacity: u8) -> Result<Self, LayoutError> {
        let mut pages = BTreeMap::new();
        for spec in specs {
            if spec.page_number == 0 || spec.page_number > total_pages {
                return Err(LayoutError::PageOutOfRange {
                    page_number: spec.page_number,
                    total_pages,
                });
            }
            let page = GridPage {
                layout: spec.layout,
                map: UnitMap::new(spec.capacity),
                allocated: false,
            };
            if pages.insert(spec.page_number, page).is_some() {
                return Err(LayoutError::DuplicatePage {
                    page_number: spec.page_number,
                });
            }
        }

        Ok(Self {
            pages,
            total_pages,
            standard_capacity,
        })
    }

    fn reserve(&mut self, slot: SlotRef, units: u8) -> Result<(), LayoutError> {
        let page = self
            .pages
            .get_mut(&slot.page_number)
            .ok_or(LayoutError::UnknownPage {
                page_number: slot.page_number,
            })?;

        if !page.map.fits(slot.position, units) {
            return Err(LayoutError::SlotOutOfBounds {
                page_number: slot.page_number,
                position: slot.position,
                units,
                capacity: page.map.capacity(),
            });
        }
        if !page.map.is_free(slot.position, units) {
            return Err(LayoutError::Overlap {
                page_number: slot.page_number,
                position: slot.position,
            });
        }

        page.map.reserve(slot.position, units);
        Ok(())
    }

    fn first_fit(&mut self, units: u8) -> Result<SlotRef, LayoutError> {
        for (&page_number, page) in self.pages.iter_mut() {
            if let Some(position) = page.map.first_fit(units) {
                page.map.reserve(position, units);
                return Ok(SlotRef::new(page_number, position));
            }
        }

        let page_number = (1..=self.total_pages)
            .find(|n| !self.pages.contains_key(n))
            .ok_or(LayoutError::InsufficientPages {
                total_pages: self.total_pages,
            })?;

        let mut map = UnitMap::new(self.standard_capacity);
        map.reserve(0, units);
        self.pages.insert(
            page_number,
            GridPage {
                layout: PageLayout::Standard,
                map,
                allocated: true,
            },
        );
        Ok(SlotRef::new(page_number, 0))
    }

    fn into_pages(self) -> Vec<PlannedPage> {
        self.pages
            .into_iter()
            .map(|(page_number, page)| PlannedPage {
                page_number,
                layout: page.layout,
                capacity: page.map.capacity(),
                used_units: page.map.used(),
                allocated: page.allocated,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlacementSize::*;

    fn standard(page_number: u32) -> PageSpec {
        PageSpec {
            page_number,
            layout: PageLayout::Standard,
            capacity: 8,
        }
    }

    #[test]
    fn packs_in_input_order() {
        let items = [
            LayoutItem::floating(Half),
            LayoutItem::floating(Quarter),
            LayoutItem::floating(Single),
            LayoutItem::floating(Full),
        ];
        let plan = plan_layout(&items, &[standard(1), standard(2)], 2, 8).unwrap();

        assert_eq!(
            plan.slots,
            vec![
                SlotRef::new(1, 0),
                SlotRef::new(1, 4),
                SlotRef::new(1, 6),
                SlotRef::new(2, 0),
            ]
        );
        assert_eq!(plan.pages[0].used_units, 7);
        assert_eq!(plan.pages[1].used_units, 8);
    }

    #[test]
    fn later_small_items_backfill_earlier_pages() {
        let items = [
            LayoutItem::floating(Half),
            LayoutItem::floating(Half),
            LayoutItem::floating(Half),
            LayoutItem::floating(Quarter),
        ];
        let plan = plan_layout(&items, &[standard(1)], 3, 8).unwrap();
        assert_eq!(plan.slots[2], SlotRef::new(2, 0));
        assert_eq!(plan.slots[3], SlotRef::new(2, 4));
        assert!(plan.pages[1].allocated);
    }

    #[test]
    fn pins_are_reserved_before_floating_items() {
        let items = [
            LayoutItem::floating(Quarter),
            LayoutItem::pinned(Single, 1, 0),
        ];
        let plan = plan_layout(&items, &[standard(1)], 1, 8).unwrap();
        assert_eq!(plan.slots[1], SlotRef::new(1, 0));
        assert_eq!(plan.slots[0], SlotRef::new(1, 1));
    }

    #[test]
    fn overlapping_pins_fail() {
        let items = [
            LayoutItem::pinned(Half, 1, 0),
            LayoutItem::pinned(Quarter, 1, 3),
        ];
        let err = plan_layout(&items, &[standard(1)], 1, 8).unwrap_err();
        assert_eq!(
            err,
            LayoutError::Overlap {
                page_number: 1,
                position: 3
            }
        );
    }

    #[test]
    fn pin_past_page_end_fails() {
        let items = [LayoutItem::pinned(Half, 1, 6)];
        let err = plan_layout(&items, &[standard(1)], 1, 8).unwrap_err();
        assert!(matches!(err, LayoutError::SlotOutOfBounds { .. }));
    }

    #[test]
    fn pin_to_missing_page_fails() {
        let items = [LayoutItem::pinned(Single, 3, 0)];
        let err = plan_layout(&items, &[standard(1)], 4, 8).unwrap_err();
        assert_eq!(err, LayoutError::UnknownPage { page_number: 3 });
    }

    #[test]
    fn running_out_of_pages_fails() {
        let items = [
            LayoutItem::floating(Full),
            LayoutItem::floating(Full),
            LayoutItem::floating(Single),
        ];
        let err = plan_layout(&items, &[], 2, 8).unwrap_err();
        assert_eq!(err, LayoutError::InsufficientPages { total_pages: 2 });
        assert!(err.to_string().to_lowercase().contains("insufficient pages"));
    }

    #[test]
    fn items_larger_than_a_page_are_rejected() {
        let items = [LayoutItem::floating(Full)];
        let err = plan_layout(&items, &[], 4, 4).unwrap_err();
        assert_eq!(
            err,
            LayoutError::ItemTooLarge {
                index: 0,
                units: 8,
                capacity: 4
            }
        );
    }

    #[test]
    fn cover_pages_hold_fewer_units() {
        let cover = PageSpec {
            page_number: 1,
            layout: PageLayout::Cover,
            capacity: 4,
        };
        let items = [LayoutItem::floating(Full), LayoutItem::floating(Half)];
        let plan = plan_layout(&items, &[cover], 2, 8).unwrap();
        assert_eq!(plan.slots[0], SlotRef::new(2, 0));
        assert_eq!(plan.slots[1], SlotRef::new(1, 0));
    }

    #[test]
    fn allocation_fills_gaps_in_page_numbers() {
        let items = [LayoutItem::floating(Full), LayoutItem::floating(Full)];
        let plan = plan_layout(&items, &[standard(3)], 3, 8).unwrap();
        assert_eq!(plan.slots, vec![SlotRef::new(3, 0), SlotRef::new(1, 0)]);
        let numbers: Vec<u32> = plan.pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 3]);
    }

    #[test]
    fn pages_outside_the_book_are_rejected() {
        let err = plan_layout(&[], &[standard(5)], 4, 8).unwrap_err();
        assert_eq!(
            err,
            LayoutError::PageOutOfRange {
                page_number: 5,
                total_pages: 4
            }
        );
        let err = plan_layout(&[], &[standard(1), standard(1)], 4, 8).unwrap_err();
        assert_eq!(err, LayoutError::DuplicatePage { page_number: 1 });
    }
}

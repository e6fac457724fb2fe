//! Layout statistics
//!
//! Summaries of a layout plan for reporting.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::layout::LayoutPlan;
use crate::types::ContentKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutStatistics {
    pub pages_used: usize,
    /// Pages the layout engine had to add
    pub pages_allocated: usize,
    pub units_total: u32,
    pub units_used: u32,
    pub units_free: u32,
    /// `units_used / units_total`, 0 for an empty plan
    pub fill_ratio: f32,
    pub placements_by_kind: BTreeMap<ContentKind, usize>,
}

/// Calculate statistics for a plan.
///
/// `kinds` is aligned with the items the plan was made for.
pub fn calculate_statistics(plan: &LayoutPlan, kinds: &[ContentKind]) -> LayoutStatistics {
    let units_total: u32 = plan.pages.iter().map(|p| u32::from(p.capacity)).sum();
    let units_used: u32 = plan.pages.iter().map(|p| u32::from(p.used_units)).sum();

    let mut placements_by_kind = BTreeMap::new();
    for kind in kinds {
        *placements_by_kind.entry(*kind).or_insert(0) += 1;
    }

    LayoutStatistics {
        pages_used: plan.pages.len(),
        pages_allocated: plan.pages.iter().filter(|p| p.allocated).count(),
        units_total,
        units_used,
        units_free: units_total - units_used,
        fill_ratio: if units_total == 0 {
            0.0
        } else {
            units_used as f32 / units_total as f32
        },
        placements_by_kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{LayoutItem, PageSpec, plan_layout};
    use crate::types::{PageLayout, PlacementSize};

    #[test]
    fn counts_units_and_kinds() {
        let items = [
            LayoutItem::floating(PlacementSize::Half),
            LayoutItem::floating(PlacementSize::Quarter),
            LayoutItem::floating(PlacementSize::Full),
        ];
        let pages = [PageSpec {
            page_number: 1,
            layout: PageLayout::Standard,
            capacity: 8,
        }];
        let plan = plan_layout(&items, &pages, 2, 8).unwrap();
        let stats = calculate_statistics(
            &plan,
            &[ContentKind::Voucher, ContentKind::Voucher, ContentKind::Ad],
        );

        assert_eq!(stats.pages_used, 2);
        assert_eq!(stats.pages_allocated, 1);
        assert_eq!(stats.units_total, 16);
        assert_eq!(stats.units_used, 14);
        assert_eq!(stats.units_free, 2);
        assert!((stats.fill_ratio - 0.875).abs() < f32::EPSILON);
        assert_eq!(stats.placements_by_kind[&ContentKind::Voucher], 2);
        assert_eq!(stats.placements_by_kind[&ContentKind::Ad], 1);
    }
}

use voucher_book::layout::SlotGeometry;
use voucher_book::*;

fn standard(page_number: u32) -> PageSpec {
    PageSpec {
        page_number,
        layout: PageLayout::Standard,
        capacity: 8,
    }
}

#[test]
fn test_mixed_sizes_pack_first_fit() {
    let items = [
        LayoutItem::floating(PlacementSize::Half),
        LayoutItem::floating(PlacementSize::Quarter),
        LayoutItem::floating(PlacementSize::Single),
        LayoutItem::floating(PlacementSize::Full),
        LayoutItem::floating(PlacementSize::Single),
    ];
    let plan = plan_layout(&items, &[standard(1)], 3, 8).unwrap();

    assert_eq!(plan.slots[0], SlotRef::new(1, 0));
    assert_eq!(plan.slots[1], SlotRef::new(1, 4));
    assert_eq!(plan.slots[2], SlotRef::new(1, 6));
    assert_eq!(plan.slots[3], SlotRef::new(2, 0));
    // Backfills the hole left on page 1.
    assert_eq!(plan.slots[4], SlotRef::new(1, 7));
    assert_eq!(plan.page_count(), 2);
    assert_eq!(plan.items_on_page(1), vec![0, 1, 2, 4]);
}

#[test]
fn test_cover_page_takes_four_units() {
    let options = GeneratorOptions::default();
    let cover = PageSpec {
        page_number: 1,
        layout: PageLayout::Cover,
        capacity: options.capacity(PageLayout::Cover),
    };
    let items = [
        LayoutItem::floating(PlacementSize::Half),
        LayoutItem::floating(PlacementSize::Single),
    ];
    let plan = plan_layout(&items, &[cover], 2, options.units_per_page).unwrap();

    assert_eq!(plan.slots[0], SlotRef::new(1, 0));
    assert_eq!(plan.slots[1], SlotRef::new(2, 0));
    assert_eq!(plan.pages[0].used_units, 4);
    assert!(plan.pages[1].allocated);
}

#[test]
fn test_pinned_overlap_rejected() {
    let items = [
        LayoutItem::pinned(PlacementSize::Half, 1, 0),
        LayoutItem::pinned(PlacementSize::Quarter, 1, 2),
    ];
    let err = plan_layout(&items, &[standard(1)], 1, 8).unwrap_err();
    assert_eq!(
        err,
        LayoutError::Overlap {
            page_number: 1,
            position: 2
        }
    );
}

#[test]
fn test_growth_is_bounded_by_total_pages() {
    let items = vec![LayoutItem::floating(PlacementSize::Full); 3];
    let err = plan_layout(&items, &[], 2, 8).unwrap_err();
    assert_eq!(err, LayoutError::InsufficientPages { total_pages: 2 });
    assert!(err.to_string().contains("Insufficient pages"));
}

#[test]
fn test_statistics_for_plan() {
    let items = [
        LayoutItem::floating(PlacementSize::Full),
        LayoutItem::floating(PlacementSize::Quarter),
    ];
    let plan = plan_layout(&items, &[standard(1)], 4, 8).unwrap();
    let stats = calculate_statistics(&plan, &[ContentKind::Voucher, ContentKind::Image]);

    assert_eq!(stats.pages_used, 2);
    assert_eq!(stats.units_used, 10);
    assert_eq!(stats.units_free, 6);
    assert_eq!(stats.placements_by_kind.len(), 2);
}

#[test]
fn test_slots_stay_inside_content_area() {
    let geometry = SlotGeometry::from_options(&GeneratorOptions::default());
    let content = geometry.content;

    let mut previous_bottom = f32::MAX;
    for position in 0..8u8 {
        let slot = geometry.slot_bounds(PageLayout::Standard, position, 1);
        assert!(slot.x >= content.x - 0.01);
        assert!(slot.right() <= content.right() + 0.01);
        assert!(slot.y >= content.y - 0.01);
        assert!(slot.top() <= content.top() + 0.01);
        // Slots run top to bottom without overlapping.
        assert!(slot.top() <= previous_bottom + 0.01);
        previous_bottom = slot.y;
    }

    let cover_slot = geometry.slot_bounds(PageLayout::Cover, 0, 4);
    assert!(cover_slot.top() <= geometry.cover_slot_area().top() + 0.01);
}

const SIZES: [PlacementSize; 4] = [
    PlacementSize::Single,
    PlacementSize::Quarter,
    PlacementSize::Half,
    PlacementSize::Full,
];

/// Every size sequence up to `max_len` items, shortest first
fn size_mixes(max_len: u32) -> Vec<Vec<PlacementSize>> {
    let mut mixes = Vec::new();
    for len in 1..=max_len {
        for mut code in 0..SIZES.len().pow(len) {
            let mut mix = Vec::with_capacity(len as usize);
            for _ in 0..len {
                mix.push(SIZES[code % SIZES.len()]);
                code /= SIZES.len();
            }
            mixes.push(mix);
        }
    }
    mixes
}

/// Pin nothing, the first item, the last item, or both, on page 2
fn with_pins(mix: &[PlacementSize], variant: usize) -> Vec<LayoutItem> {
    let last = mix.len() - 1;
    mix.iter()
        .enumerate()
        .map(|(index, &size)| {
            let pin_first = index == 0 && variant & 1 == 1;
            let pin_last = index == last && index != 0 && variant & 2 == 2;
            if pin_first {
                LayoutItem::pinned(size, 2, 0)
            } else if pin_last {
                LayoutItem::pinned(size, 2, 8 - size.units())
            } else {
                LayoutItem::floating(size)
            }
        })
        .collect()
}

#[test]
fn test_layout_properties() {
    let options = GeneratorOptions::default();
    let pages = [
        PageSpec {
            page_number: 1,
            layout: PageLayout::Cover,
            capacity: options.capacity(PageLayout::Cover),
        },
        standard(2),
    ];

    let mut planned = 0;
    for (n, mix) in size_mixes(6).iter().enumerate() {
        let items = with_pins(mix, n % 4);
        let first = plan_layout(&items, &pages, 5, options.units_per_page);
        let second = plan_layout(&items, &pages, 5, options.units_per_page);
        assert_eq!(first, second, "layout differs between runs for {items:?}");

        let Ok(plan) = first else {
            continue;
        };
        planned += 1;
        assert_eq!(plan.slots.len(), items.len());

        for (item, slot) in items.iter().zip(&plan.slots) {
            if let Some(pin) = item.pin {
                assert_eq!(*slot, pin);
            }
        }

        for page in &plan.pages {
            let mut ranges: Vec<(u8, u8)> = plan
                .items_on_page(page.page_number)
                .into_iter()
                .map(|index| {
                    let start = plan.slots[index].position;
                    (start, start + items[index].size.units())
                })
                .collect();
            ranges.sort();

            let used: u8 = ranges.iter().map(|(start, end)| end - start).sum();
            assert!(used <= page.capacity, "page {} over capacity for {items:?}", page.page_number);
            assert_eq!(used, page.used_units);
            assert!(ranges.iter().all(|&(_, end)| end <= page.capacity));
            for pair in ranges.windows(2) {
                assert!(
                    pair[0].1 <= pair[1].0,
                    "overlap on page {} for {items:?}",
                    page.page_number
                );
            }
        }

        for slot in &plan.slots {
            assert!(plan.pages.iter().any(|p| p.page_number == slot.page_number));
        }
    }
    assert!(planned > 1000);
}

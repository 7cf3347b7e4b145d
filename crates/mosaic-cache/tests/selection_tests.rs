//! Tests for in-window selection, filtering and the z-order stack.

mod common;

use common::{Harness, SCENES_PER_CELL};
use mosaic_cache::{DateStep, FilterCriteria, MosaicEvent, ShowSceneOutcome};
use mosaic_common::GridCoord;
use std::sync::Arc;
use test_utils::{
    default_pick_record, drain_events, scene_key, swath_profile, test_profile, MemorySource,
};

fn visibility(h: &Harness) -> Vec<Vec<bool>> {
    h.controller.with_window(|w| {
        w.cells()
            .iter()
            .map(|c| c.scenes().iter().map(|s| s.visible).collect())
            .collect()
    })
}

// ============================================================================
// Default pick
// ============================================================================

#[test]
fn test_default_pick_prefers_best_rating() {
    let profile = test_profile();
    let memory = Arc::new(MemorySource::new());
    memory.insert(&profile.name, GridCoord::new(10, 20), default_pick_record());
    let h = Harness::with_memory(profile, memory);
    h.goto(10, 20);

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.valid_cells, 1);
    // The eight neighbours have no record
    assert_eq!(h.controller.stats().parse_failures, 8);
    let current = snapshot.current_scene.expect("center has a selection");
    assert_eq!(current.entity_id, "JUN");
}

// ============================================================================
// show_scene / select_scene
// ============================================================================

#[test]
fn test_show_scene_in_window_selects_immediately() {
    let h = Harness::new(test_profile());
    h.goto(10, 10);
    let key = scene_key(GridCoord::new(11, 10), 2);

    assert_eq!(h.controller.show_scene(&key), ShowSceneOutcome::Selected);
    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.current_scene, Some(key.clone()));
    assert_eq!(snapshot.active_cell, Some(GridCoord::new(11, 10)));
    assert_eq!(snapshot.paint_order.last(), Some(&key));
    // No load was needed
    assert_eq!(h.controller.stats().cycles_started, 1);
}

#[test]
fn test_show_scene_out_of_window_navigates_then_selects() {
    let h = Harness::new(test_profile());
    h.goto(10, 10);
    let key = scene_key(GridCoord::new(30, 30), 1);

    assert_eq!(h.controller.show_scene(&key), ShowSceneOutcome::Navigating);
    h.wait();

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.center, GridCoord::new(30, 30));
    assert_eq!(snapshot.current_scene, Some(key.clone()));
    assert_eq!(snapshot.paint_order.last(), Some(&key));
}

#[test]
fn test_show_scene_filtered_out_reports_hidden() {
    let h = Harness::new(test_profile());
    h.goto(10, 10);
    h.controller.set_filters(FilterCriteria {
        max_cloud_cover: 5,
        ..FilterCriteria::default()
    });

    let key = scene_key(GridCoord::new(10, 10), 1);
    assert_eq!(h.controller.show_scene(&key), ShowSceneOutcome::SceneHidden);
    assert_eq!(
        h.controller.snapshot().current_scene,
        Some(scene_key(GridCoord::new(10, 10), 0))
    );
}

#[test]
fn test_show_scene_unknown_entity_not_found() {
    let h = Harness::new(test_profile());
    h.goto(10, 10);
    let mut key = scene_key(GridCoord::new(10, 10), 0);
    key.entity_id = "NOPE".to_string();
    assert_eq!(h.controller.show_scene(&key), ShowSceneOutcome::NotFound);
}

#[test]
fn test_show_scene_off_grid_cannot_move() {
    let h = Harness::new(test_profile());
    h.goto(10, 10);
    let key = scene_key(GridCoord::new(200, 0), 0);
    assert!(matches!(
        h.controller.show_scene(&key),
        ShowSceneOutcome::CannotMove(_)
    ));
}

#[test]
fn test_select_scene_publishes_event() {
    let h = Harness::new(test_profile());
    h.goto(10, 10);
    let mut rx = h.controller.subscribe();

    let key = scene_key(GridCoord::new(9, 9), 1);
    assert_eq!(h.controller.select_scene(&key), ShowSceneOutcome::Selected);
    assert_eq!(drain_events(&mut rx), vec![MosaicEvent::Normal]);
}

#[test]
fn test_select_cell_moves_active_slot() {
    let h = Harness::new(test_profile());
    h.goto(10, 10);

    assert!(h.controller.select_cell(0));
    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.active_slot, 0);
    assert_eq!(snapshot.active_cell, Some(GridCoord::new(9, 9)));
    assert_eq!(
        snapshot.paint_order.last(),
        Some(&scene_key(GridCoord::new(9, 9), 0))
    );
    assert!(!h.controller.select_cell(99));
}

// ============================================================================
// Date stepping and the date cache
// ============================================================================

#[test]
fn test_step_date_moves_through_visible_dates() {
    let h = Harness::new(test_profile());
    h.goto(10, 10);
    let center = GridCoord::new(10, 10);

    assert!(h.controller.step_date(DateStep::Newer));
    assert_eq!(h.controller.snapshot().current_scene, Some(scene_key(center, 1)));
    assert!(h.controller.step_date(DateStep::Older));
    assert_eq!(h.controller.snapshot().current_scene, Some(scene_key(center, 0)));
    assert!(!h.controller.step_date(DateStep::Older));
}

#[test]
fn test_step_date_keeps_stack_height() {
    let h = Harness::new(test_profile());
    h.goto(10, 10);
    assert!(h.controller.select_cell(0));
    let before = h.controller.zorder();

    assert!(h.controller.step_date(DateStep::Newer));
    let after = h.controller.zorder();
    assert_eq!(after.len(), before.len());
    assert_eq!(after[..8], before[..8]);
    assert_eq!(after.last(), Some(&scene_key(GridCoord::new(9, 9), 1)));
}

#[test]
fn test_date_cache_restores_choice_after_returning() {
    let h = Harness::new(test_profile());
    h.goto(10, 10);
    let chosen = scene_key(GridCoord::new(10, 10), 2);
    assert_eq!(h.controller.select_scene(&chosen), ShowSceneOutcome::Selected);

    h.goto(30, 30);
    h.goto(10, 10);

    assert_eq!(h.controller.snapshot().current_scene, Some(chosen));
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn test_filters_are_idempotent() {
    let h = Harness::new(test_profile());
    h.goto(10, 10);
    let filters = FilterCriteria {
        max_cloud_cover: 15,
        ..FilterCriteria::default()
    };

    h.controller.set_filters(filters.clone());
    let first = visibility(&h);
    h.controller.set_filters(filters);
    assert_eq!(visibility(&h), first);

    // Cloud cover 0 and 10 pass, 20 does not
    assert!(first
        .iter()
        .all(|cell| cell == &vec![true, true, false]));
}

#[test]
fn test_filters_persist_across_loads() {
    let h = Harness::new(test_profile());
    h.goto(10, 10);
    h.controller.set_filters(FilterCriteria {
        max_cloud_cover: 5,
        ..FilterCriteria::default()
    });

    h.controller.scroll(1, 0);
    h.wait();
    assert!(visibility(&h)
        .iter()
        .all(|cell| cell == &vec![true, false, false]));
    assert_eq!(h.controller.filters().max_cloud_cover, 5);
}

#[test]
fn test_filtering_everything_empties_paint_list() {
    let h = Harness::new(test_profile());
    h.goto(10, 10);
    h.controller.set_filters(FilterCriteria {
        min_quality: 10,
        ..FilterCriteria::default()
    });

    let snapshot = h.controller.snapshot();
    assert!(snapshot.paint_order.is_empty());
    assert_eq!(snapshot.current_scene, None);
    assert_eq!(snapshot.valid_cells, 9);
}

#[test]
fn test_hide_scene_reselects_and_flushes() {
    let h = Harness::new(test_profile());
    h.goto(10, 10);
    let center = GridCoord::new(10, 10);
    let hidden = scene_key(center, 0);

    h.controller.hide_scene(&hidden);
    assert_eq!(h.controller.snapshot().current_scene, Some(scene_key(center, 1)));
    assert!(h.raster.flushed().contains(&hidden));
    assert!(!h.controller.zorder().contains(&hidden));

    h.controller.unhide_all();
    // Unhiding does not undo the reselection
    assert_eq!(h.controller.snapshot().current_scene, Some(scene_key(center, 1)));
    assert!(h.controller.filters().hidden.is_empty());
}

#[test]
fn test_zorder_has_one_entry_per_valid_cell() {
    let h = Harness::new(test_profile());
    h.goto(10, 10);
    h.controller.select_scene(&scene_key(GridCoord::new(11, 11), 2));
    h.controller.scroll(0, 1);
    h.wait();

    let entries = h.controller.zorder();
    assert_eq!(entries.len(), 9);
    let mut coords: Vec<GridCoord> = entries.iter().map(|k| k.coord).collect();
    coords.sort();
    coords.dedup();
    assert_eq!(coords.len(), 9);
    h.controller.with_window(|w| {
        for key in &entries {
            let cell = w.valid_cell(key.coord).expect("entry is in the window");
            assert_eq!(cell.current_key().as_ref(), Some(key));
        }
    });
}

// ============================================================================
// Swath mode
// ============================================================================

#[test]
fn test_swath_selection_follows_scroll() {
    let profile = swath_profile();
    let memory = Arc::new(MemorySource::new());
    test_utils::populate_grid(&memory, &profile, 0..=40, 0..=40, SCENES_PER_CELL);
    let h = Harness::with_memory(profile, memory);
    h.goto(10, 10);

    let key = scene_key(GridCoord::new(10, 10), 2);
    assert_eq!(h.controller.select_scene(&key), ShowSceneOutcome::Selected);
    let all_third = |h: &Harness| {
        h.controller.with_window(|w| {
            w.cells()
                .iter()
                .filter(|c| c.valid)
                .all(|c| c.current_index() == Some(2))
        })
    };
    assert!(all_third(&h));

    h.controller.scroll(1, 0);
    h.wait();
    assert!(all_third(&h));
    assert!(h
        .controller
        .snapshot()
        .paint_order
        .iter()
        .all(|k| k.entity_id.ends_with("_2")));
}

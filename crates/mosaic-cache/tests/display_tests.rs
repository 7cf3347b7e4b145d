//! Tests for navigation limits, display modes and sensor switching.

mod common;

use common::{Harness, SCENES_PER_CELL};
use mosaic_cache::{CannotMove, MetadataSource, MosaicEvent, MoveOutcome};
use mosaic_common::GridCoord;
use std::sync::Arc;
use test_utils::{
    bumper_profile, drain_events, populate_grid, scene_key, single_scene_profile, test_profile,
    MemorySource,
};

// ============================================================================
// Limits
// ============================================================================

#[test]
fn test_goto_outside_bounded_grid() {
    let h = Harness::new(test_profile());
    assert_eq!(
        h.controller.goto_grid_cell(100, 10),
        MoveOutcome::CannotMove(CannotMove::OutOfBounds)
    );
    assert_eq!(h.controller.stats().requests, 0);
}

#[test]
fn test_bumper_rejects_goto_and_scroll() {
    let h = Harness::new(bumper_profile());
    assert_eq!(
        h.controller.goto_grid_cell(20, 10),
        MoveOutcome::CannotMove(CannotMove::OutsideBumper)
    );

    h.goto(15, 10);
    assert_eq!(
        h.controller.scroll(1, 0),
        MoveOutcome::CannotMove(CannotMove::OutsideBumper)
    );
    assert_eq!(h.controller.snapshot().center, GridCoord::new(15, 10));

    // Moving back inside is allowed
    assert!(h.controller.scroll(-1, 0).is_requested());
    h.wait();
    assert_eq!(h.controller.snapshot().center, GridCoord::new(14, 10));
}

#[test]
fn test_goto_lat_long_rejects_invalid_point() {
    let h = Harness::new(test_profile());
    assert_eq!(
        h.controller.goto_lat_long(95.0, 0.0),
        MoveOutcome::CannotMove(CannotMove::Unprojectable)
    );
}

#[test]
fn test_goto_lat_long_on_cell_center_has_zero_offset() {
    let h = Harness::new(test_profile());
    let mut rx = h.controller.subscribe();
    assert!(h.controller.goto_lat_long(-10.0, 10.0).is_requested());
    h.wait();

    assert_eq!(h.controller.snapshot().center, GridCoord::new(10, 10));
    assert_eq!(
        drain_events(&mut rx),
        vec![MosaicEvent::TargetOffset { x: 0.0, y: 0.0 }]
    );
}

// ============================================================================
// Display modes
// ============================================================================

#[test]
fn test_single_cell_display() {
    let h = Harness::new(test_profile());
    h.goto(10, 10);
    let mut rx = h.controller.subscribe();

    h.controller.set_resolution(1).expect("valid resolution");
    assert_eq!(
        drain_events(&mut rx),
        vec![MosaicEvent::DisplayModeChanged { single_cell: true }]
    );

    let snapshot = h.controller.snapshot();
    assert!(snapshot.single_cell);
    assert_eq!(snapshot.display_size, (1, 1));
    assert_eq!(snapshot.pixel_size, 30.0);
    assert_eq!(
        snapshot.paint_order,
        vec![scene_key(GridCoord::new(10, 10), 0)]
    );
}

#[test]
fn test_sub_cell_scroll_carries_into_next_cell() {
    let h = Harness::new(test_profile());
    h.goto(10, 10);
    h.controller.set_resolution(1).expect("valid resolution");

    for expected_sub in 1..4 {
        assert!(h.controller.scroll(1, 0).is_requested());
        h.wait();
        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.center, GridCoord::new(10, 10));
        assert_eq!(snapshot.sub_col, expected_sub);
    }

    h.controller.scroll(1, 0);
    h.wait();
    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.center, GridCoord::new(11, 10));
    assert_eq!(snapshot.sub_col, 0);
}

#[test]
fn test_leaving_single_cell_recenters_on_whole_cell() {
    let h = Harness::new(test_profile());
    h.goto(10, 10);
    h.controller.set_resolution(1).expect("valid resolution");
    h.controller.scroll(1, 1);
    h.wait();
    assert!(h.controller.snapshot().position().has_sub_offset());

    h.controller.set_resolution(0).expect("valid resolution");
    h.wait();

    let snapshot = h.controller.snapshot();
    assert!(!snapshot.single_cell);
    assert_eq!(snapshot.center, GridCoord::new(10, 10));
    assert!(!snapshot.position().has_sub_offset());
    assert_eq!(snapshot.paint_order.len(), 9);
}

#[test]
fn test_invalid_resolution_is_error() {
    let h = Harness::new(test_profile());
    h.goto(10, 10);
    assert!(h.controller.set_resolution(5).is_err());
    assert!(!h.controller.snapshot().single_cell);
}

// ============================================================================
// Sensors
// ============================================================================

#[test]
fn test_single_scene_sensor_paints_every_cell() {
    let h = Harness::new(single_scene_profile());
    h.goto(10, 10);

    let snapshot = h.controller.snapshot();
    assert_eq!(h.controller.zorder().len(), 1);
    assert_eq!(snapshot.paint_order.len(), 9);
    assert_eq!(
        snapshot.paint_order.last(),
        Some(&scene_key(GridCoord::new(10, 10), 0))
    );
}

#[test]
fn test_set_sensor_keeps_center_and_switches_source() {
    let h = Harness::new(test_profile());
    h.goto(10, 10);
    h.controller
        .select_scene(&scene_key(GridCoord::new(10, 10), 2));

    let other = single_scene_profile();
    let memory = Arc::new(MemorySource::new());
    populate_grid(&memory, &other, 0..=40, 0..=40, SCENES_PER_CELL);
    let source: Arc<dyn MetadataSource> = memory.clone();

    let outcome = h.controller.set_sensor(other, source).expect("valid profile");
    assert!(outcome.is_requested());
    h.wait();

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.sensor, "single_sensor");
    assert_eq!(snapshot.center, GridCoord::new(10, 10));
    assert_eq!(memory.fetch_count(), 9);
    assert_eq!(h.controller.zorder().len(), 1);
    assert_eq!(snapshot.paint_order.len(), 9);
    // The date cache belongs to the old sensor
    assert_eq!(
        snapshot.current_scene,
        Some(scene_key(GridCoord::new(10, 10), 0))
    );
}

#[test]
fn test_set_sensor_rejects_invalid_profile() {
    let h = Harness::new(test_profile());
    let mut broken = test_profile();
    broken.resolutions.clear();
    let source: Arc<dyn MetadataSource> = Arc::new(MemorySource::new());
    assert!(h.controller.set_sensor(broken, source).is_err());
}

#[test]
fn test_set_pixel_size_selects_matching_resolution() {
    let h = Harness::new(test_profile());
    h.goto(10, 10);

    h.controller.set_pixel_size(30.0).expect("offered pixel size");
    assert!(h.controller.snapshot().single_cell);
    h.controller.set_pixel_size(1000.0).expect("offered pixel size");
    assert!(!h.controller.snapshot().single_cell);
    assert!(h.controller.set_pixel_size(500.0).is_err());
}

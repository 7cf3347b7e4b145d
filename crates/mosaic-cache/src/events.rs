//! Change notifications and read-only snapshots for observers.

use crate::scene::SceneKey;
use mosaic_common::{GridCoord, GridPosition};
use serde::Serialize;

/// Published after every state change visible to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MosaicEvent {
    /// Window, selection or filters changed
    Normal,
    /// A goto completed; the requested point lies at this pixel offset from
    /// the display center (x east, y south)
    TargetOffset { x: f64, y: f64 },
    /// Switched between multi-cell and single-cell display
    DisplayModeChanged { single_cell: bool },
}

/// Read-only view of the engine state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MosaicSnapshot {
    pub sensor: String,
    /// Visible selected scenes, bottom to top
    pub paint_order: Vec<SceneKey>,
    pub active_slot: usize,
    pub active_cell: Option<GridCoord>,
    pub current_scene: Option<SceneKey>,
    pub center: GridCoord,
    pub sub_col: i32,
    pub sub_row: i32,
    /// Display size in cells (width, height)
    pub display_size: (usize, usize),
    pub pixel_size: f64,
    pub single_cell: bool,
    pub valid_cells: usize,
    /// A metadata or raster load is in progress
    pub busy: bool,
}

impl MosaicSnapshot {
    pub fn position(&self) -> GridPosition {
        GridPosition::with_sub(self.center, self.sub_col, self.sub_row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let json = serde_json::to_value(MosaicEvent::TargetOffset { x: 1.5, y: -2.0 }).unwrap();
        assert_eq!(json["type"], "target_offset");
        assert_eq!(json["x"], 1.5);

        let json = serde_json::to_value(MosaicEvent::DisplayModeChanged { single_cell: true }).unwrap();
        assert_eq!(json["type"], "display_mode_changed");
        assert_eq!(json["single_cell"], true);
        assert_eq!(
            serde_json::to_value(MosaicEvent::Normal).unwrap()["type"],
            "normal"
        );
    }
}

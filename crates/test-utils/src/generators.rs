//! Generators for synthetic cell records.
//!
//! Generated scenes follow a predictable pattern so tests can name them
//! without reading the record back:
//!
//! - entity id `E{col}_{row}_{i}`
//! - date: the 1st of month `i + 1` in 2020 (so `i < 12`)
//! - cloud cover `10 * i`, quality 9
//!
//! With these values scene 0 (the oldest, clearest) is every cell's default.

use crate::fixtures::{cell_record, SceneSpec, TEST_PROJECTION};
use crate::sources::MemorySource;
use mosaic_cache::{SceneKey, SensorProfile};
use mosaic_common::GridCoord;

/// Entity id of generated scene `index` in a cell.
pub fn entity_id(coord: GridCoord, index: usize) -> String {
    format!("E{}_{}_{}", coord.col, coord.row, index)
}

/// Key of generated scene `index` in a cell.
pub fn scene_key(coord: GridCoord, index: usize) -> SceneKey {
    SceneKey::new(coord, entity_id(coord, index))
}

/// YYYYMMDD date of generated scene `index`.
pub fn date_for_index(index: usize) -> u32 {
    20200000 + (index as u32 % 12 + 1) * 100 + 1
}

/// Scene specs for one generated cell.
///
/// Upper-left Y decreases with the row so swath members sort north to
/// south.
pub fn synthetic_scenes(coord: GridCoord, scenes_per_cell: usize) -> Vec<SceneSpec> {
    (0..scenes_per_cell)
        .map(|i| {
            SceneSpec::new(entity_id(coord, i), date_for_index(i))
                .cloud((10 * i) as i32)
                .upper_left(coord.col as f64 * 1000.0, -(coord.row as f64) * 1000.0)
        })
        .collect()
}

/// A complete generated record for one cell.
pub fn synthetic_record(coord: GridCoord, scenes_per_cell: usize) -> String {
    cell_record(coord, TEST_PROJECTION, &synthetic_scenes(coord, scenes_per_cell))
}

/// Fill an inclusive rectangle of cells with generated records.
pub fn populate_grid(
    source: &MemorySource,
    profile: &SensorProfile,
    cols: std::ops::RangeInclusive<i32>,
    rows: std::ops::RangeInclusive<i32>,
    scenes_per_cell: usize,
) {
    for col in cols {
        for row in rows.clone() {
            let coord = GridCoord::new(col, row);
            source.insert(&profile.name, coord, synthetic_record(coord, scenes_per_cell));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_for_index() {
        assert_eq!(date_for_index(0), 20200101);
        assert_eq!(date_for_index(5), 20200601);
        assert_eq!(date_for_index(11), 20201201);
    }

    #[test]
    fn test_synthetic_record_shape() {
        let text = synthetic_record(GridCoord::new(2, 3), 3);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "2,3,1,1,1,3");
        assert!(lines[2].contains("E2_3_1"));
    }
}

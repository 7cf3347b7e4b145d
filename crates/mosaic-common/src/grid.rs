//! Grid coordinates and navigation models for tiled scene catalogs.

use crate::LatLong;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of sub-cell steps per whole grid cell.
///
/// Sub-cell offsets always lie in the open interval `(-STEPS, STEPS)`.
pub const STEPS: i32 = 4;

/// A sensor-specific tiling coordinate (e.g. a WRS path/row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    pub col: i32,
    pub row: i32,
}

impl GridCoord {
    pub fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Coordinate shifted by whole cells (no wraparound applied).
    pub fn offset(&self, d_col: i32, d_row: i32) -> Self {
        Self {
            col: self.col + d_col,
            row: self.row + d_row,
        }
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// A grid coordinate plus a fractional sub-cell offset.
///
/// The offset is only non-zero while a single cell is displayed at
/// fractional granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub coord: GridCoord,
    pub sub_col: i32,
    pub sub_row: i32,
}

impl GridPosition {
    pub fn new(coord: GridCoord) -> Self {
        Self {
            coord,
            sub_col: 0,
            sub_row: 0,
        }
    }

    pub fn with_sub(coord: GridCoord, sub_col: i32, sub_row: i32) -> Self {
        Self {
            coord,
            sub_col,
            sub_row,
        }
    }

    /// Move by whole cells, discarding any sub-cell offset.
    pub fn step_cells(&self, d_col: i32, d_row: i32) -> Self {
        Self::new(self.coord.offset(d_col, d_row))
    }

    /// Move by sub-cell steps, carrying overflow into whole-cell steps.
    ///
    /// Uses truncating division so the remainder keeps the sign of the
    /// running total and stays inside `(-STEPS, STEPS)`.
    pub fn step_sub(&self, d_sub_col: i32, d_sub_row: i32) -> Self {
        let total_col = self.sub_col + d_sub_col;
        let total_row = self.sub_row + d_sub_row;
        Self {
            coord: self.coord.offset(total_col / STEPS, total_row / STEPS),
            sub_col: total_col % STEPS,
            sub_row: total_row % STEPS,
        }
    }

    /// Whether a sub-cell offset is pending.
    pub fn has_sub_offset(&self) -> bool {
        self.sub_col != 0 || self.sub_row != 0
    }

    /// Floating-point grid coordinate of this position.
    pub fn fractional(&self) -> (f64, f64) {
        (
            self.coord.col as f64 + self.sub_col as f64 / STEPS as f64,
            self.coord.row as f64 + self.sub_row as f64 / STEPS as f64,
        )
    }

    /// Rebuild a position from a floating-point grid coordinate.
    ///
    /// The whole-cell part is the nearest cell. With `keep_sub` the
    /// remainder is quantized to sub-cell steps, otherwise it is dropped.
    pub fn from_fractional(col: f64, row: f64, keep_sub: bool) -> Self {
        let coord = GridCoord::new(col.round() as i32, row.round() as i32);
        if !keep_sub {
            return Self::new(coord);
        }
        let quantize = |frac: f64| -> i32 {
            let steps = (frac * STEPS as f64).round() as i32;
            steps.clamp(-(STEPS - 1), STEPS - 1)
        };
        Self {
            coord,
            sub_col: quantize(col - coord.col as f64),
            sub_row: quantize(row - coord.row as f64),
        }
    }
}

/// Conversion and legality rules for a sensor's tiling scheme.
pub trait NavigationModel: Send + Sync + fmt::Debug {
    /// Lat/long of a (possibly fractional) grid coordinate's center.
    fn grid_to_lat_long(&self, col: f64, row: f64) -> LatLong;

    /// Fractional grid coordinate containing a lat/long.
    fn lat_long_to_grid(&self, point: &LatLong) -> (f64, f64);

    /// Inclusive legal column range.
    fn col_range(&self) -> (i32, i32);

    /// Inclusive legal row range.
    fn row_range(&self) -> (i32, i32);

    fn wraps_cols(&self) -> bool;

    fn wraps_rows(&self) -> bool;

    /// +1 when moving east increases the column, -1 when it decreases it.
    fn east_col_sign(&self) -> i32;

    /// +1 when moving south increases the row, -1 when it decreases it.
    fn south_row_sign(&self) -> i32;

    /// Map a candidate coordinate onto the legal grid.
    ///
    /// Out-of-range axes wrap when the model allows it; otherwise the
    /// candidate is rejected with `None`.
    fn normalize(&self, coord: GridCoord) -> Option<GridCoord> {
        let col = wrap_axis(coord.col, self.col_range(), self.wraps_cols())?;
        let row = wrap_axis(coord.row, self.row_range(), self.wraps_rows())?;
        Some(GridCoord::new(col, row))
    }

    /// Whether a coordinate lies inside the legal range without wrapping.
    fn in_bounds(&self, coord: GridCoord) -> bool {
        let (min_col, max_col) = self.col_range();
        let (min_row, max_row) = self.row_range();
        coord.col >= min_col && coord.col <= max_col && coord.row >= min_row && coord.row <= max_row
    }
}

fn wrap_axis(value: i32, (min, max): (i32, i32), wraps: bool) -> Option<i32> {
    if value >= min && value <= max {
        return Some(value);
    }
    if !wraps {
        return None;
    }
    let span = max - min + 1;
    Some(min + (value - min).rem_euclid(span))
}

/// A regular lat/long tiling where each cell covers a fixed angular size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegularGrid {
    /// Longitude of the center of cell `(min_col, min_row)`
    pub origin_lon: f64,
    /// Latitude of the center of cell `(min_col, min_row)`
    pub origin_lat: f64,
    /// Degrees of longitude per column (negative when columns run west)
    pub dx: f64,
    /// Degrees of latitude per row (negative when rows run south)
    pub dy: f64,
    pub min_col: i32,
    pub max_col: i32,
    pub min_row: i32,
    pub max_row: i32,
    #[serde(default)]
    pub wrap_cols: bool,
    #[serde(default)]
    pub wrap_rows: bool,
}

impl RegularGrid {
    /// A one-degree global grid, columns west to east, rows north to south.
    pub fn one_degree_global() -> Self {
        Self {
            origin_lon: -179.5,
            origin_lat: 89.5,
            dx: 1.0,
            dy: -1.0,
            min_col: 0,
            max_col: 359,
            min_row: 0,
            max_row: 179,
            wrap_cols: true,
            wrap_rows: false,
        }
    }

    /// Check the grid is usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.dx == 0.0 || self.dy == 0.0 {
            return Err("dx and dy must be non-zero".to_string());
        }
        if self.min_col > self.max_col || self.min_row > self.max_row {
            return Err("grid ranges must have min <= max".to_string());
        }
        Ok(())
    }
}

impl NavigationModel for RegularGrid {
    fn grid_to_lat_long(&self, col: f64, row: f64) -> LatLong {
        LatLong::new(
            self.origin_lat + (row - self.min_row as f64) * self.dy,
            self.origin_lon + (col - self.min_col as f64) * self.dx,
        )
    }

    fn lat_long_to_grid(&self, point: &LatLong) -> (f64, f64) {
        (
            self.min_col as f64 + (point.lon - self.origin_lon) / self.dx,
            self.min_row as f64 + (point.lat - self.origin_lat) / self.dy,
        )
    }

    fn col_range(&self) -> (i32, i32) {
        (self.min_col, self.max_col)
    }

    fn row_range(&self) -> (i32, i32) {
        (self.min_row, self.max_row)
    }

    fn wraps_cols(&self) -> bool {
        self.wrap_cols
    }

    fn wraps_rows(&self) -> bool {
        self.wrap_rows
    }

    fn east_col_sign(&self) -> i32 {
        if self.dx > 0.0 {
            1
        } else {
            -1
        }
    }

    fn south_row_sign(&self) -> i32 {
        if self.dy < 0.0 {
            1
        } else {
            -1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_sub_carries_into_whole_cells() {
        let mut pos = GridPosition::new(GridCoord::new(10, 20));
        for _ in 0..STEPS {
            pos = pos.step_sub(1, 0);
        }
        assert_eq!(pos, GridPosition::new(GridCoord::new(11, 20)));
    }

    #[test]
    fn test_step_sub_negative_stays_in_range() {
        let pos = GridPosition::new(GridCoord::new(10, 20)).step_sub(-(STEPS + 1), 0);
        assert_eq!(pos.coord, GridCoord::new(9, 20));
        assert_eq!(pos.sub_col, -1);
    }

    #[test]
    fn test_from_fractional_nearest_cell() {
        let pos = GridPosition::from_fractional(10.75, 20.0, true);
        assert_eq!(pos.coord, GridCoord::new(11, 20));
        assert_eq!(pos.sub_col, -1);

        let whole = GridPosition::from_fractional(10.75, 20.4, false);
        assert_eq!(whole, GridPosition::new(GridCoord::new(11, 20)));
    }

    #[test]
    fn test_regular_grid_wraps_columns() {
        let grid = RegularGrid::one_degree_global();
        assert_eq!(grid.normalize(GridCoord::new(360, 5)), Some(GridCoord::new(0, 5)));
        assert_eq!(grid.normalize(GridCoord::new(-1, 5)), Some(GridCoord::new(359, 5)));
        assert_eq!(grid.normalize(GridCoord::new(5, 180)), None);
    }

    #[test]
    fn test_regular_grid_round_trip() {
        let grid = RegularGrid::one_degree_global();
        let ll = grid.grid_to_lat_long(100.0, 40.0);
        let (col, row) = grid.lat_long_to_grid(&ll);
        assert!((col - 100.0).abs() < 1e-9);
        assert!((row - 40.0).abs() < 1e-9);
        assert_eq!(grid.east_col_sign(), 1);
        assert_eq!(grid.south_row_sign(), 1);
    }
}

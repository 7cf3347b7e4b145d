//! The sliding window of cells around the navigation center.

use crate::cell::Cell;
use crate::scene::{Scene, SceneKey};
use mosaic_common::{GridCoord, GridPosition, NavigationModel};

/// A `width` x `height` block of cells (both odd) centered on a grid
/// position.
///
/// Cells are stored column-major: slot `i * height + j` holds the cell at
/// column offset `i - width / 2` and row offset `j - height / 2`.
#[derive(Debug, Clone)]
pub struct GridWindow {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    position: GridPosition,
    active: usize,
    /// Profile the cells were loaded with
    sensor: String,
}

impl GridWindow {
    /// A window whose cells are all unloaded placeholders.
    pub fn empty(width: usize, height: usize, position: GridPosition, sensor: &str) -> Self {
        let cells = Self::slot_coords(width, height, position.coord)
            .map(Cell::invalid)
            .collect();
        Self::from_cells(width, height, cells, position, sensor)
    }

    /// Assemble a window from a full slot array. The center slot is active.
    pub fn from_cells(
        width: usize,
        height: usize,
        cells: Vec<Cell>,
        position: GridPosition,
        sensor: &str,
    ) -> Self {
        debug_assert_eq!(cells.len(), width * height);
        Self {
            width,
            height,
            cells,
            position,
            active: (width / 2) * height + height / 2,
            sensor: sensor.to_string(),
        }
    }

    /// Grid coordinates needed for every slot around `center`.
    ///
    /// Wraparound follows the navigation model; slots that fall off a
    /// non-wrapping edge are `None`.
    pub fn required_coords(
        width: usize,
        height: usize,
        center: GridCoord,
        nav: &dyn NavigationModel,
    ) -> Vec<Option<GridCoord>> {
        Self::slot_coords(width, height, center)
            .map(|coord| nav.normalize(coord))
            .collect()
    }

    /// Unnormalized coordinate of every slot around `center`, in slot order.
    pub fn slot_coords(width: usize, height: usize, center: GridCoord) -> impl Iterator<Item = GridCoord> {
        Self::offsets(width, height).map(move |(dc, dr)| center.offset(dc, dr))
    }

    fn offsets(width: usize, height: usize) -> impl Iterator<Item = (i32, i32)> {
        let half_w = (width / 2) as i32;
        let half_h = (height / 2) as i32;
        (0..width as i32).flat_map(move |i| (0..height as i32).map(move |j| (i - half_w, j - half_h)))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn slot_count(&self) -> usize {
        self.cells.len()
    }

    pub fn center_slot(&self) -> usize {
        (self.width / 2) * self.height + self.height / 2
    }

    pub fn position(&self) -> GridPosition {
        self.position
    }

    pub fn sensor(&self) -> &str {
        &self.sensor
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    pub fn cell(&self, slot: usize) -> Option<&Cell> {
        self.cells.get(slot)
    }

    pub fn cell_mut(&mut self, slot: usize) -> Option<&mut Cell> {
        self.cells.get_mut(slot)
    }

    /// Valid cell at `coord`.
    pub fn valid_cell(&self, coord: GridCoord) -> Option<&Cell> {
        self.cells.iter().find(|c| c.valid && c.coord == coord)
    }

    pub fn valid_cell_mut(&mut self, coord: GridCoord) -> Option<&mut Cell> {
        self.cells.iter_mut().find(|c| c.valid && c.coord == coord)
    }

    /// Move a valid cell out of the window, leaving an unloaded placeholder.
    pub fn take_cell(&mut self, coord: GridCoord) -> Option<Cell> {
        let slot = self.cells.iter().position(|c| c.valid && c.coord == coord)?;
        Some(std::mem::replace(&mut self.cells[slot], Cell::invalid(coord)))
    }

    /// Slot and scene index of `key` in a valid cell.
    pub fn locate(&self, key: &SceneKey) -> Option<(usize, usize)> {
        self.cells.iter().enumerate().find_map(|(slot, cell)| {
            if !cell.valid || cell.coord != key.coord {
                return None;
            }
            cell.find_entity(&key.entity_id).map(|index| (slot, index))
        })
    }

    pub fn scene(&self, key: &SceneKey) -> Option<&Scene> {
        let (slot, index) = self.locate(key)?;
        self.cells[slot].scene(index)
    }

    pub fn active_slot(&self) -> usize {
        self.active
    }

    pub fn active_cell(&self) -> Option<&Cell> {
        self.cells.get(self.active)
    }

    /// Make `slot` the selected cell. Only valid cells can be active.
    pub fn set_active_slot(&mut self, slot: usize) -> bool {
        match self.cells.get(slot) {
            Some(cell) if cell.valid => {
                self.active = slot;
                true
            }
            _ => false,
        }
    }

    pub fn valid_count(&self) -> usize {
        self.cells.iter().filter(|c| c.valid).count()
    }

    /// Release every cell, returning rasters to flush.
    pub fn release_all(&mut self) -> Vec<SceneKey> {
        self.cells.iter_mut().flat_map(Cell::release).collect()
    }
}

//! Live engine state: the active window, its stack, filters and selections.
//!
//! Everything here runs under the controller lock, either on the caller's
//! thread for in-window operations or on the loader thread at activation.

use crate::cell::{Cell, DateStep};
use crate::config::MosaicConfig;
use crate::events::{MosaicEvent, MosaicSnapshot};
use crate::filter::FilterCriteria;
use crate::loader::{LoadKind, LoadRequest, SlotPlan};
use crate::navigation::{CannotMove, Collaborators, ShowSceneOutcome};
use crate::picker::{pick_default, resolve_selection, DateCache};
use crate::profile::{Resolution, SensorProfile};
use crate::raster::RasterLoader;
use crate::scene::{Scene, SceneKey};
use crate::source::MetadataSource;
use crate::swath::{build_swath, Swath, SwathKey};
use crate::window::GridWindow;
use crate::zorder::{StackMode, ZOrderStack};
use mosaic_common::{
    GridCoord, GridPosition, LatLong, MosaicError, MosaicResult, NavigationModel, ProjectedPoint,
    ProjectionCode, ProjectionTransform,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub(crate) struct MosaicState {
    config: MosaicConfig,
    profile: Arc<SensorProfile>,
    source: Arc<dyn MetadataSource>,
    raster: Arc<dyn RasterLoader>,
    projection: Arc<dyn ProjectionTransform>,
    window: GridWindow,
    /// Projection shared by every valid cell in the window
    projection_code: ProjectionCode,
    zorder: ZOrderStack,
    filters: FilterCriteria,
    date_cache: DateCache,
    resolution: usize,
    /// Swath followed across scrolls
    swath_reference: Option<SwathKey>,
}

impl MosaicState {
    pub(crate) fn new(
        config: MosaicConfig,
        profile: Arc<SensorProfile>,
        collaborators: Collaborators,
    ) -> MosaicResult<Self> {
        config.validate().map_err(MosaicError::Config)?;
        if profile.resolution(config.initial_resolution).is_none() {
            return Err(MosaicError::Config(format!(
                "initial_resolution {} out of range for sensor {}",
                config.initial_resolution, profile.name
            )));
        }

        let (min_col, max_col) = profile.navigation.col_range();
        let (min_row, max_row) = profile.navigation.row_range();
        let center = GridCoord::new(min_col + (max_col - min_col) / 2, min_row + (max_row - min_row) / 2);
        let window = GridWindow::empty(
            config.window_width,
            config.window_height,
            GridPosition::new(center),
            &profile.name,
        );

        let mut state = Self {
            date_cache: DateCache::new(config.date_cache_capacity),
            resolution: config.initial_resolution,
            config,
            projection_code: profile.default_projection,
            profile,
            source: collaborators.source,
            raster: collaborators.raster,
            projection: collaborators.projection,
            window,
            zorder: ZOrderStack::new(StackMode::Single),
            filters: FilterCriteria::default(),
            swath_reference: None,
        };
        state.zorder = ZOrderStack::new(state.stack_mode());
        Ok(state)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub(crate) fn profile(&self) -> &Arc<SensorProfile> {
        &self.profile
    }

    pub(crate) fn source(&self) -> &Arc<dyn MetadataSource> {
        &self.source
    }

    pub(crate) fn raster(&self) -> &Arc<dyn RasterLoader> {
        &self.raster
    }

    pub(crate) fn config(&self) -> &MosaicConfig {
        &self.config
    }

    pub(crate) fn window(&self) -> &GridWindow {
        &self.window
    }

    pub(crate) fn zorder(&self) -> &ZOrderStack {
        &self.zorder
    }

    pub(crate) fn filters(&self) -> &FilterCriteria {
        &self.filters
    }

    pub(crate) fn swath_reference(&self) -> Option<&SwathKey> {
        self.swath_reference.as_ref()
    }

    pub(crate) fn current_resolution(&self) -> &Resolution {
        let index = self.resolution.min(self.profile.resolutions.len().saturating_sub(1));
        &self.profile.resolutions[index]
    }

    pub(crate) fn single_cell(&self) -> bool {
        self.current_resolution().single_cell
    }

    pub(crate) fn pixel_size(&self) -> f64 {
        self.current_resolution().pixel_size
    }

    /// Full-mosaic sensors composite every cell unless a single cell is shown.
    fn stack_mode(&self) -> StackMode {
        if self.profile.full_mosaic && !self.single_cell() {
            StackMode::Multi
        } else {
            StackMode::Single
        }
    }

    // ========================================================================
    // Navigation targets
    // ========================================================================

    /// Normalize a candidate position and check it against the bumper.
    pub(crate) fn check_target(
        profile: &SensorProfile,
        candidate: GridPosition,
    ) -> Result<GridPosition, CannotMove> {
        let nav = &profile.navigation;
        let coord = nav.normalize(candidate.coord).ok_or(CannotMove::OutOfBounds)?;
        let position = GridPosition::with_sub(coord, candidate.sub_col, candidate.sub_row);

        if let Some(bumper) = &profile.bumper {
            let (col, row) = position.fractional();
            let center = nav.grid_to_lat_long(col, row);
            if !bumper.contains_point(center.lon, center.lat) {
                debug!(col = coord.col, row = coord.row, "Target outside geographic bumper");
                return Err(CannotMove::OutsideBumper);
            }
        }
        Ok(position)
    }

    /// Grid position of a projected display center, in the window's
    /// projection. Sub-cell precision is kept in single-cell display.
    pub(crate) fn projected_target(&self, x: f64, y: f64) -> Result<GridPosition, CannotMove> {
        let nav = &self.profile.navigation;
        let code = self.projection_code;
        let point = ProjectedPoint::new(x, y);
        let target = self
            .projection
            .to_lat_long(code, &point)
            .map_err(|e| {
                debug!(error = %e, "Projected target cannot be converted");
                CannotMove::Unprojectable
            })?;

        let (to_col, to_row) = nav.lat_long_to_grid(&target);
        Ok(GridPosition::from_fractional(to_col, to_row, self.single_cell()))
    }

    /// Pixel offset of `point` from the display center (x east, y south).
    fn target_offset(&self, point: &LatLong) -> Option<(f64, f64)> {
        let (col, row) = self.window.position().fractional();
        let center_ll = self.profile.navigation.grid_to_lat_long(col, row);
        let convert = |ll: &LatLong| {
            self.projection
                .to_projected(self.projection_code, ll)
                .map_err(|e| warn!(error = %e, "Cannot project target point"))
                .ok()
        };
        let center = convert(&center_ll)?;
        let target = convert(point)?;
        let pixel_size = self.pixel_size();
        Some((
            (target.x - center.x) / pixel_size,
            (center.y - target.y) / pixel_size,
        ))
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Decide per slot whether to reuse, fetch or leave a cell empty.
    pub(crate) fn plan_slots(&self, request: &LoadRequest) -> Vec<SlotPlan> {
        let reuse = request.reuse && self.window.sensor() == request.profile.name;
        let (width, height) = (self.config.window_width, self.config.window_height);
        let center = request.position.coord;
        let required =
            GridWindow::required_coords(width, height, center, &request.profile.navigation);
        GridWindow::slot_coords(width, height, center)
            .zip(required)
            .map(|(raw, coord)| match coord {
                None => SlotPlan::Empty(raw),
                Some(coord) if reuse && self.window.valid_cell(coord).is_some() => {
                    SlotPlan::Reuse(coord)
                }
                Some(coord) => SlotPlan::Fetch(coord),
            })
            .collect()
    }

    /// Swap a completed load in as the live window.
    pub(crate) fn activate(
        &mut self,
        request: LoadRequest,
        plan: Vec<SlotPlan>,
        mut fetched: Vec<Option<Cell>>,
    ) -> MosaicEvent {
        let LoadRequest {
            kind,
            position,
            preserve_order,
            target_point,
            target_scene,
            swath_reference,
            profile,
            source,
            ..
        } = request;
        let sensor_switch = kind == LoadKind::SensorSwitch || profile.name != self.profile.name;
        let old_entries = self.zorder.entries();

        let mut cells = Vec::with_capacity(plan.len());
        for (slot, step) in plan.iter().enumerate() {
            let cell = match *step {
                SlotPlan::Reuse(coord) => self.window.take_cell(coord).unwrap_or_else(|| {
                    warn!(bug = true, col = coord.col, row = coord.row, "Planned reuse of a missing cell");
                    Cell::invalid(coord)
                }),
                SlotPlan::Fetch(coord) => fetched
                    .get_mut(slot)
                    .and_then(Option::take)
                    .unwrap_or_else(|| Cell::invalid(coord)),
                SlotPlan::Empty(coord) => Cell::invalid(coord),
            };
            cells.push(cell);
        }

        let evicted = self.window.release_all();
        self.flush(&evicted);

        let center_slot = (self.config.window_width / 2) * self.config.window_height
            + self.config.window_height / 2;
        let (code, rejected) = reconcile_projection(&mut cells, center_slot, profile.default_projection);
        self.flush(&rejected);

        self.window = GridWindow::from_cells(
            self.config.window_width,
            self.config.window_height,
            cells,
            position,
            &profile.name,
        );
        self.projection_code = code;

        if sensor_switch {
            info!(from = %self.profile.name, to = %profile.name, "Sensor switched");
            self.date_cache.clear();
            self.swath_reference = None;
            self.resolution = self.resolution.min(profile.resolutions.len().saturating_sub(1));
        }
        self.profile = profile;
        self.source = source;

        self.refilter();
        self.rebuild_zorder(&old_entries, preserve_order && !sensor_switch);
        self.sync_zorder();

        if self.profile.swath_mode {
            if let Some(swath) = swath_reference {
                self.apply_swath(&swath, false);
            }
        }

        if let Some(target) = target_scene {
            match self.choose_scene(&target) {
                ShowSceneOutcome::Selected => debug!(scene = %target, "Target scene selected"),
                outcome => debug!(scene = %target, ?outcome, "Target scene not selectable"),
            }
        }

        self.sync_zorder();
        self.push_rasters();

        target_point
            .and_then(|point| self.target_offset(&point))
            .map(|(x, y)| MosaicEvent::TargetOffset { x, y })
            .unwrap_or(MosaicEvent::Normal)
    }

    /// Recreate the stack for a freshly activated window.
    fn rebuild_zorder(&mut self, old_entries: &[SceneKey], preserve_order: bool) {
        self.zorder = ZOrderStack::new(self.stack_mode());

        if preserve_order {
            let mut flushed = Vec::new();
            for entry in old_entries {
                let Some(cell) = self.window.valid_cell_mut(entry.coord) else {
                    continue;
                };
                let found = cell
                    .find_entity(&entry.entity_id)
                    .filter(|&i| cell.scene(i).map(|s| s.visible).unwrap_or(false));
                if let Some(index) = found {
                    flushed.extend(cell.set_current(Some(index)));
                }
                if let Some(key) = cell.current_key() {
                    self.zorder.put_on_top(key);
                }
            }
            self.flush(&flushed);
        } else if self.zorder.mode() == StackMode::Multi {
            for cell in self.window.cells().iter().filter(|c| c.valid) {
                if let Some(key) = cell.current_key() {
                    self.zorder.put_on_top(key);
                }
            }
            if let Some(key) = self.window.active_cell().and_then(Cell::current_key) {
                self.zorder.put_on_top(key);
            }
        }
    }

    // ========================================================================
    // Filtering and selection
    // ========================================================================

    /// Re-run the filters and make sure every cell has a selection.
    ///
    /// Returns the number of visible scenes.
    pub(crate) fn refilter(&mut self) -> usize {
        let profile = Arc::clone(&self.profile);
        let visible = self.filters.apply(self.window.cells_mut(), &profile);

        let mut flushed = Vec::new();
        for cell in self.window.cells_mut() {
            let change = resolve_selection(cell, &mut self.date_cache, &profile);
            if change.changed() {
                debug!(
                    col = cell.coord.col,
                    row = cell.coord.row,
                    current = ?change.current.as_ref().map(|k| k.entity_id.as_str()),
                    "Cell selection changed"
                );
            }
            flushed.extend(change.flushed);
        }
        self.flush(&flushed);
        visible
    }

    /// Apply new filters to the live window.
    ///
    /// A load in flight re-applies them when it activates.
    pub(crate) fn set_filters(&mut self, filters: FilterCriteria) {
        self.filters = filters;
        self.refresh_filters();
    }

    pub(crate) fn hide_scene(&mut self, key: &SceneKey) {
        if self.filters.hidden.insert(key.clone()) {
            self.refresh_filters();
        }
    }

    pub(crate) fn unhide_all(&mut self) {
        if !self.filters.hidden.is_empty() {
            self.filters.hidden.clear();
            self.refresh_filters();
        }
    }

    fn refresh_filters(&mut self) {
        let visible = self.refilter();
        debug!(visible, "Filters applied");
        self.sync_zorder();
        self.push_rasters();
    }

    /// Select a scene in the live window as an explicit user choice.
    pub(crate) fn select_scene(&mut self, key: &SceneKey) -> ShowSceneOutcome {
        let outcome = self.choose_scene(key);
        if outcome == ShowSceneOutcome::Selected {
            self.sync_zorder();
            self.push_rasters();
        }
        outcome
    }

    fn choose_scene(&mut self, key: &SceneKey) -> ShowSceneOutcome {
        let Some((slot, index)) = self.window.locate(key) else {
            return ShowSceneOutcome::NotFound;
        };
        let visible = self
            .window
            .cell(slot)
            .and_then(|c| c.scene(index))
            .map(|s| s.visible)
            .unwrap_or(false);
        if !visible {
            return ShowSceneOutcome::SceneHidden;
        }

        self.window.set_active_slot(slot);
        let profile = Arc::clone(&self.profile);
        let mut flushed = Vec::new();
        let mut swath_key = None;
        if let Some(cell) = self.window.cell_mut(slot) {
            flushed.extend(cell.set_current(Some(index)));
            remember_choice(&mut self.date_cache, cell, index, &profile);
            swath_key = cell.scene(index).map(SwathKey::of);
        }
        self.flush(&flushed);

        if profile.swath_mode {
            if let Some(swath_key) = swath_key {
                let to_top = self.config.swath_to_top;
                self.apply_swath(&swath_key, to_top);
            }
        }
        self.zorder.put_on_top(key.clone());
        ShowSceneOutcome::Selected
    }

    /// Make another slot the active cell.
    pub(crate) fn select_cell(&mut self, slot: usize) -> bool {
        if !self.window.set_active_slot(slot) {
            return false;
        }
        if let Some(key) = self.window.active_cell().and_then(Cell::current_key) {
            self.zorder.put_on_top(key);
        }
        self.sync_zorder();
        self.push_rasters();
        true
    }

    /// Move the active cell to the adjacent visible date.
    ///
    /// The cell keeps its height in the stack.
    pub(crate) fn step_date(&mut self, step: DateStep) -> bool {
        let slot = self.window.active_slot();
        let profile = Arc::clone(&self.profile);

        let Some(cell) = self.window.cell(slot).filter(|c| c.valid) else {
            return false;
        };
        let Some(to) = cell.current_index().and_then(|from| cell.step_visible(from, step)) else {
            return false;
        };
        let old = cell.current_key();
        let Some(new) = cell.scene(to).map(Scene::key) else {
            return false;
        };
        let swath_key = cell.scene(to).map(SwathKey::of);

        let mut flushed = Vec::new();
        if let Some(cell) = self.window.cell_mut(slot) {
            flushed.extend(cell.set_current(Some(to)));
            remember_choice(&mut self.date_cache, cell, to, &profile);
        }
        self.flush(&flushed);

        match old {
            Some(old) => self.zorder.change_scene(&old, new),
            None => self.zorder.put_on_top(new),
        }
        if profile.swath_mode {
            if let Some(swath_key) = swath_key {
                self.apply_swath(&swath_key, false);
            }
        }

        self.sync_zorder();
        self.push_rasters();
        true
    }

    /// Select a swath across the window and update the stack.
    fn apply_swath(&mut self, key: &SwathKey, to_top: bool) -> Swath {
        let swath = build_swath(self.window.cells_mut(), key);
        if self.zorder.mode() == StackMode::Multi {
            for (old, new) in &swath.changed {
                self.zorder.change_scene(old, new.clone());
            }
        }
        self.flush(&swath.flushed);
        if to_top {
            for member in &swath.members {
                self.zorder.put_on_top(member.clone());
            }
        }
        debug!(date = key.date.yyyymmdd, members = swath.members.len(), "Swath built");
        self.swath_reference = Some(key.clone());
        swath
    }

    // ========================================================================
    // Display
    // ========================================================================

    /// Change the display resolution.
    ///
    /// Returns the new single-cell flag when the display mode changed.
    pub(crate) fn set_resolution(&mut self, index: usize) -> MosaicResult<Option<bool>> {
        if self.profile.resolution(index).is_none() {
            return Err(MosaicError::Config(format!(
                "resolution index {} out of range for sensor {}",
                index, self.profile.name
            )));
        }
        let was_single = self.single_cell();
        let old_mode = self.zorder.mode();
        self.resolution = index;

        if self.stack_mode() != old_mode {
            self.zorder.set_mode(self.stack_mode());
            self.rebuild_zorder(&[], false);
        }
        self.sync_zorder();
        self.push_rasters();

        let single = self.single_cell();
        Ok((single != was_single).then_some(single))
    }

    /// Reconcile the stack with the cells' current selections.
    ///
    /// Multi mode keeps one entry per valid cell with a selection: stale
    /// entries are replaced in place or dropped and missing cells go to
    /// the bottom. Single mode holds the active cell's selection.
    pub(crate) fn sync_zorder(&mut self) {
        let mode = self.stack_mode();
        if self.zorder.mode() != mode {
            self.zorder.set_mode(mode);
        }

        match mode {
            StackMode::Single => {
                let desired = self
                    .window
                    .active_cell()
                    .filter(|c| c.valid)
                    .and_then(Cell::current_key);
                match desired {
                    Some(key) => {
                        if self.zorder.top() != Some(&key) {
                            self.zorder.put_on_top(key);
                        }
                    }
                    None => self.zorder.empty(),
                }
            }
            StackMode::Multi => {
                let currents: HashMap<GridCoord, SceneKey> = self
                    .window
                    .cells()
                    .iter()
                    .filter(|c| c.valid)
                    .filter_map(|c| c.current_key().map(|k| (c.coord, k)))
                    .collect();

                for entry in self.zorder.entries() {
                    match currents.get(&entry.coord) {
                        Some(current) if *current != entry => {
                            self.zorder.change_scene(&entry, current.clone())
                        }
                        Some(_) => {}
                        None => {
                            self.zorder.remove(&entry);
                        }
                    }
                }
                for cell in self.window.cells().iter().rev().filter(|c| c.valid) {
                    if let Some(key) = cell.current_key() {
                        if !self.zorder.contains(&key) {
                            self.zorder.put_on_bottom(key);
                        }
                    }
                }
            }
        }
    }

    /// Visible selected scenes, bottom to top.
    pub(crate) fn paint_order(&self) -> Vec<SceneKey> {
        let is_visible = |key: &SceneKey| self.window.scene(key).map(|s| s.visible).unwrap_or(false);

        if self.single_cell() {
            return self
                .window
                .active_cell()
                .and_then(|c| c.current_scene())
                .filter(|s| s.visible)
                .map(Scene::key)
                .into_iter()
                .collect();
        }

        match self.zorder.mode() {
            StackMode::Multi => self
                .zorder
                .iter_bottom_up()
                .filter(|k| is_visible(*k))
                .cloned()
                .collect(),
            StackMode::Single => {
                let top = self.zorder.top();
                let mut order: Vec<SceneKey> = self
                    .window
                    .cells()
                    .iter()
                    .filter(|c| c.valid)
                    .filter_map(|c| c.current_scene())
                    .filter(|s| s.visible)
                    .map(Scene::key)
                    .filter(|k| Some(k) != top)
                    .collect();
                if let Some(top) = top.filter(|k| is_visible(*k)) {
                    order.push(top.clone());
                }
                order
            }
        }
    }

    /// Hand the paint list to the raster loader and flush rasters that
    /// left it.
    pub(crate) fn push_rasters(&mut self) {
        let pixel_size = self.pixel_size();
        let order = self.paint_order();
        let painted: HashSet<&SceneKey> = order.iter().collect();

        let mut scenes = Vec::with_capacity(order.len());
        for key in &order {
            let Some((slot, index)) = self.window.locate(key) else {
                continue;
            };
            if let Some(scene) = self
                .window
                .cell_mut(slot)
                .and_then(|c| c.scenes_mut().get_mut(index))
            {
                scene.loaded_resolution = Some(pixel_size);
                scenes.push(scene.clone());
            }
        }

        let mut flushed = Vec::new();
        for cell in self.window.cells_mut() {
            for scene in cell.scenes_mut() {
                if scene.loaded_resolution.is_some() && !painted.contains(&scene.key()) {
                    scene.loaded_resolution = None;
                    flushed.push(scene.key());
                }
            }
        }
        self.flush(&flushed);

        let cell_count = if self.single_cell() {
            1
        } else {
            self.window.slot_count()
        };
        self.raster
            .load_images(&scenes, cell_count, pixel_size, &self.profile);
    }

    fn flush(&self, keys: &[SceneKey]) {
        for key in keys {
            self.raster.flush(key);
        }
    }

    pub(crate) fn snapshot(&self, busy: bool) -> MosaicSnapshot {
        let position = self.window.position();
        let active = self.window.active_cell().filter(|c| c.valid);
        let display_size = if self.single_cell() {
            (1, 1)
        } else {
            (self.window.width(), self.window.height())
        };
        MosaicSnapshot {
            sensor: self.profile.name.clone(),
            paint_order: self.paint_order(),
            active_slot: self.window.active_slot(),
            active_cell: active.map(|c| c.coord),
            current_scene: active.and_then(Cell::current_key),
            center: position.coord,
            sub_col: position.sub_col,
            sub_row: position.sub_row,
            display_size,
            pixel_size: self.pixel_size(),
            single_cell: self.single_cell(),
            valid_cells: self.window.valid_count(),
            busy,
        }
    }
}

/// Record a non-default choice in the date cache, forget a default one.
fn remember_choice(cache: &mut DateCache, cell: &Cell, index: usize, profile: &SensorProfile) {
    if pick_default(cell, profile) == Some(index) {
        cache.forget(cell.coord);
    } else if let Some(scene) = cell.scene(index) {
        cache.record(&scene.key());
    }
}

/// Pick the window's projection and invalidate cells that disagree.
///
/// The center cell's code wins when it has scenes; otherwise a majority
/// vote among valid cells with scenes (ties to the lowest code), then a
/// valid but empty center, then the sensor default.
pub(crate) fn reconcile_projection(
    cells: &mut [Cell],
    center_slot: usize,
    default: ProjectionCode,
) -> (ProjectionCode, Vec<SceneKey>) {
    let center = cells.get(center_slot).filter(|c| c.valid);
    let code = center
        .filter(|c| !c.is_empty())
        .and_then(|c| c.projection)
        .or_else(|| majority_projection(cells))
        .or_else(|| center.and_then(|c| c.projection))
        .unwrap_or(default);

    let mut flushed = Vec::new();
    for cell in cells.iter_mut().filter(|c| c.valid && c.projection != Some(code)) {
        warn!(
            col = cell.coord.col,
            row = cell.coord.row,
            projection = ?cell.projection,
            window_projection = %code,
            "Cell projection disagrees with window, invalidating"
        );
        flushed.extend(cell.release());
    }
    (code, flushed)
}

fn majority_projection(cells: &[Cell]) -> Option<ProjectionCode> {
    let mut votes: BTreeMap<ProjectionCode, usize> = BTreeMap::new();
    for code in cells
        .iter()
        .filter(|c| c.valid && !c.is_empty())
        .filter_map(|c| c.projection)
    {
        *votes.entry(code).or_default() += 1;
    }
    // Ascending order with a strict comparison keeps the lowest code on ties
    votes
        .into_iter()
        .fold(None, |best: Option<(ProjectionCode, usize)>, (code, n)| match best {
            Some((_, best_n)) if best_n >= n => best,
            _ => Some((code, n)),
        })
        .map(|(code, _)| code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::CornerOffsets;
    use mosaic_common::AcquisitionDate;

    fn scene(coord: GridCoord, entity: &str) -> Scene {
        Scene {
            coord,
            sensor_id: "S".to_string(),
            date: AcquisitionDate::from_yyyymmdd(20200101).unwrap(),
            cloud_cover: Some(0),
            quality: None,
            entity_id: entity.to_string(),
            data_version: None,
            upper_left: ProjectedPoint::new(0.0, 0.0),
            corners: CornerOffsets::default(),
            offset_resolution: 1.0,
            downloadable: true,
            visible: true,
            loaded_resolution: None,
        }
    }

    fn cell(col: i32, code: i32, scenes: usize) -> Cell {
        let coord = GridCoord::new(col, 0);
        let scenes = (0..scenes).map(|i| scene(coord, &format!("E{}", i))).collect();
        Cell::loaded(coord, ProjectionCode(code), scenes, false, false)
    }

    #[test]
    fn test_center_projection_wins() {
        let mut cells = vec![cell(0, 5, 1), cell(1, 7, 1), cell(2, 5, 1)];
        let (code, _) = reconcile_projection(&mut cells, 1, ProjectionCode(1));
        assert_eq!(code, ProjectionCode(7));
        assert!(!cells[0].valid);
        assert!(cells[1].valid);
        assert!(!cells[2].valid);
    }

    #[test]
    fn test_majority_when_center_empty() {
        let mut cells = vec![cell(0, 5, 1), cell(1, 7, 0), cell(2, 5, 2), cell(3, 9, 1)];
        let (code, _) = reconcile_projection(&mut cells, 1, ProjectionCode(1));
        assert_eq!(code, ProjectionCode(5));
        assert!(cells[0].valid);
        assert!(!cells[1].valid);
        assert!(!cells[3].valid);
    }

    #[test]
    fn test_majority_tie_goes_to_lowest_code() {
        let mut cells = vec![cell(0, 9, 1), Cell::invalid(GridCoord::new(1, 0)), cell(2, 4, 1)];
        let (code, _) = reconcile_projection(&mut cells, 1, ProjectionCode(1));
        assert_eq!(code, ProjectionCode(4));
        assert!(!cells[0].valid);
        assert!(cells[2].valid);
    }

    #[test]
    fn test_default_when_nothing_valid() {
        let mut cells = vec![Cell::invalid(GridCoord::new(0, 0))];
        let (code, flushed) = reconcile_projection(&mut cells, 0, ProjectionCode(3));
        assert_eq!(code, ProjectionCode(3));
        assert!(flushed.is_empty());
    }

    #[test]
    fn test_rejected_cells_flush_rasters() {
        let mut cells = vec![cell(0, 5, 1), cell(1, 7, 1)];
        cells[0].scenes_mut()[0].loaded_resolution = Some(30.0);
        let (_, flushed) = reconcile_projection(&mut cells, 1, ProjectionCode(1));
        assert_eq!(flushed, vec![SceneKey::new(GridCoord::new(0, 0), "E0")]);
    }
}

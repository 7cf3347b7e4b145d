//! The navigation controller, the engine's public entry point.
//!
//! Navigation calls never block on I/O. They compute a candidate position,
//! validate it against the sensor's navigation model and bumper, and hand a
//! [`LoadRequest`] to the loader thread. In-window operations (selection,
//! filters, display mode) mutate the live state directly under the same
//! lock the loader uses to activate a completed load.

use crate::cell::DateStep;
use crate::config::MosaicConfig;
use crate::events::{MosaicEvent, MosaicSnapshot};
use crate::filter::FilterCriteria;
use crate::loader::{run_worker, Inner, LoadKind, LoadRequest, LoaderStatsSnapshot, Shared};
use crate::profile::SensorProfile;
use crate::raster::RasterLoader;
use crate::scene::SceneKey;
use crate::source::MetadataSource;
use crate::state::MosaicState;
use mosaic_common::{
    GridCoord, GridPosition, LatLong, MosaicError, MosaicResult, NavigationModel,
    ProjectionTransform,
};
use serde::Serialize;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Capacity of the event channel; slow subscribers see `Lagged`.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// External services the engine depends on.
#[derive(Debug, Clone)]
pub struct Collaborators {
    pub source: Arc<dyn MetadataSource>,
    pub raster: Arc<dyn RasterLoader>,
    pub projection: Arc<dyn ProjectionTransform>,
}

/// Why a navigation request was refused. State is left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CannotMove {
    /// Past the edge of a grid that does not wrap
    OutOfBounds,
    /// Center would leave the sensor's geographic bumper
    OutsideBumper,
    /// Target could not be converted to grid coordinates
    Unprojectable,
}

/// Result of a navigation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MoveOutcome {
    Requested,
    CannotMove(CannotMove),
}

impl MoveOutcome {
    pub fn is_requested(&self) -> bool {
        matches!(self, MoveOutcome::Requested)
    }
}

/// Result of [`NavigationController::show_scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShowSceneOutcome {
    /// Selected in the live window
    Selected,
    /// Present but rejected by the filters
    SceneHidden,
    /// The scene's cell is loaded but does not contain it
    NotFound,
    /// The window is moving to the scene's cell
    Navigating,
    CannotMove(CannotMove),
}

/// Façade over the mosaic engine.
///
/// Owns the loader thread; dropping the controller stops and joins it.
pub struct NavigationController {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl NavigationController {
    /// Create a controller for `profile`.
    ///
    /// The window is empty, centered on the middle of the sensor's grid,
    /// until the first navigation call.
    pub fn new(
        config: MosaicConfig,
        profile: SensorProfile,
        collaborators: Collaborators,
    ) -> MosaicResult<Self> {
        let profile = Arc::new(profile);
        let state = MosaicState::new(config, profile, collaborators)?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let shared = Arc::new(Shared::new(Inner::new(state), events));

        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("mosaic-loader".to_string())
            .spawn(move || run_worker(worker_shared))
            .map_err(|e| MosaicError::Worker(format!("failed to spawn loader thread: {}", e)))?;

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<MosaicEvent> {
        self.shared.events.subscribe()
    }

    pub fn snapshot(&self) -> MosaicSnapshot {
        let inner = self.shared.lock();
        let busy = inner.is_loading() || inner.state.raster().is_busy();
        inner.state.snapshot(busy)
    }

    /// Whether a metadata or raster load is in progress.
    pub fn is_busy(&self) -> bool {
        let inner = self.shared.lock();
        inner.is_loading() || inner.state.raster().is_busy()
    }

    /// Block until the loader has no pending or running load.
    pub fn wait_until_idle(&self) {
        let guard = self.shared.lock();
        drop(self.shared.wait_idle(guard));
    }

    /// Bounded [`wait_until_idle`](Self::wait_until_idle). Returns whether
    /// the loader went idle in time.
    pub fn wait_until_idle_timeout(&self, timeout: Duration) -> bool {
        self.shared.wait_idle_timeout(timeout)
    }

    pub fn stats(&self) -> LoaderStatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn filters(&self) -> FilterCriteria {
        self.shared.lock().state.filters().clone()
    }

    /// Entries of the paint-order stack, bottom to top.
    pub fn zorder(&self) -> Vec<SceneKey> {
        self.shared.lock().state.zorder().entries()
    }

    /// Run `f` against the live window.
    pub fn with_window<R>(&self, f: impl FnOnce(&crate::window::GridWindow) -> R) -> R {
        let inner = self.shared.lock();
        f(inner.state.window())
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Scroll by `east` and `south` display steps.
    ///
    /// Steps are whole cells in multi-cell display and sub-cell steps in
    /// single-cell display. In swath mode the current swath is followed.
    pub fn scroll(&self, east: i32, south: i32) -> MoveOutcome {
        let mut inner = self.shared.lock();
        let profile = Arc::clone(inner.state.profile());
        let d_col = east * profile.navigation.east_col_sign();
        let d_row = south * profile.navigation.south_row_sign();
        let candidate = if inner.state.single_cell() {
            inner.requested.step_sub(d_col, d_row)
        } else {
            inner.requested.step_cells(d_col, d_row)
        };

        let swath_reference = if profile.swath_mode {
            inner.state.swath_reference().cloned()
        } else {
            None
        };
        let preserve_order = inner.state.config().preserve_order_on_scroll;
        self.request(
            &mut inner,
            LoadKind::Scroll,
            candidate,
            |request| {
                request.preserve_order = preserve_order;
                request.swath_reference = swath_reference;
            },
        )
    }

    pub fn goto_grid_cell(&self, col: i32, row: i32) -> MoveOutcome {
        let mut inner = self.shared.lock();
        let candidate = GridPosition::new(GridCoord::new(col, row));
        self.request(&mut inner, LoadKind::Goto, candidate, |_| {})
    }

    /// Center the display on a projected coordinate in the window's
    /// projection.
    pub fn goto_projected_xy(&self, x: f64, y: f64) -> MoveOutcome {
        let mut inner = self.shared.lock();
        let candidate = match inner.state.projected_target(x, y) {
            Ok(candidate) => candidate,
            Err(reason) => return MoveOutcome::CannotMove(reason),
        };
        self.request(&mut inner, LoadKind::Goto, candidate, |_| {})
    }

    /// Center the display on a lat/long.
    ///
    /// Once the window is live a `TargetOffset` event reports where the
    /// point falls relative to the display center.
    pub fn goto_lat_long(&self, lat: f64, lon: f64) -> MoveOutcome {
        let point = LatLong::new(lat, lon);
        if !point.is_valid() {
            return MoveOutcome::CannotMove(CannotMove::Unprojectable);
        }
        let mut inner = self.shared.lock();
        let (col, row) = inner.state.profile().navigation.lat_long_to_grid(&point);
        let candidate = GridPosition::from_fractional(col, row, inner.state.single_cell());
        self.request(&mut inner, LoadKind::Goto, candidate, |request| {
            request.target_point = Some(point);
        })
    }

    /// Select a scene, moving the window to its cell when needed.
    pub fn show_scene(&self, key: &SceneKey) -> ShowSceneOutcome {
        let mut inner = self.shared.lock();
        let in_window = inner.state.window().valid_cell(key.coord).is_some();
        if in_window {
            let outcome = inner.state.select_scene(key);
            drop(inner);
            if outcome == ShowSceneOutcome::Selected {
                self.shared.publish(MosaicEvent::Normal);
            }
            return outcome;
        }

        let candidate = GridPosition::new(key.coord);
        let target = key.clone();
        match self.request(&mut inner, LoadKind::ShowScene, candidate, |request| {
            request.target_scene = Some(target);
        }) {
            MoveOutcome::Requested => ShowSceneOutcome::Navigating,
            MoveOutcome::CannotMove(reason) => ShowSceneOutcome::CannotMove(reason),
        }
    }

    /// Reload every cell of the current window from the source.
    pub fn refresh(&self) -> MoveOutcome {
        let mut inner = self.shared.lock();
        let candidate = inner.requested;
        self.request(&mut inner, LoadKind::Refresh, candidate, |request| {
            request.reuse = false;
            request.preserve_order = true;
        })
    }

    /// Switch to another sensor, keeping the current geographic center.
    pub fn set_sensor(
        &self,
        profile: SensorProfile,
        source: Arc<dyn MetadataSource>,
    ) -> MosaicResult<MoveOutcome> {
        profile.validate()?;
        let profile = Arc::new(profile);
        let mut inner = self.shared.lock();

        let (col, row) = inner.requested.fractional();
        let center = inner.state.profile().navigation.grid_to_lat_long(col, row);
        let (new_col, new_row) = profile.navigation.lat_long_to_grid(&center);
        let candidate = GridPosition::from_fractional(new_col, new_row, false);
        let candidate = match MosaicState::check_target(&profile, candidate) {
            Ok(position) => position,
            Err(_) => {
                // The old center is off the new sensor's grid
                let (min_col, max_col) = profile.navigation.col_range();
                let (min_row, max_row) = profile.navigation.row_range();
                GridPosition::new(GridCoord::new(
                    min_col + (max_col - min_col) / 2,
                    min_row + (max_row - min_row) / 2,
                ))
            }
        };

        info!(sensor = %profile.name, center = %candidate.coord, "Switching sensor");
        let request = LoadRequest {
            kind: LoadKind::SensorSwitch,
            position: candidate,
            reuse: false,
            preserve_order: false,
            target_point: None,
            target_scene: None,
            swath_reference: None,
            profile,
            source,
        };
        inner.state.raster().cancel_load();
        self.shared.submit(&mut inner, request);
        Ok(MoveOutcome::Requested)
    }

    /// Abandon the load in flight without requesting another.
    ///
    /// The live window is left as it was. Returns whether anything was
    /// cancelled.
    pub fn cancel_load(&self) -> bool {
        let mut inner = self.shared.lock();
        inner.state.raster().cancel_load();
        let cancelled = self.shared.cancel_all(&mut inner);
        if cancelled {
            debug!("Load cancelled by caller");
        }
        cancelled
    }

    /// Validate `candidate` and submit a load for it.
    fn request(
        &self,
        inner: &mut Inner,
        kind: LoadKind,
        candidate: GridPosition,
        customize: impl FnOnce(&mut LoadRequest),
    ) -> MoveOutcome {
        let profile = Arc::clone(inner.state.profile());
        let position = match MosaicState::check_target(&profile, candidate) {
            Ok(position) => position,
            Err(reason) => {
                debug!(?kind, ?reason, col = candidate.coord.col, row = candidate.coord.row, "Cannot move");
                return MoveOutcome::CannotMove(reason);
            }
        };

        let mut request = LoadRequest {
            kind,
            position,
            reuse: true,
            preserve_order: false,
            target_point: None,
            target_scene: None,
            swath_reference: None,
            source: Arc::clone(inner.state.source()),
            profile,
        };
        customize(&mut request);

        inner.state.raster().cancel_load();
        self.shared.submit(inner, request);
        MoveOutcome::Requested
    }

    // ========================================================================
    // In-window operations
    // ========================================================================

    /// Make another window slot the active cell.
    pub fn select_cell(&self, slot: usize) -> bool {
        let changed = self.shared.lock().state.select_cell(slot);
        if changed {
            self.shared.publish(MosaicEvent::Normal);
        }
        changed
    }

    /// Explicitly select a scene in the live window.
    pub fn select_scene(&self, key: &SceneKey) -> ShowSceneOutcome {
        let outcome = self.shared.lock().state.select_scene(key);
        if outcome == ShowSceneOutcome::Selected {
            self.shared.publish(MosaicEvent::Normal);
        }
        outcome
    }

    /// Step the active cell to the adjacent visible date.
    pub fn step_date(&self, step: DateStep) -> bool {
        let moved = self.shared.lock().state.step_date(step);
        if moved {
            self.shared.publish(MosaicEvent::Normal);
        }
        moved
    }

    /// Replace the filter criteria.
    pub fn set_filters(&self, filters: FilterCriteria) {
        self.shared.lock().state.set_filters(filters);
        self.shared.publish(MosaicEvent::Normal);
    }

    pub fn hide_scene(&self, key: &SceneKey) {
        self.shared.lock().state.hide_scene(key);
        self.shared.publish(MosaicEvent::Normal);
    }

    pub fn unhide_all(&self) {
        self.shared.lock().state.unhide_all();
        self.shared.publish(MosaicEvent::Normal);
    }

    /// Change the display resolution by index into the sensor's list.
    ///
    /// Leaving single-cell display with a sub-cell offset recenters on the
    /// whole cell.
    pub fn set_resolution(&self, index: usize) -> MosaicResult<()> {
        let mut inner = self.shared.lock();
        let mode_change = inner.state.set_resolution(index)?;

        if mode_change == Some(false) && inner.requested.has_sub_offset() {
            let candidate = GridPosition::new(inner.requested.coord);
            let outcome = self.request(&mut inner, LoadKind::Recenter, candidate, |request| {
                request.preserve_order = true;
            });
            if !outcome.is_requested() {
                warn!(?outcome, "Recenter after leaving single-cell display refused");
            }
        }
        drop(inner);

        if let Some(single_cell) = mode_change {
            info!(single_cell, "Display mode changed");
            self.shared
                .publish(MosaicEvent::DisplayModeChanged { single_cell });
        } else {
            self.shared.publish(MosaicEvent::Normal);
        }
        Ok(())
    }

    /// Change the display resolution by pixel size; it must be one of the
    /// sensor's resolutions.
    pub fn set_pixel_size(&self, pixel_size: f64) -> MosaicResult<()> {
        let index = {
            let inner = self.shared.lock();
            let profile = inner.state.profile();
            profile.resolution_index(pixel_size).ok_or_else(|| {
                MosaicError::Config(format!(
                    "pixel size {} not offered by sensor {}",
                    pixel_size, profile.name
                ))
            })?
        };
        self.set_resolution(index)
    }
}

impl Drop for NavigationController {
    fn drop(&mut self) {
        self.shared.shutdown();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Metadata loader thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for NavigationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationController")
            .field("stats", &self.shared.stats.snapshot())
            .finish()
    }
}

//! Background metadata loader.
//!
//! A single worker thread owns the fetch side of every window load. The
//! controller writes the latest request into a one-slot buffer under the
//! shared lock and signals the worker; requests that arrive while the
//! worker is busy overwrite each other, so only the newest is ever loaded.
//!
//! Cancellation is cooperative. The worker checks the flag under the lock
//! before and after each cell fetch and discards everything it fetched if
//! the flag is set. Activation, the swap of a completed load into the live
//! state, happens under the same lock as every in-window operation.

use crate::cell::Cell;
use crate::events::MosaicEvent;
use crate::profile::SensorProfile;
use crate::record::parse_cell_record;
use crate::scene::SceneKey;
use crate::source::MetadataSource;
use crate::state::MosaicState;
use crate::swath::SwathKey;
use mosaic_common::{GridCoord, GridPosition, LatLong};
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

/// Why a load was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadKind {
    Scroll,
    Goto,
    ShowScene,
    Refresh,
    /// Leaving single-cell display with a sub-cell offset pending
    Recenter,
    SensorSwitch,
}

/// A window load waiting for the worker.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub kind: LoadKind,
    pub position: GridPosition,
    /// Keep valid cells from the current window instead of refetching
    pub reuse: bool,
    /// Rebuild the stack in the old order after activation
    pub preserve_order: bool,
    /// Point to report as a pixel offset once the window is live
    pub target_point: Option<LatLong>,
    /// Scene to select once the window is live
    pub target_scene: Option<SceneKey>,
    /// Swath to keep following after a scroll
    pub swath_reference: Option<SwathKey>,
    pub profile: Arc<SensorProfile>,
    pub source: Arc<dyn MetadataSource>,
}

/// What the worker does for one window slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPlan {
    /// Move the valid cell from the current window
    Reuse(GridCoord),
    Fetch(GridCoord),
    /// Off the edge of a non-wrapping grid
    Empty(GridCoord),
}

/// Loader state machine: `Idle -> Loading -> {activated | cancelled} -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Loading { generation: u64, cancel_requested: bool },
}

/// Loader activity counters.
#[derive(Debug, Default)]
pub struct LoaderStats {
    /// Navigation requests written to the pending buffer
    pub requests: AtomicU64,
    /// Requests overwritten before the worker picked them up
    pub coalesced: AtomicU64,
    pub cycles_started: AtomicU64,
    pub cells_fetched: AtomicU64,
    pub parse_failures: AtomicU64,
    pub activations: AtomicU64,
    pub cancellations: AtomicU64,
    /// Cycles abandoned because a collaborator panicked
    pub failed_cycles: AtomicU64,
}

impl LoaderStats {
    pub fn snapshot(&self) -> LoaderStatsSnapshot {
        LoaderStatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            cycles_started: self.cycles_started.load(Ordering::Relaxed),
            cells_fetched: self.cells_fetched.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            activations: self.activations.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
            failed_cycles: self.failed_cycles.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`LoaderStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoaderStatsSnapshot {
    pub requests: u64,
    pub coalesced: u64,
    pub cycles_started: u64,
    pub cells_fetched: u64,
    pub parse_failures: u64,
    pub activations: u64,
    pub cancellations: u64,
    pub failed_cycles: u64,
}

pub(crate) struct Inner {
    pub(crate) state: MosaicState,
    pub(crate) pending: Option<LoadRequest>,
    pub(crate) phase: LoadPhase,
    /// Most recently requested position; navigation steps from here
    pub(crate) requested: GridPosition,
    generation: u64,
    shutdown: bool,
}

impl Inner {
    pub(crate) fn new(state: MosaicState) -> Self {
        let requested = state.window().position();
        Self {
            state,
            pending: None,
            phase: LoadPhase::Idle,
            requested,
            generation: 0,
            shutdown: false,
        }
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.pending.is_some() || matches!(self.phase, LoadPhase::Loading { .. })
    }
}

/// State shared between the controller and the worker thread.
pub(crate) struct Shared {
    inner: Mutex<Inner>,
    wake: Condvar,
    idle: Condvar,
    pub(crate) events: broadcast::Sender<MosaicEvent>,
    pub(crate) stats: LoaderStats,
}

impl Shared {
    pub(crate) fn new(inner: Inner, events: broadcast::Sender<MosaicEvent>) -> Self {
        Self {
            inner: Mutex::new(inner),
            wake: Condvar::new(),
            idle: Condvar::new(),
            events,
            stats: LoaderStats::default(),
        }
    }

    /// Lock the shared state. A poisoned lock is recovered; the state is
    /// only ever mutated in whole steps.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publish an event. Having no subscribers is not an error.
    pub(crate) fn publish(&self, event: MosaicEvent) {
        let _ = self.events.send(event);
    }

    /// Buffer a request for the worker, cancelling any load in flight.
    pub(crate) fn submit(&self, inner: &mut Inner, request: LoadRequest) {
        self.stats.requests.fetch_add(1, Ordering::Relaxed);
        inner.requested = request.position;
        if inner.pending.replace(request).is_some() {
            self.stats.coalesced.fetch_add(1, Ordering::Relaxed);
        }
        Self::request_cancel(inner);
        self.wake.notify_one();
    }

    /// Flag the in-flight load, if any, for cancellation.
    pub(crate) fn request_cancel(inner: &mut Inner) -> bool {
        if let LoadPhase::Loading {
            cancel_requested, ..
        } = &mut inner.phase
        {
            *cancel_requested = true;
            return true;
        }
        false
    }

    /// Drop the pending request and cancel the running load.
    ///
    /// Navigation resumes from the live window's position.
    pub(crate) fn cancel_all(&self, inner: &mut Inner) -> bool {
        let dropped = inner.pending.take().is_some();
        let cancelled = Self::request_cancel(inner);
        inner.requested = inner.state.window().position();
        if !inner.is_loading() {
            self.idle.notify_all();
        }
        dropped || cancelled
    }

    /// Block until no load is pending or running.
    pub(crate) fn wait_idle<'a>(&self, mut guard: MutexGuard<'a, Inner>) -> MutexGuard<'a, Inner> {
        while guard.is_loading() && !guard.shutdown {
            guard = self
                .idle
                .wait(guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        guard
    }

    /// Like [`Shared::wait_idle`] with an upper bound; returns whether the
    /// loader went idle.
    pub(crate) fn wait_idle_timeout(&self, timeout: std::time::Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .idle
            .wait_timeout_while(guard, timeout, |inner| {
                inner.is_loading() && !inner.shutdown
            })
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        !guard.is_loading()
    }

    pub(crate) fn shutdown(&self) {
        let mut inner = self.lock();
        inner.shutdown = true;
        Self::request_cancel(&mut inner);
        self.wake.notify_all();
        self.idle.notify_all();
    }

    fn cancelled(&self, generation: u64) -> bool {
        let inner = self.lock();
        inner.shutdown
            || match inner.phase {
                LoadPhase::Loading {
                    generation: g,
                    cancel_requested,
                } => g != generation || cancel_requested,
                LoadPhase::Idle => true,
            }
    }
}

enum LoadOutcome {
    Activated(MosaicEvent),
    Cancelled,
}

/// Worker thread body.
pub(crate) fn run_worker(shared: Arc<Shared>) {
    debug!("Metadata loader started");
    loop {
        let (request, generation) = {
            let mut inner = shared.lock();
            loop {
                if inner.shutdown {
                    debug!("Metadata loader stopping");
                    return;
                }
                if let Some(request) = inner.pending.take() {
                    inner.generation += 1;
                    let generation = inner.generation;
                    inner.phase = LoadPhase::Loading {
                        generation,
                        cancel_requested: false,
                    };
                    break (request, generation);
                }
                inner = shared
                    .wake
                    .wait(inner)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }
        };

        shared.stats.cycles_started.fetch_add(1, Ordering::Relaxed);
        // A panicking collaborator abandons the cycle; the phase must still return to Idle
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            load_window(&shared, request, generation)
        }))
        .unwrap_or_else(|_| {
            shared.stats.failed_cycles.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("mosaic_loads_failed_total").increment(1);
            error!(generation, "Window load panicked, keeping current window");
            LoadOutcome::Cancelled
        });

        let mut inner = shared.lock();
        inner.phase = LoadPhase::Idle;
        // Published before waking idle waiters so they observe the event
        if let LoadOutcome::Activated(event) = outcome {
            shared.publish(event);
        }
        if !inner.is_loading() {
            shared.idle.notify_all();
        }
    }
}

#[instrument(skip(shared, request), fields(kind = ?request.kind, center = %request.position.coord))]
fn load_window(shared: &Shared, request: LoadRequest, generation: u64) -> LoadOutcome {
    let plan = shared.lock().state.plan_slots(&request);
    let fetch_count = plan
        .iter()
        .filter(|p| matches!(p, SlotPlan::Fetch(_)))
        .count();
    debug!(generation, slots = plan.len(), fetch_count, "Starting window load");

    let mut fetched: Vec<Option<Cell>> = vec![None; plan.len()];
    for (slot, step) in plan.iter().enumerate() {
        let SlotPlan::Fetch(coord) = *step else {
            continue;
        };
        if shared.cancelled(generation) {
            return cancel(shared, generation, slot);
        }
        fetched[slot] = Some(fetch_cell(shared, &request, coord));
        if shared.cancelled(generation) {
            return cancel(shared, generation, slot);
        }
    }

    let mut inner = shared.lock();
    // A request can land between the last check and this lock
    let still_current = matches!(
        inner.phase,
        LoadPhase::Loading { generation: g, cancel_requested: false } if g == generation
    );
    if !still_current || inner.shutdown {
        drop(inner);
        return cancel(shared, generation, plan.len());
    }

    let event = inner.state.activate(request, plan, fetched);
    let valid = inner.state.window().valid_count();
    drop(inner);

    shared.stats.activations.fetch_add(1, Ordering::Relaxed);
    metrics::counter!("mosaic_loads_activated_total").increment(1);
    metrics::gauge!("mosaic_valid_cells").set(valid as f64);
    info!(generation, valid_cells = valid, "Window activated");
    LoadOutcome::Activated(event)
}

fn cancel(shared: &Shared, generation: u64, at_slot: usize) -> LoadOutcome {
    shared.stats.cancellations.fetch_add(1, Ordering::Relaxed);
    metrics::counter!("mosaic_loads_cancelled_total").increment(1);
    debug!(generation, at_slot, "Window load cancelled");
    LoadOutcome::Cancelled
}

/// Fetch and parse one cell. Failures degrade to an invalid cell.
fn fetch_cell(shared: &Shared, request: &LoadRequest, coord: GridCoord) -> Cell {
    shared.stats.cells_fetched.fetch_add(1, Ordering::Relaxed);
    metrics::counter!("mosaic_cells_fetched_total").increment(1);

    let parsed = request
        .source
        .fetch(&request.profile, coord)
        .and_then(|text| parse_cell_record(&text, coord, &request.profile));

    match parsed {
        Ok(cell) => {
            debug!(col = coord.col, row = coord.row, scenes = cell.len(), "Fetched cell");
            cell
        }
        Err(e) => {
            shared.stats.parse_failures.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("mosaic_cell_parse_failures_total").increment(1);
            warn!(col = coord.col, row = coord.row, error = %e, "Cell load failed, marking invalid");
            Cell::invalid(coord)
        }
    }
}

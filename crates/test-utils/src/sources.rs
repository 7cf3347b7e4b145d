//! In-memory collaborators for driving the engine in tests.

use mosaic_cache::{MetadataSource, MosaicEvent, RasterLoader, Scene, SceneKey, SensorProfile};
use mosaic_common::{GridCoord, MosaicError, MosaicResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Records keyed by sensor name and cell, with a log of every fetch.
#[derive(Debug, Default)]
pub struct MemorySource {
    records: Mutex<HashMap<(String, GridCoord), String>>,
    fetched: Mutex<Vec<GridCoord>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, sensor: &str, coord: GridCoord, record: impl Into<String>) {
        self.records
            .lock()
            .unwrap()
            .insert((sensor.to_string(), coord), record.into());
    }

    /// Cells fetched so far, in order.
    pub fn fetched(&self) -> Vec<GridCoord> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }

    pub fn clear_log(&self) {
        self.fetched.lock().unwrap().clear();
    }
}

impl MetadataSource for MemorySource {
    fn fetch(&self, profile: &SensorProfile, coord: GridCoord) -> MosaicResult<String> {
        self.fetched.lock().unwrap().push(coord);
        self.records
            .lock()
            .unwrap()
            .get(&(profile.name.clone(), coord))
            .cloned()
            .ok_or_else(|| MosaicError::fetch_failed(coord, "no record"))
    }
}

#[derive(Debug, Default)]
struct Gate {
    /// 1-based fetch number to block on
    block_at: Option<usize>,
    count: usize,
    blocked: bool,
    released: bool,
}

/// A [`MemorySource`] that can hold the loader inside a chosen fetch.
#[derive(Debug)]
pub struct GatedSource {
    inner: Arc<MemorySource>,
    gate: Mutex<Gate>,
    changed: Condvar,
}

impl GatedSource {
    pub fn new(inner: Arc<MemorySource>) -> Self {
        Self {
            inner,
            gate: Mutex::new(Gate::default()),
            changed: Condvar::new(),
        }
    }

    pub fn memory(&self) -> &Arc<MemorySource> {
        &self.inner
    }

    /// Block the `n`th fetch from now until [`release`](Self::release).
    pub fn block_at(&self, n: usize) {
        let mut gate = self.gate.lock().unwrap();
        *gate = Gate {
            block_at: Some(n),
            ..Gate::default()
        };
    }

    /// Wait until a fetch is held at the gate.
    pub fn wait_until_blocked(&self, timeout: Duration) -> bool {
        let gate = self.gate.lock().unwrap();
        let (gate, _) = self
            .changed
            .wait_timeout_while(gate, timeout, |g| !g.blocked)
            .unwrap();
        gate.blocked
    }

    /// Let the held fetch, and every later one, through.
    pub fn release(&self) {
        let mut gate = self.gate.lock().unwrap();
        gate.released = true;
        gate.block_at = None;
        self.changed.notify_all();
    }
}

impl MetadataSource for GatedSource {
    fn fetch(&self, profile: &SensorProfile, coord: GridCoord) -> MosaicResult<String> {
        {
            let mut gate = self.gate.lock().unwrap();
            gate.count += 1;
            if gate.block_at == Some(gate.count) {
                gate.blocked = true;
                self.changed.notify_all();
                while !gate.released {
                    gate = self.changed.wait(gate).unwrap();
                }
                gate.blocked = false;
            }
        }
        self.inner.fetch(profile, coord)
    }
}

/// A raster loader that records every call.
#[derive(Debug, Default)]
pub struct RecordingRasterLoader {
    loads: Mutex<Vec<Vec<SceneKey>>>,
    flushed: Mutex<Vec<SceneKey>>,
    cancels: AtomicUsize,
}

impl RecordingRasterLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scene keys of the most recent load, bottom to top.
    pub fn last_load(&self) -> Option<Vec<SceneKey>> {
        self.loads.lock().unwrap().last().cloned()
    }

    pub fn load_count(&self) -> usize {
        self.loads.lock().unwrap().len()
    }

    pub fn flushed(&self) -> Vec<SceneKey> {
        self.flushed.lock().unwrap().clone()
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl RasterLoader for RecordingRasterLoader {
    fn load_images(&self, scenes: &[Scene], _cell_count: usize, _pixel_size: f64, _profile: &SensorProfile) {
        self.loads
            .lock()
            .unwrap()
            .push(scenes.iter().map(Scene::key).collect());
    }

    fn cancel_load(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }

    fn is_busy(&self) -> bool {
        false
    }

    fn wait_until_done(&self) {}

    fn flush(&self, key: &SceneKey) {
        self.flushed.lock().unwrap().push(key.clone());
    }
}

/// Every event currently queued on a receiver.
pub fn drain_events(rx: &mut broadcast::Receiver<MosaicEvent>) -> Vec<MosaicEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

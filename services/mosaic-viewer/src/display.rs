//! Raster loader for running without a display.

use mosaic_cache::{RasterLoader, Scene, SceneKey, SensorProfile};
use metrics::{counter, gauge};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// Tracks which rasters would be held and at what pixel size, without
/// decoding anything.
#[derive(Debug, Default)]
pub struct HeadlessRasterLoader {
    held: Mutex<HashMap<SceneKey, f64>>,
    loads: AtomicU64,
    flushes: AtomicU64,
    cancels: AtomicU64,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RasterStats {
    pub loads: u64,
    pub flushes: u64,
    pub cancels: u64,
    pub held: usize,
}

impl HeadlessRasterLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scenes currently held, sorted.
    pub fn held(&self) -> Vec<SceneKey> {
        let mut keys: Vec<SceneKey> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn stats(&self) -> RasterStats {
        RasterStats {
            loads: self.loads.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            cancels: self.cancels.load(Ordering::Relaxed),
            held: self.lock().len(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SceneKey, f64>> {
        self.held.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RasterLoader for HeadlessRasterLoader {
    fn load_images(&self, scenes: &[Scene], cell_count: usize, pixel_size: f64, profile: &SensorProfile) {
        self.loads.fetch_add(1, Ordering::Relaxed);
        counter!("viewer_raster_loads_total").increment(1);

        let mut held = self.lock();
        for scene in scenes {
            held.insert(scene.key(), pixel_size);
        }
        gauge!("viewer_rasters_held").set(held.len() as f64);
        debug!(
            sensor = %profile.name,
            scenes = scenes.len(),
            cell_count,
            pixel_size,
            "Raster load requested"
        );
    }

    fn cancel_load(&self) {
        self.cancels.fetch_add(1, Ordering::Relaxed);
    }

    fn is_busy(&self) -> bool {
        false
    }

    fn wait_until_done(&self) {}

    fn flush(&self, key: &SceneKey) {
        if self.lock().remove(key).is_some() {
            self.flushes.fetch_add(1, Ordering::Relaxed);
            counter!("viewer_raster_flushes_total").increment(1);
        }
    }
}

//! Common harness for mosaic-cache integration tests
//!
//! Builds a controller over in-memory collaborators with a populated
//! synthetic catalog.

#![allow(dead_code)]

use mosaic_cache::{
    Collaborators, MetadataSource, MosaicConfig, NavigationController, SensorProfile,
};
use mosaic_common::PlateCarree;
use std::sync::Arc;
use std::time::Duration;
use test_utils::{populate_grid, GatedSource, MemorySource, RecordingRasterLoader};

/// Generated scenes per cell.
pub const SCENES_PER_CELL: usize = 3;

/// Upper bound for waiting on the loader in tests.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Harness {
    pub controller: NavigationController,
    pub memory: Arc<MemorySource>,
    pub gate: Arc<GatedSource>,
    pub raster: Arc<RecordingRasterLoader>,
}

impl Harness {
    /// Controller over a catalog covering columns and rows 0..=40.
    pub fn new(profile: SensorProfile) -> Self {
        let memory = Arc::new(MemorySource::new());
        populate_grid(&memory, &profile, 0..=40, 0..=40, SCENES_PER_CELL);
        Self::with_memory(profile, memory)
    }

    pub fn with_memory(profile: SensorProfile, memory: Arc<MemorySource>) -> Self {
        let gate = Arc::new(GatedSource::new(Arc::clone(&memory)));
        let raster = Arc::new(RecordingRasterLoader::new());
        let source: Arc<dyn MetadataSource> = gate.clone();
        let controller = NavigationController::new(
            MosaicConfig::default(),
            profile,
            Collaborators {
                source,
                raster: raster.clone(),
                projection: Arc::new(PlateCarree::default()),
            },
        )
        .expect("controller starts");
        Self {
            controller,
            memory,
            gate,
            raster,
        }
    }

    pub fn wait(&self) {
        assert!(
            self.controller.wait_until_idle_timeout(IDLE_TIMEOUT),
            "loader did not go idle"
        );
    }

    /// Go to a cell and wait for the window to activate.
    pub fn goto(&self, col: i32, row: i32) {
        assert!(self.controller.goto_grid_cell(col, row).is_requested());
        self.wait();
    }
}

//! Per-cell metadata record sources.

use crate::profile::SensorProfile;
use mosaic_common::{GridCoord, MosaicError, MosaicResult};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Supplies the raw text record for one grid cell.
///
/// Called from the loader thread, one cell at a time. Implementations may
/// block; cancellation is checked between calls.
pub trait MetadataSource: Send + Sync + fmt::Debug {
    fn fetch(&self, profile: &SensorProfile, coord: GridCoord) -> MosaicResult<String>;
}

/// Reads records from `<root>/<sensor name>/<col>_<row>.txt`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the record for a cell.
    pub fn record_path(&self, profile: &SensorProfile, coord: GridCoord) -> PathBuf {
        self.root
            .join(&profile.name)
            .join(format!("{}_{}.txt", coord.col, coord.row))
    }
}

impl MetadataSource for DirectorySource {
    fn fetch(&self, profile: &SensorProfile, coord: GridCoord) -> MosaicResult<String> {
        let path = self.record_path(profile, coord);
        debug!(path = %path.display(), col = coord.col, row = coord.row, "Reading cell record");
        fs::read_to_string(&path)
            .map_err(|e| MosaicError::fetch_failed(coord, format!("{}: {}", path.display(), e)))
    }
}

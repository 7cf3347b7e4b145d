//! Error types for the scene-mosaic crates.

use crate::GridCoord;
use thiserror::Error;

/// Result type alias using MosaicError.
pub type MosaicResult<T> = Result<T, MosaicError>;

/// Primary error type for mosaic operations.
#[derive(Debug, Error)]
pub enum MosaicError {
    // === Metadata Errors ===
    #[error("Invalid record for cell {coord}: {message}")]
    InvalidRecord { coord: GridCoord, message: String },

    #[error("Failed to read metadata for cell {coord}: {message}")]
    FetchFailed { coord: GridCoord, message: String },

    #[error("Invalid acquisition date: {0}")]
    InvalidDate(String),

    // === Configuration Errors ===
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid sensor profile '{sensor}': {message}")]
    InvalidProfile { sensor: String, message: String },

    #[error("No sensor data available: {0}")]
    NoSensorData(String),

    // === Geometry Errors ===
    #[error("Projection error: {0}")]
    Projection(String),

    #[error("Invalid bounding box: {0}")]
    InvalidBbox(String),

    // === Infrastructure Errors ===
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Worker error: {0}")]
    Worker(String),
}

impl MosaicError {
    /// Create an InvalidRecord error.
    pub fn invalid_record(coord: GridCoord, message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            coord,
            message: message.into(),
        }
    }

    /// Create a FetchFailed error.
    pub fn fetch_failed(coord: GridCoord, message: impl Into<String>) -> Self {
        Self::FetchFailed {
            coord,
            message: message.into(),
        }
    }

    /// Create an InvalidProfile error.
    pub fn invalid_profile(sensor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidProfile {
            sensor: sensor.into(),
            message: message.into(),
        }
    }

    /// Whether this error only degrades a single cell.
    ///
    /// Cell-scoped errors are absorbed by the loader; everything else is
    /// surfaced to the caller.
    pub fn is_cell_scoped(&self) -> bool {
        matches!(
            self,
            MosaicError::InvalidRecord { .. }
                | MosaicError::FetchFailed { .. }
                | MosaicError::InvalidDate(_)
        )
    }
}

impl From<std::io::Error> for MosaicError {
    fn from(err: std::io::Error) -> Self {
        MosaicError::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for MosaicError {
    fn from(err: serde_yaml::Error) -> Self {
        MosaicError::Config(format!("YAML error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_scoped_errors() {
        let coord = GridCoord::new(10, 20);
        assert!(MosaicError::invalid_record(coord, "bad count").is_cell_scoped());
        assert!(MosaicError::fetch_failed(coord, "timeout").is_cell_scoped());
        assert!(!MosaicError::NoSensorData("landsat".into()).is_cell_scoped());
        assert!(!MosaicError::Config("width".into()).is_cell_scoped());
    }

    #[test]
    fn test_error_display_includes_coord() {
        let err = MosaicError::invalid_record(GridCoord::new(3, 4), "short header");
        assert_eq!(err.to_string(), "Invalid record for cell (3, 4): short header");
    }
}

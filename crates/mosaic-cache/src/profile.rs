//! Sensor profiles: per-sensor record layout, resolutions and behavior flags.
//!
//! Profiles are loaded from YAML files, one profile per file:
//!
//! ```yaml
//! name: landsat_tm
//! sensor_id: TM
//! default_projection: 1
//! full_mosaic: false
//! swath_mode: true
//! has_quality: true
//! layout:
//!   date: 0
//!   ul_x: 1
//!   ul_y: 2
//!   cloud_cover: 3
//!   entity_id: 4
//!   quality: [5]
//!   corners: 6
//!   offset_resolution: 240.0
//! resolutions:
//!   - pixel_size: 1000.0
//!   - pixel_size: 240.0
//!     single_cell: true
//! navigation:
//!   origin_lon: -179.5
//!   origin_lat: 89.5
//!   dx: 1.0
//!   dy: -1.0
//!   min_col: 0
//!   max_col: 359
//!   min_row: 0
//!   max_row: 179
//!   wrap_cols: true
//! ```

use mosaic_common::{BoundingBox, MosaicError, MosaicResult, ProjectionCode, RegularGrid};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Field positions within one comma-separated scene record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordLayout {
    /// YYYYMMDD, or a bare year when `julian_day` is present
    pub date: usize,
    #[serde(default)]
    pub julian_day: Option<usize>,
    pub ul_x: usize,
    pub ul_y: usize,
    #[serde(default)]
    pub cloud_cover: Option<usize>,
    pub entity_id: usize,
    /// Quality fields; the scene quality is the lowest of them
    #[serde(default)]
    pub quality: Vec<usize>,
    /// First of eight fields: sample/line pairs for UL, UR, LR, LL
    #[serde(default)]
    pub corners: Option<usize>,
    /// Projection units per corner-offset unit
    #[serde(default = "default_offset_resolution")]
    pub offset_resolution: f64,
    #[serde(default)]
    pub data_version: Option<usize>,
    #[serde(default)]
    pub downloadable: Option<usize>,
    /// Per-record sensor identifier for combined-sensor datasets
    #[serde(default)]
    pub sensor_id: Option<usize>,
}

fn default_offset_resolution() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl RecordLayout {
    /// Minimum number of fields a record needs for this layout.
    pub fn min_fields(&self) -> usize {
        let mut max = self.date.max(self.ul_x).max(self.ul_y).max(self.entity_id);
        for idx in [
            self.julian_day,
            self.cloud_cover,
            self.data_version,
            self.downloadable,
            self.sensor_id,
        ]
        .into_iter()
        .flatten()
        {
            max = max.max(idx);
        }
        if let Some(&q) = self.quality.iter().max() {
            max = max.max(q);
        }
        if let Some(c) = self.corners {
            max = max.max(c + 7);
        }
        max + 1
    }
}

/// One display resolution offered for a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Projection units per display pixel
    pub pixel_size: f64,
    /// Whether this resolution shows a single cell with sub-cell panning
    #[serde(default)]
    pub single_cell: bool,
}

/// Everything the engine needs to know about one sensor's catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorProfile {
    /// Profile name, also the metadata directory name
    pub name: String,
    /// Sensor identifier assigned to records without their own
    pub sensor_id: String,
    pub layout: RecordLayout,
    pub resolutions: Vec<Resolution>,
    /// Composite every cell (multi-scene z-order) instead of the active cell only
    #[serde(default)]
    pub full_mosaic: bool,
    /// Select same-date scenes across cells as a unit
    #[serde(default)]
    pub swath_mode: bool,
    /// Rate default scenes by cloud cover
    #[serde(default = "default_true")]
    pub default_uses_cloud_cover: bool,
    /// Whether the sensor has a quality axis
    #[serde(default)]
    pub has_quality: bool,
    pub navigation: RegularGrid,
    /// Lat/long box the window center must stay inside
    #[serde(default)]
    pub bumper: Option<BoundingBox>,
    /// Projection code used when no cell offers one
    pub default_projection: ProjectionCode,
}

impl SensorProfile {
    /// Parse a profile from YAML text and validate it.
    pub fn from_yaml_str(yaml: &str) -> MosaicResult<Self> {
        let profile: SensorProfile = serde_yaml::from_str(yaml)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load and validate a single profile file.
    pub fn load(path: &Path) -> MosaicResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Load every `*.yaml`/`*.yml` profile in a directory, sorted by name.
    ///
    /// Files that fail to parse are skipped with a warning; an empty result
    /// is an error because the engine cannot run without a sensor.
    pub fn load_dir(dir: &Path) -> MosaicResult<Vec<Self>> {
        let mut profiles = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e == "yaml" || e == "yml")
                .unwrap_or(false);
            if !is_yaml {
                continue;
            }
            match Self::load(&path) {
                Ok(profile) => {
                    debug!(path = %path.display(), sensor = %profile.name, "Loaded sensor profile");
                    profiles.push(profile);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping invalid sensor profile");
                }
            }
        }
        if profiles.is_empty() {
            return Err(MosaicError::NoSensorData(format!(
                "no sensor profiles in {}",
                dir.display()
            )));
        }
        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(profiles)
    }

    /// Check the profile is usable.
    pub fn validate(&self) -> MosaicResult<()> {
        let invalid =
            |msg: &str| -> MosaicResult<()> { Err(MosaicError::invalid_profile(&self.name, msg)) };
        if self.name.trim().is_empty() {
            return invalid("name must not be empty");
        }
        if self.resolutions.is_empty() {
            return invalid("at least one resolution is required");
        }
        if self
            .resolutions
            .iter()
            .any(|r| !(r.pixel_size.is_finite() && r.pixel_size > 0.0))
        {
            return invalid("pixel sizes must be positive");
        }
        if !(self.layout.offset_resolution.is_finite() && self.layout.offset_resolution > 0.0) {
            return invalid("offset_resolution must be positive");
        }
        if let Some(bumper) = &self.bumper {
            if bumper.min_x > bumper.max_x || bumper.min_y > bumper.max_y {
                return invalid("bumper has min greater than max");
            }
        }
        self.navigation
            .validate()
            .map_err(|e| MosaicError::invalid_profile(&self.name, e))
    }

    /// Resolution at `index`, if it exists.
    pub fn resolution(&self, index: usize) -> Option<&Resolution> {
        self.resolutions.get(index)
    }

    /// Index of the resolution with this pixel size.
    pub fn resolution_index(&self, pixel_size: f64) -> Option<usize> {
        self.resolutions
            .iter()
            .position(|r| (r.pixel_size - pixel_size).abs() <= pixel_size.abs() * 1e-9)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"
name: test_sensor
sensor_id: TS
default_projection: 7
swath_mode: true
has_quality: true
layout:
  date: 0
  ul_x: 1
  ul_y: 2
  cloud_cover: 3
  entity_id: 4
  quality: [5, 6]
  corners: 7
resolutions:
  - pixel_size: 1000.0
  - pixel_size: 240.0
    single_cell: true
navigation:
  origin_lon: -179.5
  origin_lat: 89.5
  dx: 1.0
  dy: -1.0
  min_col: 0
  max_col: 359
  min_row: 0
  max_row: 179
  wrap_cols: true
"#;

    #[test]
    fn test_parse_profile_defaults() {
        let profile = SensorProfile::from_yaml_str(PROFILE).unwrap();
        assert_eq!(profile.name, "test_sensor");
        assert!(profile.swath_mode);
        assert!(!profile.full_mosaic);
        assert!(profile.default_uses_cloud_cover);
        assert_eq!(profile.layout.offset_resolution, 1.0);
        assert_eq!(profile.default_projection, ProjectionCode(7));
        assert!(profile.resolutions[1].single_cell);
        assert_eq!(profile.resolution_index(profile.resolutions[1].pixel_size), Some(1));
        assert_eq!(profile.resolution_index(12345.0), None);
    }

    #[test]
    fn test_min_fields_counts_corners() {
        let profile = SensorProfile::from_yaml_str(PROFILE).unwrap();
        // corners start at 7 and span 8 fields
        assert_eq!(profile.layout.min_fields(), 15);
    }

    #[test]
    fn test_validate_rejects_empty_resolutions() {
        let mut profile = SensorProfile::from_yaml_str(PROFILE).unwrap();
        profile.resolutions.clear();
        assert!(matches!(
            profile.validate(),
            Err(MosaicError::InvalidProfile { .. })
        ));
    }
}

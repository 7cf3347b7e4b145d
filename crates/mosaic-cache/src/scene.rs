//! A single dated observation over one grid cell.

use mosaic_common::{AcquisitionDate, BoundingBox, GridCoord, ProjectedPoint};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a scene across window reloads.
///
/// Two scenes are the same observation iff they share the grid cell and
/// entity identifier; the date alone is not unique for combined-sensor
/// datasets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SceneKey {
    pub coord: GridCoord,
    pub entity_id: String,
}

impl SceneKey {
    pub fn new(coord: GridCoord, entity_id: impl Into<String>) -> Self {
        Self {
            coord,
            entity_id: entity_id.into(),
        }
    }
}

impl fmt::Display for SceneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.entity_id, self.coord)
    }
}

/// Pixel offsets of the four scene corners relative to the upper-left
/// projected coordinate, in units of the record's offset resolution.
///
/// Corner order is upper-left, upper-right, lower-right, lower-left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CornerOffsets {
    pub samples: [i32; 4],
    pub lines: [i32; 4],
}

/// One acquisition over a grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub coord: GridCoord,
    pub sensor_id: String,
    pub date: AcquisitionDate,
    /// Cloud cover percentage, `None` when unknown
    pub cloud_cover: Option<u8>,
    /// Quality value 0-9, `None` when unknown
    pub quality: Option<u8>,
    pub entity_id: String,
    pub data_version: Option<String>,
    pub upper_left: ProjectedPoint,
    pub corners: CornerOffsets,
    /// Projection units per corner-offset unit
    pub offset_resolution: f64,
    pub downloadable: bool,
    /// Derived by the filter pipeline
    pub visible: bool,
    /// Pixel size of the raster the image loader currently holds
    pub loaded_resolution: Option<f64>,
}

impl Scene {
    pub fn key(&self) -> SceneKey {
        SceneKey::new(self.coord, self.entity_id.clone())
    }

    /// Projected-coordinate footprint spanned by the corner offsets.
    pub fn footprint(&self) -> BoundingBox {
        let res = self.offset_resolution;
        let mut bbox = BoundingBox::from_point(self.upper_left.x, self.upper_left.y);
        for i in 0..4 {
            bbox.include_point(
                self.upper_left.x + self.corners.samples[i] as f64 * res,
                // Lines grow downward while projected Y grows northward
                self.upper_left.y - self.corners.lines[i] as f64 * res,
            );
        }
        bbox
    }

    /// Larger of the footprint's width and height.
    pub fn footprint_size(&self) -> f64 {
        let bbox = self.footprint();
        bbox.width().max(bbox.height())
    }

    /// Whether this scene belongs to the same swath as `other`.
    pub fn same_swath(&self, other: &Scene) -> bool {
        self.date == other.date && self.sensor_id == other.sensor_id
    }

    /// Release the raster bookkeeping, returning whether one was held.
    pub fn take_raster(&mut self) -> bool {
        self.loaded_resolution.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> Scene {
        Scene {
            coord: GridCoord::new(10, 20),
            sensor_id: "TM".to_string(),
            date: AcquisitionDate::from_yyyymmdd(20200601).unwrap(),
            cloud_cover: Some(10),
            quality: Some(9),
            entity_id: "LT51020202020153".to_string(),
            data_version: None,
            upper_left: ProjectedPoint::new(1000.0, 5000.0),
            corners: CornerOffsets {
                samples: [0, 100, 90, -10],
                lines: [0, 10, 110, 100],
            },
            offset_resolution: 30.0,
            downloadable: true,
            visible: true,
            loaded_resolution: None,
        }
    }

    #[test]
    fn test_footprint_uses_offset_resolution() {
        let bbox = scene().footprint();
        assert_eq!(bbox.min_x, 1000.0 - 300.0);
        assert_eq!(bbox.max_x, 1000.0 + 3000.0);
        assert_eq!(bbox.max_y, 5000.0);
        assert_eq!(bbox.min_y, 5000.0 - 3300.0);
        assert_eq!(scene().footprint_size(), 3300.0);
    }

    #[test]
    fn test_key_identity_ignores_date() {
        let a = scene();
        let mut b = scene();
        b.date = AcquisitionDate::from_yyyymmdd(20210101).unwrap();
        assert_eq!(a.key(), b.key());
        assert!(!a.same_swath(&b));
    }
}

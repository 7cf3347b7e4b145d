//! Projection codes and the projection-transform contract.
//!
//! The projection math itself is supplied by the caller; the engine only
//! needs forward and inverse transforms for a given projection code.

use crate::{MosaicError, MosaicResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sensor-specific projection identifier carried in each cell record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectionCode(pub i32);

impl fmt::Display for ProjectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLong {
    pub lat: f64,
    pub lon: f64,
}

impl LatLong {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// A position in projection units (typically meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
}

impl ProjectedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Lat/long to projected-coordinate conversion for a projection code.
pub trait ProjectionTransform: Send + Sync + fmt::Debug {
    fn to_projected(&self, code: ProjectionCode, point: &LatLong) -> MosaicResult<ProjectedPoint>;

    fn to_lat_long(&self, code: ProjectionCode, point: &ProjectedPoint) -> MosaicResult<LatLong>;
}

/// Equirectangular transform that ignores the projection code.
///
/// Adequate for tests and for catalogs whose records are already in a
/// single geographic-like plane.
#[derive(Debug, Clone, Copy)]
pub struct PlateCarree {
    pub meters_per_degree: f64,
}

impl Default for PlateCarree {
    fn default() -> Self {
        Self {
            meters_per_degree: 111_320.0,
        }
    }
}

impl ProjectionTransform for PlateCarree {
    fn to_projected(&self, _code: ProjectionCode, point: &LatLong) -> MosaicResult<ProjectedPoint> {
        if !point.is_valid() {
            return Err(MosaicError::Projection(format!(
                "lat/long out of range: {}, {}",
                point.lat, point.lon
            )));
        }
        Ok(ProjectedPoint::new(
            point.lon * self.meters_per_degree,
            point.lat * self.meters_per_degree,
        ))
    }

    fn to_lat_long(&self, _code: ProjectionCode, point: &ProjectedPoint) -> MosaicResult<LatLong> {
        let ll = LatLong::new(
            point.y / self.meters_per_degree,
            point.x / self.meters_per_degree,
        );
        if !ll.is_valid() {
            return Err(MosaicError::Projection(format!(
                "projected point out of range: {}, {}",
                point.x, point.y
            )));
        }
        Ok(ll)
    }
}

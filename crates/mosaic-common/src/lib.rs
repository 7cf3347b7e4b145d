//! Common types and utilities shared across the scene-mosaic crates.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod grid;
pub mod time;

pub use bbox::BoundingBox;
pub use crs::{LatLong, PlateCarree, ProjectedPoint, ProjectionCode, ProjectionTransform};
pub use error::{MosaicError, MosaicResult};
pub use grid::{GridCoord, GridPosition, NavigationModel, RegularGrid, STEPS};
pub use time::{AcquisitionDate, YearMonth};

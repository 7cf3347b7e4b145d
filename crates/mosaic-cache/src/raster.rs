//! Contract with the image raster loader.

use crate::profile::SensorProfile;
use crate::scene::{Scene, SceneKey};
use std::fmt;

/// Loads and releases the pixel data for selected scenes.
///
/// The engine only tracks which resolution each scene was requested at;
/// the loader owns the decode buffers and must release them on `flush`.
pub trait RasterLoader: Send + Sync + fmt::Debug {
    /// Start loading rasters for `scenes`, painted bottom to top.
    fn load_images(&self, scenes: &[Scene], cell_count: usize, pixel_size: f64, profile: &SensorProfile);

    /// Abandon the current load.
    fn cancel_load(&self);

    fn is_busy(&self) -> bool;

    /// Block until the current load finishes.
    fn wait_until_done(&self);

    /// Release the raster held for a scene.
    fn flush(&self, key: &SceneKey);
}

/// A loader that holds nothing. Used when no display is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRasterLoader;

impl RasterLoader for NullRasterLoader {
    fn load_images(&self, _scenes: &[Scene], _cell_count: usize, _pixel_size: f64, _profile: &SensorProfile) {}

    fn cancel_load(&self) {}

    fn is_busy(&self) -> bool {
        false
    }

    fn wait_until_done(&self) {}

    fn flush(&self, _key: &SceneKey) {}
}

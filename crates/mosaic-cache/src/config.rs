//! Configuration for the mosaic engine.

use serde::{Deserialize, Serialize};

/// Configuration for the navigation controller and loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MosaicConfig {
    /// Window width in cells (odd).
    pub window_width: usize,

    /// Window height in cells (odd).
    pub window_height: usize,

    /// Number of explicit selections remembered per sensor.
    pub date_cache_capacity: usize,

    /// Index into the sensor's resolution list used at startup.
    pub initial_resolution: usize,

    /// Move every swath member to the top of the stack when a swath is built.
    pub swath_to_top: bool,

    /// Keep the stacking order of surviving cells across scrolls.
    pub preserve_order_on_scroll: bool,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            window_width: 3,
            window_height: 3,
            date_cache_capacity: 20,
            initial_resolution: 0,
            swath_to_top: true,
            preserve_order_on_scroll: true,
        }
    }
}

impl MosaicConfig {
    /// Load configuration from `MOSAIC_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("MOSAIC_WINDOW_WIDTH") {
            if let Ok(width) = val.parse() {
                config.window_width = width;
            }
        }

        if let Ok(val) = std::env::var("MOSAIC_WINDOW_HEIGHT") {
            if let Ok(height) = val.parse() {
                config.window_height = height;
            }
        }

        if let Ok(val) = std::env::var("MOSAIC_DATE_CACHE_CAPACITY") {
            if let Ok(capacity) = val.parse() {
                config.date_cache_capacity = capacity;
            }
        }

        if let Ok(val) = std::env::var("MOSAIC_INITIAL_RESOLUTION") {
            if let Ok(index) = val.parse() {
                config.initial_resolution = index;
            }
        }

        if let Ok(val) = std::env::var("MOSAIC_SWATH_TO_TOP") {
            config.swath_to_top = parse_bool(&val);
        }

        if let Ok(val) = std::env::var("MOSAIC_PRESERVE_ORDER") {
            config.preserve_order_on_scroll = parse_bool(&val);
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.window_width == 0 || self.window_width % 2 == 0 {
            return Err("window_width must be odd".to_string());
        }

        if self.window_height == 0 || self.window_height % 2 == 0 {
            return Err("window_height must be odd".to_string());
        }

        if self.date_cache_capacity == 0 {
            return Err("date_cache_capacity must be > 0".to_string());
        }

        Ok(())
    }

    pub fn slot_count(&self) -> usize {
        self.window_width * self.window_height
    }
}

fn parse_bool(val: &str) -> bool {
    val.eq_ignore_ascii_case("true") || val == "1"
}

//! Default scene selection and the recent-selection date cache.

use crate::cell::Cell;
use crate::profile::SensorProfile;
use crate::scene::{Scene, SceneKey};
use lru::LruCache;
use mosaic_common::GridCoord;
use std::num::NonZeroUsize;
use tracing::debug;

pub const CLOUD_COVER_WEIGHT: u32 = 1;
/// Larger than any cloud-cover term, so quality always dominates.
pub const QUALITY_WEIGHT: u32 = 101;
/// Rating input for unknown cloud cover (worse than 100%).
pub const UNKNOWN_CLOUD_COVER: u32 = 101;
/// Rating input for unknown quality.
pub const UNKNOWN_QUALITY: u32 = 9;
pub const MAX_QUALITY: u32 = 9;

/// Rating of a scene as a default candidate; lower is better.
///
/// `rating = CLOUD_COVER_WEIGHT * cloud + QUALITY_WEIGHT * (9 - quality)`.
/// The cloud term is dropped for sensors that do not rate by cloud cover
/// and the quality term for sensors without a quality axis.
pub fn rating(scene: &Scene, profile: &SensorProfile) -> u32 {
    let cloud = if profile.default_uses_cloud_cover {
        scene
            .cloud_cover
            .map(u32::from)
            .unwrap_or(UNKNOWN_CLOUD_COVER)
    } else {
        0
    };
    let quality = if profile.has_quality {
        scene
            .quality
            .map(u32::from)
            .unwrap_or(UNKNOWN_QUALITY)
            .min(MAX_QUALITY)
    } else {
        MAX_QUALITY
    };
    CLOUD_COVER_WEIGHT * cloud + QUALITY_WEIGHT * (MAX_QUALITY - quality)
}

/// Index of the best default scene in a cell.
///
/// Scans newest to oldest so ties go to the newest scene. Visible scenes
/// win; if none is visible the best invisible scene is used so a cell with
/// any scene always has a selection.
pub fn pick_default(cell: &Cell, profile: &SensorProfile) -> Option<usize> {
    let mut best_visible: Option<(u32, usize)> = None;
    let mut best_any: Option<(u32, usize)> = None;

    for (index, scene) in cell.scenes().iter().enumerate().rev() {
        let r = rating(scene, profile);
        if best_any.map(|(b, _)| r < b).unwrap_or(true) {
            best_any = Some((r, index));
        }
        if scene.visible && best_visible.map(|(b, _)| r < b).unwrap_or(true) {
            best_visible = Some((r, index));
        }
    }

    best_visible.or(best_any).map(|(_, index)| index)
}

/// Recently made explicit selections, keyed by grid cell.
///
/// Lets the user step across cell boundaries and come back without losing
/// a deliberate choice that differs from the default.
#[derive(Debug)]
pub struct DateCache {
    entries: LruCache<GridCoord, String>,
}

impl DateCache {
    pub const DEFAULT_CAPACITY: usize = 20;

    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Remember an explicit selection.
    pub fn record(&mut self, key: &SceneKey) {
        self.entries.put(key.coord, key.entity_id.clone());
    }

    /// Entity previously chosen for a cell.
    pub fn lookup(&mut self, coord: GridCoord) -> Option<&str> {
        self.entries.get(&coord).map(String::as_str)
    }

    pub fn forget(&mut self, coord: GridCoord) {
        self.entries.pop(&coord);
    }

    /// Evict every entry (sensor switch).
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DateCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

/// Outcome of resolving one cell's selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    pub previous: Option<SceneKey>,
    pub current: Option<SceneKey>,
    /// Raster of the previous selection that must be flushed
    pub flushed: Option<SceneKey>,
}

impl SelectionChange {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Ensure a cell has a sensible selection.
///
/// A visible current selection is kept. Otherwise the date cache is
/// consulted, then the rating scan.
pub fn resolve_selection(
    cell: &mut Cell,
    cache: &mut DateCache,
    profile: &SensorProfile,
) -> SelectionChange {
    let previous = cell.current_key();
    if !cell.valid || cell.is_empty() {
        let flushed = cell.set_current(None);
        return SelectionChange {
            previous,
            current: None,
            flushed,
        };
    }
    if cell.current_is_visible() {
        return SelectionChange {
            current: previous.clone(),
            previous,
            flushed: None,
        };
    }

    let cached = cache
        .lookup(cell.coord)
        .and_then(|entity| cell.find_entity(entity))
        .filter(|&i| cell.scene(i).map(|s| s.visible).unwrap_or(false));

    let index = match cached {
        Some(i) => {
            debug!(coord = %cell.coord, index = i, "Restored selection from date cache");
            Some(i)
        }
        None => pick_default(cell, profile),
    };

    let flushed = cell.set_current(index);
    SelectionChange {
        previous,
        current: cell.current_key(),
        flushed,
    }
}

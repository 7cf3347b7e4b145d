//! Scene visibility filters.
//!
//! A scene is visible iff every active predicate accepts it. Each pass
//! recomputes `visible` from the scene's raw attributes, so applying the
//! same criteria twice yields the same flags.

use crate::cell::Cell;
use crate::profile::SensorProfile;
use crate::scene::{Scene, SceneKey};
use mosaic_common::YearMonth;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Geometric containment test against a user-drawn area.
///
/// Implemented by the drawing collaborator.
pub trait AreaSelector: Send + Sync + fmt::Debug {
    fn contains(&self, scene: &Scene) -> bool;
}

/// The predicate that rejected a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    CloudCover,
    DateRange,
    Quality,
    DataVersion,
    SceneList,
    NotDownloadable,
    GridRange,
    OutsideArea,
    Hidden,
}

/// User-adjustable filter parameters.
#[derive(Debug, Clone)]
pub struct FilterCriteria {
    /// Maximum cloud cover; 100 also admits unknown cloud cover
    pub max_cloud_cover: u8,
    pub start: YearMonth,
    pub end: YearMonth,
    /// Minimum quality, skipped for sensors without a quality axis
    pub min_quality: u8,
    /// Required data version, `None` for all versions
    pub data_version: Option<String>,
    pub scene_list: HashSet<SceneKey>,
    /// Restrict to members of `scene_list`
    pub scene_list_only: bool,
    pub downloadable_only: bool,
    /// Inclusive grid column sub-range
    pub col_range: Option<(i32, i32)>,
    /// Inclusive grid row sub-range
    pub row_range: Option<(i32, i32)>,
    pub area: Option<Arc<dyn AreaSelector>>,
    pub hidden: HashSet<SceneKey>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            max_cloud_cover: 100,
            start: YearMonth::new(1970, 1),
            end: YearMonth::new(9999, 12),
            min_quality: 0,
            data_version: None,
            scene_list: HashSet::new(),
            scene_list_only: false,
            downloadable_only: false,
            col_range: None,
            row_range: None,
            area: None,
            hidden: HashSet::new(),
        }
    }
}

impl FilterCriteria {
    /// The first predicate that rejects `scene`, or `None` if it is visible.
    pub fn rejection(&self, scene: &Scene, profile: &SensorProfile) -> Option<FilterReason> {
        let cloud_ok = match scene.cloud_cover {
            Some(cc) => cc <= self.max_cloud_cover,
            None => self.max_cloud_cover >= 100,
        };
        if !cloud_ok {
            return Some(FilterReason::CloudCover);
        }

        if !YearMonth::range_contains(self.start, self.end, &scene.date) {
            return Some(FilterReason::DateRange);
        }

        // Unknown quality rates as the top value, so it never fails here
        if profile.has_quality && scene.quality.unwrap_or(9) < self.min_quality {
            return Some(FilterReason::Quality);
        }

        if let Some(version) = &self.data_version {
            if scene.data_version.as_deref() != Some(version.as_str()) {
                return Some(FilterReason::DataVersion);
            }
        }

        if self.scene_list_only && !self.scene_list.contains(&scene.key()) {
            return Some(FilterReason::SceneList);
        }

        if self.downloadable_only && !scene.downloadable {
            return Some(FilterReason::NotDownloadable);
        }

        let in_range = |range: Option<(i32, i32)>, v: i32| {
            range.map(|(lo, hi)| v >= lo && v <= hi).unwrap_or(true)
        };
        if !in_range(self.col_range, scene.coord.col) || !in_range(self.row_range, scene.coord.row)
        {
            return Some(FilterReason::GridRange);
        }

        if let Some(area) = &self.area {
            if !area.contains(scene) {
                return Some(FilterReason::OutsideArea);
            }
        }

        if self.hidden.contains(&scene.key()) {
            return Some(FilterReason::Hidden);
        }

        None
    }

    pub fn accepts(&self, scene: &Scene, profile: &SensorProfile) -> bool {
        self.rejection(scene, profile).is_none()
    }

    /// Recompute `visible` for every scene in every cell.
    ///
    /// Returns the number of visible scenes.
    pub fn apply(&self, cells: &mut [Cell], profile: &SensorProfile) -> usize {
        let mut visible = 0;
        for cell in cells.iter_mut() {
            for scene in cell.scenes_mut() {
                scene.visible = self.accepts(scene, profile);
                if scene.visible {
                    visible += 1;
                }
            }
        }
        visible
    }
}

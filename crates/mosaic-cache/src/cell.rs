//! Per-grid-cell container of scene metadata (the cell's table of contents).

use crate::scene::{Scene, SceneKey};
use mosaic_common::{AcquisitionDate, BoundingBox, GridCoord, ProjectionCode};

/// Direction for stepping through a cell's dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStep {
    Newer,
    Older,
}

/// All known scenes over one grid cell plus the cell's selection state.
///
/// Scenes are kept ordered oldest to newest; date lookups rely on it.
#[derive(Debug, Clone)]
pub struct Cell {
    pub coord: GridCoord,
    pub projection: Option<ProjectionCode>,
    scenes: Vec<Scene>,
    current: Option<usize>,
    /// True only after a successful, non-cancelled load
    pub valid: bool,
    pub has_lines: bool,
    pub has_metrics: bool,
    /// Union of the scene footprints in projection units
    pub extent: Option<BoundingBox>,
    pub max_footprint: f64,
}

impl Cell {
    /// A placeholder for a window slot that has not been loaded.
    pub fn invalid(coord: GridCoord) -> Self {
        Self {
            coord,
            projection: None,
            scenes: Vec::new(),
            current: None,
            valid: false,
            has_lines: false,
            has_metrics: false,
            extent: None,
            max_footprint: 0.0,
        }
    }

    /// A loaded cell. Scenes are sorted oldest to newest (stable, so
    /// same-date scenes keep record order).
    pub fn loaded(
        coord: GridCoord,
        projection: ProjectionCode,
        mut scenes: Vec<Scene>,
        has_lines: bool,
        has_metrics: bool,
    ) -> Self {
        scenes.sort_by_key(|s| s.date);
        let mut cell = Self {
            coord,
            projection: Some(projection),
            scenes,
            current: None,
            valid: true,
            has_lines,
            has_metrics,
            extent: None,
            max_footprint: 0.0,
        };
        cell.recompute_extent();
        cell
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn scenes_mut(&mut self) -> &mut [Scene] {
        &mut self.scenes
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn scene(&self, index: usize) -> Option<&Scene> {
        self.scenes.get(index)
    }

    /// Index of the selected observation.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        self.current.and_then(|i| self.scenes.get(i))
    }

    pub fn current_key(&self) -> Option<SceneKey> {
        self.current_scene().map(Scene::key)
    }

    /// Whether the selection exists and passes the filters.
    pub fn current_is_visible(&self) -> bool {
        self.current_scene().map(|s| s.visible).unwrap_or(false)
    }

    /// Change the selection.
    ///
    /// Returns the key of the previously selected scene when its raster
    /// must be flushed because the selection moved away from it.
    pub fn set_current(&mut self, index: Option<usize>) -> Option<SceneKey> {
        let index = index.filter(|&i| i < self.scenes.len());
        if index == self.current {
            return None;
        }
        let previous = std::mem::replace(&mut self.current, index);
        previous.and_then(|i| {
            let scene = &mut self.scenes[i];
            scene.take_raster().then(|| scene.key())
        })
    }

    pub fn find_entity(&self, entity_id: &str) -> Option<usize> {
        self.scenes.iter().position(|s| s.entity_id == entity_id)
    }

    /// First index whose date equals `date`.
    pub fn find_date(&self, date: AcquisitionDate) -> Option<usize> {
        let start = self.scenes.partition_point(|s| s.date < date);
        (start < self.scenes.len() && self.scenes[start].date == date).then_some(start)
    }

    /// Adjacent visible scene from `from` in the given direction.
    pub fn step_visible(&self, from: usize, step: DateStep) -> Option<usize> {
        match step {
            DateStep::Newer => (from + 1..self.scenes.len()).find(|&i| self.scenes[i].visible),
            DateStep::Older => (0..from.min(self.scenes.len())).rev().find(|&i| self.scenes[i].visible),
        }
    }

    /// Drop all scenes and mark the cell invalid.
    ///
    /// Returns the keys of scenes whose rasters must be flushed.
    pub fn release(&mut self) -> Vec<SceneKey> {
        let flushed = self
            .scenes
            .iter_mut()
            .filter_map(|s| s.take_raster().then(|| s.key()))
            .collect();
        self.scenes.clear();
        self.current = None;
        self.valid = false;
        self.extent = None;
        self.max_footprint = 0.0;
        flushed
    }

    fn recompute_extent(&mut self) {
        self.extent = None;
        self.max_footprint = 0.0;
        for scene in &self.scenes {
            let footprint = scene.footprint();
            self.extent = Some(match self.extent {
                Some(extent) => extent.union(&footprint),
                None => footprint,
            });
            self.max_footprint = self.max_footprint.max(scene.footprint_size());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::CornerOffsets;
    use mosaic_common::ProjectedPoint;

    fn scene(date: u32, entity: &str, visible: bool) -> Scene {
        Scene {
            coord: GridCoord::new(1, 2),
            sensor_id: "TM".to_string(),
            date: AcquisitionDate::from_yyyymmdd(date).unwrap(),
            cloud_cover: Some(0),
            quality: Some(9),
            entity_id: entity.to_string(),
            data_version: None,
            upper_left: ProjectedPoint::new(0.0, 0.0),
            corners: CornerOffsets::default(),
            offset_resolution: 1.0,
            downloadable: true,
            visible,
            loaded_resolution: None,
        }
    }

    fn cell() -> Cell {
        Cell::loaded(
            GridCoord::new(1, 2),
            ProjectionCode(5),
            vec![
                scene(20201201, "c", true),
                scene(20200101, "a", true),
                scene(20200601, "b", false),
            ],
            true,
            true,
        )
    }

    #[test]
    fn test_loaded_sorts_oldest_first() {
        let cell = cell();
        let ids: Vec<_> = cell.scenes().iter().map(|s| s.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(cell.valid);
    }

    #[test]
    fn test_find_date() {
        let cell = cell();
        let date = AcquisitionDate::from_yyyymmdd(20200601).unwrap();
        assert_eq!(cell.find_date(date), Some(1));
        let missing = AcquisitionDate::from_yyyymmdd(20200602).unwrap();
        assert_eq!(cell.find_date(missing), None);
    }

    #[test]
    fn test_step_visible_skips_hidden() {
        let cell = cell();
        assert_eq!(cell.step_visible(0, DateStep::Newer), Some(2));
        assert_eq!(cell.step_visible(2, DateStep::Older), Some(0));
        assert_eq!(cell.step_visible(0, DateStep::Older), None);
    }

    #[test]
    fn test_set_current_reports_flush() {
        let mut cell = cell();
        assert_eq!(cell.set_current(Some(0)), None);
        cell.scenes_mut()[0].loaded_resolution = Some(240.0);
        let flushed = cell.set_current(Some(2));
        assert_eq!(flushed, Some(SceneKey::new(GridCoord::new(1, 2), "a")));
        assert_eq!(cell.scenes()[0].loaded_resolution, None);
        // Same selection again is a no-op
        assert_eq!(cell.set_current(Some(2)), None);
    }

    #[test]
    fn test_release_invalidates() {
        let mut cell = cell();
        cell.set_current(Some(0));
        cell.scenes_mut()[2].loaded_resolution = Some(30.0);
        let flushed = cell.release();
        assert_eq!(flushed, vec![SceneKey::new(GridCoord::new(1, 2), "c")]);
        assert!(!cell.valid);
        assert!(cell.is_empty());
        assert_eq!(cell.current_index(), None);
    }
}

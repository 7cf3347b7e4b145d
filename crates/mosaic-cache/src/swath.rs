//! Grouping of same-date, same-sensor scenes across cells.

use crate::cell::Cell;
use crate::scene::{Scene, SceneKey};
use mosaic_common::AcquisitionDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Identity shared by every member of a swath.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwathKey {
    pub date: AcquisitionDate,
    pub sensor_id: String,
}

impl SwathKey {
    pub fn of(scene: &Scene) -> Self {
        Self {
            date: scene.date,
            sensor_id: scene.sensor_id.clone(),
        }
    }

    pub fn matches(&self, scene: &Scene) -> bool {
        scene.date == self.date && scene.sensor_id == self.sensor_id
    }
}

/// Result of building a swath over the window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Swath {
    /// Members ordered top to bottom by projected upper-left Y
    pub members: Vec<SceneKey>,
    /// Members that replaced a cell's previous selection
    pub changed: Vec<(SceneKey, SceneKey)>,
    /// Rasters of replaced selections that must be flushed
    pub flushed: Vec<SceneKey>,
}

impl Swath {
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Select the swath identified by `key` in every valid cell.
///
/// Each cell contributes its first visible scene matching the key and that
/// scene becomes the cell's selection. Cells without a match keep their
/// selection.
pub fn build_swath(cells: &mut [Cell], key: &SwathKey) -> Swath {
    let mut swath = Swath::default();
    // (upper-left Y, key) kept sorted north to south; equal Y keeps
    // insertion order
    let mut ordered: Vec<(f64, SceneKey)> = Vec::new();

    for cell in cells.iter_mut().filter(|c| c.valid) {
        let Some(index) = cell.find_date(key.date).and_then(|first| {
            cell.scenes()[first..]
                .iter()
                .take_while(|s| s.date == key.date)
                .position(|s| s.visible && key.matches(s))
                .map(|offset| first + offset)
        }) else {
            continue;
        };

        let member = cell.scenes()[index].key();
        let ul_y = cell.scenes()[index].upper_left.y;
        let previous = cell.current_key();
        if let Some(flushed) = cell.set_current(Some(index)) {
            swath.flushed.push(flushed);
        }
        if let Some(previous) = previous.filter(|p| *p != member) {
            swath.changed.push((previous, member.clone()));
        }

        let at = ordered
            .iter()
            .position(|(y, _)| y.partial_cmp(&ul_y) == Some(Ordering::Less))
            .unwrap_or(ordered.len());
        ordered.insert(at, (ul_y, member));
    }

    swath.members = ordered.into_iter().map(|(_, k)| k).collect();
    swath
}

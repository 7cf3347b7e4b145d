//! Paint order of the currently selected scenes.

use crate::scene::SceneKey;
use mosaic_common::GridCoord;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How many entries the stack tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackMode {
    /// At most one entry: the current scene of the active cell
    Single,
    /// One entry per cell, ordered by recency of selection
    Multi,
}

/// Ordered scene keys, bottom (index 0) to top (last).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZOrderStack {
    mode: StackMode,
    entries: Vec<SceneKey>,
}

impl ZOrderStack {
    pub fn new(mode: StackMode) -> Self {
        Self {
            mode,
            entries: Vec::new(),
        }
    }

    pub fn mode(&self) -> StackMode {
        self.mode
    }

    /// Switch modes; the stack is emptied.
    pub fn set_mode(&mut self, mode: StackMode) {
        self.mode = mode;
        self.entries.clear();
    }

    /// Move or insert `key` at the front.
    pub fn put_on_top(&mut self, key: SceneKey) {
        match self.mode {
            StackMode::Single => self.entries.clear(),
            StackMode::Multi => self.remove_cell(key.coord),
        }
        self.entries.push(key);
    }

    /// Move or insert `key` at the back.
    ///
    /// In single mode this only fills an empty stack.
    pub fn put_on_bottom(&mut self, key: SceneKey) {
        match self.mode {
            StackMode::Single => {
                if self.entries.is_empty() {
                    self.entries.push(key);
                }
            }
            StackMode::Multi => {
                self.remove_cell(key.coord);
                self.entries.insert(0, key);
            }
        }
    }

    /// Replace `old` with `new` keeping its height.
    ///
    /// Both keys must belong to the same cell. When `old` is not present
    /// the new key goes on top.
    pub fn change_scene(&mut self, old: &SceneKey, new: SceneKey) {
        if old.coord != new.coord {
            warn!(bug = true, old = %old, new = %new, "change_scene across cells");
            self.put_on_top(new);
            return;
        }
        match self.entries.iter().position(|k| k == old) {
            Some(pos) => self.entries[pos] = new,
            None => self.put_on_top(new),
        }
    }

    pub fn remove(&mut self, key: &SceneKey) -> bool {
        let before = self.entries.len();
        self.entries.retain(|k| k != key);
        self.entries.len() != before
    }

    pub fn remove_cell(&mut self, coord: GridCoord) {
        self.entries.retain(|k| k.coord != coord);
    }

    pub fn contains(&self, key: &SceneKey) -> bool {
        self.entries.contains(key)
    }

    /// Frontmost entry.
    pub fn top(&self) -> Option<&SceneKey> {
        self.entries.last()
    }

    pub fn bottom(&self) -> Option<&SceneKey> {
        self.entries.first()
    }

    /// Entries from the back to the front (paint order).
    pub fn iter_bottom_up(&self) -> impl DoubleEndedIterator<Item = &SceneKey> {
        self.entries.iter()
    }

    /// Entries from the front to the back (hit-test order).
    pub fn iter_top_down(&self) -> impl DoubleEndedIterator<Item = &SceneKey> {
        self.entries.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn empty(&mut self) {
        self.entries.clear();
    }

    /// Snapshot of the entries, bottom to top.
    pub fn entries(&self) -> Vec<SceneKey> {
        self.entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(col: i32, entity: &str) -> SceneKey {
        SceneKey::new(GridCoord::new(col, 0), entity)
    }

    #[test]
    fn test_multi_one_entry_per_cell() {
        let mut stack = ZOrderStack::new(StackMode::Multi);
        stack.put_on_top(key(1, "a"));
        stack.put_on_top(key(2, "b"));
        stack.put_on_top(key(1, "c"));
        let ids: Vec<_> = stack.iter_bottom_up().map(|k| k.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_change_scene_keeps_height() {
        let mut stack = ZOrderStack::new(StackMode::Multi);
        stack.put_on_top(key(1, "a"));
        stack.put_on_top(key(2, "b"));
        stack.put_on_top(key(3, "c"));
        stack.change_scene(&key(1, "a"), key(1, "a2"));
        assert_eq!(stack.bottom(), Some(&key(1, "a2")));
        assert_eq!(stack.top(), Some(&key(3, "c")));
    }

    #[test]
    fn test_put_on_bottom() {
        let mut stack = ZOrderStack::new(StackMode::Multi);
        stack.put_on_top(key(1, "a"));
        stack.put_on_top(key(2, "b"));
        stack.put_on_bottom(key(2, "b"));
        let ids: Vec<_> = stack.iter_top_down().map(|k| k.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_single_mode_holds_one() {
        let mut stack = ZOrderStack::new(StackMode::Single);
        stack.put_on_top(key(1, "a"));
        stack.put_on_top(key(2, "b"));
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.top(), Some(&key(2, "b")));
        stack.put_on_bottom(key(3, "c"));
        assert_eq!(stack.top(), Some(&key(2, "b")));
    }

    #[test]
    fn test_change_scene_missing_goes_on_top() {
        let mut stack = ZOrderStack::new(StackMode::Multi);
        stack.put_on_top(key(1, "a"));
        stack.change_scene(&key(2, "x"), key(2, "y"));
        assert_eq!(stack.top(), Some(&key(2, "y")));
        assert_eq!(stack.len(), 2);
    }
}

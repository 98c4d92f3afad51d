//! Dirty tracking for mesh and shape rebuilds.

use std::collections::HashSet;

use crate::engine_state::voxels::region::RegionPos;

/// Tracks which regions need their mesh and shape rebuilt.
///
/// Uses a HashSet for automatic deduplication - multiple edits to
/// the same region only result in one rebuild.
#[derive(Clone, Debug, Default)]
pub struct DirtyTracker {
    dirty_regions: HashSet<RegionPos>,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self {
            dirty_regions: HashSet::new(),
        }
    }

    /// Mark a single region as dirty.
    ///
    /// Returns true if the region was not already dirty.
    pub fn mark_dirty(&mut self, pos: RegionPos) -> bool {
        self.dirty_regions.insert(pos)
    }

    /// Mark several regions, e.g. an edited region and the neighbours that
    /// share the edited boundary.
    pub fn mark_many(&mut self, positions: impl IntoIterator<Item = RegionPos>) {
        self.dirty_regions.extend(positions);
    }

    pub fn is_dirty(&self, pos: RegionPos) -> bool {
        self.dirty_regions.contains(&pos)
    }

    pub fn has_dirty(&self) -> bool {
        !self.dirty_regions.is_empty()
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty_regions.len()
    }

    /// Take all dirty regions (clears the set).
    pub fn take_dirty(&mut self) -> HashSet<RegionPos> {
        std::mem::take(&mut self.dirty_regions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tracker_is_empty() {
        let tracker = DirtyTracker::new();
        assert!(!tracker.has_dirty());
        assert_eq!(tracker.dirty_count(), 0);
    }

    #[test]
    fn deduplication() {
        let mut tracker = DirtyTracker::new();
        let pos = RegionPos::new(5, 5, 5);

        assert!(tracker.mark_dirty(pos));
        for _ in 0..10 {
            assert!(!tracker.mark_dirty(pos));
        }
        assert_eq!(tracker.dirty_count(), 1);
        assert!(tracker.is_dirty(pos));
    }

    #[test]
    fn take_dirty_clears_set() {
        let mut tracker = DirtyTracker::new();
        tracker.mark_many([RegionPos::new(1, 1, 1), RegionPos::new(2, 2, 2), RegionPos::new(1, 1, 1)]);

        let taken = tracker.take_dirty();
        assert_eq!(taken.len(), 2);
        assert!(!tracker.has_dirty());
    }
}

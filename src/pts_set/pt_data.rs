// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

use super::points_to::{HybridPointsToSet, PointsToSet};
use crate::util::{Idx, IndexVec};

/// Points-to sets for all pointers, stored side by side and keyed by the
/// dense pointer handle.
///
/// K (Key):  the pointer owning a points-to set.
/// D (Data): elements of points-to sets.
pub struct PointsToData<K: Idx, D: Idx> {
    sets: IndexVec<K, HybridPointsToSet<D>>,
}

impl<K: Idx, D: Idx> fmt::Debug for PointsToData<K, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "PointsToData".fmt(f)
    }
}

impl<K: Idx, D: Idx> PointsToData<K, D> {
    pub fn new() -> Self {
        PointsToData {
            sets: IndexVec::new(),
        }
    }

    /// Get the points-to set of a pointer. Pointers never written to are
    /// indistinguishable from pointers with an empty set.
    #[inline]
    pub fn pts(&self, pointer: K) -> Option<&HybridPointsToSet<D>> {
        self.sets.get(pointer).filter(|pts| !pts.is_empty())
    }

    #[inline]
    pub fn pts_mut(&mut self, pointer: K) -> &mut HybridPointsToSet<D> {
        self.sets.ensure_contains(pointer, HybridPointsToSet::new);
        &mut self.sets[pointer]
    }

    #[inline]
    pub fn contains(&self, pointer: K, elem: D) -> bool {
        self.pts(pointer).map_or(false, |pts| pts.contains(elem))
    }

    /// Performs pts(pointer) = pts(pointer) U set, returns true on growth.
    pub fn union_to(&mut self, pointer: K, set: &HybridPointsToSet<D>) -> bool {
        self.pts_mut(pointer).union(set)
    }

    /// Total number of (pointer, object) entries.
    pub fn total_entries(&self) -> usize {
        self.sets.iter().map(|pts| pts.count()).sum()
    }

    /// Iterates all non-empty points-to sets in pointer-handle order.
    pub fn iter_non_empty(&self) -> impl Iterator<Item = (K, &HybridPointsToSet<D>)> {
        self.sets
            .iter_enumerated()
            .filter(|(_, pts)| !pts.is_empty())
    }
}

impl<K: Idx, D: Idx> Default for PointsToData<K, D> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn union_reports_growth() {
        let mut data: PointsToData<u32, u32> = PointsToData::new();
        let mut set = HybridPointsToSet::new();
        set.insert(1);
        set.insert(2);
        assert!(data.union_to(0, &set));
        assert!(!data.union_to(0, &set));
        assert!(data.contains(0, 1));
        assert!(!data.contains(0, 3));
        assert_eq!(data.total_entries(), 2);
    }

    #[test]
    fn unwritten_pointer_has_no_set() {
        let data: PointsToData<u32, u32> = PointsToData::new();
        assert!(data.pts(5).is_none());
    }
}

// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;
use std::slice;

use arrayvec::ArrayVec;
use indexmap::IndexSet;

use crate::util::Idx;

const SMALL_SET_CAPACITY: usize = 16;

pub trait PointsToSet<T> {
    type Iter<'a>: Iterator<Item = T>
    where
        Self: 'a;

    fn new() -> Self;
    fn count(&self) -> usize;
    fn contains(&self, elem: T) -> bool;
    fn is_empty(&self) -> bool;
    fn superset(&self, other: &Self) -> bool;
    fn insert(&mut self, elem: T) -> bool;
    fn union(&mut self, other: &Self) -> bool;
    fn subtract(&mut self, other: &Self) -> bool;
    fn iter<'a>(&'a self) -> Self::Iter<'a>;
}

/// Hybrid implementation of points-to set, which uses a small inline array
/// for small sets and spills into an insertion-ordered hash set once the
/// inline capacity is exceeded. Iteration order is the insertion order in
/// both representations.
#[derive(Clone)]
pub struct HybridPointsToSet<T> {
    points_to: HybridSet<T>,
}

impl<T: Idx> fmt::Debug for HybridPointsToSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.points_to.fmt(f)
    }
}

impl<T: Idx> PartialEq for HybridPointsToSet<T> {
    /// Equality by membership, irrespective of representation and order.
    fn eq(&self, other: &Self) -> bool {
        self.count() == other.count() && self.iter().all(|elem| other.contains(elem))
    }
}

impl<T: Idx> Eq for HybridPointsToSet<T> {}

/// IntoIterator
impl<'a, T: Idx> IntoIterator for &'a HybridPointsToSet<T> {
    type Item = T;
    type IntoIter = HybridIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Idx> HybridPointsToSet<T> {
    /// Creates a set holding a single element.
    pub fn singleton(elem: T) -> Self {
        let mut set = Self::new();
        set.insert(elem);
        set
    }
}

impl<T: Idx> Default for HybridPointsToSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Idx> PointsToSet<T> for HybridPointsToSet<T> {
    fn new() -> Self {
        HybridPointsToSet {
            points_to: HybridSet::new(),
        }
    }

    /// Count the number of elements in the set.
    fn count(&self) -> usize {
        self.points_to.count()
    }

    /// Returns `true` if `self` contains `elem`.
    fn contains(&self, elem: T) -> bool {
        self.points_to.contains(elem)
    }

    fn is_empty(&self) -> bool {
        self.points_to.is_empty()
    }

    /// Is `self` a superset of `other`?
    fn superset(&self, other: &HybridPointsToSet<T>) -> bool {
        other.iter().all(|elem| self.contains(elem))
    }

    /// Adds `elem` to this set, returns true if it was not already present.
    fn insert(&mut self, elem: T) -> bool {
        self.points_to.insert(elem)
    }

    fn union(&mut self, other: &HybridPointsToSet<T>) -> bool {
        let mut changed = false;
        for elem in other.iter() {
            changed |= self.insert(elem);
        }
        changed
    }

    fn subtract(&mut self, other: &HybridPointsToSet<T>) -> bool {
        self.points_to.retain_not_in(&other.points_to)
    }

    type Iter<'a> = HybridIter<'a, T>;
    fn iter(&self) -> HybridIter<'_, T> {
        self.points_to.iter()
    }
}

#[derive(Clone)]
enum HybridSet<T> {
    SmallSet(ArrayVec<T, SMALL_SET_CAPACITY>),
    LargeSet(IndexSet<T>),
}

impl<T: Idx> fmt::Debug for HybridSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: Idx> HybridSet<T> {
    fn new() -> Self {
        HybridSet::SmallSet(ArrayVec::new())
    }

    fn count(&self) -> usize {
        match self {
            HybridSet::SmallSet(small) => small.len(),
            HybridSet::LargeSet(large) => large.len(),
        }
    }

    fn contains(&self, elem: T) -> bool {
        match self {
            HybridSet::SmallSet(small) => small.contains(&elem),
            HybridSet::LargeSet(large) => large.contains(&elem),
        }
    }

    fn is_empty(&self) -> bool {
        self.count() == 0
    }

    fn insert(&mut self, elem: T) -> bool {
        match self {
            HybridSet::SmallSet(small) if small.contains(&elem) => false,
            HybridSet::SmallSet(small) if !small.is_full() => {
                small.push(elem);
                true
            }
            HybridSet::SmallSet(small) => {
                // The inline buffer is full, spill into a large set.
                let mut large: IndexSet<T> = small.iter().copied().collect();
                let changed = large.insert(elem);
                *self = HybridSet::LargeSet(large);
                changed
            }
            HybridSet::LargeSet(large) => large.insert(elem),
        }
    }

    /// Removes every element contained in `other`, keeping the relative
    /// order of the survivors.
    fn retain_not_in(&mut self, other: &HybridSet<T>) -> bool {
        let mut changed = false;
        match self {
            HybridSet::SmallSet(small) => {
                small.retain(|elem| {
                    let drop = other.contains(*elem);
                    changed |= drop;
                    !drop
                });
            }
            HybridSet::LargeSet(large) => {
                large.retain(|elem| {
                    let drop = other.contains(*elem);
                    changed |= drop;
                    !drop
                });
            }
        }
        changed
    }

    fn iter(&self) -> HybridIter<'_, T> {
        match self {
            HybridSet::SmallSet(small) => HybridIter::SmallIter(small.iter()),
            HybridSet::LargeSet(large) => HybridIter::LargeIter(large.iter()),
        }
    }
}

pub enum HybridIter<'a, T: Idx> {
    SmallIter(slice::Iter<'a, T>),
    LargeIter(indexmap::set::Iter<'a, T>),
}

impl<'a, T: Idx> Iterator for HybridIter<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        match self {
            HybridIter::SmallIter(small) => small.next().copied(),
            HybridIter::LargeIter(large) => large.next().copied(),
        }
    }
}

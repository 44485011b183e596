// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Indexed set over small non-negative integers.
//!
//! `dense` holds the members in insertion order (until a removal swaps the
//! tail into the hole), `sparse[value]` holds the member's position in `dense`.
//! All three operations are O(1). Iterating while removing is only safe when
//! walking `dense` back to front.

/// Keys that can address a slot in the sparse array.
pub trait SparseIndex: Copy + PartialEq {
    fn sparse_index(self) -> usize;
}

impl SparseIndex for u32 {
    #[inline]
    fn sparse_index(self) -> usize {
        self as usize
    }
}

impl SparseIndex for usize {
    #[inline]
    fn sparse_index(self) -> usize {
        self
    }
}

#[derive(Debug, Clone)]
pub struct SparseSet<T: SparseIndex> {
    dense: Vec<T>,
    sparse: Vec<usize>,
}

impl<T: SparseIndex> Default for SparseSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SparseIndex> SparseSet<T> {
    pub fn new() -> Self {
        Self {
            dense: Vec::new(),
            sparse: Vec::new(),
        }
    }

    /// Create a set whose sparse array already covers `[0, capacity)`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            dense: Vec::new(),
            sparse: vec![usize::MAX; capacity],
        }
    }

    #[inline]
    fn slot(&self, value: T) -> Option<usize> {
        let pos = *self.sparse.get(value.sparse_index())?;
        match self.dense.get(pos) {
            Some(v) if *v == value => Some(pos),
            _ => None,
        }
    }

    #[inline]
    pub fn has(&self, value: T) -> bool {
        self.slot(value).is_some()
    }

    /// Insert `value`. Returns false if it was already present.
    pub fn add(&mut self, value: T) -> bool {
        if self.has(value) {
            return false;
        }
        let idx = value.sparse_index();
        if idx >= self.sparse.len() {
            self.sparse.resize(idx + 1, usize::MAX);
        }
        self.sparse[idx] = self.dense.len();
        self.dense.push(value);
        true
    }

    /// Swap-remove `value`. Returns false if it was absent.
    pub fn remove(&mut self, value: T) -> bool {
        let Some(pos) = self.slot(value) else {
            return false;
        };
        self.dense.swap_remove(pos);
        if let Some(&moved) = self.dense.get(pos) {
            self.sparse[moved.sparse_index()] = pos;
        }
        true
    }

    /// Members in dense order.
    #[inline]
    pub fn dense(&self) -> &[T] {
        &self.dense
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.dense.iter()
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Forget every member. Stale sparse slots are harmless because `has`
    /// cross-checks against `dense`.
    pub fn clear(&mut self) {
        self.dense.clear();
    }

    /// Copy out the members and clear the set.
    pub fn drain_to_vec(&mut self) -> Vec<T> {
        std::mem::take(&mut self.dense)
    }
}

impl<'a, T: SparseIndex> IntoIterator for &'a SparseSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.dense.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_has_remove() {
        let mut set = SparseSet::<u32>::new();
        assert!(set.add(5));
        assert!(set.add(2));
        assert!(!set.add(5));
        assert!(set.has(5));
        assert!(set.has(2));
        assert!(!set.has(3));
        assert_eq!(set.len(), 2);

        assert!(set.remove(5));
        assert!(!set.remove(5));
        assert!(!set.has(5));
        assert_eq!(set.dense(), &[2]);
    }

    #[test]
    fn test_swap_remove_fixes_sparse() {
        let mut set = SparseSet::<u32>::with_capacity(8);
        for v in [1, 3, 5, 7] {
            set.add(v);
        }
        set.remove(3);
        // 7 was swapped into the hole left by 3
        assert_eq!(set.dense(), &[1, 7, 5]);
        assert!(set.has(7));
        assert!(set.remove(7));
        assert_eq!(set.dense(), &[1, 5]);
    }

    #[test]
    fn test_back_to_front_removal_while_iterating() {
        let mut set = SparseSet::<u32>::new();
        for v in 0..10 {
            set.add(v);
        }
        for i in (0..set.len()).rev() {
            let v = set.dense()[i];
            if v % 2 == 0 {
                set.remove(v);
            }
        }
        let mut rest = set.dense().to_vec();
        rest.sort_unstable();
        assert_eq!(rest, vec![1, 3, 5, 7, 9]);
    }

    #[test]
    fn test_clear_and_readd() {
        let mut set = SparseSet::<u32>::new();
        set.add(4);
        set.add(9);
        set.clear();
        assert!(!set.has(4));
        assert!(set.add(9));
        assert_eq!(set.dense(), &[9]);
    }

    #[test]
    fn test_drain_to_vec() {
        let mut set = SparseSet::<usize>::new();
        set.add(3);
        set.add(1);
        assert_eq!(set.drain_to_vec(), vec![3, 1]);
        assert!(set.is_empty());
        assert!(!set.has(3));
    }
}

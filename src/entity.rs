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

//! Entity identifiers and the id allocator shared by every world.

use std::collections::VecDeque;
use std::fmt;

use crate::sparse_set::SparseIndex;

/// Integer entity handle.
///
/// Ids come from one cursor shared by all worlds of a [`Universe`](crate::Universe),
/// so an id addresses the same row in every component store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw id value
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Row index into bitmask arrays and component columns
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl SparseIndex for EntityId {
    #[inline]
    fn sparse_index(self) -> usize {
        self.index()
    }
}

/// Where the next id comes from. Only applied once the caller accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IdSource {
    Fresh(EntityId),
    Removed(EntityId),
}

impl IdSource {
    pub(crate) fn id(self) -> EntityId {
        match self {
            IdSource::Fresh(id) | IdSource::Removed(id) => id,
        }
    }
}

/// Id cursor plus the two recycling queues.
///
/// `removed` is consumed front first. In automatic mode an id is only reused
/// once more than `size * threshold` ids are waiting, which keeps a freshly
/// freed id from being handed out again in the same frame. In manual mode
/// freed ids park in `recycled` until [`EntityPool::flush_recycled`] moves
/// them over, after which they are reused eagerly.
#[derive(Debug, Clone)]
pub struct EntityPool {
    cursor: u32,
    removed: VecDeque<EntityId>,
    recycled: Vec<EntityId>,
    recycle_threshold: f64,
}

impl EntityPool {
    pub fn new(recycle_threshold: f64) -> Self {
        Self {
            cursor: 0,
            removed: VecDeque::new(),
            recycled: Vec::new(),
            recycle_threshold,
        }
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn recycle_threshold(&self) -> f64 {
        self.recycle_threshold
    }

    pub fn set_recycle_threshold(&mut self, threshold: f64) {
        self.recycle_threshold = threshold;
    }

    /// Pick the next id without consuming it.
    pub(crate) fn peek(&self, manual: bool, global_size: usize) -> IdSource {
        let reuse = if manual {
            !self.removed.is_empty()
        } else {
            let limit = (global_size as f64 * self.recycle_threshold).round() as usize;
            self.removed.len() > limit
        };

        match self.removed.front() {
            Some(&id) if reuse => IdSource::Removed(id),
            _ => IdSource::Fresh(EntityId(self.cursor)),
        }
    }

    /// Consume an id previously returned by [`EntityPool::peek`].
    pub(crate) fn commit(&mut self, source: IdSource) {
        match source {
            IdSource::Fresh(_) => self.cursor += 1,
            IdSource::Removed(_) => {
                self.removed.pop_front();
            }
        }
    }

    /// Return an id to the pool it belongs to.
    pub(crate) fn release(&mut self, id: EntityId, manual: bool) {
        if manual {
            self.recycled.push(id);
        } else {
            self.removed.push_back(id);
        }
    }

    /// Make manually recycled ids available for reuse.
    pub(crate) fn flush_recycled(&mut self) {
        self.removed.extend(self.recycled.drain(..));
    }

    /// Ids waiting in either queue, recycled first.
    pub fn removed_entities(&self) -> Vec<EntityId> {
        self.recycled
            .iter()
            .chain(self.removed.iter())
            .copied()
            .collect()
    }

    pub(crate) fn reset(&mut self, recycle_threshold: f64) {
        self.cursor = 0;
        self.removed.clear();
        self.recycled.clear();
        self.recycle_threshold = recycle_threshold;
    }
}

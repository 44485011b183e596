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

//! Query system with incremental membership
//!
//! A query is a list of [`QueryTerm`]s. The first time it is used in a world
//! it is compiled into per-generation required/forbidden masks and seeded by
//! one scan over existing entities. From then on it is kept current by the
//! component add/remove paths, which only touch the queries subscribed to the
//! component being changed.
//!
//! Removal is two-phase. A mutation that makes an entity stop matching only
//! queues it in `to_remove`; the live set is pruned by
//! [`World::commit_removals`], which runs at the start of every query read.

#[cfg(feature = "profiling")]
use tracing::info_span;

use smallvec::SmallVec;

use crate::component::ComponentId;
use crate::entity::EntityId;
use crate::sparse_set::{SparseIndex, SparseSet};
use crate::storage::{Column, ComponentStore};
use crate::world::World;

const MAX_QUERY_TERMS: usize = 8;

/// Handle to a query definition owned by a [`Universe`](crate::Universe)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryId(pub(crate) usize);

impl QueryId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl SparseIndex for QueryId {
    #[inline]
    fn sparse_index(self) -> usize {
        self.0
    }
}

/// One term of a query signature.
///
/// Only conjunction and negation are expressible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryTerm {
    /// Entity must hold the component
    Required(ComponentId),
    /// Entity must not hold the component
    Forbidden(ComponentId),
    /// Entity must hold the component; reads report entities whose values changed
    Tracked(ComponentId),
}

impl QueryTerm {
    pub fn component(self) -> ComponentId {
        match self {
            QueryTerm::Required(c) | QueryTerm::Forbidden(c) | QueryTerm::Tracked(c) => c,
        }
    }
}

impl From<ComponentId> for QueryTerm {
    fn from(component: ComponentId) -> Self {
        QueryTerm::Required(component)
    }
}

/// Exclude entities holding `component`
pub fn not(component: ComponentId) -> QueryTerm {
    QueryTerm::Forbidden(component)
}

/// Require `component` and report entities whose values changed between reads
pub fn changed(component: ComponentId) -> QueryTerm {
    QueryTerm::Tracked(component)
}

pub(crate) type QueryTerms = SmallVec<[QueryTerm; MAX_QUERY_TERMS]>;

/// OR-combined bits for one generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GenerationMask {
    generation: usize,
    required: u32,
    forbidden: u32,
}

/// A query compiled against one world
#[derive(Debug)]
pub(crate) struct CompiledQuery {
    id: QueryId,
    required: SmallVec<[ComponentId; MAX_QUERY_TERMS]>,
    forbidden: SmallVec<[ComponentId; MAX_QUERY_TERMS]>,
    masks: SmallVec<[GenerationMask; 4]>,

    /// (component, column index) for every value column under change tracking
    tracked_columns: Vec<(ComponentId, usize)>,
    /// Previous values, parallel to `tracked_columns`, allocated on first diff
    shadows: Vec<Option<Column>>,
    tracking: bool,

    pub(crate) live: SparseSet<EntityId>,
    pub(crate) entered: SparseSet<EntityId>,
    pub(crate) exited: SparseSet<EntityId>,
    pub(crate) to_remove: SparseSet<EntityId>,
    pub(crate) changed: SparseSet<EntityId>,
}

impl CompiledQuery {
    /// Does this query subscribe to `component`?
    pub(crate) fn references(&self, component: ComponentId) -> bool {
        self.required.contains(&component) || self.forbidden.contains(&component)
    }

    /// Tested on entity creation: a fresh entity holds nothing, so it can
    /// match queries that only forbid or that require nothing.
    fn matches_on_creation(&self) -> bool {
        !self.forbidden.is_empty() || self.required.is_empty()
    }

    /// Generation by generation mask test, short-circuiting on the first miss.
    pub(crate) fn matches(&self, masks: &[Vec<u32>], entity: EntityId) -> bool {
        for gm in &self.masks {
            let mask = masks[gm.generation]
                .get(entity.index())
                .copied()
                .unwrap_or(0);
            if gm.forbidden != 0 && mask & gm.forbidden != 0 {
                return false;
            }
            if gm.required != 0 && mask & gm.required != gm.required {
                return false;
            }
        }
        true
    }

    pub(crate) fn add_entity(&mut self, entity: EntityId) {
        self.to_remove.remove(entity);
        self.entered.add(entity);
        self.live.add(entity);
    }

    /// Queue `entity` for removal at the next commit.
    pub(crate) fn remove_entity(&mut self, entity: EntityId, dirty: &mut SparseSet<QueryId>) {
        if !self.live.has(entity) || self.to_remove.has(entity) {
            return;
        }
        self.to_remove.add(entity);
        dirty.add(self.id);
        self.exited.add(entity);
    }

    /// Full predicate re-test after one of the subscribed components changed.
    pub(crate) fn reevaluate(
        &mut self,
        entity: EntityId,
        masks: &[Vec<u32>],
        dirty: &mut SparseSet<QueryId>,
    ) {
        self.to_remove.remove(entity);
        if self.matches(masks, entity) {
            self.exited.remove(entity);
            self.add_entity(entity);
        } else {
            self.entered.remove(entity);
            self.remove_entity(entity, dirty);
        }
    }

    fn commit_removals(&mut self) {
        // Back to front so swap-removal never skips an element
        while let Some(&entity) = self.to_remove.dense().last() {
            self.to_remove.remove(entity);
            self.live.remove(entity);
        }
    }

    pub(crate) fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Compare tracked columns of every live entity against the shadows and
    /// return the entities whose values moved.
    pub(crate) fn diff(&mut self, stores: &[ComponentStore], clear: bool) -> &[EntityId] {
        #[cfg(feature = "profiling")]
        let span = info_span!("query.diff", query = self.id.0, entities = self.live.len());
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        if clear {
            self.changed.clear();
        }
        if self.live.is_empty() {
            return self.changed.dense();
        }

        for (slot, &(component, col)) in self.shadows.iter_mut().zip(&self.tracked_columns) {
            let column = &stores[component.index()].columns()[col];
            let shadow = slot.get_or_insert_with(|| column.clone());
            column.grow_shadow(shadow);
        }

        for &entity in self.live.dense() {
            let mut dirty = false;
            for (slot, &(component, col)) in self.shadows.iter_mut().zip(&self.tracked_columns) {
                if let Some(shadow) = slot {
                    let column = &stores[component.index()].columns()[col];
                    dirty |= column.sync_shadow(shadow, entity.index());
                }
            }
            if dirty {
                self.changed.add(entity);
            }
        }

        self.changed.dense()
    }
}

impl World {
    /// Compile `terms` into this world and seed it from existing entities.
    /// Every referenced component must already exist in `stores`.
    pub(crate) fn register_query(
        &mut self,
        id: QueryId,
        terms: &[QueryTerm],
        stores: &[ComponentStore],
    ) {
        if self.queries.contains_key(&id) {
            return;
        }

        #[cfg(feature = "profiling")]
        let span = info_span!("query.register", query = id.0, terms = terms.len());
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        let mut required = SmallVec::<[ComponentId; MAX_QUERY_TERMS]>::new();
        let mut forbidden = SmallVec::<[ComponentId; MAX_QUERY_TERMS]>::new();
        let mut tracked = SmallVec::<[ComponentId; MAX_QUERY_TERMS]>::new();

        for term in terms {
            let component = term.component();
            self.register_component(component);
            let (list, extra) = match term {
                QueryTerm::Required(_) => (&mut required, None),
                QueryTerm::Forbidden(_) => (&mut forbidden, None),
                QueryTerm::Tracked(_) => (&mut required, Some(&mut tracked)),
            };
            if !list.contains(&component) {
                list.push(component);
            }
            if let Some(tracked) = extra {
                if !tracked.contains(&component) {
                    tracked.push(component);
                }
            }
        }

        let mut masks = SmallVec::<[GenerationMask; 4]>::new();
        for (component, is_required) in required
            .iter()
            .map(|c| (*c, true))
            .chain(forbidden.iter().map(|c| (*c, false)))
        {
            let Some(record) = self.components.get(&component) else {
                continue;
            };
            let idx = match masks.iter().position(|m| m.generation == record.generation) {
                Some(idx) => idx,
                None => {
                    masks.push(GenerationMask {
                        generation: record.generation,
                        required: 0,
                        forbidden: 0,
                    });
                    masks.len() - 1
                }
            };
            if is_required {
                masks[idx].required |= record.bitflag;
            } else {
                masks[idx].forbidden |= record.bitflag;
            }
        }

        let tracked_columns: Vec<(ComponentId, usize)> = tracked
            .iter()
            .flat_map(|&c| (0..stores[c.index()].columns().len()).map(move |col| (c, col)))
            .collect();

        let mut query = CompiledQuery {
            id,
            shadows: vec![None; tracked_columns.len()],
            tracking: !tracked.is_empty(),
            tracked_columns,
            required,
            forbidden,
            masks,
            live: SparseSet::new(),
            entered: SparseSet::new(),
            exited: SparseSet::new(),
            to_remove: SparseSet::new(),
            changed: SparseSet::new(),
        };

        let mut existing = self.entities.dense().to_vec();
        existing.sort_unstable();
        for entity in existing {
            if query.matches(&self.masks, entity) {
                query.add_entity(entity);
            }
        }

        for component in query.required.iter().chain(&query.forbidden) {
            if let Some(record) = self.components.get_mut(component) {
                if !record.queries.contains(&id) {
                    record.queries.push(id);
                }
            }
        }
        if query.matches_on_creation() {
            self.creation_queries.add(id);
        }

        tracing::trace!(
            query = id.0,
            matched = query.live.len(),
            generations = query.masks.len(),
            "compiled query"
        );
        self.queries.insert(id, query);
    }

    /// Apply queued removals to every dirty query's live set.
    pub fn commit_removals(&mut self) {
        if self.dirty_queries.is_empty() {
            return;
        }

        #[cfg(feature = "profiling")]
        let span = info_span!("query.commit_removals", dirty = self.dirty_queries.len());
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        for id in self.dirty_queries.dense() {
            if let Some(q) = self.queries.get_mut(id) {
                q.commit_removals();
            }
        }
        self.dirty_queries.clear();
    }

    /// Drop a compiled query and every subscription pointing at it.
    pub(crate) fn unregister_query(&mut self, id: QueryId) -> bool {
        let Some(query) = self.queries.remove(&id) else {
            return false;
        };
        for component in query.required.iter().chain(&query.forbidden) {
            if let Some(record) = self.components.get_mut(component) {
                record.queries.retain(|q| *q != id);
            }
        }
        self.creation_queries.remove(id);
        self.dirty_queries.remove(id);
        true
    }

    pub(crate) fn compiled_query_mut(&mut self, id: QueryId) -> Option<&mut CompiledQuery> {
        self.queries.get_mut(&id)
    }
}

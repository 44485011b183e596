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

//! World: a bounded set of entities plus the membership bitmasks and
//! compiled queries over them

use ahash::AHashMap;
use rustc_hash::FxHashMap;
use slotmap::new_key_type;

use crate::bitset::BitSet;
use crate::component::{ComponentId, ComponentRecord};
use crate::entity::EntityId;
use crate::error::{EcsError, Result};
use crate::query::{CompiledQuery, QueryId};
use crate::sparse_set::SparseSet;

new_key_type! {
    /// Handle to a world owned by a [`Universe`](crate::Universe).
    pub struct WorldId;
}

pub struct World {
    /// Maximum number of entity rows
    pub(crate) size: usize,

    /// Live entity count at which a resize is advisable
    pub(crate) resize_threshold: usize,

    threshold_warned: bool,

    /// One mask array per generation, indexed by entity
    pub(crate) masks: Vec<Vec<u32>>,

    /// Bit handed to the next registered component
    pub(crate) bitflag: u32,

    pub(crate) components: FxHashMap<ComponentId, ComponentRecord>,

    /// Registration order, for `get_world_components`
    pub(crate) component_order: Vec<ComponentId>,

    pub(crate) queries: AHashMap<QueryId, CompiledQuery>,

    /// Queries tested against every newly created entity
    pub(crate) creation_queries: SparseSet<QueryId>,

    /// Queries with removals waiting for `commit_removals`
    pub(crate) dirty_queries: SparseSet<QueryId>,

    pub(crate) entities: SparseSet<EntityId>,

    /// Components currently held, by component index
    pub(crate) entity_components: AHashMap<EntityId, BitSet>,

    /// Deserializer mapping: local id -> entity, and back
    pub(crate) local_entities: AHashMap<u32, EntityId>,
    pub(crate) local_entity_lookup: AHashMap<EntityId, u32>,

    pub(crate) manual_recycling: bool,
}

fn resize_threshold(size: usize) -> usize {
    size - size / 5
}

impl World {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            size,
            resize_threshold: resize_threshold(size),
            threshold_warned: false,
            masks: vec![vec![0; size]],
            bitflag: 1,
            components: FxHashMap::default(),
            component_order: Vec::new(),
            queries: AHashMap::new(),
            creation_queries: SparseSet::new(),
            dirty_queries: SparseSet::new(),
            entities: SparseSet::with_capacity(size),
            entity_components: AHashMap::new(),
            local_entities: AHashMap::new(),
            local_entity_lookup: AHashMap::new(),
            manual_recycling: false,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn resize_threshold(&self) -> usize {
        self.resize_threshold
    }

    pub fn generation_count(&self) -> usize {
        self.masks.len()
    }

    /// Mask word of `entity` in `generation` (0 when out of range)
    pub fn mask(&self, generation: usize, entity: EntityId) -> u32 {
        self.masks
            .get(generation)
            .and_then(|masks| masks.get(entity.index()))
            .copied()
            .unwrap_or(0)
    }

    /// Live entities in dense order
    pub fn entities(&self) -> &[EntityId] {
        self.entities.dense()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.has(entity)
    }

    pub fn is_manual_recycling(&self) -> bool {
        self.manual_recycling
    }

    /// Registered components in registration order
    pub fn components(&self) -> &[ComponentId] {
        &self.component_order
    }

    pub fn component_record(&self, component: ComponentId) -> Option<&ComponentRecord> {
        self.components.get(&component)
    }

    pub fn query_count(&self) -> usize {
        self.queries.len()
    }

    pub fn dirty_query_count(&self) -> usize {
        self.dirty_queries.len()
    }

    pub fn is_query_registered(&self, query: QueryId) -> bool {
        self.queries.contains_key(&query)
    }

    pub fn local_entity(&self, local: u32) -> Option<EntityId> {
        self.local_entities.get(&local).copied()
    }

    /// `entity` is live and its id addresses a mask row.
    /// Shrinking a world can leave live entities past the last row.
    pub(crate) fn check_entity(&self, entity: EntityId) -> Result<()> {
        if !self.entities.has(entity) {
            return Err(EcsError::EntityNotFound(entity));
        }
        if entity.index() >= self.size {
            return Err(EcsError::CapacityExceeded {
                attempted: entity.index(),
                capacity: self.size,
            });
        }
        Ok(())
    }

    pub(crate) fn resize(&mut self, size: usize) {
        for masks in &mut self.masks {
            masks.resize(size, 0);
        }
        self.size = size;
        self.resize_threshold = resize_threshold(size);
        self.threshold_warned = false;
    }

    /// Mark `entity` present and run it through the creation queries.
    pub(crate) fn insert_entity(&mut self, entity: EntityId) {
        self.entities.add(entity);

        for id in self.creation_queries.dense() {
            if let Some(q) = self.queries.get_mut(id) {
                if q.matches(&self.masks, entity) {
                    q.add_entity(entity);
                }
            }
        }

        self.entity_components.insert(entity, BitSet::new());

        if !self.threshold_warned && self.entities.len() >= self.resize_threshold {
            self.threshold_warned = true;
            tracing::warn!(
                entities = self.entities.len(),
                size = self.size,
                "world is approaching its entity capacity"
            );
        }
    }

    /// Drop `entity` from every query and clear all of its state.
    /// Returns false if it was not in this world.
    pub(crate) fn remove_entity(&mut self, entity: EntityId) -> bool {
        if !self.entities.has(entity) {
            return false;
        }

        // Immediate exit from every query; the live sets catch up on commit
        for q in self.queries.values_mut() {
            q.remove_entity(entity, &mut self.dirty_queries);
        }

        self.entities.remove(entity);
        self.entity_components.remove(&entity);
        if self.entities.len() < self.resize_threshold {
            self.threshold_warned = false;
        }

        if let Some(local) = self.local_entity_lookup.remove(&entity) {
            self.local_entities.remove(&local);
        }

        for masks in &mut self.masks {
            if let Some(mask) = masks.get_mut(entity.index()) {
                *mask = 0;
            }
        }
        true
    }

    /// Components `entity` holds, ascending by id
    pub(crate) fn held_components(&self, entity: EntityId) -> Vec<ComponentId> {
        self.entity_components
            .get(&entity)
            .map(|held| held.ones().map(ComponentId).collect())
            .unwrap_or_default()
    }

    pub(crate) fn map_local_entity(&mut self, local: u32, entity: EntityId) {
        if let Some(old_local) = self.local_entity_lookup.insert(entity, local) {
            self.local_entities.remove(&old_local);
        }
        if let Some(previous) = self.local_entities.insert(local, entity) {
            if previous != entity {
                self.local_entity_lookup.remove(&previous);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_world() {
        let world = World::new(100);
        assert_eq!(world.size(), 100);
        assert_eq!(world.resize_threshold(), 80);
        assert_eq!(world.generation_count(), 1);
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn test_insert_remove_entity() {
        let mut world = World::new(10);
        let e = EntityId::new(4);
        world.insert_entity(e);
        assert!(world.contains(e));
        assert!(world.held_components(e).is_empty());

        assert!(world.remove_entity(e));
        assert!(!world.remove_entity(e));
        assert!(!world.contains(e));
    }

    #[test]
    fn test_remove_clears_every_generation() {
        let mut world = World::new(10);
        let e = EntityId::new(1);
        world.insert_entity(e);
        for i in 0..40 {
            world.attach_component(ComponentId(i), e);
        }
        assert_eq!(world.generation_count(), 2);
        assert_ne!(world.mask(1, e), 0);

        world.remove_entity(e);
        assert_eq!(world.mask(0, e), 0);
        assert_eq!(world.mask(1, e), 0);
    }

    #[test]
    fn test_resize_keeps_masks() {
        let mut world = World::new(4);
        let e = EntityId::new(3);
        world.insert_entity(e);
        world.attach_component(ComponentId(0), e);

        world.resize(20);
        assert_eq!(world.size(), 20);
        assert_eq!(world.resize_threshold(), 16);
        assert_eq!(world.mask(0, e), 1);
    }

    #[test]
    fn test_local_entity_mapping() {
        let mut world = World::new(4);
        let e = EntityId::new(0);
        world.insert_entity(e);
        world.map_local_entity(7, e);
        assert_eq!(world.local_entity(7), Some(e));

        world.remove_entity(e);
        assert_eq!(world.local_entity(7), None);
    }

    #[test]
    fn test_remapping_local_entity_drops_old_id() {
        let mut world = World::new(4);
        let e = EntityId::new(0);
        let other = EntityId::new(1);
        world.insert_entity(e);
        world.insert_entity(other);

        world.map_local_entity(7, e);
        world.map_local_entity(9, e);
        assert_eq!(world.local_entity(7), None);
        assert_eq!(world.local_entity(9), Some(e));

        // taking over a local id unmaps its previous owner
        world.map_local_entity(9, other);
        assert_eq!(world.local_entity(9), Some(other));
        assert!(!world.local_entity_lookup.contains_key(&e));

        world.remove_entity(other);
        assert_eq!(world.local_entity(9), None);
        assert!(world.local_entities.is_empty());
    }

    #[test]
    fn test_threshold_warning_rearms_below_threshold() {
        let mut world = World::new(10);
        for raw in 0..8 {
            world.insert_entity(EntityId::new(raw));
        }
        assert!(world.threshold_warned);

        world.remove_entity(EntityId::new(7));
        assert!(!world.threshold_warned);

        world.insert_entity(EntityId::new(7));
        assert!(world.threshold_warned);
    }

    #[test]
    fn test_check_entity_after_shrink() {
        let mut world = World::new(10);
        let low = EntityId::new(2);
        let high = EntityId::new(6);
        world.insert_entity(low);
        world.insert_entity(high);

        world.resize(4);
        assert_eq!(world.check_entity(low), Ok(()));
        assert_eq!(
            world.check_entity(high),
            Err(EcsError::CapacityExceeded {
                attempted: 6,
                capacity: 4
            })
        );
        assert_eq!(
            world.check_entity(EntityId::new(3)),
            Err(EcsError::EntityNotFound(EntityId::new(3)))
        );
    }
}

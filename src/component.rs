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

//! Component registration and membership bits
//!
//! A component gets a `(generation, bitflag)` pair the first time it is
//! registered in a world. Holding the component means that bit is set in
//! `masks[generation][entity]`. Each generation word carries 31 components;
//! the 32nd registration opens a new generation.

use smallvec::SmallVec;

use crate::entity::EntityId;
use crate::query::QueryId;
use crate::world::World;

/// Handle to a component store owned by a [`Universe`](crate::Universe)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) usize);

impl ComponentId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Highest bitflag handed out in a generation. Bit 31 is never used.
pub const MAX_BITFLAG: u32 = 1 << 30;

/// Per-world registration of one component
#[derive(Debug, Clone)]
pub struct ComponentRecord {
    pub generation: usize,
    pub bitflag: u32,
    /// Compiled queries that mention this component, required or forbidden
    pub(crate) queries: SmallVec<[QueryId; 8]>,
}

impl ComponentRecord {
    pub fn queries(&self) -> &[QueryId] {
        &self.queries
    }
}

impl World {
    /// Assign the next bit to `component`. Already registered components are left alone.
    pub(crate) fn register_component(&mut self, component: ComponentId) {
        if self.components.contains_key(&component) {
            return;
        }

        let queries = self
            .queries
            .iter()
            .filter(|(_, q)| q.references(component))
            .map(|(id, _)| *id)
            .collect();

        tracing::trace!(
            component = component.index(),
            generation = self.masks.len() - 1,
            bitflag = self.bitflag,
            "registering component"
        );

        self.components.insert(
            component,
            ComponentRecord {
                generation: self.masks.len() - 1,
                bitflag: self.bitflag,
                queries,
            },
        );
        self.component_order.push(component);
        self.increment_bitflag();
    }

    fn increment_bitflag(&mut self) {
        if self.bitflag >= MAX_BITFLAG {
            self.bitflag = 1;
            self.masks.push(vec![0; self.size]);
            tracing::trace!(generations = self.masks.len(), "opened new mask generation");
        } else {
            self.bitflag <<= 1;
        }
    }

    pub(crate) fn has_component(&self, component: ComponentId, entity: EntityId) -> bool {
        let Some(record) = self.components.get(&component) else {
            return false;
        };
        self.masks[record.generation]
            .get(entity.index())
            .is_some_and(|mask| mask & record.bitflag == record.bitflag)
    }

    /// Set the component bit and re-evaluate subscribed queries.
    /// Returns false if the entity already held the component.
    pub(crate) fn attach_component(&mut self, component: ComponentId, entity: EntityId) -> bool {
        self.register_component(component);
        if self.has_component(component, entity) {
            return false;
        }
        let Some(record) = self.components.get(&component) else {
            return false;
        };

        if let Some(mask) = self.masks[record.generation].get_mut(entity.index()) {
            *mask |= record.bitflag;
        }

        for id in &record.queries {
            if let Some(q) = self.queries.get_mut(id) {
                q.reevaluate(entity, &self.masks, &mut self.dirty_queries);
            }
        }

        self.entity_components
            .entry(entity)
            .or_default()
            .insert(component.index());
        true
    }

    /// Clear the component bit and re-evaluate subscribed queries.
    /// Returns false if the entity did not hold the component.
    pub(crate) fn detach_component(&mut self, component: ComponentId, entity: EntityId) -> bool {
        if !self.has_component(component, entity) {
            return false;
        }
        let Some(record) = self.components.get(&component) else {
            return false;
        };

        if let Some(mask) = self.masks[record.generation].get_mut(entity.index()) {
            *mask &= !record.bitflag;
        }

        for id in &record.queries {
            if let Some(q) = self.queries.get_mut(id) {
                q.reevaluate(entity, &self.masks, &mut self.dirty_queries);
            }
        }

        if let Some(held) = self.entity_components.get_mut(&entity) {
            held.remove(component.index());
        }
        true
    }
}

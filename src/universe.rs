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

//! Universe: owner of every world, store and query definition
//!
//! Worlds share one entity id space and one set of component stores, so the
//! id cursor, the recycling pools and the stores live here rather than in a
//! world. Everything is single-threaded: callers run one update pass at a
//! time, and resizing must not overlap with reads or mutations.

use ahash::AHashMap;
use slotmap::SlotMap;

use crate::component::ComponentId;
use crate::config::UniverseConfig;
use crate::entity::{EntityId, EntityPool};
use crate::error::{EcsError, Result};
use crate::query::{QueryId, QueryTerm, QueryTerms};
use crate::storage::{ComponentStore, Schema};
use crate::world::{World, WorldId};

pub struct Universe {
    config: UniverseConfig,

    /// Capacity applied to new worlds and stores
    global_size: usize,

    entities: EntityPool,

    /// Which world each live entity belongs to
    entity_worlds: AHashMap<EntityId, WorldId>,

    worlds: SlotMap<WorldId, World>,

    stores: Vec<ComponentStore>,

    query_defs: Vec<QueryTerms>,
}

impl Universe {
    pub fn new() -> Self {
        Self::with_config(UniverseConfig::default())
    }

    pub fn with_config(config: UniverseConfig) -> Self {
        Self {
            global_size: config.default_size,
            entities: EntityPool::new(config.removed_recycle_threshold),
            entity_worlds: AHashMap::new(),
            worlds: SlotMap::with_key(),
            stores: Vec::new(),
            query_defs: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &UniverseConfig {
        &self.config
    }

    pub fn global_size(&self) -> usize {
        self.global_size
    }

    pub fn default_size(&self) -> usize {
        self.config.default_size
    }

    pub fn entity_cursor(&self) -> u32 {
        self.entities.cursor()
    }

    /// Ids waiting to be reused, manually recycled ones first
    pub fn removed_entities(&self) -> Vec<EntityId> {
        self.entities.removed_entities()
    }

    /// Reset the id cursor, the pools, the recycle threshold and the global size.
    pub fn reset_globals(&mut self) {
        self.global_size = self.config.default_size;
        self.entities.reset(self.config.removed_recycle_threshold);
    }

    /// Change the default capacity and apply it to every world and store.
    ///
    /// This also resets the id cursor and pools, so call it before creating entities.
    pub fn set_default_size(&mut self, size: usize) {
        self.config.default_size = size;
        self.reset_globals();
        self.resize_worlds(size);
        self.resize_components(size);
    }

    pub fn set_removed_recycle_threshold(&mut self, threshold: f64) {
        self.entities.set_recycle_threshold(threshold);
    }

    /// Resize every world and every store together.
    pub fn resize(&mut self, size: usize) {
        self.global_size = size;
        self.resize_worlds(size);
        self.resize_components(size);
    }

    // ========== Worlds ==========

    /// Create a world holding up to `size` entities (global size when `None`).
    pub fn create_world(&mut self, size: Option<usize>) -> WorldId {
        let size = size.unwrap_or(self.global_size);
        let id = self.worlds.insert(World::new(size));
        tracing::debug!(world = ?id, size, "created world");
        id
    }

    pub fn world(&self, world: WorldId) -> Option<&World> {
        self.worlds.get(world)
    }

    pub fn world_ids(&self) -> impl Iterator<Item = WorldId> + '_ {
        self.worlds.keys()
    }

    fn world_mut(&mut self, world: WorldId) -> Result<&mut World> {
        self.worlds.get_mut(world).ok_or(EcsError::WorldNotFound)
    }

    /// Remove every entity, then return the world to its freshly created state.
    pub fn reset_world(&mut self, world: WorldId, size: Option<usize>) -> Result<()> {
        let size = size.unwrap_or(self.global_size);
        self.release_all_entities(world)?;
        *self.world_mut(world)? = World::new(size);
        tracing::debug!(world = ?world, size, "reset world");
        Ok(())
    }

    /// Release the world's entities and drop it.
    pub fn delete_world(&mut self, world: WorldId) -> Result<()> {
        self.release_all_entities(world)?;
        self.worlds.remove(world);
        tracing::debug!(world = ?world, "deleted world");
        Ok(())
    }

    fn release_all_entities(&mut self, world: WorldId) -> Result<()> {
        let entities = self.world_mut(world)?.entities().to_vec();
        for entity in entities {
            self.remove_entity(world, entity)?;
        }
        Ok(())
    }

    /// Grow or shrink every world's mask arrays. Live entities past a shrunk
    /// size stay in the world but their components can no longer change.
    pub fn resize_worlds(&mut self, size: usize) {
        for (id, world) in self.worlds.iter_mut() {
            world.resize(size);
            tracing::debug!(world = ?id, size, "resized world");
        }
    }

    /// Freed ids of this world wait in the recycled pool until
    /// [`Universe::flush_removed_entities`] is called.
    pub fn enable_manual_entity_recycling(&mut self, world: WorldId) -> Result<()> {
        self.world_mut(world)?.manual_recycling = true;
        Ok(())
    }

    pub fn flush_removed_entities(&mut self, world: WorldId) -> Result<()> {
        if !self.world_mut(world)?.manual_recycling {
            return Err(EcsError::ManualRecyclingDisabled);
        }
        self.entities.flush_recycled();
        Ok(())
    }

    pub fn get_all_entities(&self, world: WorldId) -> Result<Vec<EntityId>> {
        let world = self.worlds.get(world).ok_or(EcsError::WorldNotFound)?;
        Ok(world.entities().to_vec())
    }

    pub fn get_world_components(&self, world: WorldId) -> Result<Vec<ComponentId>> {
        let world = self.worlds.get(world).ok_or(EcsError::WorldNotFound)?;
        Ok(world.components().to_vec())
    }

    // ========== Entities ==========

    /// Create an entity in `world`.
    ///
    /// Fails with [`EcsError::CapacityExceeded`] when the chosen id does not
    /// fit the world; in that case no id is consumed.
    pub fn add_entity(&mut self, world: WorldId) -> Result<EntityId> {
        let target = self.worlds.get_mut(world).ok_or(EcsError::WorldNotFound)?;

        let source = self
            .entities
            .peek(target.manual_recycling, self.global_size);
        let entity = source.id();
        if entity.index() >= target.size {
            return Err(EcsError::CapacityExceeded {
                attempted: entity.index(),
                capacity: target.size,
            });
        }
        self.entities.commit(source);

        target.insert_entity(entity);
        self.entity_worlds.insert(entity, world);
        Ok(entity)
    }

    /// Remove `entity` from `world`. Removing an absent entity does nothing.
    pub fn remove_entity(&mut self, world: WorldId, entity: EntityId) -> Result<()> {
        let target = self.worlds.get_mut(world).ok_or(EcsError::WorldNotFound)?;
        if !target.remove_entity(entity) {
            return Ok(());
        }
        self.entities.release(entity, target.manual_recycling);
        if self.entity_worlds.get(&entity) == Some(&world) {
            self.entity_worlds.remove(&entity);
        }
        Ok(())
    }

    pub fn entity_exists(&self, world: WorldId, entity: EntityId) -> bool {
        self.worlds
            .get(world)
            .is_some_and(|world| world.contains(entity))
    }

    /// World that currently owns `entity`
    pub fn world_of(&self, entity: EntityId) -> Option<WorldId> {
        self.entity_worlds.get(&entity).copied()
    }

    pub fn get_entity_components(
        &self,
        world: WorldId,
        entity: EntityId,
    ) -> Result<Vec<ComponentId>> {
        let world = self.worlds.get(world).ok_or(EcsError::WorldNotFound)?;
        if !world.contains(entity) {
            return Err(EcsError::EntityNotFound(entity));
        }
        Ok(world.held_components(entity))
    }

    /// Record a deserializer mapping from a local id to `entity`.
    pub fn map_local_entity(&mut self, world: WorldId, local: u32, entity: EntityId) -> Result<()> {
        let target = self.world_mut(world)?;
        if !target.contains(entity) {
            return Err(EcsError::EntityNotFound(entity));
        }
        target.map_local_entity(local, entity);
        Ok(())
    }

    // ========== Components ==========

    /// Allocate a store for `schema`, sized to `size` or the global size.
    pub fn define_component(&mut self, schema: Schema, size: Option<usize>) -> ComponentId {
        let id = ComponentId(self.stores.len());
        self.stores
            .push(ComponentStore::new(schema, size.unwrap_or(self.global_size)));
        id
    }

    /// Existence-only component
    pub fn define_tag(&mut self) -> ComponentId {
        self.define_component(Schema::new(), None)
    }

    pub fn store(&self, component: ComponentId) -> Result<&ComponentStore> {
        self.stores
            .get(component.index())
            .ok_or(EcsError::ComponentNotFound(component))
    }

    pub fn store_mut(&mut self, component: ComponentId) -> Result<&mut ComponentStore> {
        self.stores
            .get_mut(component.index())
            .ok_or(EcsError::ComponentNotFound(component))
    }

    /// Resize every store with columns. Tag stores have nothing to resize.
    pub fn resize_components(&mut self, size: usize) {
        for store in self.stores.iter_mut().filter(|s| !s.is_tag()) {
            store.resize(size);
        }
        tracing::debug!(stores = self.stores.len(), size, "resized component stores");
    }

    fn check_component(&self, component: ComponentId) -> Result<()> {
        self.store(component).map(|_| ())
    }

    pub fn register_component(&mut self, world: WorldId, component: ComponentId) -> Result<()> {
        self.check_component(component)?;
        self.world_mut(world)?.register_component(component);
        Ok(())
    }

    pub fn register_components(&mut self, world: WorldId, components: &[ComponentId]) -> Result<()> {
        for &component in components {
            self.register_component(world, component)?;
        }
        Ok(())
    }

    /// False for unregistered components, unknown worlds and absent entities.
    pub fn has_component(&self, world: WorldId, component: ComponentId, entity: EntityId) -> bool {
        self.worlds
            .get(world)
            .is_some_and(|world| world.has_component(component, entity))
    }

    /// Add `component` to `entity` without touching its stored values.
    pub fn add_component(
        &mut self,
        world: WorldId,
        component: ComponentId,
        entity: EntityId,
    ) -> Result<()> {
        self.add_component_with(world, component, entity, false)
    }

    /// Add `component` to `entity`, zeroing its values first when `reset` is set.
    /// Adding a component the entity already holds does nothing.
    pub fn add_component_with(
        &mut self,
        world: WorldId,
        component: ComponentId,
        entity: EntityId,
        reset: bool,
    ) -> Result<()> {
        self.check_component(component)?;
        let target = self.world_mut(world)?;
        target.check_entity(entity)?;
        if target.attach_component(component, entity) && reset {
            self.stores[component.index()].reset_for(entity);
        }
        Ok(())
    }

    /// Remove `component` from `entity` and zero its values.
    pub fn remove_component(
        &mut self,
        world: WorldId,
        component: ComponentId,
        entity: EntityId,
    ) -> Result<()> {
        self.remove_component_with(world, component, entity, true)
    }

    /// Remove `component` from `entity`, keeping its values unless `reset` is set.
    /// Removing a component the entity lacks does nothing.
    pub fn remove_component_with(
        &mut self,
        world: WorldId,
        component: ComponentId,
        entity: EntityId,
        reset: bool,
    ) -> Result<()> {
        self.check_component(component)?;
        let target = self.world_mut(world)?;
        target.check_entity(entity)?;
        if target.detach_component(component, entity) && reset {
            self.stores[component.index()].reset_for(entity);
        }
        Ok(())
    }

    // ========== Queries ==========

    /// Define a query. It is compiled per world on first use.
    ///
    /// ```
    /// use bitmask_ecs::prelude::*;
    ///
    /// let mut ecs = Universe::new();
    /// let world = ecs.create_world(Some(64));
    /// let position = ecs.define_component(Schema::new().field("x", FieldKind::F32), None);
    /// let frozen = ecs.define_tag();
    /// let moving = ecs.define_query([QueryTerm::from(position), not(frozen)]).unwrap();
    ///
    /// let e = ecs.add_entity(world).unwrap();
    /// ecs.add_component(world, position, e).unwrap();
    /// assert_eq!(ecs.query(world, moving).unwrap(), &[e]);
    /// ```
    pub fn define_query<T>(&mut self, terms: impl IntoIterator<Item = T>) -> Result<QueryId>
    where
        T: Into<QueryTerm>,
    {
        let terms: QueryTerms = terms.into_iter().map(Into::into).collect();
        for term in &terms {
            self.check_component(term.component())?;
        }
        let id = QueryId(self.query_defs.len());
        self.query_defs.push(terms);
        Ok(id)
    }

    /// Compile `query` into `world` now instead of on first read.
    pub fn register_query(&mut self, world: WorldId, query: QueryId) -> Result<()> {
        let terms = self
            .query_defs
            .get(query.index())
            .ok_or(EcsError::QueryNotFound(query))?;
        let target = self.worlds.get_mut(world).ok_or(EcsError::WorldNotFound)?;
        target.register_query(query, terms, &self.stores);
        Ok(())
    }

    /// Read a query, clearing the changed list of a tracking query first.
    pub fn query(&mut self, world: WorldId, query: QueryId) -> Result<&[EntityId]> {
        self.query_with(world, query, true)
    }

    /// Commit pending removals, then return the live set, or for a query
    /// with tracked components the entities whose values changed.
    pub fn query_with(
        &mut self,
        world: WorldId,
        query: QueryId,
        clear_changed: bool,
    ) -> Result<&[EntityId]> {
        self.register_query(world, query)?;
        let target = self.worlds.get_mut(world).ok_or(EcsError::WorldNotFound)?;
        target.commit_removals();

        let compiled = target
            .compiled_query_mut(query)
            .ok_or(EcsError::QueryNotFound(query))?;
        if compiled.is_tracking() {
            Ok(compiled.diff(&self.stores, clear_changed))
        } else {
            Ok(compiled.live.dense())
        }
    }

    /// Drain entities that started matching since the last call.
    pub fn enter_query(&mut self, world: WorldId, query: QueryId) -> Result<Vec<EntityId>> {
        self.register_query(world, query)?;
        let compiled = self
            .world_mut(world)?
            .compiled_query_mut(query)
            .ok_or(EcsError::QueryNotFound(query))?;
        Ok(compiled.entered.drain_to_vec())
    }

    /// Drain entities that stopped matching since the last call.
    pub fn exit_query(&mut self, world: WorldId, query: QueryId) -> Result<Vec<EntityId>> {
        self.register_query(world, query)?;
        let compiled = self
            .world_mut(world)?
            .compiled_query_mut(query)
            .ok_or(EcsError::QueryNotFound(query))?;
        Ok(compiled.exited.drain_to_vec())
    }

    /// Forget the compiled form of `query` in `world`. It is recompiled from
    /// scratch if read again.
    pub fn remove_query(&mut self, world: WorldId, query: QueryId) -> Result<()> {
        self.world_mut(world)?.unregister_query(query);
        Ok(())
    }

    /// Clear the accumulated changed list of a tracking query.
    pub fn reset_changed_query(&mut self, world: WorldId, query: QueryId) -> Result<()> {
        if query.index() >= self.query_defs.len() {
            return Err(EcsError::QueryNotFound(query));
        }
        if let Some(compiled) = self.world_mut(world)?.compiled_query_mut(query) {
            compiled.changed.clear();
        }
        Ok(())
    }

    /// Apply pending query removals without reading a query.
    pub fn commit_removals(&mut self, world: WorldId) -> Result<()> {
        self.world_mut(world)?.commit_removals();
        Ok(())
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::new()
    }
}

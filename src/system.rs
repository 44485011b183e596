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

//! Systems and left-to-right pipelines

use crate::error::Result;
use crate::universe::Universe;
use crate::world::WorldId;

/// System trait
pub trait System {
    /// Get system name
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Run one update of `world`
    fn run(&mut self, universe: &mut Universe, world: WorldId) -> Result<()>;
}

impl<F> System for F
where
    F: FnMut(&mut Universe, WorldId) -> Result<()>,
{
    fn run(&mut self, universe: &mut Universe, world: WorldId) -> Result<()> {
        self(universe, world)
    }
}

/// Boxed system
pub type BoxedSystem = Box<dyn System>;

/// Wrap an update function so it hands the same world back to the caller.
pub fn define_system<F>(mut update: F) -> impl FnMut(&mut Universe, WorldId) -> Result<WorldId>
where
    F: FnMut(&mut Universe, WorldId) -> Result<()>,
{
    move |universe: &mut Universe, world: WorldId| {
        update(universe, world)?;
        Ok(world)
    }
}

/// Systems run in insertion order
#[derive(Default)]
pub struct Pipeline {
    systems: Vec<BoxedSystem>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<S: System + 'static>(mut self, system: S) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn push<S: System + 'static>(&mut self, system: S) {
        self.systems.push(Box::new(system));
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Run every system once, stopping at the first error.
    pub fn run(&mut self, universe: &mut Universe, world: WorldId) -> Result<WorldId> {
        for system in &mut self.systems {
            #[cfg(feature = "profiling")]
            let span = tracing::info_span!("system", name = system.name());
            #[cfg(feature = "profiling")]
            let _span_guard = span.enter();

            system.run(universe, world)?;
        }
        Ok(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EcsError;

    struct Spawner {
        count: usize,
    }

    impl System for Spawner {
        fn name(&self) -> &str {
            "spawner"
        }

        fn run(&mut self, universe: &mut Universe, world: WorldId) -> Result<()> {
            for _ in 0..self.count {
                universe.add_entity(world)?;
            }
            Ok(())
        }
    }

    #[test]
    fn test_define_system_returns_world() -> Result<()> {
        let mut ecs = Universe::new();
        let world = ecs.create_world(Some(8));
        let mut system = define_system(|ecs: &mut Universe, world| {
            ecs.add_entity(world)?;
            Ok(())
        });
        assert_eq!(system(&mut ecs, world)?, world);
        assert_eq!(ecs.get_all_entities(world)?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_pipeline_runs_in_order() -> Result<()> {
        let mut ecs = Universe::new();
        let world = ecs.create_world(Some(8));
        let tag = ecs.define_tag();

        let mut pipeline = Pipeline::new()
            .with(Spawner { count: 2 })
            .with(move |ecs: &mut Universe, world: WorldId| -> Result<()> {
                for e in ecs.get_all_entities(world)? {
                    ecs.add_component(world, tag, e)?;
                }
                Ok(())
            });
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.run(&mut ecs, world)?, world);

        let e = ecs.get_all_entities(world)?[0];
        assert!(ecs.has_component(world, tag, e));
        Ok(())
    }

    #[test]
    fn test_pipeline_stops_on_error() {
        let mut ecs = Universe::new();
        let world = ecs.create_world(Some(1));
        let mut pipeline = Pipeline::new()
            .with(Spawner { count: 2 })
            .with(|_: &mut Universe, _: WorldId| -> Result<()> { panic!("must not run") });

        assert!(matches!(
            pipeline.run(&mut ecs, world),
            Err(EcsError::CapacityExceeded { .. })
        ));
    }
}

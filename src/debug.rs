//! Debug and inspection tools

use crate::component::ComponentId;
use crate::universe::Universe;
use crate::world::WorldId;

/// World inspector for debugging
pub struct WorldInspector;

impl WorldInspector {
    /// Snapshot of a world's bookkeeping, `None` if the world does not exist
    pub fn summary(universe: &Universe, world: WorldId) -> Option<WorldSummary> {
        let w = universe.world(world)?;
        let components = w
            .components()
            .iter()
            .filter_map(|&id| {
                let record = w.component_record(id)?;
                Some(ComponentInfo {
                    id,
                    generation: record.generation,
                    bitflag: record.bitflag,
                    subscribed_queries: record.queries().len(),
                })
            })
            .collect();

        Some(WorldSummary {
            entity_count: w.entity_count(),
            capacity: w.size(),
            resize_threshold: w.resize_threshold(),
            generations: w.generation_count(),
            components,
            compiled_queries: w.query_count(),
            dirty_queries: w.dirty_query_count(),
            manual_recycling: w.is_manual_recycling(),
        })
    }

    /// Print world summary to console
    pub fn print_summary(universe: &Universe, world: WorldId) {
        let Some(summary) = Self::summary(universe, world) else {
            println!("World {world:?} not found");
            return;
        };

        println!("=== World Summary ===");
        println!("Entities: {}/{}", summary.entity_count, summary.capacity);
        println!("Resize threshold: {}", summary.resize_threshold);
        println!("Generations: {}", summary.generations);
        println!(
            "Queries: {} compiled, {} dirty",
            summary.compiled_queries, summary.dirty_queries
        );
        println!("Entity cursor: {}", universe.entity_cursor());

        println!("\n=== Components ===");
        for info in &summary.components {
            println!(
                "Component {}: generation {}, bit {:#x}, {} queries",
                info.id.index(),
                info.generation,
                info.bitflag,
                info.subscribed_queries
            );
        }
    }
}

/// Per-world diagnostics
#[derive(Clone, Debug, PartialEq)]
pub struct WorldSummary {
    pub entity_count: usize,
    pub capacity: usize,
    pub resize_threshold: usize,
    pub generations: usize,
    pub components: Vec<ComponentInfo>,
    pub compiled_queries: usize,
    pub dirty_queries: usize,
    pub manual_recycling: bool,
}

/// Component registration details
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentInfo {
    pub id: ComponentId,
    pub generation: usize,
    pub bitflag: u32,
    pub subscribed_queries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;

    #[test]
    fn test_world_inspector() -> Result<()> {
        let mut ecs = Universe::new();
        let world = ecs.create_world(Some(50));
        let a = ecs.define_tag();
        let b = ecs.define_tag();
        let q = ecs.define_query([a, b])?;

        let e = ecs.add_entity(world)?;
        ecs.add_component(world, a, e)?;
        ecs.add_component(world, b, e)?;
        ecs.query(world, q)?;
        ecs.remove_component(world, b, e)?;

        let summary = WorldInspector::summary(&ecs, world).expect("world exists");
        assert_eq!(summary.entity_count, 1);
        assert_eq!(summary.capacity, 50);
        assert_eq!(summary.resize_threshold, 40);
        assert_eq!(summary.generations, 1);
        assert_eq!(summary.compiled_queries, 1);
        assert_eq!(summary.dirty_queries, 1);
        assert_eq!(summary.components.len(), 2);
        assert_eq!(summary.components[1].bitflag, 2);
        assert_eq!(summary.components[1].subscribed_queries, 1);
        Ok(())
    }

    #[test]
    fn test_missing_world() -> Result<()> {
        let mut ecs = Universe::new();
        let world = ecs.create_world(Some(4));
        ecs.delete_world(world)?;
        assert!(WorldInspector::summary(&ecs, world).is_none());
        Ok(())
    }
}

//! Benchmarks for core operations
//!
//! Run with: cargo bench
//!
//! Measures:
//! - Entity creation and removal with recycling
//! - Component add/remove with subscribed queries
//! - Query reads, including change diffing

use bitmask_ecs::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const SIZE: usize = 20_000;

fn movement_schema() -> Schema {
    Schema::new()
        .field("x", FieldKind::F32)
        .field("y", FieldKind::F32)
        .field("z", FieldKind::F32)
}

struct Scene {
    ecs: Universe,
    world: WorldId,
    position: ComponentId,
    velocity: ComponentId,
    frozen: ComponentId,
}

fn scene(count: usize) -> Scene {
    let mut ecs = Universe::with_config(UniverseConfig {
        default_size: SIZE,
        ..UniverseConfig::default()
    });
    let world = ecs.create_world(None);
    let position = ecs.define_component(movement_schema(), None);
    let velocity = ecs.define_component(movement_schema(), None);
    let frozen = ecs.define_tag();

    for i in 0..count {
        let Ok(e) = ecs.add_entity(world) else { break };
        let _ = ecs.add_component(world, position, e);
        if i % 2 == 0 {
            let _ = ecs.add_component(world, velocity, e);
        }
        if i % 10 == 0 {
            let _ = ecs.add_component(world, frozen, e);
        }
    }

    Scene {
        ecs,
        world,
        position,
        velocity,
        frozen,
    }
}

// Bench: Entity churn through the recycling pool
fn bench_entities(c: &mut Criterion) {
    let mut group = c.benchmark_group("entities");

    group.bench_function("add_remove_10k", |b| {
        b.iter(|| {
            let mut ecs = Universe::with_config(UniverseConfig {
                default_size: SIZE,
                ..UniverseConfig::default()
            });
            let world = ecs.create_world(None);
            for _ in 0..10_000 {
                let e = ecs.add_entity(world).ok();
                if let Some(e) = e {
                    let _ = ecs.remove_entity(world, e);
                }
            }
            black_box(ecs.entity_cursor());
        });
    });

    group.finish();
}

// Bench: Component add/remove with live queries subscribed
fn bench_components(c: &mut Criterion) {
    let mut group = c.benchmark_group("components");

    for queries in [0usize, 4, 16] {
        group.bench_with_input(
            BenchmarkId::new("toggle_velocity_1k", queries),
            &queries,
            |b, &queries| {
                let mut s = scene(1_000);
                for _ in 0..queries {
                    if let Ok(q) = s.ecs.define_query([QueryTerm::from(s.velocity), not(s.frozen)]) {
                        let _ = s.ecs.register_query(s.world, q);
                    }
                }
                let entities = s.ecs.get_all_entities(s.world).unwrap_or_default();
                b.iter(|| {
                    for &e in &entities {
                        let _ = s.ecs.remove_component_with(s.world, s.velocity, e, false);
                        let _ = s.ecs.add_component(s.world, s.velocity, e);
                    }
                    let _ = s.ecs.commit_removals(s.world);
                });
            },
        );
    }

    group.finish();
}

// Bench: Query reads
fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("queries");

    group.bench_function("iterate_moving_10k", |b| {
        let mut s = scene(10_000);
        let Ok(moving) = s.ecs.define_query([
            QueryTerm::from(s.position),
            QueryTerm::from(s.velocity),
            not(s.frozen),
        ]) else {
            return;
        };
        b.iter(|| {
            let mut sum = 0u64;
            if let Ok(entities) = s.ecs.query(s.world, moving) {
                for e in entities {
                    sum += u64::from(e.raw());
                }
            }
            black_box(sum);
        });
    });

    group.bench_function("changed_diff_10k", |b| {
        let mut s = scene(10_000);
        let Ok(moved) = s.ecs.define_query([changed(s.position)]) else {
            return;
        };
        let _ = s.ecs.query(s.world, moved);
        let mut tick = 0.0f32;
        b.iter(|| {
            tick += 1.0;
            if let Ok(store) = s.ecs.store_mut(s.position) {
                if let Ok(xs) = store.column_mut::<f32>("x") {
                    for x in xs.iter_mut().step_by(7) {
                        *x = tick;
                    }
                }
            }
            black_box(s.ecs.query(s.world, moved).map(|c| c.len()).unwrap_or(0));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_entities, bench_components, bench_queries);
criterion_main!(benches);

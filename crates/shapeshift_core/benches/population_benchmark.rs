//! # Population Benchmark
//!
//! Measures the steady-state tick once pools have reached their peak, and raw
//! pool churn (get + reclaim) for recycling and non-recycling factories.

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::Rng;
use shapeshift_core::{
    CoreResult, LifecycleBehavior, MaterialType, MovementBehavior, OscillationBehavior, PoolId,
    Population, PopulationManager, RandomExt, RandomStreams, RotationBehavior, ShapeFactory,
    ShapeKey, ShapePrefab, ShapeStore, ShapeType, SpawnContext, SpawnSource,
};

const DT: f32 = 1.0 / 50.0;

fn store(recycle: bool) -> (ShapeStore, PoolId) {
    let mut store = ShapeStore::new();
    let pool = store
        .register(ShapeFactory::new(
            vec![ShapePrefab::new("cube", 1), ShapePrefab::new("composite", 3)],
            3,
            recycle,
        ))
        .expect("fresh store accepts the factory");
    (store, pool)
}

/// Every behavior kind except satellites, with a short lifecycle.
struct ChurnSource(PoolId);

impl SpawnSource for ChurnSource {
    fn produce_spawn(&mut self, ctx: &mut SpawnContext<'_>) -> CoreResult<ShapeKey> {
        let rng = &mut *ctx.rng;
        let key = ctx.population.spawn(self.0, ShapeType(rng.gen_range(0..2)), MaterialType(0))?;
        let velocity = rng.on_unit_sphere() * rng.range_f32(0.5, 2.0);
        let angular = rng.on_unit_sphere() * 90.0;
        ctx.population.with_context(key, |ctx| {
            ctx.attach_with::<MovementBehavior>(|b| b.velocity = velocity);
            ctx.attach_with::<RotationBehavior>(|b| b.angular_velocity = angular);
            ctx.attach_with::<OscillationBehavior>(|b| {
                b.offset = shapeshift_shared::Vec3::Y;
                b.frequency = 0.5;
            });
            LifecycleBehavior::attach(ctx, 0.5, 3.0, 0.5);
        });
        Ok(key)
    }
}

/// Benchmark: a full tick at steady state (spawns balanced by lifecycles).
fn bench_steady_state_tick(c: &mut Criterion) {
    let (store, pool) = store(true);
    let mut manager = PopulationManager::new(store, RandomStreams::from_seed(7));
    let mut source = ChurnSource(pool);
    manager.set_creation_speed(500.0);
    manager.set_population_limit(2_000);

    // Warm up until the pools hold their peak.
    for _ in 0..500 {
        let _ = manager.tick(DT, &mut source);
    }

    c.bench_function("tick_steady_state_2K", |b| {
        b.iter(|| {
            let report = manager.tick(black_box(DT), &mut source);
            black_box(report.map(|r| r.spawned).unwrap_or_default())
        });
    });
}

/// Benchmark: the update pass alone, no structural changes.
fn bench_update_pass(c: &mut Criterion) {
    let (store, pool) = store(true);
    let mut population = Population::new(store);
    for i in 0..10_000_u32 {
        if let Ok(key) = population.spawn(pool, ShapeType((i % 2) as u16), MaterialType(0)) {
            population.with_context(key, |ctx| {
                ctx.attach_with::<MovementBehavior>(|b| b.velocity = shapeshift_shared::Vec3::X);
                ctx.attach_with::<RotationBehavior>(|b| {
                    b.angular_velocity = shapeshift_shared::Vec3::Y * 45.0;
                });
            });
        }
    }

    c.bench_function("update_pass_10K", |b| {
        b.iter(|| {
            population.update_shapes(black_box(DT));
            black_box(population.apply_deferred())
        });
    });
}

/// Benchmark: get + reclaim cycles.
fn bench_pool_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_churn");

    for recycle in [true, false] {
        let name = if recycle { "recycling_1K" } else { "releasing_1K" };
        group.bench_function(name, |b| {
            b.iter_batched(
                || {
                    let (store, pool) = store(recycle);
                    (Population::new(store), pool)
                },
                |(mut population, pool)| {
                    for _ in 0..4 {
                        for _ in 0..1_000 {
                            let _ = population.spawn(pool, ShapeType(0), MaterialType(1));
                        }
                        while let Some(handle) = population.handle_at(0) {
                            population.kill(handle);
                        }
                    }
                    black_box(population.len())
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_steady_state_tick, bench_update_pass, bench_pool_churn);
criterion_main!(benches);

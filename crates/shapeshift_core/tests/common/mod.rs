//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use rand::Rng;
use shapeshift_core::{
    CoreResult, LifecycleBehavior, MaterialType, MovementBehavior, OscillationBehavior, PoolId,
    PopulationManager, RandomExt, RandomStreams, RotationBehavior, SatelliteBehavior, SaveReader,
    SaveWriter, ShapeFactory, ShapeKey, ShapePrefab, ShapeStore, ShapeType, SpawnContext,
    SpawnSource,
};
use shapeshift_shared::{Transform, Vec3};

/// Main pool (recycling, three shape types, three materials) and a
/// non-recycling moon pool.
pub fn store() -> (ShapeStore, PoolId, PoolId) {
    let mut store = ShapeStore::new();
    let main = store
        .register(ShapeFactory::new(
            vec![
                ShapePrefab::new("cube", 1),
                ShapePrefab::new("sphere", 1),
                ShapePrefab::new("composite", 3),
            ],
            3,
            true,
        ))
        .unwrap();
    let moons = store
        .register(ShapeFactory::new(vec![ShapePrefab::new("moon", 1)], 1, false))
        .unwrap();
    (store, main, moons)
}

/// A manager over [`store`] with a fixed seed.
pub fn manager(seed: u64) -> PopulationManager {
    let (store, _, _) = store();
    PopulationManager::new(store, RandomStreams::from_seed(seed))
}

/// Plain cubes, no behaviors.
pub struct CubeSource(pub PoolId);

impl SpawnSource for CubeSource {
    fn produce_spawn(&mut self, ctx: &mut SpawnContext<'_>) -> CoreResult<ShapeKey> {
        ctx.population.spawn(self.0, ShapeType(0), MaterialType(0))
    }
}

/// Random shapes with every behavior kind; every third spawn adds a moon.
pub struct BusySource {
    pub pool: PoolId,
    pub moons: PoolId,
    pub spawned: i32,
}

impl BusySource {
    pub fn new() -> Self {
        Self { pool: PoolId(0), moons: PoolId(1), spawned: 0 }
    }
}

impl SpawnSource for BusySource {
    fn produce_spawn(&mut self, ctx: &mut SpawnContext<'_>) -> CoreResult<ShapeKey> {
        let rng = &mut *ctx.rng;
        let population = &mut *ctx.population;

        let shape_type = ShapeType(rng.gen_range(0..3));
        let material = MaterialType(rng.gen_range(0..3));
        let key = population.spawn(self.pool, shape_type, material)?;

        let transform = Transform::new(
            rng.inside_unit_sphere() * 5.0,
            rng.rotation(),
            Vec3::splat(rng.range_f32(0.5, 1.5)),
        );
        if let Some(shape) = population.shape_mut(key) {
            shape.transform = transform;
        }
        let parts = population.store().shape(key).map_or(0, |shape| shape.color_count());
        for part in 0..parts {
            let color = rng.color_hsv((0.0, 1.0), (0.5, 1.0), (0.25, 1.0));
            population.store_mut().set_color_at(key, part, color);
        }

        let velocity = rng.on_unit_sphere() * rng.range_f32(0.0, 2.0);
        let angular_velocity = rng.on_unit_sphere() * rng.range_f32(0.0, 90.0);
        let offset = Vec3::Y * rng.range_f32(0.1, 0.5);
        let frequency = rng.range_f32(0.2, 1.0);
        population.with_context(key, |ctx| {
            ctx.attach_with::<MovementBehavior>(|b| b.velocity = velocity);
            ctx.attach_with::<RotationBehavior>(|b| b.angular_velocity = angular_velocity);
            ctx.attach_with::<OscillationBehavior>(|b| {
                b.offset = offset;
                b.frequency = frequency;
            });
            LifecycleBehavior::attach(ctx, 0.5, 1.5, 0.75);
        });

        self.spawned += 1;
        if self.spawned % 3 == 0 {
            let focal = population.handle_of(key);
            let moon = population.spawn(self.moons, ShapeType(0), MaterialType(0))?;
            if let Some(shape) = population.shape_mut(moon) {
                shape.transform = Transform::new(Vec3::ZERO, rng.rotation(), Vec3::splat(0.3));
            }
            population.with_context(moon, |ctx| {
                SatelliteBehavior::attach(ctx, rng, focal, 1.5, 0.4);
                LifecycleBehavior::attach(ctx, 0.25, 2.0, 0.5);
            });
        }
        Ok(key)
    }

    fn save_state(&self, writer: &mut SaveWriter) {
        writer.write_i32(self.spawned);
    }

    fn load_state(&mut self, reader: &mut SaveReader<'_>) -> CoreResult<()> {
        self.spawned = reader.read_i32()?;
        Ok(())
    }
}

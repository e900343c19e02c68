//! Integration tests for behavior effects over many ticks.

mod common;

use shapeshift_core::{
    BehaviorKind, DyingBehavior, GrowingBehavior, LifecycleBehavior, MaterialType,
    MovementBehavior, OscillationBehavior, Population, RandomStreams, SatelliteBehavior,
    ShapeBehavior, ShapeHandle, ShapeKey, ShapeType,
};
use shapeshift_shared::Vec3;

const DT: f32 = 0.02;

fn population() -> Population {
    let (store, _, _) = common::store();
    Population::new(store)
}

fn spawn(population: &mut Population) -> (ShapeKey, ShapeHandle) {
    let key = population.spawn(shapeshift_core::PoolId(0), ShapeType(0), MaterialType(0)).unwrap();
    (key, population.handle_of(key))
}

fn tick(population: &mut Population, ticks: usize) {
    for _ in 0..ticks {
        population.update_shapes(DT);
        population.apply_deferred();
    }
}

fn kinds(population: &Population, handle: ShapeHandle) -> Vec<BehaviorKind> {
    population
        .store()
        .get(handle)
        .map(|shape| shape.behaviors().iter().map(ShapeBehavior::kind).collect())
        .unwrap_or_default()
}

#[test]
fn test_movement_integrates_velocity() {
    let mut population = population();
    let (key, handle) = spawn(&mut population);
    population.with_context(key, |ctx| {
        ctx.attach_with::<MovementBehavior>(|m| m.velocity = Vec3::new(1.0, 0.0, -2.0));
    });

    tick(&mut population, 50);
    let position = population.store().get(handle).unwrap().transform.position;
    assert!((position - Vec3::new(1.0, 0.0, -2.0)).length() < 1e-3);
}

#[test]
fn test_oscillation_returns_after_full_period() {
    let mut population = population();
    let (key, handle) = spawn(&mut population);
    population.with_context(key, |ctx| {
        ctx.attach_with::<OscillationBehavior>(|o| {
            o.offset = Vec3::Y;
            o.frequency = 0.5;
        });
    });

    tick(&mut population, 25);
    let quarter = population.store().get(handle).unwrap().transform.position.y;
    assert!((quarter - 1.0).abs() < 1e-3);

    tick(&mut population, 25);
    let half = population.store().get(handle).unwrap().transform.position.y;
    assert!(half.abs() < 1e-3);
}

#[test]
fn test_lifecycle_runs_all_phases() {
    let mut population = population();
    let (key, handle) = spawn(&mut population);
    population.with_context(key, |ctx| LifecycleBehavior::attach(ctx, 0.5, 0.5, 0.5));

    let shape = population.store().get(handle).unwrap();
    assert_eq!(shape.transform.scale, Vec3::ZERO);
    assert_eq!(kinds(&population, handle), vec![BehaviorKind::Lifecycle, BehaviorKind::Growing]);

    tick(&mut population, 10);
    let scale = population.store().get(handle).unwrap().transform.scale.x;
    assert!(scale > 0.0 && scale < 1.0);

    tick(&mut population, 20);
    assert_eq!(population.store().get(handle).unwrap().transform.scale, Vec3::ONE);
    assert_eq!(kinds(&population, handle), vec![BehaviorKind::Lifecycle]);

    tick(&mut population, 22);
    assert_eq!(kinds(&population, handle), vec![BehaviorKind::Dying]);
    assert!(population.is_marked_as_dying(handle));
    assert_eq!(population.dying_count(), 1);

    tick(&mut population, 30);
    assert!(!handle.is_valid(population.store()));
    assert!(population.is_empty());
    assert!(population.behavior_pools().dying.available() >= 1);
    assert!(population.behavior_pools().lifecycle.available() >= 1);
}

#[test]
fn test_growing_only_restores_scale() {
    let mut population = population();
    let (key, handle) = spawn(&mut population);
    population.with_context(key, |ctx| GrowingBehavior::attach(ctx, 0.2));

    tick(&mut population, 11);
    let shape = population.store().get(handle).unwrap();
    assert_eq!(shape.transform.scale, Vec3::ONE);
    assert!(shape.behaviors().is_empty());
}

#[test]
fn test_dying_outside_pass_marks_immediately() {
    let mut population = population();
    let (_, first) = spawn(&mut population);
    let (key, second) = spawn(&mut population);

    population.with_context(key, |ctx| DyingBehavior::attach(ctx, 0.1));
    assert!(population.is_marked_as_dying(second));
    assert_eq!(population.handle_at(0), Some(second));

    tick(&mut population, 6);
    assert!(!second.is_valid(population.store()));
    assert!(first.is_valid(population.store()));
    assert!(population.is_consistent());
}

#[test]
fn test_satellite_orbits_then_drifts() {
    let mut streams = RandomStreams::from_seed(21);
    let mut population = population();
    let (_, focal) = spawn(&mut population);
    let (moon_key, moon) = spawn(&mut population);

    population.with_context(moon_key, |ctx| {
        SatelliteBehavior::attach(ctx, streams.session(), focal, 2.0, 0.5);
    });
    assert_eq!(kinds(&population, moon), vec![BehaviorKind::Satellite, BehaviorKind::Rotation]);

    let mut previous = Vec3::ZERO;
    for _ in 0..40 {
        previous = population.store().get(moon).unwrap().transform.position;
        tick(&mut population, 1);
        let distance = population.store().get(moon).unwrap().transform.position.length();
        assert!((distance - 2.0).abs() < 1e-3, "orbit radius drifted: {distance}");
    }

    // The focal shape disappears: the moon keeps its last velocity.
    population.kill(focal);
    let last = population.store().get(moon).unwrap().transform.position;
    tick(&mut population, 1);
    assert_eq!(kinds(&population, moon), vec![BehaviorKind::Rotation, BehaviorKind::Movement]);

    let drifted = population.store().get(moon).unwrap().transform.position;
    let expected = last + (last - previous);
    assert!((drifted - expected).length() < 1e-4);
}

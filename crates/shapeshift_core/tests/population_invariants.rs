//! Integration tests for the dying partition and deferred mutation.

mod common;

use std::collections::HashSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use shapeshift_core::{
    LifecycleBehavior, MaterialType, Population, ShapeHandle, ShapeType,
};

fn populated(count: usize) -> (Population, Vec<ShapeHandle>) {
    let (store, main, _) = common::store();
    let mut population = Population::new(store);
    let handles = (0..count)
        .map(|_| {
            let key = population.spawn(main, ShapeType(0), MaterialType(0)).unwrap();
            population.handle_of(key)
        })
        .collect();
    (population, handles)
}

/// Attaches a lifecycle that kills the shape on its first update.
fn doom(population: &mut Population, handle: ShapeHandle) {
    let key = handle.key().unwrap();
    population
        .with_context(key, |ctx| LifecycleBehavior::attach(ctx, 0.0, 0.0, 0.0))
        .unwrap();
}

fn live_set(population: &Population) -> HashSet<(u16, u32)> {
    population.keys().iter().map(|key| (key.pool.0, key.slot)).collect()
}

#[test]
fn test_random_kill_and_mark_sequences_keep_invariants() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let (mut population, mut handles) = populated(40);
    let mut marked: HashSet<ShapeHandle> = HashSet::new();

    for step in 0..400 {
        if step % 5 == 0 {
            let key = population.spawn(shapeshift_core::PoolId(0), ShapeType(1), MaterialType(2)).unwrap();
            handles.push(population.handle_of(key));
        }
        let handle = handles[rng.gen_range(0..handles.len())];
        if rng.gen_bool(0.4) {
            population.kill(handle);
            marked.remove(&handle);
        } else {
            population.mark_as_dying(handle);
            if handle.is_valid(population.store()) {
                marked.insert(handle);
            }
        }

        assert!(population.is_consistent(), "index invariant broken at step {step}");
        for index in 0..population.len() {
            let handle = population.handle_at(index).unwrap();
            assert_eq!(index < population.dying_count(), marked.contains(&handle));
        }
    }
}

#[test]
fn test_deferred_kills_match_immediate_kills() {
    let victims = [0_usize, 3, 4, 7, 9];

    let (mut deferred, handles) = populated(10);
    for &index in &victims {
        doom(&mut deferred, handles[index]);
    }
    deferred.update_shapes(0.02);
    assert_eq!(deferred.len(), 10, "kills must wait for the end of the pass");
    let report = deferred.apply_deferred();
    assert_eq!(report.killed, victims.len());

    let (mut immediate, handles) = populated(10);
    for &index in &victims {
        immediate.kill(handles[index]);
    }

    assert_eq!(live_set(&deferred), live_set(&immediate));
    assert!(deferred.is_consistent());
}

#[test]
fn test_double_kill_in_pass_removes_once() {
    let (mut population, handles) = populated(5);
    // Two schedulers on one shape: both request the kill in the same pass.
    doom(&mut population, handles[2]);
    doom(&mut population, handles[2]);

    population.update_shapes(0.02);
    let report = population.apply_deferred();

    assert_eq!(population.len(), 4);
    assert_eq!(report.killed, 1);
    assert_eq!(report.dropped, 1);
    assert!(!handles[2].is_valid(population.store()));
    assert!(population.is_consistent());
}

#[test]
fn test_generation_changes_on_every_reuse() {
    let (mut population, handles) = populated(1);
    let key = handles[0].key().unwrap();
    let mut seen = vec![handles[0].generation().unwrap()];
    let mut stale = vec![handles[0]];

    for _ in 0..5 {
        population.kill(population.handle_of(key));
        let again = population.spawn(key.pool, ShapeType(0), MaterialType(1)).unwrap();
        assert_eq!(again, key, "recycling pool reuses the same memory");

        let generation = population.handle_of(again).generation().unwrap();
        assert!(!seen.contains(&generation));
        seen.push(generation);
        assert!(stale.iter().all(|h| !h.is_valid(population.store())));
        stale.push(population.handle_of(again));
    }
}

#[test]
fn test_marking_twice_keeps_order() {
    let (mut population, handles) = populated(6);
    population.mark_as_dying(handles[4]);
    population.mark_as_dying(handles[1]);
    let order = population.keys().to_vec();

    population.mark_as_dying(handles[4]);
    population.mark_as_dying(handles[1]);

    assert_eq!(population.dying_count(), 2);
    assert_eq!(population.keys(), order.as_slice());
}

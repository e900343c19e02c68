//! # Population Manager
//!
//! Drives one fixed tick:
//!
//! 1. update every shape's behaviors (requests are queued)
//! 2. let the spawn source spawn on its own schedule
//! 3. spawn quota: one spawn per whole unit of accumulated progress
//! 4. destroy quota: kill or start dying a random alive shape per whole unit
//! 5. population ceiling: kill random alive shapes until under the limit
//! 6. drain the kill queue, then the mark-dying queue

use rand_chacha::ChaCha8Rng;

use crate::error::{CoreError, CoreResult};
use crate::handle::ShapeKey;
use crate::persistence::{SaveReader, SaveWriter};
use crate::pool::ShapeStore;
use crate::population::{DeferredReport, Population};
use crate::random::{RandomExt, RandomStreams};

/// Something that can produce configured shapes: a spawn zone.
pub trait SpawnSource {
    /// Picks a pooled shape, places it, decorates it and attaches its behaviors.
    ///
    /// The shape must be added to `ctx.population`; the manager tracks it from here.
    ///
    /// # Errors
    ///
    /// Fails if the source names an unknown pool, shape type or material.
    fn produce_spawn(&mut self, ctx: &mut SpawnContext<'_>) -> CoreResult<ShapeKey>;

    /// Spawns at the source's own rate. Called once per tick, after the update
    /// pass and before the spawn quota. Returns how many shapes were produced.
    ///
    /// # Errors
    ///
    /// Returns the first failed spawn; later spawns of the same call still run.
    fn advance(&mut self, _delta_time: f32, _ctx: &mut SpawnContext<'_>) -> CoreResult<usize> {
        Ok(0)
    }

    /// Writes state that must survive a save (level state block).
    fn save_state(&self, _writer: &mut SaveWriter) {}

    /// Reads back what [`SpawnSource::save_state`] wrote.
    ///
    /// # Errors
    ///
    /// Fails on malformed data.
    fn load_state(&mut self, _reader: &mut SaveReader<'_>) -> CoreResult<()> {
        Ok(())
    }
}

/// Mutable access handed to a [`SpawnSource`].
pub struct SpawnContext<'a> {
    /// The population to add shapes to.
    pub population: &'a mut Population,
    /// Session random stream.
    pub rng: &'a mut ChaCha8Rng,
}

/// Spawn/destroy rates and their fractional progress.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProgressCounters {
    /// Spawns per second.
    pub creation_speed: f32,
    /// Fraction of the next spawn accumulated.
    pub creation_progress: f32,
    /// Destructions per second.
    pub destruction_speed: f32,
    /// Fraction of the next destruction accumulated.
    pub destruction_progress: f32,
}

/// What one tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Shapes produced by the spawn quota.
    pub spawned: usize,
    /// Shapes the spawn source produced at its own rate.
    pub source_spawned: usize,
    /// Shapes killed or sent dying by the destroy quota.
    pub destroyed: usize,
    /// Shapes killed to respect the population limit.
    pub culled: usize,
    /// Deferred queue results.
    pub deferred: DeferredReport,
}

/// Population plus quotas and random streams.
#[derive(Debug)]
pub struct PopulationManager {
    population: Population,
    random: RandomStreams,
    counters: ProgressCounters,
    /// Death-transition duration used by the destroy quota. Zero kills outright.
    destroy_duration: f32,
    /// Maximum alive shapes. Zero disables the ceiling.
    population_limit: usize,
}

impl PopulationManager {
    /// Creates a manager over `store`.
    #[must_use]
    pub fn new(store: ShapeStore, random: RandomStreams) -> Self {
        Self {
            population: Population::new(store),
            random,
            counters: ProgressCounters::default(),
            destroy_duration: 0.0,
            population_limit: 0,
        }
    }

    /// The population.
    #[inline]
    #[must_use]
    pub const fn population(&self) -> &Population {
        &self.population
    }

    /// Mutable population.
    #[inline]
    pub fn population_mut(&mut self) -> &mut Population {
        &mut self.population
    }

    /// Random streams.
    #[inline]
    #[must_use]
    pub const fn random(&self) -> &RandomStreams {
        &self.random
    }

    /// Mutable random streams.
    #[inline]
    pub fn random_mut(&mut self) -> &mut RandomStreams {
        &mut self.random
    }

    /// Rates and progress.
    #[inline]
    #[must_use]
    pub const fn counters(&self) -> ProgressCounters {
        self.counters
    }

    /// Replaces rates and progress.
    pub fn set_counters(&mut self, counters: ProgressCounters) {
        self.counters = counters;
    }

    /// Sets the spawn rate (per second).
    pub fn set_creation_speed(&mut self, speed: f32) {
        self.counters.creation_speed = speed.max(0.0);
    }

    /// Sets the destroy rate (per second).
    pub fn set_destruction_speed(&mut self, speed: f32) {
        self.counters.destruction_speed = speed.max(0.0);
    }

    /// Death-transition duration for quota kills.
    #[inline]
    #[must_use]
    pub const fn destroy_duration(&self) -> f32 {
        self.destroy_duration
    }

    /// Sets the death-transition duration for quota kills.
    pub fn set_destroy_duration(&mut self, duration: f32) {
        self.destroy_duration = duration;
    }

    /// Alive-shape ceiling (zero = none).
    #[inline]
    #[must_use]
    pub const fn population_limit(&self) -> usize {
        self.population_limit
    }

    /// Sets the alive-shape ceiling.
    pub fn set_population_limit(&mut self, limit: usize) {
        self.population_limit = limit;
    }

    /// Starts a new session: reseeds the session stream, reclaims every shape
    /// and resets progress.
    pub fn begin_new_game(&mut self) {
        self.random.begin_session();
        self.population.clear();
        self.counters.creation_progress = 0.0;
        self.counters.destruction_progress = 0.0;
        tracing::info!("new game started");
    }

    /// Asks `source` for one shape.
    ///
    /// # Errors
    ///
    /// Propagates the source's failure.
    pub fn spawn(&mut self, source: &mut dyn SpawnSource) -> CoreResult<ShapeKey> {
        let mut ctx = SpawnContext { population: &mut self.population, rng: self.random.session() };
        source.produce_spawn(&mut ctx)
    }

    /// Picks a random alive shape and kills it, or starts it dying when a
    /// destroy duration is configured. Returns false if nothing was alive.
    pub fn destroy_random(&mut self) -> bool {
        let Some(handle) = self.pick_alive() else {
            return false;
        };
        if self.destroy_duration <= 0.0 {
            self.population.kill(handle);
        } else {
            self.population.start_dying(handle, self.destroy_duration);
        }
        true
    }

    fn pick_alive(&mut self) -> Option<crate::handle::ShapeHandle> {
        if self.population.alive_count() == 0 {
            return None;
        }
        let index =
            self.random.session().index_in(self.population.dying_count(), self.population.len());
        self.population.handle_at(index)
    }

    /// Advances the simulation by `delta_time` seconds.
    ///
    /// # Errors
    ///
    /// Returns the first spawn failure. The tick still runs to completion, so the
    /// population is consistent either way.
    pub fn tick(&mut self, delta_time: f32, source: &mut dyn SpawnSource) -> CoreResult<TickReport> {
        let mut report = TickReport::default();
        let mut failure: Option<CoreError> = None;

        self.population.update_shapes(delta_time);

        let mut ctx = SpawnContext { population: &mut self.population, rng: self.random.session() };
        match source.advance(delta_time, &mut ctx) {
            Ok(spawned) => report.source_spawned = spawned,
            Err(err) => {
                tracing::error!(%err, "source spawn failed");
                failure.get_or_insert(err);
            }
        }

        self.counters.creation_progress += delta_time * self.counters.creation_speed;
        while self.counters.creation_progress >= 1.0 {
            self.counters.creation_progress -= 1.0;
            match self.spawn(source) {
                Ok(_) => report.spawned += 1,
                Err(err) => {
                    tracing::error!(%err, "spawn failed");
                    failure.get_or_insert(err);
                }
            }
        }

        self.counters.destruction_progress += delta_time * self.counters.destruction_speed;
        while self.counters.destruction_progress >= 1.0 {
            self.counters.destruction_progress -= 1.0;
            if self.destroy_random() {
                report.destroyed += 1;
            }
        }

        if self.population_limit > 0 {
            while self.population.alive_count() > self.population_limit {
                let before = self.population.alive_count();
                if let Some(handle) = self.pick_alive() {
                    self.population.kill(handle);
                }
                if self.population.alive_count() >= before {
                    break;
                }
                report.culled += 1;
            }
        }

        report.deferred = self.population.apply_deferred();
        tracing::trace!(?report, population = self.population.len(), "tick");

        match failure {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{MaterialType, PoolId, ShapeType};
    use crate::pool::{ShapeFactory, ShapePrefab};

    struct CubeSource(PoolId);

    impl SpawnSource for CubeSource {
        fn produce_spawn(&mut self, ctx: &mut SpawnContext<'_>) -> CoreResult<ShapeKey> {
            ctx.population.spawn(self.0, ShapeType(0), MaterialType(0))
        }
    }

    fn manager() -> (PopulationManager, CubeSource) {
        let mut store = ShapeStore::new();
        let pool = store.register(ShapeFactory::new(vec![ShapePrefab::new("cube", 1)], 1, true)).unwrap();
        (PopulationManager::new(store, RandomStreams::from_seed(1)), CubeSource(pool))
    }

    #[test]
    fn test_spawn_quota_keeps_remainder() {
        let (mut manager, mut source) = manager();
        manager.set_creation_speed(3.0);
        let report = manager.tick(0.5, &mut source).unwrap();
        assert_eq!(report.spawned, 1);
        assert_eq!(manager.population().len(), 1);
        assert!((manager.counters().creation_progress - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_destroy_with_empty_population_is_noop() {
        let (mut manager, mut source) = manager();
        manager.set_destruction_speed(10.0);
        let report = manager.tick(1.0, &mut source).unwrap();
        assert_eq!(report.destroyed, 0);
        assert!(manager.counters().destruction_progress < 1.0);
    }

    #[test]
    fn test_destroy_with_duration_marks_dying() {
        let (mut manager, mut source) = manager();
        for _ in 0..3 {
            manager.spawn(&mut source).unwrap();
        }
        manager.set_destroy_duration(1.0);
        assert!(manager.destroy_random());
        assert_eq!(manager.population().len(), 3);
        assert_eq!(manager.population().dying_count(), 1);
        assert!(manager.population().is_consistent());
    }

    #[test]
    fn test_population_limit_culls_alive_shapes() {
        let (mut manager, mut source) = manager();
        for _ in 0..6 {
            manager.spawn(&mut source).unwrap();
        }
        manager.set_population_limit(4);
        let report = manager.tick(0.02, &mut source).unwrap();
        assert_eq!(report.culled, 2);
        assert_eq!(manager.population().alive_count(), 4);
    }

    /// Spawns `per_tick` cubes from `advance` and nothing else.
    struct BurstSource {
        cubes: CubeSource,
        per_tick: usize,
    }

    impl SpawnSource for BurstSource {
        fn produce_spawn(&mut self, ctx: &mut SpawnContext<'_>) -> CoreResult<ShapeKey> {
            self.cubes.produce_spawn(ctx)
        }

        fn advance(&mut self, _delta_time: f32, ctx: &mut SpawnContext<'_>) -> CoreResult<usize> {
            for _ in 0..self.per_tick {
                self.produce_spawn(ctx)?;
            }
            Ok(self.per_tick)
        }
    }

    #[test]
    fn test_source_spawns_respect_population_limit() {
        let (mut manager, cubes) = manager();
        let mut source = BurstSource { cubes, per_tick: 3 };
        manager.set_population_limit(2);

        let report = manager.tick(0.02, &mut source).unwrap();
        assert_eq!(report.source_spawned, 3);
        assert_eq!(report.spawned, 0);
        assert_eq!(report.culled, 1);
        assert_eq!(manager.population().alive_count(), 2);
        assert!(manager.population().is_consistent());
    }

    #[test]
    fn test_spawn_failure_is_surfaced() {
        let (mut manager, _) = manager();
        let mut broken = CubeSource(PoolId(9));
        manager.set_creation_speed(1.0);
        assert_eq!(manager.tick(1.0, &mut broken), Err(CoreError::UnknownPool(9)));
        assert_eq!(manager.counters().creation_progress, 0.0);
    }

    #[test]
    fn test_new_game_resets() {
        let (mut manager, mut source) = manager();
        manager.set_creation_speed(1.5);
        manager.tick(1.0, &mut source).unwrap();
        let old_session = manager.random().session_state();

        manager.begin_new_game();
        assert!(manager.population().is_empty());
        assert_eq!(manager.counters().creation_progress, 0.0);
        assert_eq!(manager.counters().creation_speed, 1.5);
        assert_ne!(manager.random().session_state(), old_session);
    }
}

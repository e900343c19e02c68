//! # Levels
//!
//! A level is one spawn zone tree plus its kill and life zones and a
//! population limit. The level index is stored in save files; the spawn
//! zone tree's cursors and spawn progress travel with it as the level state
//! block. Zones with their own spawn rate spawn during the tick, before the
//! population limit is enforced.

use std::collections::HashMap;

use shapeshift_core::{
    CoreResult, PoolId, Population, SaveReader, SaveWriter, ShapeKey, SpawnContext, SpawnSource,
};

use crate::config::LevelConfig;
use crate::error::GameResult;
use crate::spawn_zone::SpawnZone;
use crate::zones::{KillZone, LifeZone};

/// A loaded level.
#[derive(Clone, Debug)]
pub struct Level {
    index: i32,
    name: String,
    population_limit: usize,
    spawn_zone: SpawnZone,
    kill_zones: Vec<KillZone>,
    life_zones: Vec<LifeZone>,
}

impl Level {
    /// Builds level `index` (1-based) from its configuration.
    ///
    /// # Errors
    ///
    /// Fails if the spawn zone names an unknown factory.
    pub fn from_config(
        index: i32,
        config: &LevelConfig,
        pools: &HashMap<String, PoolId>,
    ) -> GameResult<Self> {
        Ok(Self {
            index,
            name: config.name.clone(),
            population_limit: config.population_limit,
            spawn_zone: SpawnZone::from_config(&config.spawn_zone, pools)?,
            kill_zones: config.kill_zones.iter().map(KillZone::from).collect(),
            life_zones: config.life_zones.iter().map(LifeZone::from).collect(),
        })
    }

    /// 1-based level index.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> i32 {
        self.index
    }

    /// Display name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maximum alive shapes. Zero means unlimited.
    #[inline]
    #[must_use]
    pub const fn population_limit(&self) -> usize {
        self.population_limit
    }

    /// Root spawn zone.
    #[inline]
    #[must_use]
    pub const fn spawn_zone(&self) -> &SpawnZone {
        &self.spawn_zone
    }

    /// Evaluates every kill zone, then every life zone.
    ///
    /// Must run outside the update pass. Returns how many shapes were affected.
    pub fn apply_zones(&mut self, population: &mut Population) -> usize {
        let killed: usize = self.kill_zones.iter_mut().map(|zone| zone.apply(population)).sum();
        let expired: usize = self.life_zones.iter_mut().map(|zone| zone.apply(population)).sum();
        killed + expired
    }

    /// Re-reads which shapes are inside each life zone after the population
    /// was replaced.
    pub fn sync_zones(&mut self, population: &Population) {
        for zone in &mut self.life_zones {
            zone.sync(population);
        }
    }
}

impl SpawnSource for Level {
    fn produce_spawn(&mut self, ctx: &mut SpawnContext<'_>) -> CoreResult<ShapeKey> {
        self.spawn_zone.produce_spawn(ctx)
    }

    fn advance(&mut self, delta_time: f32, ctx: &mut SpawnContext<'_>) -> CoreResult<usize> {
        self.spawn_zone.advance(delta_time, ctx)
    }

    fn save_state(&self, writer: &mut SaveWriter) {
        self.spawn_zone.save_state(writer);
    }

    fn load_state(&mut self, reader: &mut SaveReader<'_>) -> CoreResult<()> {
        self.spawn_zone.load_state(reader)
    }
}

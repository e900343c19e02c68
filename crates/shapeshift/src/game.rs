//! # Game
//!
//! Owns the population manager, the active level and the save slot, and
//! turns [`GameCommand`]s into state changes.
//!
//! ## Tick order
//!
//! ```text
//! ┌──────────────────────┐     ┌──────────────────────┐
//! │ PopulationManager    │────>│ Level zones          │
//! │ update/spawn/destroy │     │ kill zones           │
//! │ ceiling/deferred     │     │ life zones           │
//! └──────────────────────┘     └──────────────────────┘
//! ```
//!
//! Zones run after the deferred queues are drained, so their kills apply
//! immediately.
//!
//! ## Loading
//!
//! A load decodes the blob, builds the saved level as a candidate and
//! applies the save against it. Live state changes only if every step
//! succeeds.

use std::collections::HashMap;

use shapeshift_core::{
    PoolId, Population, PopulationManager, RandomStreams, SaveCodec, ShapeFactory, ShapePrefab,
    ShapeStore, TickReport,
};

use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::level::Level;
use crate::storage::Storage;

/// Player-facing actions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GameCommand {
    // =========================================================================
    // Population
    // =========================================================================
    /// Spawn one shape from the level's spawn zone.
    CreateShape,
    /// Kill a random alive shape, or start it dying.
    DestroyShape,
    /// Spawns per second.
    SetCreationSpeed(f32),
    /// Destructions per second.
    SetDestructionSpeed(f32),

    // =========================================================================
    // Session
    // =========================================================================
    /// Reseed the session stream and clear the population.
    NewGame,
    /// Write the current state to storage.
    Save,
    /// Replace the current state with the stored one.
    Load,
    /// Start a new game in level `n` (1-based).
    LoadLevel(i32),
}

/// The running game.
pub struct Game {
    config: GameConfig,
    manager: PopulationManager,
    level: Level,
    storage: Box<dyn Storage>,
    pools: HashMap<String, PoolId>,
}

impl Game {
    /// Registers the configured factories, seeds the random streams and
    /// starts a new game in level 1.
    ///
    /// # Errors
    ///
    /// Returns `Config` for invalid settings and `Core` if a factory cannot be
    /// registered.
    pub fn new(config: GameConfig, storage: Box<dyn Storage>) -> GameResult<Self> {
        config.validate()?;

        let mut store = ShapeStore::new();
        let mut pools = HashMap::with_capacity(config.factories.len());
        for factory in &config.factories {
            let prefabs = factory
                .shapes
                .iter()
                .map(|shape| ShapePrefab::new(shape.name.clone(), shape.color_slots))
                .collect();
            let id = store.register(ShapeFactory::new(
                prefabs,
                factory.materials.len() as u16,
                factory.recycle,
            ))?;
            pools.insert(factory.name.clone(), id);
        }

        let random = config.seed.map_or_else(RandomStreams::from_entropy, RandomStreams::from_seed);
        let mut manager = PopulationManager::new(store, random);
        manager.set_creation_speed(config.creation_speed);
        manager.set_destruction_speed(config.destruction_speed);
        manager.set_destroy_duration(config.destroy_duration);

        let level = build_level(&config, &pools, 1)?;
        manager.set_population_limit(level.population_limit());
        manager.begin_new_game();

        tracing::info!(
            factories = pools.len(),
            levels = config.levels.len(),
            seed = ?config.seed,
            "game initialised"
        );
        Ok(Self { config, manager, level, storage, pools })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Settings the game was created with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Population manager.
    #[inline]
    #[must_use]
    pub const fn manager(&self) -> &PopulationManager {
        &self.manager
    }

    /// Live population.
    #[inline]
    #[must_use]
    pub const fn population(&self) -> &Population {
        self.manager.population()
    }

    /// Active level.
    #[inline]
    #[must_use]
    pub const fn level(&self) -> &Level {
        &self.level
    }

    /// Pool id of a configured factory.
    #[must_use]
    pub fn pool(&self, factory: &str) -> Option<PoolId> {
        self.pools.get(factory).copied()
    }

    /// Length of one simulation tick in seconds.
    #[inline]
    #[must_use]
    pub fn fixed_delta(&self) -> f32 {
        self.config.fixed_delta()
    }

    // =========================================================================
    // Simulation
    // =========================================================================

    /// Runs one tick, with the level's own zone spawns, and then the level's
    /// kill and life zones.
    ///
    /// # Errors
    ///
    /// Returns the first spawn failure of the tick. The tick and the zones
    /// still ran, so the population is consistent either way.
    pub fn update(&mut self, delta_time: f32) -> GameResult<TickReport> {
        let result = self.manager.tick(delta_time, &mut self.level);
        let zoned = self.level.apply_zones(self.manager.population_mut());
        if zoned > 0 {
            tracing::trace!(zoned, "zones applied");
        }
        Ok(result?)
    }

    /// Executes one command.
    ///
    /// # Errors
    ///
    /// Fails on spawn errors, storage errors, malformed saves and unknown
    /// levels. Failed loads leave the game untouched.
    pub fn execute(&mut self, command: GameCommand) -> GameResult<()> {
        tracing::debug!(?command, "executing command");
        match command {
            GameCommand::CreateShape => {
                self.manager.spawn(&mut self.level)?;
            }
            GameCommand::DestroyShape => {
                self.manager.destroy_random();
            }
            GameCommand::SetCreationSpeed(speed) => self.manager.set_creation_speed(speed),
            GameCommand::SetDestructionSpeed(speed) => self.manager.set_destruction_speed(speed),
            GameCommand::NewGame => self.begin_new_game(),
            GameCommand::Save => {
                let bytes = self.save_bytes();
                self.storage.save(&bytes)?;
            }
            GameCommand::Load => {
                let bytes = self.storage.load()?;
                self.load_bytes(&bytes)?;
            }
            GameCommand::LoadLevel(index) => self.load_level(index)?,
        }
        Ok(())
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Reseeds the session stream, reclaims every shape and resets progress.
    pub fn begin_new_game(&mut self) {
        self.manager.begin_new_game();
        self.level.sync_zones(self.manager.population());
    }

    /// Starts a new game in level `index` (1-based).
    ///
    /// # Errors
    ///
    /// Returns `UnknownLevel` without touching the current game.
    pub fn load_level(&mut self, index: i32) -> GameResult<()> {
        let mut level = build_level(&self.config, &self.pools, index)?;
        self.manager.begin_new_game();
        self.manager.set_population_limit(level.population_limit());
        level.sync_zones(self.manager.population());
        tracing::info!(index, name = level.name(), "level loaded");
        self.level = level;
        Ok(())
    }

    /// Serialises the current state.
    #[must_use]
    pub fn save_bytes(&self) -> Vec<u8> {
        SaveCodec::save(&self.manager, self.level.index(), &self.level)
    }

    /// Replaces the current state with a saved one.
    ///
    /// # Errors
    ///
    /// Fails on malformed data, unknown ids or an unknown level; the game is
    /// untouched in that case.
    pub fn load_bytes(&mut self, bytes: &[u8]) -> GameResult<()> {
        let save = SaveCodec::decode(bytes)?;
        let mut candidate = build_level(&self.config, &self.pools, save.level_index)?;
        let reseed = self.config.reseed_on_load;

        SaveCodec::apply(save, &mut self.manager, &mut candidate, reseed)?;

        self.manager.set_population_limit(candidate.population_limit());
        candidate.sync_zones(self.manager.population());
        self.level = candidate;
        if reseed {
            self.manager.random_mut().begin_session();
        }
        tracing::info!(
            level = self.level.index(),
            shapes = self.manager.population().len(),
            "save restored"
        );
        Ok(())
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("level", &self.level.index())
            .field("population", &self.manager.population().len())
            .field("counters", &self.manager.counters())
            .finish_non_exhaustive()
    }
}

/// Builds level `index` (1-based) from `config`.
fn build_level(config: &GameConfig, pools: &HashMap<String, PoolId>, index: i32) -> GameResult<Level> {
    let level_config = usize::try_from(index)
        .ok()
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| config.levels.get(i))
        .ok_or(GameError::UnknownLevel { requested: index, available: config.levels.len() })?;
    Level::from_config(index, level_config, pools)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn game() -> Game {
        let config = GameConfig { seed: Some(42), ..GameConfig::default() };
        Game::new(config, Box::new(MemoryStorage::new())).unwrap()
    }

    #[test]
    fn test_new_game_starts_in_level_one() {
        let game = game();
        assert_eq!(game.level().index(), 1);
        assert!(game.population().is_empty());
        assert_eq!(game.manager().population_limit(), game.level().population_limit());
        assert!(game.pool("shapes").is_some());
        assert!(game.pool("missing").is_none());
    }

    #[test]
    fn test_commands_create_and_destroy() {
        let mut game = game();
        game.execute(GameCommand::CreateShape).unwrap();
        assert!(game.population().alive_count() >= 1);

        let alive = game.population().alive_count();
        game.execute(GameCommand::DestroyShape).unwrap();
        assert_eq!(game.population().alive_count(), alive - 1);
    }

    #[test]
    fn test_unknown_level_is_rejected() {
        let mut game = game();
        game.execute(GameCommand::CreateShape).unwrap();
        let before = game.population().len();

        for index in [0, -1, 3] {
            let err = game.execute(GameCommand::LoadLevel(index)).unwrap_err();
            assert_eq!(err, GameError::UnknownLevel { requested: index, available: 2 });
        }
        assert_eq!(game.level().index(), 1);
        assert_eq!(game.population().len(), before);
    }

    #[test]
    fn test_load_level_resets_population() {
        let mut game = game();
        game.execute(GameCommand::CreateShape).unwrap();
        game.execute(GameCommand::LoadLevel(2)).unwrap();
        assert_eq!(game.level().index(), 2);
        assert!(game.population().is_empty());
        assert_eq!(game.manager().population_limit(), 60);
    }

    #[test]
    fn test_load_without_save_fails() {
        let mut game = game();
        assert!(matches!(game.execute(GameCommand::Load), Err(GameError::Storage(_))));
    }
}

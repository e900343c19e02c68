//! # SHAPESHIFT
//!
//! The game layer on top of the lifecycle engine: levels built from TOML
//! configuration, spawn zones that decorate new shapes, kill and life zones,
//! a single save slot and a fixed-step loop. Input arrives as
//! [`GameCommand`]s, so the whole game runs headless.
//!
//! ## Modules
//!
//! - `config`: TOML settings, factories and level definitions
//! - `spawn_zone`: cube, sphere and composite spawn zones
//! - `zones`: kill zones and life zones
//! - `level`: one spawn zone tree plus its zones
//! - `storage`: file and in-memory save slots
//! - `game`: commands, save/load and the per-tick zone pass
//! - `game_loop`: fixed-step driver and frame statistics
//!
//! ## Example
//!
//! ```rust,ignore
//! use shapeshift::{Game, GameCommand, GameConfig, MemoryStorage};
//!
//! let mut game = Game::new(GameConfig::default(), Box::new(MemoryStorage::new()))?;
//! game.execute(GameCommand::CreateShape)?;
//! game.update(game.fixed_delta())?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod game;
pub mod game_loop;
pub mod level;
pub mod spawn_zone;
pub mod storage;
pub mod zones;

// Re-export the engine
pub use shapeshift_core as core;
pub use shapeshift_shared as shared;

pub use config::GameConfig;
pub use error::{GameError, GameResult};
pub use game::{Game, GameCommand};
pub use game_loop::{FrameStats, FrameStatsAccumulator, GameLoop, GameLoopConfig};
pub use level::Level;
pub use spawn_zone::SpawnZone;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use zones::{KillZone, LifeZone, Volume};

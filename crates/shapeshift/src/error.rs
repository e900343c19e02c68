//! # Game Error Types
//!
//! Everything above the core that can fail: configuration, storage and
//! level selection. Core failures pass through unchanged.

use shapeshift_core::CoreError;
use thiserror::Error;

/// Errors raised by the game layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// Failure inside the simulation core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Invalid or unreadable configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The save blob could not be written or read.
    #[error("storage failure: {0}")]
    Storage(String),

    /// A level index outside the configured range.
    #[error("unknown level {requested}: {available} levels configured")]
    UnknownLevel {
        /// The requested level index (1-based).
        requested: i32,
        /// Number of configured levels.
        available: usize,
    },
}

/// Result type for game operations.
pub type GameResult<T> = Result<T, GameError>;

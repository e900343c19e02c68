//! # SHAPESHIFT Core
//!
//! Entity lifecycle engine for a population of short-lived shapes:
//! - recycling pools that hand out generational handles
//! - pooled, composable per-shape behaviors
//! - a tick loop that defers structural changes until iteration is over
//! - versioned binary saves that capture the random stream exactly
//!
//! ## Architecture Rules
//!
//! 1. **Single thread** - one fixed tick, no shared state between threads
//! 2. **Pools own memory** - the population only stores keys
//! 3. **Handles observe** - a stale handle means "gone", never a fault
//!
//! ## Example
//!
//! ```rust,ignore
//! use shapeshift_core::{PopulationManager, RandomStreams, ShapeStore};
//!
//! let manager = PopulationManager::new(ShapeStore::new(), RandomStreams::from_seed(7));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod behavior;
pub mod error;
pub mod handle;
pub mod ids;
pub mod manager;
pub mod persistence;
pub mod pool;
pub mod population;
pub mod random;
pub mod render;
pub mod shape;

pub use behavior::{
    BehaviorContext, BehaviorKind, BehaviorPools, BehaviorVariant, DyingBehavior,
    GrowingBehavior, LifecycleBehavior, MovementBehavior, OscillationBehavior, RotationBehavior,
    SatelliteBehavior, ShapeBehavior,
};
pub use error::{CoreError, CoreResult};
pub use handle::{ShapeHandle, ShapeKey};
pub use ids::{MaterialType, PoolId, ShapeType, WriteOnce};
pub use manager::{PopulationManager, ProgressCounters, SpawnContext, SpawnSource, TickReport};
pub use persistence::{SaveCodec, SaveGame, SaveReader, SaveWriter, SAVE_VERSION};
pub use pool::{ShapeFactory, ShapePrefab, ShapeStore};
pub use population::{DeferredReport, Population};
pub use random::{RandomExt, RandomState, RandomStreams};
pub use render::{NullRenderBinding, RenderBinding};
pub use shape::Shape;

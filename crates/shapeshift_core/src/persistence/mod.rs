//! # Persistence
//!
//! Versioned binary saves. The first field is the format version, stored negated;
//! files from before versioning start with a non-negative shape count instead.
//!
//! Loading is two-phase: [`SaveCodec::decode`] builds a [`SaveGame`] without
//! touching live state, [`SaveCodec::apply`] validates it against the pools and
//! only then replaces the population. A bad file never leaves a half-loaded game.

mod codec;
mod io;

pub use codec::{SaveCodec, SaveGame, SavedColors, SavedShape, SAVE_VERSION};
pub use io::{SaveReader, SaveWriter};

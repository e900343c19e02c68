//! # Core Error Types
//!
//! All errors that can occur in the lifecycle engine.
//!
//! Protocol violations (`IdentifierAlreadySet`, `ForeignPool`, unknown ids) are
//! programming errors: the offending call is refused and population state is left
//! untouched. Pool errors (`PoolExhausted`, `PoolCorrupted`, `TooManyPools`) are
//! resource failures at allocation or registration time. Persistence errors abort a load before anything live is modified.
//! Stale handles are not errors at all.

use thiserror::Error;

/// Errors that can occur in the core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A write-once identifier was assigned a second time.
    #[error("{what} already set to {existing}, refusing to overwrite with {attempted}")]
    IdentifierAlreadySet {
        /// Which identifier.
        what: &'static str,
        /// Value already stored.
        existing: i64,
        /// Value that was rejected.
        attempted: i64,
    },

    /// A pool was asked to reclaim a shape it did not allocate.
    #[error("pool {pool} cannot reclaim a shape owned by pool {owner}")]
    ForeignPool {
        /// Pool that received the request.
        pool: u16,
        /// Pool that owns the shape.
        owner: u16,
    },

    /// No pool is registered under this id.
    #[error("unknown pool: {0}")]
    UnknownPool(i32),

    /// The pool cannot address another slot.
    #[error("pool {pool} is out of slots")]
    PoolExhausted {
        /// Pool that was asked.
        pool: u16,
    },

    /// A pool slot is not in the state its bookkeeping says it is in.
    #[error("pool {pool} slot {slot} is inconsistent: {reason}")]
    PoolCorrupted {
        /// Pool that owns the slot.
        pool: u16,
        /// Slot index.
        slot: u32,
        /// What was found.
        reason: &'static str,
    },

    /// The store cannot assign another pool id.
    #[error("no pool id left after {registered} registered pools")]
    TooManyPools {
        /// Pools already registered.
        registered: usize,
    },

    /// The pool has no prefab for this shape type.
    #[error("pool {pool} has no shape type {shape_type}")]
    UnknownShapeType {
        /// Pool that was asked.
        pool: u16,
        /// Requested shape type.
        shape_type: i32,
    },

    /// The pool has no material with this id.
    #[error("pool {pool} has no material {material}")]
    UnknownMaterial {
        /// Pool that was asked.
        pool: u16,
        /// Requested material.
        material: i32,
    },

    /// A save file named a behavior tag this build does not implement.
    #[error("unknown behavior tag: {0}")]
    UnknownBehavior(i32),

    /// The save file was written by a newer build.
    #[error("unsupported future save version {found} (newest readable: {supported})")]
    UnsupportedVersion {
        /// Version found in the file.
        found: i32,
        /// Newest version this build reads.
        supported: i32,
    },

    /// The save data ended before a field could be read.
    #[error("save data truncated: needed {needed} bytes at offset {offset}, {available} left")]
    Truncated {
        /// Byte offset of the failed read.
        offset: usize,
        /// Bytes the read needed.
        needed: usize,
        /// Bytes remaining.
        available: usize,
    },

    /// The save data is structurally invalid.
    #[error("invalid save data: {0}")]
    InvalidSaveData(String),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

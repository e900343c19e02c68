//! # Shape Handles
//!
//! Shapes are addressed by a [`ShapeKey`] (pool + slot) that stays the same for
//! as long as the pool keeps the memory. A [`ShapeHandle`] pairs a key with the
//! generation observed when it was captured:
//! - the pool bumps the generation every time it reclaims the shape
//! - a handle is valid only while the two generations agree
//!
//! Handles never own anything. Holding one does not keep a shape alive.

use crate::pool::ShapeStore;
use crate::shape::Shape;

/// Stable address of a shape's memory: pool id plus slot index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShapeKey {
    /// Pool that owns the memory.
    pub pool: crate::ids::PoolId,
    /// Slot inside the pool.
    pub slot: u32,
}

impl ShapeKey {
    /// Creates a key.
    #[inline]
    #[must_use]
    pub const fn new(pool: crate::ids::PoolId, slot: u32) -> Self {
        Self { pool, slot }
    }
}

/// Where a handle points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
enum Target {
    /// Points nowhere.
    #[default]
    None,
    /// Loaded from a save file, not yet resolved against the population.
    SaveIndex(i32),
    /// Points at a shape captured at `generation`.
    Live {
        key: ShapeKey,
        generation: u32,
    },
}

/// Generational reference to a shape.
///
/// Every consumer must check [`ShapeHandle::is_valid`] (or use
/// [`ShapeStore::get`], which does) before touching the target; invalidity means
/// "the shape is gone", never a fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct ShapeHandle {
    target: Target,
}

impl ShapeHandle {
    /// Handle that never resolves to a shape.
    pub const NONE: Self = Self { target: Target::None };

    /// Captures a live shape at its current generation.
    #[inline]
    #[must_use]
    pub fn of(shape: &Shape) -> Self {
        Self::from_parts(shape.key(), shape.generation())
    }

    /// Builds a handle from a key and the generation it should match.
    #[inline]
    #[must_use]
    pub const fn from_parts(key: ShapeKey, generation: u32) -> Self {
        Self { target: Target::Live { key, generation } }
    }

    /// Builds a deferred handle from an index into a saved population.
    ///
    /// The handle stays invalid until [`ShapeHandle::resolve`] runs after the whole
    /// population has been rebuilt. Negative indices never resolve.
    #[inline]
    #[must_use]
    pub const fn from_save_index(index: i32) -> Self {
        Self { target: Target::SaveIndex(index) }
    }

    /// Key of the target, if the handle has been resolved.
    #[inline]
    #[must_use]
    pub const fn key(&self) -> Option<ShapeKey> {
        match self.target {
            Target::Live { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Generation captured by the handle, if resolved.
    #[inline]
    #[must_use]
    pub const fn generation(&self) -> Option<u32> {
        match self.target {
            Target::Live { generation, .. } => Some(generation),
            _ => None,
        }
    }

    /// Save index still waiting for resolution.
    #[inline]
    #[must_use]
    pub const fn pending_save_index(&self) -> Option<i32> {
        match self.target {
            Target::SaveIndex(index) => Some(index),
            _ => None,
        }
    }

    /// True iff the target exists and has not been recycled since capture.
    #[inline]
    #[must_use]
    pub fn is_valid(&self, store: &ShapeStore) -> bool {
        store.get(*self).is_some()
    }

    /// Converts a pending save index into a live handle.
    ///
    /// `population` is the rebuilt population in save order. Already-live handles
    /// are left alone; out-of-range indices become [`ShapeHandle::NONE`].
    pub fn resolve(&mut self, population: &[ShapeKey], store: &ShapeStore) {
        let Target::SaveIndex(index) = self.target else {
            return;
        };
        *self = usize::try_from(index)
            .ok()
            .and_then(|i| population.get(i))
            .and_then(|key| store.shape(*key))
            .map_or(Self::NONE, Self::of);
    }

    /// Index to write into a save file: the target's population index, or -1.
    #[must_use]
    pub fn save_index(&self, store: &ShapeStore) -> i32 {
        match self.target {
            Target::SaveIndex(index) => index,
            _ => store.get(*self).map_or(-1, |shape| shape.position_index() as i32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::PoolId;

    #[test]
    fn test_handle_parts() {
        let key = ShapeKey::new(PoolId(2), 17);
        let handle = ShapeHandle::from_parts(key, 5);
        assert_eq!(handle.key(), Some(key));
        assert_eq!(handle.generation(), Some(5));
        assert_eq!(handle.pending_save_index(), None);
    }

    #[test]
    fn test_deferred_handle_is_unresolved() {
        let handle = ShapeHandle::from_save_index(3);
        assert_eq!(handle.key(), None);
        assert_eq!(handle.pending_save_index(), Some(3));
        assert_eq!(ShapeHandle::default(), ShapeHandle::NONE);
    }
}

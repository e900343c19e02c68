//! Per-variant behavior pools.
//!
//! Pools live as long as the population and only ever grow to their peak usage.

use super::lifecycle::{DyingBehavior, GrowingBehavior, LifecycleBehavior};
use super::motion::{MovementBehavior, OscillationBehavior, RotationBehavior};
use super::satellite::SatelliteBehavior;

/// Stack of reusable payloads of one variant.
#[derive(Debug)]
pub struct BehaviorPool<T> {
    stack: Vec<T>,
    created: usize,
}

impl<T> Default for BehaviorPool<T> {
    fn default() -> Self {
        Self { stack: Vec::new(), created: 0 }
    }
}

impl<T: Default> BehaviorPool<T> {
    /// Pops a pooled payload or creates one.
    pub fn acquire(&mut self) -> T {
        self.stack.pop().unwrap_or_else(|| {
            self.created += 1;
            T::default()
        })
    }

    /// Returns a payload for reuse.
    pub fn release(&mut self, value: T) {
        self.stack.push(value);
    }

    /// Payloads waiting for reuse.
    #[inline]
    #[must_use]
    pub fn available(&self) -> usize {
        self.stack.len()
    }

    /// Payloads ever constructed by this pool.
    #[inline]
    #[must_use]
    pub const fn created(&self) -> usize {
        self.created
    }
}

/// One pool per behavior variant.
#[derive(Debug, Default)]
pub struct BehaviorPools {
    /// Movement payloads.
    pub movement: BehaviorPool<MovementBehavior>,
    /// Rotation payloads.
    pub rotation: BehaviorPool<RotationBehavior>,
    /// Oscillation payloads.
    pub oscillation: BehaviorPool<OscillationBehavior>,
    /// Satellite payloads.
    pub satellite: BehaviorPool<SatelliteBehavior>,
    /// Growing payloads.
    pub growing: BehaviorPool<GrowingBehavior>,
    /// Dying payloads.
    pub dying: BehaviorPool<DyingBehavior>,
    /// Lifecycle payloads.
    pub lifecycle: BehaviorPool<LifecycleBehavior>,
}

impl BehaviorPools {
    /// Total payloads waiting for reuse, across variants.
    #[must_use]
    pub fn available(&self) -> usize {
        self.movement.available()
            + self.rotation.available()
            + self.oscillation.available()
            + self.satellite.available()
            + self.growing.available()
            + self.dying.available()
            + self.lifecycle.available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_reuses_released_payloads() {
        let mut pool: BehaviorPool<MovementBehavior> = BehaviorPool::default();
        let first = pool.acquire();
        assert_eq!(pool.created(), 1);
        pool.release(first);
        assert_eq!(pool.available(), 1);

        let _again = pool.acquire();
        assert_eq!(pool.created(), 1);
        assert_eq!(pool.available(), 0);
    }
}

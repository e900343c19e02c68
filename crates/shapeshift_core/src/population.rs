//! # Population
//!
//! The live shapes, as one flat array split at `dying_count`:
//!
//! ```text
//! [ dying ... dying | alive ... alive ]
//!   0               ^ dying_count       len
//! ```
//!
//! Every shape stores its own array index. Every swap updates both sides.
//!
//! ## Deferred mutation
//!
//! While the update pass runs, [`Population::kill`] and
//! [`Population::mark_as_dying`] only queue the request. The queues are drained by
//! [`Population::apply_deferred`] once iteration is over. Outside the pass both
//! requests act immediately.

use shapeshift_shared::Transform;

use crate::behavior::{BehaviorContext, BehaviorPools, DyingBehavior, ShapeBehavior};
use crate::error::CoreResult;
use crate::handle::{ShapeHandle, ShapeKey};
use crate::ids::{MaterialType, PoolId, ShapeType};
use crate::pool::ShapeStore;
use crate::shape::Shape;

/// Live shapes with their dying partition and deferred request queues.
#[derive(Debug)]
pub struct Population {
    /// Pools that own shape memory.
    pub(crate) store: ShapeStore,
    /// Per-variant behavior pools.
    pub(crate) behaviors: BehaviorPools,
    /// Population order. `[0, dying_count)` is the dying partition.
    shapes: Vec<ShapeKey>,
    /// Partition boundary.
    dying_count: usize,
    /// True while behaviors are being updated.
    in_update_pass: bool,
    /// Kills requested during the update pass.
    kill_queue: Vec<ShapeHandle>,
    /// Mark-dying requests made during the update pass.
    dying_queue: Vec<ShapeHandle>,
}

/// Counts from draining the deferred queues.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeferredReport {
    /// Queued kills that found their shape still alive.
    pub killed: usize,
    /// Queued marks applied.
    pub marked: usize,
    /// Requests dropped because the handle went stale.
    pub dropped: usize,
}

impl Population {
    /// Creates an empty population over `store`.
    #[must_use]
    pub fn new(store: ShapeStore) -> Self {
        Self {
            store,
            behaviors: BehaviorPools::default(),
            shapes: Vec::new(),
            dying_count: 0,
            in_update_pass: false,
            kill_queue: Vec::new(),
            dying_queue: Vec::new(),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The shape store.
    #[inline]
    #[must_use]
    pub const fn store(&self) -> &ShapeStore {
        &self.store
    }

    /// Mutable shape store.
    #[inline]
    pub fn store_mut(&mut self) -> &mut ShapeStore {
        &mut self.store
    }

    /// Behavior pools.
    #[inline]
    #[must_use]
    pub const fn behavior_pools(&self) -> &BehaviorPools {
        &self.behaviors
    }

    /// Number of live shapes, dying ones included.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// True if no shape is live.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Size of the dying partition.
    #[inline]
    #[must_use]
    pub const fn dying_count(&self) -> usize {
        self.dying_count
    }

    /// Shapes not yet committed to death.
    #[inline]
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.shapes.len() - self.dying_count
    }

    /// True while behaviors are being updated.
    #[inline]
    #[must_use]
    pub const fn in_update_pass(&self) -> bool {
        self.in_update_pass
    }

    /// Keys in population order.
    #[inline]
    #[must_use]
    pub fn keys(&self) -> &[ShapeKey] {
        &self.shapes
    }

    /// Shape at population index `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Shape> {
        self.store.shape(*self.shapes.get(index)?)
    }

    /// Handle to the shape at population index `index`.
    #[must_use]
    pub fn handle_at(&self, index: usize) -> Option<ShapeHandle> {
        self.get(index).map(ShapeHandle::of)
    }

    /// Handle to the active shape at `key`, or [`ShapeHandle::NONE`].
    #[must_use]
    pub fn handle_of(&self, key: ShapeKey) -> ShapeHandle {
        self.store
            .shape(key)
            .filter(|shape| shape.is_active())
            .map_or(ShapeHandle::NONE, ShapeHandle::of)
    }

    /// Shapes in population order.
    pub fn iter(&self) -> impl Iterator<Item = &Shape> + '_ {
        self.shapes.iter().filter_map(|key| self.store.shape(*key))
    }

    /// True if the handle's shape sits in the dying partition.
    #[must_use]
    pub fn is_marked_as_dying(&self, handle: ShapeHandle) -> bool {
        self.store.get(handle).is_some_and(|shape| shape.position_index() < self.dying_count)
    }

    /// Checks the partition and index invariants.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.dying_count <= self.shapes.len()
            && self.shapes.iter().enumerate().all(|(index, key)| {
                self.store
                    .shape(*key)
                    .is_some_and(|shape| shape.is_active() && shape.position_index() == index)
            })
    }

    // =========================================================================
    // Membership
    // =========================================================================

    /// Takes a shape from `pool` and appends it to the alive partition.
    ///
    /// # Errors
    ///
    /// Fails on unknown pool, shape type or material.
    pub fn spawn(
        &mut self,
        pool: PoolId,
        shape_type: ShapeType,
        material: MaterialType,
    ) -> CoreResult<ShapeKey> {
        let key = self.store.get_shape(pool, shape_type, material)?;
        self.add(key);
        Ok(key)
    }

    /// Appends a shape that was handed out by the store.
    fn add(&mut self, key: ShapeKey) {
        let index = self.shapes.len();
        if let Some(shape) = self.store.shape_mut(key) {
            shape.set_position_index(index);
            self.shapes.push(key);
        }
    }

    /// Reclaims every shape and empties the queues.
    pub fn clear(&mut self) {
        for key in std::mem::take(&mut self.shapes) {
            if let Err(err) = self.store.reclaim(key, &mut self.behaviors) {
                tracing::error!(%err, "failed to reclaim shape while clearing");
            }
        }
        self.dying_count = 0;
        self.kill_queue.clear();
        self.dying_queue.clear();
    }

    // =========================================================================
    // Kill / mark dying
    // =========================================================================

    /// Kills a shape, now or at the end of the update pass.
    ///
    /// Stale handles are ignored.
    pub fn kill(&mut self, handle: ShapeHandle) {
        if !handle.is_valid(&self.store) {
            return;
        }
        if self.in_update_pass {
            self.kill_queue.push(handle);
        } else if let Some(key) = handle.key() {
            self.kill_immediately(key);
        }
    }

    /// Moves a shape into the dying partition, now or at the end of the update pass.
    ///
    /// Stale handles are ignored.
    pub fn mark_as_dying(&mut self, handle: ShapeHandle) {
        if !handle.is_valid(&self.store) {
            return;
        }
        if self.in_update_pass {
            self.dying_queue.push(handle);
        } else if let Some(key) = handle.key() {
            self.mark_as_dying_immediately(key);
        }
    }

    /// Removes the shape at `key` and returns it to its pool.
    pub(crate) fn kill_immediately(&mut self, key: ShapeKey) {
        let Some(mut index) = self.population_index(key) else {
            tracing::warn!(?key, "kill of a shape outside the population ignored");
            return;
        };
        if let Err(err) = self.store.reclaim(key, &mut self.behaviors) {
            tracing::error!(%err, "kill refused");
            return;
        }

        if index < self.dying_count {
            self.dying_count -= 1;
            if index < self.dying_count {
                self.move_shape(self.dying_count, index);
                index = self.dying_count;
            }
        }
        let last = self.shapes.len() - 1;
        if index < last {
            self.move_shape(last, index);
        }
        self.shapes.pop();
    }

    fn mark_as_dying_immediately(&mut self, key: ShapeKey) {
        let Some(index) = self.population_index(key) else {
            return;
        };
        if index < self.dying_count {
            return;
        }
        let boundary = self.dying_count;
        if index != boundary {
            self.shapes.swap(index, boundary);
            self.set_index(self.shapes[index], index);
            self.set_index(self.shapes[boundary], boundary);
        }
        self.dying_count += 1;
    }

    /// Copies the key at `from` into `to`, fixing the moved shape's index.
    fn move_shape(&mut self, from: usize, to: usize) {
        let moved = self.shapes[from];
        self.shapes[to] = moved;
        self.set_index(moved, to);
    }

    fn set_index(&mut self, key: ShapeKey, index: usize) {
        if let Some(shape) = self.store.shape_mut(key) {
            shape.set_position_index(index);
        }
    }

    /// Index of `key` in the population, if it is a member.
    fn population_index(&self, key: ShapeKey) -> Option<usize> {
        let index = self.store.shape(key)?.position_index();
        (self.shapes.get(index) == Some(&key)).then_some(index)
    }

    /// Drains the kill queue, then the mark-dying queue.
    pub fn apply_deferred(&mut self) -> DeferredReport {
        let mut report = DeferredReport::default();
        for handle in std::mem::take(&mut self.kill_queue) {
            match handle.key().filter(|_| handle.is_valid(&self.store)) {
                Some(key) => {
                    self.kill_immediately(key);
                    report.killed += 1;
                }
                None => report.dropped += 1,
            }
        }
        for handle in std::mem::take(&mut self.dying_queue) {
            match handle.key().filter(|_| handle.is_valid(&self.store)) {
                Some(key) => {
                    self.mark_as_dying_immediately(key);
                    report.marked += 1;
                }
                None => report.dropped += 1,
            }
        }
        report
    }

    // =========================================================================
    // Update pass
    // =========================================================================

    /// Ages every shape and runs its behaviors in list order.
    ///
    /// Dying shapes are updated too, so their dying sequence can finish.
    pub fn update_shapes(&mut self, delta_time: f32) {
        self.in_update_pass = true;
        for index in 0..self.shapes.len() {
            let key = self.shapes[index];
            self.update_shape(key, delta_time);
        }
        self.in_update_pass = false;
    }

    fn update_shape(&mut self, key: ShapeKey, delta_time: f32) {
        let Some(shape) = self.store.shape_mut(key) else {
            return;
        };
        shape.advance_age(delta_time);
        let handle = ShapeHandle::of(shape);
        let transform = shape.transform;
        let age = shape.age();
        let mut list = std::mem::take(&mut shape.behaviors);

        let mut ctx = BehaviorContext::new(self, handle, transform, age, delta_time);
        let mut i = 0;
        while i < list.len() {
            let keep = list[i].update(&mut ctx);
            list.append(&mut ctx.attached);
            if keep {
                i += 1;
            } else {
                list.remove(i).recycle(&mut ctx.population.behaviors);
            }
        }
        let transform = ctx.transform;

        if let Some(shape) = self.store.shape_mut(key) {
            shape.transform = transform;
            shape.behaviors = list;
        }
    }

    // =========================================================================
    // Outside-pass access
    // =========================================================================

    /// Runs `f` with a behavior context for the shape at `key`.
    ///
    /// Used to attach and initialise behaviors on a shape outside the update pass.
    /// Returns `None` if `key` is not an active shape.
    pub fn with_context<T>(
        &mut self,
        key: ShapeKey,
        f: impl FnOnce(&mut BehaviorContext<'_>) -> T,
    ) -> Option<T> {
        let shape = self.store.shape(key).filter(|shape| shape.is_active())?;
        let handle = ShapeHandle::of(shape);
        let transform = shape.transform;
        let age = shape.age();

        let mut ctx = BehaviorContext::new(self, handle, transform, age, 0.0);
        let out = f(&mut ctx);
        let transform = ctx.transform;
        let attached = std::mem::take(&mut ctx.attached);

        match self.store.get_mut(handle) {
            Some(shape) => {
                shape.transform = transform;
                shape.behaviors.extend(attached);
            }
            None => {
                for behavior in attached {
                    behavior.recycle(&mut self.behaviors);
                }
            }
        }
        Some(out)
    }

    /// Mutable shape memory of a live member.
    pub fn shape_mut(&mut self, key: ShapeKey) -> Option<&mut Shape> {
        self.population_index(key)?;
        self.store.shape_mut(key)
    }

    /// Starts a dying sequence of `duration` seconds on a shape.
    ///
    /// A non-positive duration kills the shape instead.
    pub fn start_dying(&mut self, handle: ShapeHandle, duration: f32) {
        let Some(key) = handle.key().filter(|_| handle.is_valid(&self.store)) else {
            return;
        };
        if duration <= 0.0 {
            self.kill(handle);
        } else if !self.is_marked_as_dying(handle) {
            self.with_context(key, |ctx| DyingBehavior::attach(ctx, duration));
        }
    }

    // =========================================================================
    // Restore
    // =========================================================================

    /// Adds a shape rebuilt from saved state.
    ///
    /// # Errors
    ///
    /// Fails on unknown pool, shape type or material.
    pub(crate) fn restore_shape(
        &mut self,
        pool: PoolId,
        shape_type: ShapeType,
        material: MaterialType,
        transform: Transform,
        age: f32,
        behaviors: Vec<ShapeBehavior>,
    ) -> CoreResult<ShapeKey> {
        let key = self.spawn(pool, shape_type, material)?;
        if let Some(shape) = self.store.shape_mut(key) {
            shape.transform = transform;
            shape.set_age(age);
            shape.behaviors = behaviors;
        }
        Ok(key)
    }

    /// Rebuilds the dying partition after a restore.
    ///
    /// With a saved length the first `dying_count` shapes are marked, since
    /// saves list the dying partition first. Older saves carry no length, so
    /// shapes with a dying behavior are marked instead.
    pub(crate) fn restore_dying_partition(&mut self, dying_count: Option<usize>) {
        if let Some(count) = dying_count {
            for index in 0..count.min(self.shapes.len()) {
                let key = self.shapes[index];
                self.mark_as_dying_immediately(key);
            }
            return;
        }
        for index in 0..self.shapes.len() {
            let key = self.shapes[index];
            let dying = self.store.shape(key).is_some_and(|shape| {
                shape.behaviors().iter().any(|b| matches!(b, ShapeBehavior::Dying(_)))
            });
            if dying {
                self.mark_as_dying_immediately(key);
            }
        }
    }

    /// Resolves saved shape indices into live handles, across all behaviors.
    pub(crate) fn resolve_shape_instances(&mut self) {
        for index in 0..self.shapes.len() {
            let key = self.shapes[index];
            let Some(shape) = self.store.shape_mut(key) else {
                continue;
            };
            let mut list = std::mem::take(&mut shape.behaviors);
            for behavior in &mut list {
                behavior.resolve_shape_instances(&self.shapes, &self.store);
            }
            if let Some(shape) = self.store.shape_mut(key) {
                shape.behaviors = list;
            }
        }
    }
}

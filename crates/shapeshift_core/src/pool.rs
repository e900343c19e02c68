//! # Shape Pools
//!
//! A [`ShapeFactory`] hands out shapes of its registered prefabs and takes them
//! back when they die. A [`ShapeStore`] owns every factory plus the render binding.
//!
//! ## Slot reuse
//!
//! - Recycling factories keep one free list per shape type. A reclaimed shape keeps
//!   its identity (type, origin pool) and only gets a new generation.
//! - Non-recycling factories release the slot. The next cold allocation may reuse
//!   it, but the generation keeps counting so stale handles never match again.

use shapeshift_shared::Color;

use crate::behavior::BehaviorPools;
use crate::error::{CoreError, CoreResult};
use crate::handle::{ShapeHandle, ShapeKey};
use crate::ids::{MaterialType, PoolId, ShapeType, WriteOnce};
use crate::render::{NullRenderBinding, RenderBinding};
use crate::shape::Shape;

/// Template for one shape type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShapePrefab {
    /// Human readable name, used in logs.
    pub name: String,
    /// Number of independently colored parts.
    pub color_count: usize,
}

impl ShapePrefab {
    /// Creates a prefab.
    #[must_use]
    pub fn new(name: impl Into<String>, color_count: usize) -> Self {
        Self { name: name.into(), color_count: color_count.max(1) }
    }
}

/// A slot in the factory's storage.
#[derive(Debug)]
enum Slot {
    /// Memory in use (active or waiting in a free list).
    Occupied(Shape),
    /// Memory dropped by a non-recycling factory.
    Released {
        /// Generation to continue from on reuse.
        generation: u32,
    },
}

/// Allocates and reclaims shapes of a fixed set of prefabs and materials.
#[derive(Debug)]
pub struct ShapeFactory {
    /// Assigned once, by the store.
    id: WriteOnce<PoolId>,
    /// Registered prefabs, indexed by shape type.
    prefabs: Vec<ShapePrefab>,
    /// Number of materials.
    material_count: u16,
    /// Whether reclaimed shapes are kept for reuse.
    recycle: bool,
    /// Storage.
    slots: Vec<Slot>,
    /// Free list per shape type (recycling only).
    free_lists: Vec<Vec<u32>>,
    /// Released slots (non-recycling only).
    vacant: Vec<u32>,
    /// Shapes currently handed out.
    active_count: usize,
}

impl ShapeFactory {
    /// Creates an unregistered factory.
    #[must_use]
    pub fn new(prefabs: Vec<ShapePrefab>, material_count: u16, recycle: bool) -> Self {
        let free_lists = vec![Vec::new(); prefabs.len()];
        Self {
            id: WriteOnce::unset("pool id"),
            prefabs,
            material_count,
            recycle,
            slots: Vec::new(),
            free_lists,
            vacant: Vec::new(),
            active_count: 0,
        }
    }

    /// Pool id, once registered.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> Option<PoolId> {
        self.id.get()
    }

    /// True if reclaimed shapes are kept for reuse.
    #[inline]
    #[must_use]
    pub const fn recycles(&self) -> bool {
        self.recycle
    }

    /// Registered prefabs.
    #[inline]
    #[must_use]
    pub fn prefabs(&self) -> &[ShapePrefab] {
        &self.prefabs
    }

    /// Number of shape types.
    #[inline]
    #[must_use]
    pub fn shape_type_count(&self) -> usize {
        self.prefabs.len()
    }

    /// Number of materials.
    #[inline]
    #[must_use]
    pub const fn material_count(&self) -> u16 {
        self.material_count
    }

    /// Shapes currently handed out.
    #[inline]
    #[must_use]
    pub const fn active_count(&self) -> usize {
        self.active_count
    }

    /// Shapes of `shape_type` waiting for reuse.
    #[must_use]
    pub fn pooled_count(&self, shape_type: ShapeType) -> usize {
        self.free_lists.get(shape_type.index()).map_or(0, Vec::len)
    }

    /// Slots that hold shape memory (active or pooled).
    #[must_use]
    pub fn allocated_count(&self) -> usize {
        self.slots.iter().filter(|slot| matches!(slot, Slot::Occupied(_))).count()
    }

    /// Checks that `shape_type` and `material` are known to this factory.
    ///
    /// # Errors
    ///
    /// Returns `UnknownShapeType` or `UnknownMaterial`.
    pub fn validate(&self, shape_type: i32, material: i32) -> CoreResult<(ShapeType, MaterialType)> {
        let pool = self.id().map_or(u16::MAX, |id| id.0);
        let shape_type = usize::try_from(shape_type)
            .ok()
            .filter(|&t| t < self.prefabs.len())
            .map(|t| ShapeType(t as u16))
            .ok_or(CoreError::UnknownShapeType { pool, shape_type })?;
        let material = u16::try_from(material)
            .ok()
            .filter(|&m| m < self.material_count)
            .map(MaterialType)
            .ok_or(CoreError::UnknownMaterial { pool, material })?;
        Ok((shape_type, material))
    }

    /// Hands out an active shape of `shape_type` wearing `material`.
    ///
    /// Reuses a pooled shape when one is available, otherwise allocates a new one
    /// and permanently binds its type and origin pool.
    ///
    /// # Errors
    ///
    /// Fails on unknown type or material, or if the factory is not registered.
    pub fn get(
        &mut self,
        shape_type: ShapeType,
        material: MaterialType,
        binding: &mut dyn RenderBinding,
    ) -> CoreResult<ShapeKey> {
        let pool = self.id().ok_or(CoreError::UnknownPool(-1))?;
        self.validate(i32::from(shape_type.0), i32::from(material.0))?;

        let reused = if self.recycle {
            self.free_lists[shape_type.index()].pop()
        } else {
            None
        };

        let slot = match reused {
            Some(slot) => slot,
            None => self.allocate_cold(pool, shape_type)?,
        };
        let key = ShapeKey::new(pool, slot);

        let Some(Slot::Occupied(shape)) = self.slots.get_mut(slot as usize) else {
            return Err(CoreError::PoolCorrupted {
                pool: pool.0,
                slot,
                reason: "allocated slot holds no shape",
            });
        };
        shape.activate(material);
        self.active_count += 1;

        binding.set_material(key, material);
        binding.set_active(key, true);
        tracing::trace!(pool = pool.0, slot, reused = reused.is_some(), "shape handed out");
        Ok(key)
    }

    /// Creates fresh shape memory and returns its slot.
    fn allocate_cold(&mut self, pool: PoolId, shape_type: ShapeType) -> CoreResult<u32> {
        let color_count = self.prefabs[shape_type.index()].color_count;
        let (slot, generation) = match self.vacant.pop() {
            Some(slot) => match self.slots[slot as usize] {
                Slot::Released { generation } => (slot, generation),
                Slot::Occupied(_) => {
                    self.vacant.push(slot);
                    let err = CoreError::PoolCorrupted {
                        pool: pool.0,
                        slot,
                        reason: "vacant slot is still occupied",
                    };
                    tracing::error!("{err}");
                    return Err(err);
                }
            },
            None => {
                let slot = u32::try_from(self.slots.len())
                    .map_err(|_| CoreError::PoolExhausted { pool: pool.0 })?;
                self.slots.push(Slot::Released { generation: 0 });
                (slot, 0)
            }
        };

        let mut shape = Shape::new(ShapeKey::new(pool, slot), generation, color_count);
        shape.bind(pool, shape_type)?;
        self.slots[slot as usize] = Slot::Occupied(shape);
        Ok(slot)
    }

    /// Takes a shape back.
    ///
    /// Resets age, bumps the generation, recycles the shape's behaviors and hides
    /// it. Reclaiming a shape that is already pooled is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ForeignPool` if the shape was allocated by a different factory.
    pub fn reclaim(
        &mut self,
        key: ShapeKey,
        behaviors: &mut BehaviorPools,
        binding: &mut dyn RenderBinding,
    ) -> CoreResult<()> {
        let pool = self.id().ok_or(CoreError::UnknownPool(-1))?;
        let Some(Slot::Occupied(shape)) = self.slots.get_mut(key.slot as usize) else {
            tracing::warn!(pool = pool.0, slot = key.slot, "reclaim of an empty slot ignored");
            return Ok(());
        };
        let owner = shape.origin_pool().unwrap_or(key.pool);
        if key.pool != pool || owner != pool {
            let err = CoreError::ForeignPool { pool: pool.0, owner: owner.0 };
            tracing::error!("{err}");
            return Err(err);
        }
        if !shape.is_active() {
            tracing::warn!(pool = pool.0, slot = key.slot, "shape already reclaimed");
            return Ok(());
        }

        for behavior in shape.retire() {
            behavior.recycle(behaviors);
        }
        let shape_type = shape.shape_type();
        let generation = shape.generation();
        self.active_count -= 1;
        binding.set_active(key, false);

        if self.recycle {
            self.free_lists[shape_type.index()].push(key.slot);
        } else {
            self.slots[key.slot as usize] = Slot::Released { generation };
            self.vacant.push(key.slot);
        }
        Ok(())
    }

    /// Shape memory in `slot`, active or pooled.
    #[inline]
    #[must_use]
    pub fn shape(&self, slot: u32) -> Option<&Shape> {
        match self.slots.get(slot as usize)? {
            Slot::Occupied(shape) => Some(shape),
            Slot::Released { .. } => None,
        }
    }

    /// Mutable shape memory in `slot`.
    #[inline]
    pub fn shape_mut(&mut self, slot: u32) -> Option<&mut Shape> {
        match self.slots.get_mut(slot as usize)? {
            Slot::Occupied(shape) => Some(shape),
            Slot::Released { .. } => None,
        }
    }
}

/// Owner of every pool and of the render binding.
pub struct ShapeStore {
    factories: Vec<ShapeFactory>,
    binding: Box<dyn RenderBinding>,
}

impl std::fmt::Debug for ShapeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShapeStore").field("factories", &self.factories).finish_non_exhaustive()
    }
}

impl Default for ShapeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeStore {
    /// Creates an empty store with no render binding.
    #[must_use]
    pub fn new() -> Self {
        Self::with_binding(Box::new(NullRenderBinding))
    }

    /// Creates an empty store reporting to `binding`.
    #[must_use]
    pub fn with_binding(binding: Box<dyn RenderBinding>) -> Self {
        Self { factories: Vec::new(), binding }
    }

    /// Registers a factory and assigns its pool id.
    ///
    /// # Errors
    ///
    /// Fails if the factory was already registered somewhere.
    pub fn register(&mut self, mut factory: ShapeFactory) -> CoreResult<PoolId> {
        let id = u16::try_from(self.factories.len())
            .map(PoolId)
            .map_err(|_| CoreError::TooManyPools { registered: self.factories.len() })?;
        factory.id.set(id)?;
        tracing::debug!(pool = id.0, shape_types = factory.shape_type_count(), "pool registered");
        self.factories.push(factory);
        Ok(id)
    }

    /// Number of registered pools.
    #[inline]
    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.factories.len()
    }

    /// Factory registered under `id`.
    #[inline]
    #[must_use]
    pub fn factory(&self, id: PoolId) -> Option<&ShapeFactory> {
        self.factories.get(id.index())
    }

    /// Factory named by a raw (saved) id.
    ///
    /// # Errors
    ///
    /// Returns `UnknownPool` if no factory has that id.
    pub fn factory_by_raw(&self, id: i32) -> CoreResult<&ShapeFactory> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.factories.get(i))
            .ok_or(CoreError::UnknownPool(id))
    }

    /// Hands out a shape from pool `pool`.
    ///
    /// # Errors
    ///
    /// Fails on unknown pool, shape type or material.
    pub fn get_shape(
        &mut self,
        pool: PoolId,
        shape_type: ShapeType,
        material: MaterialType,
    ) -> CoreResult<ShapeKey> {
        let factory = self
            .factories
            .get_mut(pool.index())
            .ok_or(CoreError::UnknownPool(i32::from(pool.0)))?;
        factory.get(shape_type, material, self.binding.as_mut())
    }

    /// Returns a shape to the pool that owns it.
    ///
    /// # Errors
    ///
    /// Fails if the key names an unknown pool.
    pub fn reclaim(&mut self, key: ShapeKey, behaviors: &mut BehaviorPools) -> CoreResult<()> {
        let factory = self
            .factories
            .get_mut(key.pool.index())
            .ok_or(CoreError::UnknownPool(i32::from(key.pool.0)))?;
        factory.reclaim(key, behaviors, self.binding.as_mut())
    }

    /// Returns a shape to a specific pool, which must be its origin pool.
    ///
    /// # Errors
    ///
    /// Returns `ForeignPool` if `pool` did not allocate the shape.
    pub fn reclaim_into(
        &mut self,
        pool: PoolId,
        key: ShapeKey,
        behaviors: &mut BehaviorPools,
    ) -> CoreResult<()> {
        if pool != key.pool {
            let err = CoreError::ForeignPool { pool: pool.0, owner: key.pool.0 };
            tracing::error!("{err}");
            return Err(err);
        }
        self.reclaim(key, behaviors)
    }

    /// The active shape a handle points at, if it is still valid.
    #[must_use]
    pub fn get(&self, handle: ShapeHandle) -> Option<&Shape> {
        let key = handle.key()?;
        let generation = handle.generation()?;
        self.shape(key).filter(|shape| shape.is_active() && shape.generation() == generation)
    }

    /// Mutable access through a handle, if it is still valid.
    pub fn get_mut(&mut self, handle: ShapeHandle) -> Option<&mut Shape> {
        let key = handle.key()?;
        let generation = handle.generation()?;
        self.shape_mut(key).filter(|shape| shape.is_active() && shape.generation() == generation)
    }

    /// Shape memory at `key`, active or pooled.
    #[inline]
    #[must_use]
    pub fn shape(&self, key: ShapeKey) -> Option<&Shape> {
        self.factories.get(key.pool.index())?.shape(key.slot)
    }

    /// Mutable shape memory at `key`.
    #[inline]
    pub fn shape_mut(&mut self, key: ShapeKey) -> Option<&mut Shape> {
        self.factories.get_mut(key.pool.index())?.shape_mut(key.slot)
    }

    /// Sets the color of one part and notifies the binding.
    ///
    /// Out-of-range parts are ignored.
    pub fn set_color_at(&mut self, key: ShapeKey, index: usize, color: Color) {
        let changed = self.shape_mut(key).is_some_and(|shape| shape.set_color_at(index, color));
        if changed {
            self.binding.set_color(key, index, color);
        }
    }

    /// Sets every part to the same color.
    pub fn set_color(&mut self, key: ShapeKey, color: Color) {
        let count = self.shape(key).map_or(0, Shape::color_count);
        for index in 0..count {
            self.set_color_at(key, index, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(recycle: bool) -> (ShapeStore, PoolId) {
        let mut store = ShapeStore::new();
        let factory = ShapeFactory::new(
            vec![ShapePrefab::new("cube", 1), ShapePrefab::new("composite", 3)],
            2,
            recycle,
        );
        let id = store.register(factory).unwrap();
        (store, id)
    }

    #[test]
    fn test_reclaimed_shape_is_reused() {
        let (mut store, pool) = store(true);
        let mut behaviors = BehaviorPools::default();

        let key = store.get_shape(pool, ShapeType(0), MaterialType(1)).unwrap();
        let handle = ShapeHandle::of(store.shape(key).unwrap());
        store.reclaim(key, &mut behaviors).unwrap();

        assert!(!handle.is_valid(&store));
        assert_eq!(store.factory(pool).unwrap().pooled_count(ShapeType(0)), 1);

        let again = store.get_shape(pool, ShapeType(0), MaterialType(0)).unwrap();
        assert_eq!(again, key);
        let shape = store.shape(again).unwrap();
        assert_eq!(shape.generation(), 1);
        assert_eq!(shape.age(), 0.0);
        assert_eq!(shape.material(), MaterialType(0));
        assert!(!handle.is_valid(&store));
    }

    #[test]
    fn test_free_lists_are_per_type() {
        let (mut store, pool) = store(true);
        let mut behaviors = BehaviorPools::default();

        let cube = store.get_shape(pool, ShapeType(0), MaterialType(0)).unwrap();
        store.reclaim(cube, &mut behaviors).unwrap();
        let composite = store.get_shape(pool, ShapeType(1), MaterialType(0)).unwrap();

        assert_ne!(cube, composite);
        assert_eq!(store.shape(composite).unwrap().color_count(), 3);
        assert_eq!(store.factory(pool).unwrap().allocated_count(), 2);
    }

    #[test]
    fn test_non_recycling_pool_keeps_generation_counting() {
        let (mut store, pool) = store(false);
        let mut behaviors = BehaviorPools::default();

        let key = store.get_shape(pool, ShapeType(0), MaterialType(0)).unwrap();
        let stale = ShapeHandle::of(store.shape(key).unwrap());
        store.reclaim(key, &mut behaviors).unwrap();
        assert!(store.shape(key).is_none());

        let reused = store.get_shape(pool, ShapeType(1), MaterialType(0)).unwrap();
        assert_eq!(reused.slot, key.slot);
        assert!(!stale.is_valid(&store));
        assert_eq!(store.shape(reused).unwrap().generation(), 1);
    }

    #[test]
    fn test_unknown_ids_are_rejected() {
        let (mut store, pool) = store(true);
        assert!(matches!(
            store.get_shape(pool, ShapeType(9), MaterialType(0)),
            Err(CoreError::UnknownShapeType { shape_type: 9, .. })
        ));
        assert!(matches!(
            store.get_shape(pool, ShapeType(0), MaterialType(5)),
            Err(CoreError::UnknownMaterial { material: 5, .. })
        ));
        assert_eq!(store.get_shape(PoolId(4), ShapeType(0), MaterialType(0)), Err(CoreError::UnknownPool(4)));
    }

    #[test]
    fn test_foreign_reclaim_is_refused() {
        let mut store = ShapeStore::new();
        let mut behaviors = BehaviorPools::default();
        let a = store.register(ShapeFactory::new(vec![ShapePrefab::new("cube", 1)], 1, true)).unwrap();
        let b = store.register(ShapeFactory::new(vec![ShapePrefab::new("cube", 1)], 1, true)).unwrap();

        let key = store.get_shape(a, ShapeType(0), MaterialType(0)).unwrap();
        let err = store.reclaim_into(b, key, &mut behaviors).unwrap_err();
        assert_eq!(err, CoreError::ForeignPool { pool: b.0, owner: a.0 });
        assert!(store.shape(key).unwrap().is_active());
    }

    #[test]
    fn test_factory_cannot_be_registered_twice() {
        let mut first = ShapeStore::new();
        first.register(ShapeFactory::new(vec![ShapePrefab::new("cube", 1)], 1, true)).unwrap();

        let mut factory = ShapeFactory::new(vec![ShapePrefab::new("cube", 1)], 1, true);
        factory.id.set(PoolId(0)).unwrap();
        let mut second = ShapeStore::new();
        assert!(matches!(second.register(factory), Err(CoreError::IdentifierAlreadySet { .. })));
    }

    #[test]
    fn test_occupied_vacant_slot_is_refused() {
        let (mut store, pool) = store(false);
        let key = store.get_shape(pool, ShapeType(0), MaterialType(0)).unwrap();
        let handle = ShapeHandle::of(store.shape(key).unwrap());
        store.factories[pool.index()].vacant.push(key.slot);

        let err = store.get_shape(pool, ShapeType(0), MaterialType(0)).unwrap_err();
        assert!(matches!(err, CoreError::PoolCorrupted { slot, .. } if slot == key.slot));
        assert!(handle.is_valid(&store));
        assert_eq!(store.shape(key).unwrap().generation(), 0);
        assert_eq!(store.factory(pool).unwrap().active_count(), 1);
    }

    #[test]
    fn test_pool_ids_run_out() {
        let mut store = ShapeStore::new();
        for _ in 0..=u16::MAX {
            store.register(ShapeFactory::new(vec![ShapePrefab::new("cube", 1)], 1, true)).unwrap();
        }
        let err = store
            .register(ShapeFactory::new(vec![ShapePrefab::new("cube", 1)], 1, true))
            .unwrap_err();
        assert_eq!(err, CoreError::TooManyPools { registered: usize::from(u16::MAX) + 1 });
    }

    #[derive(Clone, Debug, PartialEq)]
    enum Hook {
        Material(ShapeKey, MaterialType),
        Color(ShapeKey, usize),
        Active(ShapeKey, bool),
    }

    struct Recorder(std::rc::Rc<std::cell::RefCell<Vec<Hook>>>);

    impl RenderBinding for Recorder {
        fn set_material(&mut self, shape: ShapeKey, material: MaterialType) {
            self.0.borrow_mut().push(Hook::Material(shape, material));
        }

        fn set_color(&mut self, shape: ShapeKey, index: usize, _color: Color) {
            self.0.borrow_mut().push(Hook::Color(shape, index));
        }

        fn set_active(&mut self, shape: ShapeKey, active: bool) {
            self.0.borrow_mut().push(Hook::Active(shape, active));
        }
    }

    #[test]
    fn test_binding_sees_visual_changes() {
        let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut store = ShapeStore::with_binding(Box::new(Recorder(std::rc::Rc::clone(&log))));
        let pool = store.register(ShapeFactory::new(vec![ShapePrefab::new("pair", 2)], 2, true)).unwrap();
        let mut behaviors = BehaviorPools::default();

        let key = store.get_shape(pool, ShapeType(0), MaterialType(1)).unwrap();
        store.set_color(key, Color::BLACK);
        store.set_color_at(key, 5, Color::WHITE);
        store.reclaim(key, &mut behaviors).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                Hook::Material(key, MaterialType(1)),
                Hook::Active(key, true),
                Hook::Color(key, 0),
                Hook::Color(key, 1),
                Hook::Active(key, false),
            ]
        );
    }
}

//! # Shapes
//!
//! A shape is the pooled entity the whole engine revolves around. Its memory is
//! owned by the pool that first allocated it; the population only tracks keys.

use shapeshift_shared::{Color, Transform};

use crate::behavior::ShapeBehavior;
use crate::handle::ShapeKey;
use crate::ids::{MaterialType, PoolId, ShapeType, WriteOnce};

/// A pooled shape.
///
/// `generation` changes every time the pool reclaims the shape, which is what
/// makes outstanding [`crate::ShapeHandle`]s go stale.
#[derive(Debug)]
pub struct Shape {
    /// Where this shape lives in its pool.
    key: ShapeKey,
    /// Shape kind, fixed at cold allocation.
    shape_type: WriteOnce<ShapeType>,
    /// Pool that owns the memory, fixed at cold allocation.
    origin_pool: WriteOnce<PoolId>,
    /// Current material; reassigned on every `get`.
    material: MaterialType,
    /// Seconds since (re)activation.
    age: f32,
    /// Recycle counter.
    generation: u32,
    /// Slot in the population array.
    position_index: usize,
    /// False while the shape sits in a free list.
    active: bool,
    /// Render-facing transform. Opaque to the engine apart from behaviors.
    pub transform: Transform,
    /// One color per renderable part.
    colors: Vec<Color>,
    /// Active behaviors, updated in order.
    pub(crate) behaviors: Vec<ShapeBehavior>,
}

impl Shape {
    /// Creates a fresh shape for a cold allocation.
    pub(crate) fn new(key: ShapeKey, generation: u32, color_count: usize) -> Self {
        Self {
            key,
            shape_type: WriteOnce::unset("shape type"),
            origin_pool: WriteOnce::unset("origin pool"),
            material: MaterialType::default(),
            age: 0.0,
            generation,
            position_index: 0,
            active: false,
            transform: Transform::IDENTITY,
            colors: vec![Color::WHITE; color_count],
            behaviors: Vec::new(),
        }
    }

    /// Stable pool address.
    #[inline]
    #[must_use]
    pub const fn key(&self) -> ShapeKey {
        self.key
    }

    /// Shape kind.
    #[inline]
    #[must_use]
    pub fn shape_type(&self) -> ShapeType {
        self.shape_type.get().unwrap_or_default()
    }

    /// Owning pool, if bound.
    #[inline]
    #[must_use]
    pub const fn origin_pool(&self) -> Option<PoolId> {
        self.origin_pool.get()
    }

    /// Current material.
    #[inline]
    #[must_use]
    pub const fn material(&self) -> MaterialType {
        self.material
    }

    /// Seconds since activation.
    #[inline]
    #[must_use]
    pub const fn age(&self) -> f32 {
        self.age
    }

    /// Recycle counter (the instance id handles compare against).
    #[inline]
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Current slot in the population array.
    #[inline]
    #[must_use]
    pub const fn position_index(&self) -> usize {
        self.position_index
    }

    /// True while the shape is out of its pool.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Per-part colors.
    #[inline]
    #[must_use]
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Number of renderable parts.
    #[inline]
    #[must_use]
    pub fn color_count(&self) -> usize {
        self.colors.len()
    }

    /// Active behaviors, in update order.
    #[inline]
    #[must_use]
    pub fn behaviors(&self) -> &[ShapeBehavior] {
        &self.behaviors
    }

    pub(crate) fn bind(&mut self, pool: PoolId, shape_type: ShapeType) -> crate::CoreResult<()> {
        self.origin_pool.set(pool)?;
        self.shape_type.set(shape_type)
    }

    pub(crate) fn activate(&mut self, material: MaterialType) {
        self.active = true;
        self.material = material;
    }

    /// Resets lifetime state and bumps the generation. Returns the behaviors to recycle.
    pub(crate) fn retire(&mut self) -> Vec<ShapeBehavior> {
        self.age = 0.0;
        self.generation = self.generation.wrapping_add(1);
        self.active = false;
        std::mem::take(&mut self.behaviors)
    }

    pub(crate) fn advance_age(&mut self, delta_time: f32) {
        self.age += delta_time;
    }

    pub(crate) fn set_age(&mut self, age: f32) {
        self.age = age;
    }

    pub(crate) fn set_position_index(&mut self, index: usize) {
        self.position_index = index;
    }

    pub(crate) fn set_color_at(&mut self, index: usize, color: Color) -> bool {
        match self.colors.get_mut(index) {
            Some(slot) => {
                *slot = color;
                true
            }
            None => false,
        }
    }
}

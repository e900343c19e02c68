//! # Shape Behaviors
//!
//! A shape is driven by an ordered list of behaviors. Each behavior is a variant of
//! the closed [`ShapeBehavior`] enum and is pooled per variant.
//!
//! ## Contract
//!
//! - `update` returns `false` when the behavior is finished; the owner then
//!   recycles it into its variant pool and drops it from the list.
//! - Behaviors mutate only their own shape (through [`BehaviorContext`]). Kill and
//!   mark-dying are requests routed through the population.
//! - Behaviors attached during an update run later in the same pass.
//!
//! ## Variants
//!
//! | tag | variant     | state                                        |
//! |-----|-------------|----------------------------------------------|
//! | 0   | Movement    | velocity                                     |
//! | 1   | Rotation    | angular velocity (degrees/s)                 |
//! | 2   | Oscillation | offset, frequency, last sample               |
//! | 3   | Satellite   | focal handle, frequency, offsets, last pos   |
//! | 4   | Growing     | original scale, duration                     |
//! | 5   | Dying       | original scale, duration, age at death start |
//! | 6   | Lifecycle   | adult and dying durations, death age         |

mod lifecycle;
mod motion;
mod pool;
mod satellite;

pub use lifecycle::{DyingBehavior, GrowingBehavior, LifecycleBehavior};
pub use motion::{MovementBehavior, OscillationBehavior, RotationBehavior};
pub use pool::{BehaviorPool, BehaviorPools};
pub use satellite::SatelliteBehavior;

use shapeshift_shared::{Transform, Vec3};

use crate::error::{CoreError, CoreResult};
use crate::handle::{ShapeHandle, ShapeKey};
use crate::persistence::{SaveReader, SaveWriter};
use crate::pool::ShapeStore;
use crate::population::Population;

/// Save tag of a behavior variant.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BehaviorKind {
    /// Linear motion.
    Movement = 0,
    /// Constant spin.
    Rotation = 1,
    /// Sinusoidal offset.
    Oscillation = 2,
    /// Orbit around a focal shape.
    Satellite = 3,
    /// Scale-in phase.
    Growing = 4,
    /// Scale-out phase ending in death.
    Dying = 5,
    /// Growing/adult/dying scheduler.
    Lifecycle = 6,
}

impl BehaviorKind {
    /// Decodes a save tag.
    ///
    /// # Errors
    ///
    /// Returns `UnknownBehavior` for tags this build does not know.
    pub fn from_tag(tag: i32) -> CoreResult<Self> {
        Ok(match tag {
            0 => Self::Movement,
            1 => Self::Rotation,
            2 => Self::Oscillation,
            3 => Self::Satellite,
            4 => Self::Growing,
            5 => Self::Dying,
            6 => Self::Lifecycle,
            _ => return Err(CoreError::UnknownBehavior(tag)),
        })
    }

    /// Save tag.
    #[inline]
    #[must_use]
    pub const fn tag(self) -> i32 {
        self as i32
    }
}

/// A pooled behavior payload.
pub trait BehaviorVariant: Default + Sized {
    /// Variant tag.
    const KIND: BehaviorKind;

    /// The pool this variant is recycled into.
    fn pool(pools: &mut BehaviorPools) -> &mut BehaviorPool<Self>;

    /// Wraps the payload.
    fn into_behavior(self) -> ShapeBehavior;
}

/// One behavior attached to a shape.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeBehavior {
    /// See [`MovementBehavior`].
    Movement(MovementBehavior),
    /// See [`RotationBehavior`].
    Rotation(RotationBehavior),
    /// See [`OscillationBehavior`].
    Oscillation(OscillationBehavior),
    /// See [`SatelliteBehavior`].
    Satellite(SatelliteBehavior),
    /// See [`GrowingBehavior`].
    Growing(GrowingBehavior),
    /// See [`DyingBehavior`].
    Dying(DyingBehavior),
    /// See [`LifecycleBehavior`].
    Lifecycle(LifecycleBehavior),
}

macro_rules! impl_variant {
    ($($variant:ident => $ty:ty, $field:ident;)*) => {
        $(
            impl BehaviorVariant for $ty {
                const KIND: BehaviorKind = BehaviorKind::$variant;

                fn pool(pools: &mut BehaviorPools) -> &mut BehaviorPool<Self> {
                    &mut pools.$field
                }

                fn into_behavior(self) -> ShapeBehavior {
                    ShapeBehavior::$variant(self)
                }
            }

            impl From<$ty> for ShapeBehavior {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*

        impl ShapeBehavior {
            /// Variant tag.
            #[must_use]
            pub const fn kind(&self) -> BehaviorKind {
                match self {
                    $(Self::$variant(_) => BehaviorKind::$variant,)*
                }
            }

            /// Runs one tick. Returns `false` once finished.
            pub fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> bool {
                match self {
                    $(Self::$variant(b) => b.update(ctx),)*
                }
            }

            /// Writes the payload (without the tag).
            pub fn save(&self, writer: &mut SaveWriter, store: &ShapeStore) {
                match self {
                    $(Self::$variant(b) => b.save(writer, store),)*
                }
            }

            /// Reads a payload of the given kind.
            ///
            /// # Errors
            ///
            /// Fails on truncated data.
            pub fn load(kind: BehaviorKind, reader: &mut SaveReader<'_>) -> CoreResult<Self> {
                Ok(match kind {
                    $(BehaviorKind::$variant => Self::$variant(<$ty>::load(reader)?),)*
                })
            }

            /// Returns the payload to its variant pool.
            pub(crate) fn recycle(self, pools: &mut BehaviorPools) {
                match self {
                    $(Self::$variant(b) => pools.$field.release(b.recycled()),)*
                }
            }
        }
    };
}

impl_variant! {
    Movement => MovementBehavior, movement;
    Rotation => RotationBehavior, rotation;
    Oscillation => OscillationBehavior, oscillation;
    Satellite => SatelliteBehavior, satellite;
    Growing => GrowingBehavior, growing;
    Dying => DyingBehavior, dying;
    Lifecycle => LifecycleBehavior, lifecycle;
}

impl ShapeBehavior {
    /// Turns saved shape indices into live handles.
    pub(crate) fn resolve_shape_instances(&mut self, population: &[ShapeKey], store: &ShapeStore) {
        if let Self::Satellite(satellite) = self {
            satellite.focal.resolve(population, store);
        }
    }
}

/// What a behavior may see and do while it runs.
///
/// The shape's transform is worked on as a copy and written back afterwards.
/// Behaviors attached through the context are appended to the shape's list.
pub struct BehaviorContext<'a> {
    pub(crate) population: &'a mut Population,
    handle: ShapeHandle,
    pub(crate) transform: Transform,
    age: f32,
    delta_time: f32,
    pub(crate) attached: Vec<ShapeBehavior>,
}

impl<'a> BehaviorContext<'a> {
    pub(crate) fn new(
        population: &'a mut Population,
        handle: ShapeHandle,
        transform: Transform,
        age: f32,
        delta_time: f32,
    ) -> Self {
        Self { population, handle, transform, age, delta_time, attached: Vec::new() }
    }

    /// Handle of the shape being driven.
    #[inline]
    #[must_use]
    pub const fn handle(&self) -> ShapeHandle {
        self.handle
    }

    /// The shape's age in seconds.
    #[inline]
    #[must_use]
    pub const fn age(&self) -> f32 {
        self.age
    }

    /// Tick duration. Zero outside the update pass.
    #[inline]
    #[must_use]
    pub const fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// The shape's transform.
    #[inline]
    #[must_use]
    pub const fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Mutable transform.
    #[inline]
    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    /// Position of another shape, if the handle is still valid.
    #[must_use]
    pub fn position_of(&self, other: ShapeHandle) -> Option<Vec3> {
        self.population.store().get(other).map(|shape| shape.transform.position)
    }

    /// Requests the death of this shape.
    pub fn die(&mut self) {
        self.population.kill(self.handle);
    }

    /// Requests that this shape join the dying partition.
    pub fn mark_as_dying(&mut self) {
        self.population.mark_as_dying(self.handle);
    }

    /// True once the shape sits in the dying partition.
    #[must_use]
    pub fn is_marked_as_dying(&self) -> bool {
        self.population.is_marked_as_dying(self.handle)
    }

    /// Attaches a pooled behavior of variant `V`, initialised by `init`.
    pub fn attach_with<V: BehaviorVariant>(&mut self, init: impl FnOnce(&mut V)) {
        let mut behavior = V::pool(&mut self.population.behaviors).acquire();
        init(&mut behavior);
        self.attached.push(behavior.into_behavior());
    }
}

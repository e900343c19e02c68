//! Growing, dying and the lifecycle scheduler.
//!
//! Scale changes use a smoothstep ease over the fraction of the phase elapsed.

use shapeshift_shared::Vec3;

use super::BehaviorContext;
use crate::error::CoreResult;
use crate::persistence::{SaveReader, SaveWriter};
use crate::pool::ShapeStore;

#[inline]
fn smoothstep(s: f32) -> f32 {
    (3.0 - 2.0 * s) * s * s
}

/// Scales the shape up from zero to its original scale.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GrowingBehavior {
    /// Scale to reach.
    pub original_scale: Vec3,
    /// Seconds, measured from age zero.
    pub duration: f32,
}

impl GrowingBehavior {
    /// Starts the growing phase: remembers the scale and collapses the shape.
    pub fn attach(ctx: &mut BehaviorContext<'_>, duration: f32) {
        let original_scale = ctx.transform().scale;
        ctx.attach_with::<Self>(|growing| {
            growing.original_scale = original_scale;
            growing.duration = duration;
        });
        ctx.transform_mut().scale = Vec3::ZERO;
    }

    pub(crate) fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> bool {
        let age = ctx.age();
        if age < self.duration {
            let s = smoothstep(age / self.duration);
            ctx.transform_mut().scale = self.original_scale * s;
            return true;
        }
        ctx.transform_mut().scale = self.original_scale;
        false
    }

    pub(crate) fn save(&self, writer: &mut SaveWriter, _store: &ShapeStore) {
        writer.write_vec3(self.original_scale);
        writer.write_f32(self.duration);
    }

    pub(crate) fn load(reader: &mut SaveReader<'_>) -> CoreResult<Self> {
        Ok(Self { original_scale: reader.read_vec3()?, duration: reader.read_f32()? })
    }

    pub(crate) fn recycled(self) -> Self {
        self
    }
}

/// Shrinks the shape to nothing, then kills it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DyingBehavior {
    /// Scale when dying began.
    pub original_scale: Vec3,
    /// Seconds until death.
    pub duration: f32,
    /// Shape age when dying began.
    pub dying_age: f32,
}

impl DyingBehavior {
    /// Starts the dying sequence and moves the shape into the dying partition.
    pub fn attach(ctx: &mut BehaviorContext<'_>, duration: f32) {
        let original_scale = ctx.transform().scale;
        let dying_age = ctx.age();
        ctx.attach_with::<Self>(|dying| {
            dying.original_scale = original_scale;
            dying.duration = duration;
            dying.dying_age = dying_age;
        });
        ctx.mark_as_dying();
    }

    pub(crate) fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> bool {
        let dying_duration = ctx.age() - self.dying_age;
        if dying_duration < self.duration {
            let s = smoothstep(1.0 - dying_duration / self.duration);
            ctx.transform_mut().scale = self.original_scale * s;
            return true;
        }
        ctx.die();
        true
    }

    pub(crate) fn save(&self, writer: &mut SaveWriter, _store: &ShapeStore) {
        writer.write_vec3(self.original_scale);
        writer.write_f32(self.duration);
        writer.write_f32(self.dying_age);
    }

    pub(crate) fn load(reader: &mut SaveReader<'_>) -> CoreResult<Self> {
        Ok(Self {
            original_scale: reader.read_vec3()?,
            duration: reader.read_f32()?,
            dying_age: reader.read_f32()?,
        })
    }

    pub(crate) fn recycled(self) -> Self {
        self
    }
}

/// Schedules the growing, adult and dying phases of a shape.
///
/// Growing is attached up front. Once the adult phase has elapsed the scheduler
/// either kills the shape outright (no dying duration) or hands over to a
/// [`DyingBehavior`] and retires.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LifecycleBehavior {
    /// Seconds spent fully grown.
    pub adult_duration: f32,
    /// Seconds spent shrinking.
    pub dying_duration: f32,
    /// Age at which dying starts.
    pub dying_age: f32,
}

impl LifecycleBehavior {
    /// Attaches the scheduler (and a growing phase if `growing > 0`).
    pub fn attach(ctx: &mut BehaviorContext<'_>, growing: f32, adult: f32, dying: f32) {
        ctx.attach_with::<Self>(|lifecycle| {
            lifecycle.adult_duration = adult;
            lifecycle.dying_duration = dying;
            lifecycle.dying_age = growing + adult;
        });
        if growing > 0.0 {
            GrowingBehavior::attach(ctx, growing);
        }
    }

    pub(crate) fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> bool {
        if ctx.age() < self.dying_age {
            return true;
        }
        if self.dying_duration <= 0.0 {
            ctx.die();
            return true;
        }
        if !ctx.is_marked_as_dying() {
            let remaining = self.dying_duration + self.dying_age - ctx.age();
            DyingBehavior::attach(ctx, remaining);
        }
        false
    }

    pub(crate) fn save(&self, writer: &mut SaveWriter, _store: &ShapeStore) {
        writer.write_f32(self.adult_duration);
        writer.write_f32(self.dying_duration);
        writer.write_f32(self.dying_age);
    }

    pub(crate) fn load(reader: &mut SaveReader<'_>) -> CoreResult<Self> {
        Ok(Self {
            adult_duration: reader.read_f32()?,
            dying_duration: reader.read_f32()?,
            dying_age: reader.read_f32()?,
        })
    }

    pub(crate) fn recycled(self) -> Self {
        self
    }
}

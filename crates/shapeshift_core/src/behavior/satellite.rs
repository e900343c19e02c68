//! Orbit around a focal shape.
//!
//! Position is a pure function of age, so an orbit survives save and reload
//! without drift. When the focal shape disappears the satellite keeps its last
//! velocity as linear motion.

use rand::Rng;
use shapeshift_shared::Vec3;

use super::motion::{MovementBehavior, RotationBehavior};
use super::BehaviorContext;
use crate::error::CoreResult;
use crate::handle::ShapeHandle;
use crate::persistence::{SaveReader, SaveWriter};
use crate::pool::ShapeStore;
use crate::random::RandomExt;

/// Orbits a focal shape in a random plane.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SatelliteBehavior {
    /// Shape being orbited.
    pub focal: ShapeHandle,
    /// Revolutions per second.
    pub frequency: f32,
    /// Offset at phase zero, length = orbit radius.
    pub cos_offset: Vec3,
    /// Offset a quarter turn later, orthogonal to `cos_offset`.
    pub sin_offset: Vec3,
    /// Position before the last update.
    pub previous_position: Vec3,
}

impl SatelliteBehavior {
    /// Puts the shape in orbit around `focal`.
    ///
    /// Also attaches a rotation so the satellite stays tidally locked.
    pub fn attach<R: Rng + ?Sized>(
        ctx: &mut BehaviorContext<'_>,
        rng: &mut R,
        focal: ShapeHandle,
        radius: f32,
        frequency: f32,
    ) {
        let orbit_axis = rng.on_unit_sphere();
        let cos_offset = loop {
            let candidate = orbit_axis.cross(rng.on_unit_sphere()).normalized();
            if candidate.length_squared() >= 0.01 {
                break candidate;
            }
        };
        let sin_offset = cos_offset.cross(orbit_axis);
        let (cos_offset, sin_offset) = (cos_offset * radius, sin_offset * radius);
        let angular_velocity =
            ctx.transform().inverse_transform_direction(orbit_axis) * (-360.0 * frequency);

        let t = std::f32::consts::TAU * frequency * ctx.age();
        let position = ctx
            .position_of(focal)
            .map(|center| center + cos_offset * t.cos() + sin_offset * t.sin());
        if let Some(position) = position {
            ctx.transform_mut().position = position;
        }
        let previous_position = ctx.transform().position;

        ctx.attach_with::<Self>(|satellite| {
            satellite.focal = focal;
            satellite.frequency = frequency;
            satellite.cos_offset = cos_offset;
            satellite.sin_offset = sin_offset;
            satellite.previous_position = previous_position;
        });
        ctx.attach_with::<RotationBehavior>(|rotation| rotation.angular_velocity = angular_velocity);
    }

    pub(crate) fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> bool {
        if let Some(center) = ctx.position_of(self.focal) {
            let t = std::f32::consts::TAU * self.frequency * ctx.age();
            self.previous_position = ctx.transform().position;
            ctx.transform_mut().position =
                center + self.cos_offset * t.cos() + self.sin_offset * t.sin();
            return true;
        }

        let dt = ctx.delta_time();
        let velocity = if dt > 0.0 {
            (ctx.transform().position - self.previous_position) / dt
        } else {
            Vec3::ZERO
        };
        tracing::trace!(?velocity, "focal shape gone, satellite drifts");
        ctx.attach_with::<MovementBehavior>(|movement| movement.velocity = velocity);
        false
    }

    pub(crate) fn save(&self, writer: &mut SaveWriter, store: &ShapeStore) {
        writer.write_i32(self.focal.save_index(store));
        writer.write_f32(self.frequency);
        writer.write_vec3(self.cos_offset);
        writer.write_vec3(self.sin_offset);
        writer.write_vec3(self.previous_position);
    }

    pub(crate) fn load(reader: &mut SaveReader<'_>) -> CoreResult<Self> {
        Ok(Self {
            focal: ShapeHandle::from_save_index(reader.read_i32()?),
            frequency: reader.read_f32()?,
            cos_offset: reader.read_vec3()?,
            sin_offset: reader.read_vec3()?,
            previous_position: reader.read_vec3()?,
        })
    }

    pub(crate) fn recycled(mut self) -> Self {
        self.focal = ShapeHandle::NONE;
        self
    }
}

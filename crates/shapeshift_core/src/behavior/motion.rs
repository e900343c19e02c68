//! Movement, rotation and oscillation.

use shapeshift_shared::Vec3;

use super::BehaviorContext;
use crate::error::CoreResult;
use crate::persistence::{SaveReader, SaveWriter};
use crate::pool::ShapeStore;

/// Moves the shape at a constant velocity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MovementBehavior {
    /// Units per second.
    pub velocity: Vec3,
}

impl MovementBehavior {
    pub(crate) fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> bool {
        let dt = ctx.delta_time();
        ctx.transform_mut().position += self.velocity * dt;
        true
    }

    pub(crate) fn save(&self, writer: &mut SaveWriter, _store: &ShapeStore) {
        writer.write_vec3(self.velocity);
    }

    pub(crate) fn load(reader: &mut SaveReader<'_>) -> CoreResult<Self> {
        Ok(Self { velocity: reader.read_vec3()? })
    }

    pub(crate) fn recycled(self) -> Self {
        self
    }
}

/// Spins the shape around its local axes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RotationBehavior {
    /// Euler degrees per second.
    pub angular_velocity: Vec3,
}

impl RotationBehavior {
    pub(crate) fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> bool {
        let step = self.angular_velocity * ctx.delta_time();
        ctx.transform_mut().rotate_local(step);
        true
    }

    pub(crate) fn save(&self, writer: &mut SaveWriter, _store: &ShapeStore) {
        writer.write_vec3(self.angular_velocity);
    }

    pub(crate) fn load(reader: &mut SaveReader<'_>) -> CoreResult<Self> {
        Ok(Self { angular_velocity: reader.read_vec3()? })
    }

    pub(crate) fn recycled(self) -> Self {
        self
    }
}

/// Adds a sinusoidal offset to the shape's position.
///
/// Only the change since the previous sample is applied, so other behaviors
/// can move the shape at the same time.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OscillationBehavior {
    /// Peak displacement.
    pub offset: Vec3,
    /// Cycles per second.
    pub frequency: f32,
    /// Last sample, in `[-1, 1]`.
    pub previous: f32,
}

impl OscillationBehavior {
    pub(crate) fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> bool {
        let oscillation = (std::f32::consts::TAU * self.frequency * ctx.age()).sin();
        let delta = self.offset * (oscillation - self.previous);
        ctx.transform_mut().position += delta;
        self.previous = oscillation;
        true
    }

    pub(crate) fn save(&self, writer: &mut SaveWriter, _store: &ShapeStore) {
        writer.write_vec3(self.offset);
        writer.write_f32(self.frequency);
        writer.write_f32(self.previous);
    }

    pub(crate) fn load(reader: &mut SaveReader<'_>) -> CoreResult<Self> {
        Ok(Self {
            offset: reader.read_vec3()?,
            frequency: reader.read_f32()?,
            previous: reader.read_f32()?,
        })
    }

    pub(crate) fn recycled(mut self) -> Self {
        self.previous = 0.0;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::ShapeBehavior;

    #[test]
    fn test_oscillation_resets_sample_on_recycle() {
        let behavior = OscillationBehavior { offset: Vec3::X, frequency: 1.0, previous: 0.7 };
        assert_eq!(behavior.recycled().previous, 0.0);
    }

    #[test]
    fn test_payloads_read_back() {
        let store = ShapeStore::new();
        let original = ShapeBehavior::Oscillation(OscillationBehavior {
            offset: Vec3::new(0.0, 2.0, 0.0),
            frequency: 0.5,
            previous: -0.25,
        });
        let mut writer = SaveWriter::new();
        original.save(&mut writer, &store);
        let bytes = writer.into_bytes();

        let mut reader = SaveReader::new(&bytes, 7);
        let loaded = ShapeBehavior::load(original.kind(), &mut reader).unwrap();
        assert_eq!(loaded, original);
    }
}

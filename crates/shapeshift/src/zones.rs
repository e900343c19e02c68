//! # Kill Zones & Life Zones
//!
//! Trigger volumes evaluated after each tick, outside the update pass, so
//! their kills and death sequences take effect immediately.
//!
//! - A kill zone acts on shapes whose position is inside it.
//! - A life zone acts on shapes that were inside at the previous evaluation
//!   and are now outside.

use std::collections::HashSet;

use shapeshift_core::{Population, ShapeHandle};
use shapeshift_shared::Vec3;

use crate::config::{KillZoneConfig, LifeZoneConfig, VolumeConfig};

/// Axis-aligned box or ball.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Volume {
    /// Box between two corners.
    Box {
        /// Minimum corner.
        min: Vec3,
        /// Maximum corner.
        max: Vec3,
    },
    /// Ball.
    Sphere {
        /// Center.
        center: Vec3,
        /// Radius.
        radius: f32,
    },
}

impl Volume {
    /// True if `point` is inside or on the boundary.
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        match *self {
            Self::Box { min, max } => {
                (min.x..=max.x).contains(&point.x)
                    && (min.y..=max.y).contains(&point.y)
                    && (min.z..=max.z).contains(&point.z)
            }
            Self::Sphere { center, radius } => (point - center).length_squared() <= radius * radius,
        }
    }
}

impl From<VolumeConfig> for Volume {
    fn from(config: VolumeConfig) -> Self {
        match config {
            VolumeConfig::Box { center, size } => {
                let half = Vec3::new(size.x.abs(), size.y.abs(), size.z.abs()) * 0.5;
                Self::Box { min: center - half, max: center + half }
            }
            VolumeConfig::Sphere { center, radius } => Self::Sphere { center, radius: radius.abs() },
        }
    }
}

/// Positions and handles of every live shape, in population order.
fn shapes(population: &Population) -> impl Iterator<Item = (ShapeHandle, Vec3)> + '_ {
    population.iter().map(|shape| (ShapeHandle::of(shape), shape.transform.position))
}

/// Kills shapes inside its volume, or starts their death sequence.
#[derive(Clone, Debug)]
pub struct KillZone {
    volume: Volume,
    dying_duration: f32,
    victims: Vec<ShapeHandle>,
}

impl KillZone {
    /// Creates a zone. A non-positive `dying_duration` kills outright.
    #[must_use]
    pub fn new(volume: Volume, dying_duration: f32) -> Self {
        Self { volume, dying_duration, victims: Vec::new() }
    }

    /// Trigger volume.
    #[inline]
    #[must_use]
    pub const fn volume(&self) -> &Volume {
        &self.volume
    }

    /// Acts on every shape inside. Returns how many were affected.
    pub fn apply(&mut self, population: &mut Population) -> usize {
        let kill = self.dying_duration <= 0.0;
        self.victims.clear();
        self.victims.extend(
            shapes(population)
                .filter(|(handle, position)| {
                    self.volume.contains(*position) && (kill || !population.is_marked_as_dying(*handle))
                })
                .map(|(handle, _)| handle),
        );

        for handle in &self.victims {
            if kill {
                population.kill(*handle);
            } else {
                population.start_dying(*handle, self.dying_duration);
            }
        }
        self.victims.len()
    }
}

impl From<&KillZoneConfig> for KillZone {
    fn from(config: &KillZoneConfig) -> Self {
        Self::new(config.volume.into(), config.dying_duration)
    }
}

/// Starts the death sequence of shapes that leave its volume.
#[derive(Clone, Debug)]
pub struct LifeZone {
    volume: Volume,
    dying_duration: f32,
    /// Shapes inside at the last evaluation.
    inside: HashSet<ShapeHandle>,
    scratch: HashSet<ShapeHandle>,
    exited: Vec<ShapeHandle>,
}

impl LifeZone {
    /// Creates a zone. A non-positive `dying_duration` kills outright.
    #[must_use]
    pub fn new(volume: Volume, dying_duration: f32) -> Self {
        Self {
            volume,
            dying_duration,
            inside: HashSet::new(),
            scratch: HashSet::new(),
            exited: Vec::new(),
        }
    }

    /// Trigger volume.
    #[inline]
    #[must_use]
    pub const fn volume(&self) -> &Volume {
        &self.volume
    }

    /// Records which shapes are inside right now without acting on them.
    ///
    /// Used after the population was replaced by a new game or a load.
    pub fn sync(&mut self, population: &Population) {
        self.inside.clear();
        let volume = self.volume;
        self.inside.extend(
            shapes(population).filter(|(_, position)| volume.contains(*position)).map(|(handle, _)| handle),
        );
    }

    /// Acts on every shape that left since the last call. Returns how many.
    pub fn apply(&mut self, population: &mut Population) -> usize {
        self.scratch.clear();
        self.exited.clear();
        for (handle, position) in shapes(population) {
            if self.volume.contains(position) {
                self.scratch.insert(handle);
            } else if self.inside.contains(&handle) {
                self.exited.push(handle);
            }
        }
        std::mem::swap(&mut self.inside, &mut self.scratch);

        let mut affected = 0;
        for handle in &self.exited {
            if !population.is_marked_as_dying(*handle) {
                population.start_dying(*handle, self.dying_duration);
                affected += 1;
            }
        }
        if affected > 0 {
            tracing::debug!(affected, "shapes left a life zone");
        }
        affected
    }
}

impl From<&LifeZoneConfig> for LifeZone {
    fn from(config: &LifeZoneConfig) -> Self {
        Self::new(config.volume.into(), config.dying_duration)
    }
}

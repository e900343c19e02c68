//! # Spawn Zones
//!
//! A spawn zone picks a point, takes a pooled shape from one of its factories
//! and decorates it: transform, colors, motion behaviors, satellites and a
//! lifecycle. Composite zones delegate to their children, either in order or at
//! random; the sequential cursor is level state and goes into save files.
//!
//! Every zone in the tree may also spawn on its own at `spawn_speed` shapes per
//! second. The fractional progress toward the next spawn is level state too.
//!
//! All randomness comes from the session stream handed over in the
//! [`SpawnContext`], so a restored session replays the same spawns.

use std::collections::HashMap;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use shapeshift_core::{
    CoreError, CoreResult, DyingBehavior, GrowingBehavior, LifecycleBehavior, MaterialType,
    MovementBehavior, OscillationBehavior, PoolId, Population, RandomExt, RotationBehavior,
    SatelliteBehavior, SaveReader, SaveWriter, ShapeKey, ShapeType, SpawnContext, SpawnSource,
};
use shapeshift_shared::{Transform, Vec3};

use crate::config::{LifecycleDurations, MovementDirection, SpawnConfiguration, SpawnZoneConfig};
use crate::error::{GameError, GameResult};

/// Spawn configuration with factory names resolved to pool ids.
#[derive(Clone, Debug)]
struct Decoration {
    /// Never empty.
    factories: Vec<PoolId>,
    config: SpawnConfiguration,
}

#[derive(Clone, Debug)]
enum ZoneKind {
    Cube { surface_only: bool },
    Sphere { surface_only: bool },
    Composite { zones: Vec<SpawnZone>, sequential: bool, override_config: bool, next: usize },
}

/// A runtime spawn zone.
#[derive(Clone, Debug)]
pub struct SpawnZone {
    transform: Transform,
    kind: ZoneKind,
    decoration: Decoration,
    /// Own spawns per second.
    spawn_speed: f32,
    /// Fraction of the next own spawn accumulated.
    spawn_progress: f32,
}

impl SpawnZone {
    /// Builds a zone tree, resolving factory names through `pools`.
    ///
    /// # Errors
    ///
    /// Returns `Config` for unknown factories, empty factory lists and
    /// composites without children.
    pub fn from_config(config: &SpawnZoneConfig, pools: &HashMap<String, PoolId>) -> GameResult<Self> {
        let (transform, kind, spawn) = match config {
            SpawnZoneConfig::Cube { transform, surface_only, spawn, .. } => {
                (transform, ZoneKind::Cube { surface_only: *surface_only }, spawn)
            }
            SpawnZoneConfig::Sphere { transform, surface_only, spawn, .. } => {
                (transform, ZoneKind::Sphere { surface_only: *surface_only }, spawn)
            }
            SpawnZoneConfig::Composite {
                transform, zones, sequential, override_config, spawn, ..
            } => {
                if zones.is_empty() {
                    return Err(GameError::Config("composite spawn zone without children".into()));
                }
                let zones = zones
                    .iter()
                    .map(|zone| Self::from_config(zone, pools))
                    .collect::<GameResult<Vec<_>>>()?;
                let kind = ZoneKind::Composite {
                    zones,
                    sequential: *sequential,
                    override_config: *override_config,
                    next: 0,
                };
                (transform, kind, spawn)
            }
        };

        let factories = spawn
            .factories
            .iter()
            .map(|name| {
                pools
                    .get(name)
                    .copied()
                    .ok_or_else(|| GameError::Config(format!("unknown factory '{name}'")))
            })
            .collect::<GameResult<Vec<_>>>()?;
        if factories.is_empty() {
            return Err(GameError::Config("spawn zone without factories".into()));
        }

        Ok(Self {
            transform: transform.to_transform(),
            kind,
            decoration: Decoration { factories, config: spawn.clone() },
            spawn_speed: config.spawn_speed(),
            spawn_progress: 0.0,
        })
    }

    /// Zone placement.
    #[inline]
    #[must_use]
    pub const fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Own spawns per second.
    #[inline]
    #[must_use]
    pub const fn spawn_speed(&self) -> f32 {
        self.spawn_speed
    }

    /// Fraction of the next own spawn accumulated.
    #[inline]
    #[must_use]
    pub const fn spawn_progress(&self) -> f32 {
        self.spawn_progress
    }

    /// Index of the child the next sequential spawn will use, for composites.
    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        match &self.kind {
            ZoneKind::Composite { next, .. } => Some(*next),
            _ => None,
        }
    }

    /// A random point inside (or on) the zone, in world space.
    pub fn spawn_point(&mut self, rng: &mut ChaCha8Rng) -> Vec3 {
        if matches!(self.kind, ZoneKind::Composite { .. }) {
            let index = self.next_child(rng);
            if let ZoneKind::Composite { zones, .. } = &mut self.kind {
                return zones[index].spawn_point(rng);
            }
        }
        match self.kind {
            ZoneKind::Cube { surface_only } => {
                let mut p = [rng.range_f32(-0.5, 0.5), rng.range_f32(-0.5, 0.5), rng.range_f32(-0.5, 0.5)];
                if surface_only {
                    let axis = rng.gen_range(0..3);
                    p[axis] = if p[axis] < 0.0 { -0.5 } else { 0.5 };
                }
                self.transform.transform_point(Vec3::from_array(p))
            }
            ZoneKind::Sphere { surface_only } => {
                let p = if surface_only { rng.on_unit_sphere() } else { rng.inside_unit_sphere() };
                self.transform.transform_point(p)
            }
            ZoneKind::Composite { .. } => self.transform.position,
        }
    }

    /// Picks a child for a composite and advances the sequential cursor.
    fn next_child(&mut self, rng: &mut ChaCha8Rng) -> usize {
        match &mut self.kind {
            ZoneKind::Composite { zones, sequential: true, next, .. } => {
                let index = *next;
                *next = (*next + 1) % zones.len();
                index
            }
            ZoneKind::Composite { zones, .. } => rng.index_in(0, zones.len()),
            _ => 0,
        }
    }

    /// Produces a shape decorated with this zone's own configuration.
    fn spawn_shape(&mut self, ctx: &mut SpawnContext<'_>) -> CoreResult<ShapeKey> {
        let rng = &mut *ctx.rng;
        let population = &mut *ctx.population;

        let point = self.spawn_point(rng);
        let origin = self.transform.position;
        let decoration = &self.decoration;
        let config = &decoration.config;

        let key = decoration.take_shape(population, rng)?;
        let rotation = rng.rotation();
        let transform = Transform::new(point, rotation, Vec3::splat(config.scale.random(rng)));
        if let Some(shape) = population.shape_mut(key) {
            shape.transform = transform;
        }
        decoration.setup_color(population, key, rng);

        let angular_speed = config.angular_speed.random(rng);
        let angular_velocity = (angular_speed != 0.0).then(|| rng.on_unit_sphere() * angular_speed);
        let direction = direction_vector(config.movement_direction, &transform, origin, rng);
        let speed = config.speed.random(rng);

        let amplitude = config.oscillation_amplitude.random(rng);
        let frequency = config.oscillation_frequency.random(rng);
        let oscillation = (amplitude != 0.0 && frequency != 0.0).then(|| {
            direction_vector(config.oscillation_direction, &transform, origin, rng) * amplitude
        });

        population.with_context(key, |ctx| {
            if let Some(angular_velocity) = angular_velocity {
                ctx.attach_with::<RotationBehavior>(|b| b.angular_velocity = angular_velocity);
            }
            if speed != 0.0 {
                ctx.attach_with::<MovementBehavior>(|b| b.velocity = direction * speed);
            }
            if let Some(offset) = oscillation {
                ctx.attach_with::<OscillationBehavior>(|b| {
                    b.offset = offset;
                    b.frequency = frequency;
                });
            }
        });

        let satellites = config.satellite.amount.random(rng);
        let durations = config.lifecycle.random(rng);
        for _ in 0..satellites {
            let satellite_durations = if config.satellite.uniform_lifecycles {
                durations
            } else {
                config.lifecycle.random(rng)
            };
            decoration.create_satellite(population, rng, key, satellite_durations)?;
        }
        setup_lifecycle(population, key, durations);

        tracing::trace!(?key, satellites, "shape spawned");
        Ok(key)
    }
}

impl SpawnSource for SpawnZone {
    fn produce_spawn(&mut self, ctx: &mut SpawnContext<'_>) -> CoreResult<ShapeKey> {
        if let ZoneKind::Composite { override_config: false, .. } = self.kind {
            let index = self.next_child(ctx.rng);
            if let ZoneKind::Composite { zones, .. } = &mut self.kind {
                return zones[index].produce_spawn(ctx);
            }
        }
        self.spawn_shape(ctx)
    }

    fn advance(&mut self, delta_time: f32, ctx: &mut SpawnContext<'_>) -> CoreResult<usize> {
        let mut spawned = 0;
        let mut failure = None;

        self.spawn_progress += delta_time * self.spawn_speed;
        while self.spawn_progress >= 1.0 {
            self.spawn_progress -= 1.0;
            match self.produce_spawn(ctx) {
                Ok(_) => spawned += 1,
                Err(err) => {
                    failure.get_or_insert(err);
                }
            }
        }
        if let ZoneKind::Composite { zones, .. } = &mut self.kind {
            for zone in zones {
                match zone.advance(delta_time, ctx) {
                    Ok(count) => spawned += count,
                    Err(err) => {
                        failure.get_or_insert(err);
                    }
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(spawned),
        }
    }

    fn save_state(&self, writer: &mut SaveWriter) {
        writer.write_f32(self.spawn_progress);
        if let ZoneKind::Composite { zones, next, .. } = &self.kind {
            writer.write_i32(*next as i32);
            for zone in zones {
                zone.save_state(writer);
            }
        }
    }

    fn load_state(&mut self, reader: &mut SaveReader<'_>) -> CoreResult<()> {
        self.spawn_progress = if reader.version() >= 8 { reader.read_f32()? } else { 0.0 };
        if let ZoneKind::Composite { zones, next, .. } = &mut self.kind {
            let saved = reader.read_i32()?;
            *next = usize::try_from(saved)
                .ok()
                .filter(|index| *index < zones.len())
                .ok_or_else(|| {
                    CoreError::InvalidSaveData(format!(
                        "composite cursor {saved} out of range for {} zones",
                        zones.len()
                    ))
                })?;
            for zone in zones {
                zone.load_state(reader)?;
            }
        }
        Ok(())
    }
}

impl Decoration {
    /// Takes a random shape of a random material from a random factory.
    fn take_shape(&self, population: &mut Population, rng: &mut ChaCha8Rng) -> CoreResult<ShapeKey> {
        let pool = self.factories[rng.index_in(0, self.factories.len())];
        let factory =
            population.store().factory(pool).ok_or(CoreError::UnknownPool(i32::from(pool.0)))?;
        let shape_type = rng.index_in(0, factory.shape_type_count());
        let material = rng.index_in(0, usize::from(factory.material_count()));
        population.spawn(pool, ShapeType(shape_type as u16), MaterialType(material as u16))
    }

    fn setup_color(&self, population: &mut Population, key: ShapeKey, rng: &mut ChaCha8Rng) {
        let store = population.store_mut();
        if self.config.uniform_color {
            store.set_color(key, self.config.color.random(rng));
        } else {
            let parts = store.shape(key).map_or(0, |shape| shape.color_count());
            for part in 0..parts {
                store.set_color_at(key, part, self.config.color.random(rng));
            }
        }
    }

    /// Spawns a shape orbiting `focal`.
    fn create_satellite(
        &self,
        population: &mut Population,
        rng: &mut ChaCha8Rng,
        focal: ShapeKey,
        durations: LifecycleDurations,
    ) -> CoreResult<ShapeKey> {
        let config = &self.config.satellite;
        let key = self.take_shape(population, rng)?;

        let focal_handle = population.handle_of(focal);
        let focal_scale = population.store().shape(focal).map_or(Vec3::ONE, |shape| shape.transform.scale);
        let rotation = rng.rotation();
        let scale = focal_scale * config.relative_scale.random(rng);
        if let Some(shape) = population.shape_mut(key) {
            shape.transform = Transform::new(Vec3::ZERO, rotation, scale);
        }
        self.setup_color(population, key, rng);

        let radius = config.orbit_radius.random(rng);
        let frequency = config.orbit_frequency.random(rng);
        population.with_context(key, |ctx| {
            SatelliteBehavior::attach(ctx, rng, focal_handle, radius, frequency);
        });
        setup_lifecycle(population, key, durations);
        Ok(key)
    }
}

fn direction_vector(
    direction: MovementDirection,
    transform: &Transform,
    origin: Vec3,
    rng: &mut ChaCha8Rng,
) -> Vec3 {
    match direction {
        MovementDirection::Forward => transform.forward(),
        MovementDirection::Upward => transform.up(),
        MovementDirection::Outward => (transform.position - origin).normalized(),
        MovementDirection::Random => rng.on_unit_sphere(),
    }
}

/// Attaches the cheapest behavior set that covers the given phases.
fn setup_lifecycle(population: &mut Population, key: ShapeKey, durations: LifecycleDurations) {
    let LifecycleDurations { growing, adult, dying } = durations;
    population.with_context(key, |ctx| {
        if growing > 0.0 {
            if adult > 0.0 || dying > 0.0 {
                LifecycleBehavior::attach(ctx, growing, adult, dying);
            } else {
                GrowingBehavior::attach(ctx, growing);
            }
        } else if adult > 0.0 {
            LifecycleBehavior::attach(ctx, growing, adult, dying);
        } else if dying > 0.0 {
            DyingBehavior::attach(ctx, dying);
        }
    });
}

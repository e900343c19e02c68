//! # Game Configuration
//!
//! Loaded once at startup from a TOML document. Every field has a default, so
//! an empty document yields the built-in two-level setup.
//!
//! ```toml
//! seed = 42
//! creation_speed = 4.0
//! destroy_duration = 0.5
//!
//! [[factories]]
//! name = "shapes"
//! materials = ["standard", "shiny"]
//! shapes = [{ name = "cube" }, { name = "cluster", color_slots = 3 }]
//!
//! [[levels]]
//! name = "Arena"
//! population_limit = 50
//! spawn_zone = { kind = "sphere", spawn = { factories = ["shapes"] } }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};
use shapeshift_core::RandomExt;
use shapeshift_shared::{Color, Quaternion, Transform, Vec3, FIXED_TICK_RATE};

use crate::error::{GameError, GameResult};

// =============================================================================
// Ranges
// =============================================================================

/// Closed float interval sampled uniformly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FloatRange {
    /// Lower bound.
    pub min: f32,
    /// Upper bound.
    pub max: f32,
}

impl FloatRange {
    /// Creates a range.
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// A range that always yields `value`.
    #[must_use]
    pub const fn constant(value: f32) -> Self {
        Self::new(value, value)
    }

    /// Uniform sample.
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        rng.range_f32(self.min, self.max)
    }
}

/// Closed integer interval sampled uniformly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    /// Lower bound.
    pub min: i32,
    /// Upper bound (inclusive).
    pub max: i32,
}

impl IntRange {
    /// Creates a range.
    #[must_use]
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Uniform sample.
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> i32 {
        rng.range_inclusive(self.min, self.max)
    }
}

/// Hue, saturation and value ranges for random colors.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorRangeHsv {
    /// Hue in `[0, 1]`.
    pub hue: FloatRange,
    /// Saturation in `[0, 1]`.
    pub saturation: FloatRange,
    /// Value in `[0, 1]`.
    pub value: FloatRange,
}

impl Default for ColorRangeHsv {
    fn default() -> Self {
        Self {
            hue: FloatRange::new(0.0, 1.0),
            saturation: FloatRange::new(0.5, 1.0),
            value: FloatRange::new(0.25, 1.0),
        }
    }
}

impl ColorRangeHsv {
    /// Uniform sample.
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Color {
        rng.color_hsv(
            (self.hue.min, self.hue.max),
            (self.saturation.min, self.saturation.max),
            (self.value.min, self.value.max),
        )
    }
}

// =============================================================================
// Spawn configuration
// =============================================================================

/// Direction used for initial velocity and oscillation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementDirection {
    /// The shape's local +Z.
    #[default]
    Forward,
    /// The shape's local +Y.
    Upward,
    /// Away from the spawn zone's origin.
    Outward,
    /// Uniform on the unit sphere.
    Random,
}

/// Orbiting shapes spawned alongside each shape.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SatelliteConfiguration {
    /// Number of satellites per spawned shape.
    pub amount: IntRange,
    /// Satellite scale relative to its focal shape.
    pub relative_scale: FloatRange,
    /// Orbit radius.
    pub orbit_radius: FloatRange,
    /// Revolutions per second.
    pub orbit_frequency: FloatRange,
    /// Reuse the focal shape's lifecycle durations instead of drawing new ones.
    pub uniform_lifecycles: bool,
}

impl Default for SatelliteConfiguration {
    fn default() -> Self {
        Self {
            amount: IntRange::new(0, 0),
            relative_scale: FloatRange::new(0.1, 0.3),
            orbit_radius: FloatRange::new(1.0, 2.0),
            orbit_frequency: FloatRange::new(0.2, 0.5),
            uniform_lifecycles: true,
        }
    }
}

/// Phase durations in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfiguration {
    /// Growing phase.
    pub growing: FloatRange,
    /// Adult phase.
    pub adult: FloatRange,
    /// Dying phase.
    pub dying: FloatRange,
}

/// Sampled lifecycle durations.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LifecycleDurations {
    /// Growing phase.
    pub growing: f32,
    /// Adult phase.
    pub adult: f32,
    /// Dying phase.
    pub dying: f32,
}

impl LifecycleConfiguration {
    /// Draws one duration per phase.
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> LifecycleDurations {
        LifecycleDurations {
            growing: self.growing.random(rng),
            adult: self.adult.random(rng),
            dying: self.dying.random(rng),
        }
    }
}

/// How a spawn zone decorates the shapes it produces.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfiguration {
    /// Factories to draw shapes from, by name.
    pub factories: Vec<String>,
    /// Direction of the initial velocity.
    pub movement_direction: MovementDirection,
    /// Initial speed.
    pub speed: FloatRange,
    /// Angular speed in degrees per second.
    pub angular_speed: FloatRange,
    /// Uniform scale.
    pub scale: FloatRange,
    /// Color range.
    pub color: ColorRangeHsv,
    /// One color for every part instead of one per part.
    pub uniform_color: bool,
    /// Direction of the oscillation offset.
    pub oscillation_direction: MovementDirection,
    /// Oscillation amplitude.
    pub oscillation_amplitude: FloatRange,
    /// Oscillations per second.
    pub oscillation_frequency: FloatRange,
    /// Satellites.
    pub satellite: SatelliteConfiguration,
    /// Lifecycle phase durations.
    pub lifecycle: LifecycleConfiguration,
}

impl Default for SpawnConfiguration {
    fn default() -> Self {
        Self {
            factories: vec![DEFAULT_FACTORY.to_owned()],
            movement_direction: MovementDirection::Forward,
            speed: FloatRange::constant(0.0),
            angular_speed: FloatRange::constant(0.0),
            scale: FloatRange::new(0.1, 1.0),
            color: ColorRangeHsv::default(),
            uniform_color: false,
            oscillation_direction: MovementDirection::Upward,
            oscillation_amplitude: FloatRange::constant(0.0),
            oscillation_frequency: FloatRange::constant(0.0),
            satellite: SatelliteConfiguration::default(),
            lifecycle: LifecycleConfiguration::default(),
        }
    }
}

// =============================================================================
// Zones
// =============================================================================

/// Placement of a zone. Rotation is given as Euler angles in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneTransform {
    /// World position.
    pub position: Vec3,
    /// Euler rotation in degrees.
    pub rotation: Vec3,
    /// Per-axis scale.
    pub scale: Vec3,
}

impl Default for ZoneTransform {
    fn default() -> Self {
        Self { position: Vec3::ZERO, rotation: Vec3::ZERO, scale: Vec3::ONE }
    }
}

impl ZoneTransform {
    /// The equivalent transform.
    #[must_use]
    pub fn to_transform(&self) -> Transform {
        let rotation = if self.rotation == Vec3::ZERO {
            Quaternion::IDENTITY
        } else {
            Quaternion::from_euler_degrees(self.rotation)
        };
        Transform::new(self.position, rotation, self.scale)
    }
}

/// A spawn zone: where shapes appear and how they are configured.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpawnZoneConfig {
    /// Unit cube mapped through `transform`.
    Cube {
        /// Placement.
        #[serde(default)]
        transform: ZoneTransform,
        /// Spawn on the faces only.
        #[serde(default)]
        surface_only: bool,
        /// Shapes per second this zone spawns on its own.
        #[serde(default)]
        spawn_speed: f32,
        /// Decoration.
        #[serde(default)]
        spawn: SpawnConfiguration,
    },
    /// Unit sphere mapped through `transform`.
    Sphere {
        /// Placement.
        #[serde(default)]
        transform: ZoneTransform,
        /// Spawn on the surface only.
        #[serde(default)]
        surface_only: bool,
        /// Shapes per second this zone spawns on its own.
        #[serde(default)]
        spawn_speed: f32,
        /// Decoration.
        #[serde(default)]
        spawn: SpawnConfiguration,
    },
    /// Delegates to child zones.
    Composite {
        /// Placement, used as the origin for outward movement.
        #[serde(default)]
        transform: ZoneTransform,
        /// Child zones.
        zones: Vec<SpawnZoneConfig>,
        /// Cycle through children in order instead of picking at random.
        #[serde(default)]
        sequential: bool,
        /// Decorate with this zone's configuration instead of the child's.
        #[serde(default)]
        override_config: bool,
        /// Shapes per second this zone spawns on its own, on top of its children.
        #[serde(default)]
        spawn_speed: f32,
        /// Decoration used when `override_config` is set.
        #[serde(default)]
        spawn: SpawnConfiguration,
    },
}

impl Default for SpawnZoneConfig {
    fn default() -> Self {
        Self::Sphere {
            transform: ZoneTransform::default(),
            surface_only: false,
            spawn_speed: 0.0,
            spawn: SpawnConfiguration::default(),
        }
    }
}

impl SpawnZoneConfig {
    /// Spawn configurations used by this zone and its children.
    fn spawn_configurations(&self) -> Vec<&SpawnConfiguration> {
        match self {
            Self::Cube { spawn, .. } | Self::Sphere { spawn, .. } => vec![spawn],
            Self::Composite { zones, override_config, spawn, .. } => {
                let mut all: Vec<_> = zones.iter().flat_map(Self::spawn_configurations).collect();
                if *override_config {
                    all.push(spawn);
                }
                all
            }
        }
    }

    /// Own spawn rate.
    #[must_use]
    pub fn spawn_speed(&self) -> f32 {
        match self {
            Self::Cube { spawn_speed, .. }
            | Self::Sphere { spawn_speed, .. }
            | Self::Composite { spawn_speed, .. } => *spawn_speed,
        }
    }

    fn validate(&self) -> GameResult<()> {
        let speed = self.spawn_speed();
        if !speed.is_finite() || speed < 0.0 {
            return Err(GameError::Config(format!(
                "spawn_speed {speed} must be a non-negative number"
            )));
        }
        if let Self::Composite { zones, .. } = self {
            if zones.is_empty() {
                return Err(GameError::Config("composite spawn zone without children".into()));
            }
            for zone in zones {
                zone.validate()?;
            }
        }
        Ok(())
    }
}

/// Axis-aligned trigger volume.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum VolumeConfig {
    /// Box around `center`.
    Box {
        /// Center.
        center: Vec3,
        /// Full extents.
        size: Vec3,
    },
    /// Ball around `center`.
    Sphere {
        /// Center.
        center: Vec3,
        /// Radius.
        radius: f32,
    },
}

/// Kills shapes that enter the volume.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KillZoneConfig {
    /// Trigger volume.
    pub volume: VolumeConfig,
    /// Death transition; zero kills outright.
    #[serde(default)]
    pub dying_duration: f32,
}

/// Starts the death of shapes that leave the volume.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LifeZoneConfig {
    /// Trigger volume.
    pub volume: VolumeConfig,
    /// Death transition; zero kills outright.
    #[serde(default)]
    pub dying_duration: f32,
}

/// One level.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Display name.
    pub name: String,
    /// Alive-shape ceiling; zero disables it.
    pub population_limit: usize,
    /// Root spawn zone.
    pub spawn_zone: SpawnZoneConfig,
    /// Kill zones.
    pub kill_zones: Vec<KillZoneConfig>,
    /// Life zones.
    pub life_zones: Vec<LifeZoneConfig>,
}

// =============================================================================
// Factories
// =============================================================================

/// A shape kind inside a factory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefabConfig {
    /// Kind name.
    pub name: String,
    /// Number of independently colored parts.
    #[serde(default = "one")]
    pub color_slots: usize,
}

/// A shape pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryConfig {
    /// Unique name, referenced from spawn configurations.
    pub name: String,
    /// Keep reclaimed shapes for reuse.
    #[serde(default = "yes")]
    pub recycle: bool,
    /// Shape kinds; the index is the shape type id.
    pub shapes: Vec<PrefabConfig>,
    /// Material names; the index is the material id.
    pub materials: Vec<String>,
}

const fn one() -> usize {
    1
}

const fn yes() -> bool {
    true
}

/// Name of the factory spawn configurations use by default.
pub const DEFAULT_FACTORY: &str = "shapes";

// =============================================================================
// Game configuration
// =============================================================================

/// Top-level game settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Main stream seed. OS entropy when absent.
    pub seed: Option<u64>,
    /// Spawns per second.
    pub creation_speed: f32,
    /// Destructions per second.
    pub destruction_speed: f32,
    /// Death transition for destroyed shapes; zero kills outright.
    pub destroy_duration: f32,
    /// Keep the current session stream when loading instead of restoring it.
    pub reseed_on_load: bool,
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Where the file storage keeps the save blob.
    pub save_path: PathBuf,
    /// Shape pools, registered in order.
    pub factories: Vec<FactoryConfig>,
    /// Levels; level `n` is `levels[n - 1]`.
    pub levels: Vec<LevelConfig>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: None,
            creation_speed: 2.0,
            destruction_speed: 0.0,
            destroy_duration: 0.5,
            reseed_on_load: false,
            tick_rate: FIXED_TICK_RATE,
            save_path: PathBuf::from("saveFile"),
            factories: default_factories(),
            levels: default_levels(),
        }
    }
}

impl GameConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `Config` on syntax errors or inconsistent settings.
    pub fn from_toml_str(text: &str) -> GameResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| GameError::Config(format!("failed to parse: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> GameResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| GameError::Config(format!("failed to read {}: {e}", path.display())))?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), levels = config.levels.len(), "configuration loaded");
        Ok(config)
    }

    /// Length of one simulation tick in seconds.
    #[must_use]
    pub fn fixed_delta(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Checks cross references and ranges.
    ///
    /// # Errors
    ///
    /// Returns `Config` describing the first problem found.
    pub fn validate(&self) -> GameResult<()> {
        if self.tick_rate == 0 {
            return Err(GameError::Config("tick_rate must be positive".into()));
        }
        if self.creation_speed < 0.0 || self.destruction_speed < 0.0 {
            return Err(GameError::Config("speeds must not be negative".into()));
        }
        if self.factories.is_empty() {
            return Err(GameError::Config("no factories configured".into()));
        }

        let mut names = HashSet::new();
        for factory in &self.factories {
            if !names.insert(factory.name.as_str()) {
                return Err(GameError::Config(format!("duplicate factory '{}'", factory.name)));
            }
            if factory.shapes.is_empty() || factory.materials.is_empty() {
                return Err(GameError::Config(format!(
                    "factory '{}' needs at least one shape and one material",
                    factory.name
                )));
            }
            if factory.shapes.len() > usize::from(u16::MAX)
                || factory.materials.len() > usize::from(u16::MAX)
            {
                return Err(GameError::Config(format!("factory '{}' is too large", factory.name)));
            }
        }

        if self.levels.is_empty() {
            return Err(GameError::Config("no levels configured".into()));
        }
        for level in &self.levels {
            level.spawn_zone.validate()?;
            for spawn in level.spawn_zone.spawn_configurations() {
                if spawn.factories.is_empty() {
                    return Err(GameError::Config(format!(
                        "level '{}' has a spawn zone without factories",
                        level.name
                    )));
                }
                if let Some(unknown) = spawn.factories.iter().find(|f| !names.contains(f.as_str())) {
                    return Err(GameError::Config(format!(
                        "level '{}' references unknown factory '{unknown}'",
                        level.name
                    )));
                }
            }
        }
        Ok(())
    }
}

fn default_factories() -> Vec<FactoryConfig> {
    let prefab = |name: &str, color_slots| PrefabConfig { name: name.to_owned(), color_slots };
    vec![
        FactoryConfig {
            name: DEFAULT_FACTORY.to_owned(),
            recycle: true,
            shapes: vec![prefab("cube", 1), prefab("sphere", 1), prefab("capsule", 1), prefab("cluster", 3)],
            materials: vec!["standard".into(), "shiny".into(), "metallic".into()],
        },
        FactoryConfig {
            name: "moons".to_owned(),
            recycle: false,
            shapes: vec![prefab("moon", 1)],
            materials: vec!["standard".into()],
        },
    ]
}

fn default_levels() -> Vec<LevelConfig> {
    let lifecycle = LifecycleConfiguration {
        growing: FloatRange::new(0.3, 0.6),
        adult: FloatRange::new(5.0, 10.0),
        dying: FloatRange::new(0.5, 1.0),
    };
    let sphere = SpawnZoneConfig::Sphere {
        transform: ZoneTransform { scale: Vec3::splat(5.0), ..ZoneTransform::default() },
        surface_only: false,
        spawn_speed: 0.0,
        spawn: SpawnConfiguration {
            movement_direction: MovementDirection::Outward,
            speed: FloatRange::new(0.5, 1.5),
            angular_speed: FloatRange::new(0.0, 90.0),
            scale: FloatRange::new(0.25, 1.0),
            satellite: SatelliteConfiguration { amount: IntRange::new(0, 2), ..Default::default() },
            lifecycle,
            ..SpawnConfiguration::default()
        },
    };

    let cube = |x: f32, direction, spawn_speed| SpawnZoneConfig::Cube {
        transform: ZoneTransform {
            position: Vec3::new(x, 0.0, 0.0),
            scale: Vec3::splat(3.0),
            ..ZoneTransform::default()
        },
        surface_only: true,
        spawn_speed,
        spawn: SpawnConfiguration {
            factories: vec![DEFAULT_FACTORY.to_owned(), "moons".to_owned()],
            movement_direction: direction,
            speed: FloatRange::new(1.0, 2.0),
            uniform_color: true,
            oscillation_amplitude: FloatRange::new(0.2, 0.5),
            oscillation_frequency: FloatRange::new(0.5, 1.0),
            lifecycle,
            ..SpawnConfiguration::default()
        },
    };

    vec![
        LevelConfig {
            name: "Sphere".to_owned(),
            population_limit: 100,
            spawn_zone: sphere,
            kill_zones: Vec::new(),
            life_zones: Vec::new(),
        },
        LevelConfig {
            name: "Twin Cubes".to_owned(),
            population_limit: 60,
            spawn_zone: SpawnZoneConfig::Composite {
                transform: ZoneTransform::default(),
                zones: vec![
                    cube(-4.0, MovementDirection::Upward, 0.0),
                    cube(4.0, MovementDirection::Random, 1.0),
                ],
                sequential: true,
                override_config: false,
                spawn_speed: 0.0,
                spawn: SpawnConfiguration::default(),
            },
            kill_zones: vec![KillZoneConfig {
                volume: VolumeConfig::Box { center: Vec3::new(0.0, -10.0, 0.0), size: Vec3::new(40.0, 2.0, 40.0) },
                dying_duration: 0.0,
            }],
            life_zones: vec![LifeZoneConfig {
                volume: VolumeConfig::Sphere { center: Vec3::ZERO, radius: 15.0 },
                dying_duration: 1.0,
            }],
        },
    ]
}

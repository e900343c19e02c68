//! Save layout, version gates, and atomic restore.

use shapeshift_shared::{Color, Transform};

use super::io::{SaveReader, SaveWriter};
use crate::behavior::{BehaviorKind, MovementBehavior, RotationBehavior, ShapeBehavior};
use crate::error::{CoreError, CoreResult};
use crate::handle::ShapeKey;
use crate::ids::PoolId;
use crate::manager::{PopulationManager, ProgressCounters, SpawnSource};
use crate::pool::ShapeStore;
use crate::random::RandomState;
use crate::shape::Shape;

/// Newest format this build writes and reads.
pub const SAVE_VERSION: i32 = 8;

/// Smallest possible per-shape record (legacy: transform only).
const MIN_SHAPE_BYTES: usize = 40;

/// Colors as stored for one shape.
#[derive(Clone, Debug, PartialEq)]
pub enum SavedColors {
    /// One color for every part (formats before 5).
    Uniform(Color),
    /// One color per part, as many as were saved.
    PerSlot(Vec<Color>),
}

/// One shape as read from a save.
#[derive(Clone, Debug, PartialEq)]
pub struct SavedShape {
    /// Raw pool id.
    pub pool: i32,
    /// Raw shape type.
    pub shape_type: i32,
    /// Raw material.
    pub material: i32,
    /// Transform.
    pub transform: Transform,
    /// Colors.
    pub colors: SavedColors,
    /// Age in seconds.
    pub age: f32,
    /// Behavior stack, with satellite references still unresolved.
    pub behaviors: Vec<ShapeBehavior>,
}

/// Fully decoded save, not yet applied to anything.
#[derive(Clone, Debug, PartialEq)]
pub struct SaveGame {
    /// Format version of the data.
    pub version: i32,
    /// Session stream state (format 3+).
    pub random_state: Option<RandomState>,
    /// Rates and progress (format 3+).
    pub counters: Option<ProgressCounters>,
    /// Length of the dying partition at the front of `shapes` (format 8+).
    pub dying_count: Option<usize>,
    /// Level that was loaded when saving.
    pub level_index: i32,
    /// Opaque level state (format 3+, empty before).
    pub level_state: Vec<u8>,
    /// Shapes in population order.
    pub shapes: Vec<SavedShape>,
}

/// Binary save writer and loader.
#[derive(Clone, Copy, Debug, Default)]
pub struct SaveCodec;

impl SaveCodec {
    /// Serialises the whole simulation.
    #[must_use]
    pub fn save(manager: &PopulationManager, level_index: i32, source: &dyn SpawnSource) -> Vec<u8> {
        let population = manager.population();
        let store = population.store();
        let counters = manager.counters();
        let mut writer = SaveWriter::new();

        writer.write_i32(-SAVE_VERSION);
        writer.write_i32(population.len() as i32);
        writer.write_i32(population.dying_count() as i32);
        writer.write_random_state(&manager.random().session_state());
        writer.write_f32(counters.creation_speed);
        writer.write_f32(counters.creation_progress);
        writer.write_f32(counters.destruction_speed);
        writer.write_f32(counters.destruction_progress);
        writer.write_i32(level_index);

        let mut level = SaveWriter::new();
        source.save_state(&mut level);
        writer.write_block(&level.into_bytes());

        for shape in population.iter() {
            writer.write_i32(shape.origin_pool().map_or(0, |pool| i32::from(pool.0)));
            writer.write_i32(i32::from(shape.shape_type().0));
            writer.write_i32(i32::from(shape.material().0));
            writer.write_transform(&shape.transform);
            writer.write_i32(shape.color_count() as i32);
            for color in shape.colors() {
                writer.write_color(*color);
            }
            writer.write_f32(shape.age());
            writer.write_i32(shape.behaviors().len() as i32);
            for behavior in shape.behaviors() {
                writer.write_i32(behavior.kind().tag());
                behavior.save(&mut writer, store);
            }
        }

        tracing::debug!(bytes = writer.len(), shapes = population.len(), "game saved");
        writer.into_bytes()
    }

    /// Decodes a save without touching any live state.
    ///
    /// # Errors
    ///
    /// Fails on future versions, truncated data, negative counts and unknown
    /// behavior tags.
    pub fn decode(bytes: &[u8]) -> CoreResult<SaveGame> {
        let mut reader = SaveReader::new(bytes, 0);
        let raw = reader.read_i32()?;
        let version = raw
            .checked_neg()
            .ok_or_else(|| CoreError::InvalidSaveData(format!("bad version field {raw}")))?;
        if version > SAVE_VERSION {
            return Err(CoreError::UnsupportedVersion { found: version, supported: SAVE_VERSION });
        }
        reader.set_version(version);

        let count = if version <= 0 {
            usize::try_from(raw)
                .map_err(|_| CoreError::InvalidSaveData(format!("bad legacy count {raw}")))?
        } else {
            reader.read_count("shape")?
        };
        let dying_count = if version >= 8 {
            let dying = reader.read_count("dying shape")?;
            if dying > count {
                return Err(CoreError::InvalidSaveData(format!(
                    "{dying} dying shapes in a population of {count}"
                )));
            }
            Some(dying)
        } else {
            None
        };

        let mut random_state = None;
        let mut counters = None;
        if version >= 3 {
            random_state = Some(reader.read_random_state()?);
            counters = Some(ProgressCounters {
                creation_speed: reader.read_f32()?,
                creation_progress: reader.read_f32()?,
                destruction_speed: reader.read_f32()?,
                destruction_progress: reader.read_f32()?,
            });
        }
        let level_index = if version < 2 { 1 } else { reader.read_i32()? };
        let level_state = if version >= 3 { reader.read_block()?.to_vec() } else { Vec::new() };

        let mut shapes = Vec::with_capacity(count.min(reader.remaining() / MIN_SHAPE_BYTES));
        for _ in 0..count {
            shapes.push(Self::decode_shape(&mut reader)?);
        }
        if reader.remaining() > 0 {
            tracing::warn!(trailing = reader.remaining(), "ignoring trailing save data");
        }

        Ok(SaveGame { version, random_state, counters, dying_count, level_index, level_state, shapes })
    }

    fn decode_shape(reader: &mut SaveReader<'_>) -> CoreResult<SavedShape> {
        let version = reader.version();
        let pool = if version >= 5 { reader.read_i32()? } else { 0 };
        let (shape_type, material) = if version > 0 {
            (reader.read_i32()?, reader.read_i32()?)
        } else {
            (0, 0)
        };
        let transform = reader.read_transform()?;

        let colors = if version >= 5 {
            let count = reader.read_count("color")?;
            let mut colors = Vec::with_capacity(count.min(reader.remaining() / 16));
            for _ in 0..count {
                colors.push(reader.read_color()?);
            }
            SavedColors::PerSlot(colors)
        } else if version > 0 {
            SavedColors::Uniform(reader.read_color()?)
        } else {
            SavedColors::Uniform(Color::WHITE)
        };

        let mut age = 0.0;
        let mut behaviors = Vec::new();
        if version >= 6 {
            age = reader.read_f32()?;
            let count = reader.read_count("behavior")?;
            for _ in 0..count {
                let kind = BehaviorKind::from_tag(reader.read_i32()?)?;
                behaviors.push(ShapeBehavior::load(kind, reader)?);
            }
        } else if version >= 4 {
            let angular_velocity = reader.read_vec3()?;
            let velocity = reader.read_vec3()?;
            behaviors.push(RotationBehavior { angular_velocity }.into());
            behaviors.push(MovementBehavior { velocity }.into());
        }

        Ok(SavedShape { pool, shape_type, material, transform, colors, age, behaviors })
    }

    /// Checks every saved id against the registered pools.
    ///
    /// # Errors
    ///
    /// Returns `UnknownPool`, `UnknownShapeType` or `UnknownMaterial`.
    pub fn validate(save: &SaveGame, store: &ShapeStore) -> CoreResult<()> {
        for shape in &save.shapes {
            store.factory_by_raw(shape.pool)?.validate(shape.shape_type, shape.material)?;
        }
        Ok(())
    }

    /// Replaces the live simulation with a decoded save.
    ///
    /// Everything that can fail is checked before live state changes. With
    /// `reseed` the session stream is left as it is instead of restored.
    ///
    /// # Errors
    ///
    /// Fails on unknown ids or malformed level state; the manager is untouched.
    pub fn apply(
        save: SaveGame,
        manager: &mut PopulationManager,
        source: &mut dyn SpawnSource,
        reseed: bool,
    ) -> CoreResult<()> {
        Self::validate(&save, manager.population().store())?;
        if save.version >= 3 {
            source.load_state(&mut SaveReader::new(&save.level_state, save.version))?;
        }

        manager.population_mut().clear();
        if let Some(state) = save.random_state.filter(|_| !reseed) {
            manager.random_mut().restore_session(&state);
        }
        if let Some(counters) = save.counters {
            manager.set_counters(counters);
        }

        let shape_count = save.shapes.len();
        let dying_count = save.dying_count;
        let population = manager.population_mut();
        for saved in save.shapes {
            let (shape_type, material) = population
                .store()
                .factory_by_raw(saved.pool)?
                .validate(saved.shape_type, saved.material)?;
            let pool = PoolId(saved.pool as u16);
            let key = population.restore_shape(
                pool,
                shape_type,
                material,
                saved.transform,
                saved.age,
                saved.behaviors,
            )?;
            apply_colors(population.store_mut(), key, &saved.colors);
        }
        population.restore_dying_partition(dying_count);
        population.resolve_shape_instances();

        tracing::info!(version = save.version, shapes = shape_count, "game loaded");
        Ok(())
    }

    /// Decodes and applies in one step.
    ///
    /// # Errors
    ///
    /// See [`SaveCodec::decode`] and [`SaveCodec::apply`].
    pub fn load(
        bytes: &[u8],
        manager: &mut PopulationManager,
        source: &mut dyn SpawnSource,
        reseed: bool,
    ) -> CoreResult<i32> {
        let save = Self::decode(bytes)?;
        let level_index = save.level_index;
        Self::apply(save, manager, source, reseed)?;
        Ok(level_index)
    }
}

fn apply_colors(store: &mut ShapeStore, key: ShapeKey, colors: &SavedColors) {
    match colors {
        SavedColors::Uniform(color) => store.set_color(key, *color),
        SavedColors::PerSlot(saved) => {
            let count = store.shape(key).map_or(0, Shape::color_count);
            if saved.len() > count {
                tracing::debug!(saved = saved.len(), slots = count, "discarding extra saved colors");
            }
            for index in 0..count {
                store.set_color_at(key, index, saved.get(index).copied().unwrap_or(Color::WHITE));
            }
        }
    }
}

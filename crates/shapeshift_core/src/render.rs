//! Render binding hooks.
//!
//! The engine never inspects rendering state. It only reports material, color
//! and visibility changes through this trait.

use shapeshift_shared::Color;

use crate::handle::ShapeKey;
use crate::ids::MaterialType;

/// Receiver of visual state changes.
///
/// All methods default to no-ops so headless runs can use [`NullRenderBinding`].
pub trait RenderBinding {
    /// A shape was (re)assigned a material.
    fn set_material(&mut self, _shape: ShapeKey, _material: MaterialType) {}

    /// Part `index` of a shape changed color.
    fn set_color(&mut self, _shape: ShapeKey, _index: usize, _color: Color) {}

    /// A shape left (`false`) or re-entered (`true`) its pool.
    fn set_active(&mut self, _shape: ShapeKey, _active: bool) {}
}

/// Binding that ignores every hook.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRenderBinding;

impl RenderBinding for NullRenderBinding {}

//! # SHAPESHIFT Shared
//!
//! Plain value types used by the simulation core and the game crate.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on:
//! - the simulation core
//! - any rendering or windowing crate
//!
//! Everything in here is `Copy` and bitwise serialisable.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod color;
pub mod constants;
pub mod math;

pub use color::Color;
pub use constants::{FIXED_TICK_RATE, MAX_FRAME_DELTA};
pub use math::{Quaternion, Transform, Vec3};

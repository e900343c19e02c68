//! # Simulation Constants
//!
//! Values baked into the binary. Changing the tick rate changes replay output.

/// Fixed simulation rate (ticks per second).
pub const FIXED_TICK_RATE: u32 = 50;

/// Duration of one fixed tick in seconds.
pub const FIXED_DELTA: f32 = 1.0 / FIXED_TICK_RATE as f32;

/// Largest frame delta accepted by the loop before clamping (seconds).
///
/// Prevents a spiral of catch-up ticks after a stall.
pub const MAX_FRAME_DELTA: f32 = 0.25;

//! # Fixed-Step Game Loop
//!
//! ```text
//! Frame N:
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. CLAMP                                                            │
//! │    └─ Frame delta capped at max_frame_delta                         │
//! │                                                                     │
//! │ 2. ACCUMULATE                                                       │
//! │    └─ Leftover time from previous frames is kept                    │
//! │                                                                     │
//! │ 3. FIXED TICKS                                                      │
//! │    ├─ One Game::update per whole fixed delta                        │
//! │    └─ First failure is kept, remaining ticks still run              │
//! │                                                                     │
//! │ 4. STATS                                                            │
//! │    └─ Timing and tick totals recorded                               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The simulation only ever sees the fixed delta, so replays do not depend
//! on the frame rate.

use std::time::{Duration, Instant};

use shapeshift_shared::constants::FIXED_DELTA;
use shapeshift_shared::{FIXED_TICK_RATE, MAX_FRAME_DELTA};

use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::game::Game;

/// Wall-clock budget for one frame's simulation work.
pub const FRAME_BUDGET: Duration = Duration::from_millis(16);

/// Configuration for the game loop.
#[derive(Clone, Debug, PartialEq)]
pub struct GameLoopConfig {
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Largest frame delta accepted before clamping (seconds).
    pub max_frame_delta: f32,
    /// Log frames that exceed [`FRAME_BUDGET`].
    pub enable_timing_logs: bool,
}

impl Default for GameLoopConfig {
    fn default() -> Self {
        Self { tick_rate: FIXED_TICK_RATE, max_frame_delta: MAX_FRAME_DELTA, enable_timing_logs: false }
    }
}

impl GameLoopConfig {
    /// Loop settings for a game configuration.
    #[must_use]
    pub fn for_game(config: &GameConfig) -> Self {
        Self { tick_rate: config.tick_rate, ..Self::default() }
    }

    /// Length of one tick in seconds.
    #[must_use]
    pub fn fixed_delta(&self) -> f32 {
        if self.tick_rate == FIXED_TICK_RATE {
            FIXED_DELTA
        } else {
            1.0 / self.tick_rate.max(1) as f32
        }
    }
}

/// What one frame did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number.
    pub frame: u64,
    /// Wall-clock time spent in the frame, in microseconds.
    pub total_us: u64,
    /// Fixed ticks run.
    pub ticks: u32,
    /// Shapes spawned by the quota and by the level's zones.
    pub spawned: usize,
    /// Shapes killed or sent dying by the destroy quota.
    pub destroyed: usize,
    /// Shapes culled by the population limit.
    pub culled: usize,
    /// Population size after the frame.
    pub population: usize,
}

/// Drives a [`Game`] at a fixed tick rate from variable frame deltas.
#[derive(Debug)]
pub struct GameLoop {
    config: GameLoopConfig,
    /// Unsimulated time carried over from previous frames.
    accumulator: f32,
    frame_count: u64,
    stats: FrameStatsAccumulator,
}

impl GameLoop {
    /// Creates a loop.
    #[must_use]
    pub fn new(config: GameLoopConfig) -> Self {
        Self { config, accumulator: 0.0, frame_count: 0, stats: FrameStatsAccumulator::new() }
    }

    /// Runs as many fixed ticks as `frame_delta` (plus leftovers) covers.
    ///
    /// # Errors
    ///
    /// Returns the first tick failure of the frame. All due ticks still ran.
    pub fn advance(&mut self, frame_delta: f32, game: &mut Game) -> GameResult<FrameStats> {
        let start = Instant::now();
        let fixed_delta = self.config.fixed_delta();

        let clamped = frame_delta.clamp(0.0, self.config.max_frame_delta);
        if clamped < frame_delta && self.config.enable_timing_logs {
            tracing::warn!(frame_delta, clamped, "frame delta clamped");
        }
        self.accumulator += clamped;

        let mut stats = FrameStats { frame: self.frame_count, ..FrameStats::default() };
        let mut failure: Option<GameError> = None;
        while self.accumulator >= fixed_delta {
            self.accumulator -= fixed_delta;
            stats.ticks += 1;
            match game.update(fixed_delta) {
                Ok(report) => {
                    stats.spawned += report.spawned + report.source_spawned;
                    stats.destroyed += report.destroyed;
                    stats.culled += report.culled;
                }
                Err(err) => {
                    failure.get_or_insert(err);
                }
            }
        }

        stats.population = game.population().len();
        stats.total_us = start.elapsed().as_micros() as u64;
        self.end_frame(stats);

        match failure {
            Some(err) => Err(err),
            None => Ok(stats),
        }
    }

    fn end_frame(&mut self, stats: FrameStats) {
        self.frame_count += 1;
        self.stats.record(stats);

        if self.config.enable_timing_logs && stats.total_us > FRAME_BUDGET.as_micros() as u64 {
            tracing::warn!(
                frame = stats.frame,
                ms = stats.total_us as f64 / 1000.0,
                budget_ms = FRAME_BUDGET.as_micros() as f64 / 1000.0,
                "frame exceeded budget"
            );
        }
    }

    /// Frames advanced so far.
    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Time waiting for the next tick, as a fraction of the fixed delta.
    #[must_use]
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.config.fixed_delta()
    }

    /// Accumulated statistics.
    #[must_use]
    pub fn stats(&self) -> &FrameStatsAccumulator {
        &self.stats
    }
}

/// Accumulator for frame statistics.
#[derive(Clone, Debug)]
pub struct FrameStatsAccumulator {
    /// Total frames recorded.
    pub frames_recorded: u64,
    /// Total fixed ticks run.
    pub ticks: u64,
    /// Sum of frame times.
    pub total_us_sum: u64,
    /// Min frame time.
    pub min_frame_us: u64,
    /// Max frame time.
    pub max_frame_us: u64,
    /// Frames that exceeded [`FRAME_BUDGET`].
    pub frames_over_budget: u64,
    /// Total shapes spawned.
    pub spawned: u64,
    /// Total shapes destroyed by the quota.
    pub destroyed: u64,
    /// Total shapes culled by the population limit.
    pub culled: u64,
    /// Largest population seen after a frame.
    pub peak_population: usize,
}

impl FrameStatsAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames_recorded: 0,
            ticks: 0,
            total_us_sum: 0,
            min_frame_us: u64::MAX,
            max_frame_us: 0,
            frames_over_budget: 0,
            spawned: 0,
            destroyed: 0,
            culled: 0,
            peak_population: 0,
        }
    }

    /// Records a frame's statistics.
    pub fn record(&mut self, stats: FrameStats) {
        self.frames_recorded += 1;
        self.ticks += u64::from(stats.ticks);
        self.total_us_sum += stats.total_us;
        self.min_frame_us = self.min_frame_us.min(stats.total_us);
        self.max_frame_us = self.max_frame_us.max(stats.total_us);
        self.spawned += stats.spawned as u64;
        self.destroyed += stats.destroyed as u64;
        self.culled += stats.culled as u64;
        self.peak_population = self.peak_population.max(stats.population);

        if stats.total_us > FRAME_BUDGET.as_micros() as u64 {
            self.frames_over_budget += 1;
        }
    }

    /// Average frame time in milliseconds.
    #[must_use]
    pub fn avg_frame_ms(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        (self.total_us_sum as f64 / self.frames_recorded as f64) / 1000.0
    }

    /// Share of frames over budget.
    #[must_use]
    pub fn over_budget_ratio(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        self.frames_over_budget as f64 / self.frames_recorded as f64
    }

    /// Logs a summary at `info`.
    pub fn log_summary(&self) {
        let min_ms = if self.frames_recorded == 0 { 0.0 } else { self.min_frame_us as f64 / 1000.0 };
        tracing::info!(
            frames = self.frames_recorded,
            ticks = self.ticks,
            avg_ms = self.avg_frame_ms(),
            min_ms,
            max_ms = self.max_frame_us as f64 / 1000.0,
            over_budget_pct = self.over_budget_ratio() * 100.0,
            "frame timing"
        );
        tracing::info!(
            spawned = self.spawned,
            destroyed = self.destroyed,
            culled = self.culled,
            peak_population = self.peak_population,
            "population totals"
        );
    }
}

impl Default for FrameStatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

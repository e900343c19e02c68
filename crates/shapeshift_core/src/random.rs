//! # Random Streams
//!
//! Two ChaCha8 streams drive the simulation:
//! - the **main** stream, seeded once per process, only ever produces session seeds
//! - the **session** stream, reseeded on every new game, feeds every random
//!   decision the simulation makes
//!
//! The session stream's full state is captured in saves, so a loaded game replays
//! the exact same decisions as the run that saved it.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use shapeshift_shared::{Color, Quaternion, Vec3};

/// Complete, serialisable state of a ChaCha8 stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RandomState {
    /// Key.
    pub seed: [u8; 32],
    /// Stream (nonce).
    pub stream: u64,
    /// Position in the keystream, in 32-bit words.
    pub word_pos: u128,
}

impl RandomState {
    /// Captures the state of `rng`.
    #[must_use]
    pub fn capture(rng: &ChaCha8Rng) -> Self {
        Self { seed: rng.get_seed(), stream: rng.get_stream(), word_pos: rng.get_word_pos() }
    }

    /// Rebuilds a generator positioned exactly where the captured one was.
    #[must_use]
    pub fn restore(&self) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::from_seed(self.seed);
        rng.set_stream(self.stream);
        rng.set_word_pos(self.word_pos);
        rng
    }
}

/// Main and session streams.
#[derive(Clone, Debug)]
pub struct RandomStreams {
    main: ChaCha8Rng,
    session: ChaCha8Rng,
}

impl RandomStreams {
    /// Deterministic streams from a fixed seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        let mut main = ChaCha8Rng::seed_from_u64(seed);
        let session = ChaCha8Rng::seed_from_u64(main.next_u64());
        Self { main, session }
    }

    /// Streams seeded from OS entropy.
    ///
    /// Falls back to a fixed seed (with a warning) if the OS refuses.
    #[must_use]
    pub fn from_entropy() -> Self {
        let mut bytes = [0_u8; 8];
        let seed = match getrandom::fill(&mut bytes) {
            Ok(()) => u64::from_le_bytes(bytes),
            Err(err) => {
                tracing::warn!(%err, "OS entropy unavailable, using fixed seed");
                0x5EED
            }
        };
        Self::from_seed(seed)
    }

    /// Reseeds the session stream from the main stream.
    pub fn begin_session(&mut self) {
        self.session = ChaCha8Rng::seed_from_u64(self.main.next_u64());
    }

    /// The session stream.
    #[inline]
    pub fn session(&mut self) -> &mut ChaCha8Rng {
        &mut self.session
    }

    /// Snapshot of the session stream.
    #[must_use]
    pub fn session_state(&self) -> RandomState {
        RandomState::capture(&self.session)
    }

    /// Replaces the session stream with a captured one.
    pub fn restore_session(&mut self, state: &RandomState) {
        self.session = state.restore();
    }
}

/// Sampling helpers on top of any [`Rng`].
pub trait RandomExt: Rng {
    /// Uniform value in `[min, max]`. Degenerate ranges return `min`.
    fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.gen::<f32>()
    }

    /// Uniform integer in `[min, max]` (inclusive). Returns `min` if `max < min`.
    fn range_inclusive(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            min
        } else {
            self.gen_range(min..=max)
        }
    }

    /// Uniform index in `[start, end)`. Returns `start` for empty ranges.
    fn index_in(&mut self, start: usize, end: usize) -> usize {
        if end <= start {
            start
        } else {
            self.gen_range(start..end)
        }
    }

    /// Uniform point on the unit sphere.
    fn on_unit_sphere(&mut self) -> Vec3 {
        loop {
            let v = Vec3::new(
                self.range_f32(-1.0, 1.0),
                self.range_f32(-1.0, 1.0),
                self.range_f32(-1.0, 1.0),
            );
            let len_sq = v.length_squared();
            if len_sq > 1e-4 && len_sq <= 1.0 {
                return v / len_sq.sqrt();
            }
        }
    }

    /// Uniform point inside the unit ball.
    fn inside_unit_sphere(&mut self) -> Vec3 {
        let direction = self.on_unit_sphere();
        direction * self.gen::<f32>().cbrt()
    }

    /// Uniform random rotation.
    fn rotation(&mut self) -> Quaternion {
        let u1 = self.gen::<f32>();
        let u2 = self.gen::<f32>() * std::f32::consts::TAU;
        let u3 = self.gen::<f32>() * std::f32::consts::TAU;
        let a = (1.0 - u1).sqrt();
        let b = u1.sqrt();
        Quaternion::new(a * u2.sin(), a * u2.cos(), b * u3.sin(), b * u3.cos())
    }

    /// Opaque color with hue, saturation and value drawn from the given ranges.
    fn color_hsv(&mut self, hue: (f32, f32), saturation: (f32, f32), value: (f32, f32)) -> Color {
        let h = self.range_f32(hue.0, hue.1);
        let s = self.range_f32(saturation.0, saturation.1);
        let v = self.range_f32(value.0, value.1);
        Color::from_hsv(h, s, v)
    }
}

impl<R: Rng + ?Sized> RandomExt for R {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_capture_resumes_stream() {
        let mut streams = RandomStreams::from_seed(42);
        for _ in 0..17 {
            streams.session().next_u32();
        }
        let state = streams.session_state();
        let expected: Vec<u64> = (0..8).map(|_| streams.session().next_u64()).collect();

        let mut restored = state.restore();
        let actual: Vec<u64> = (0..8).map(|_| restored.next_u64()).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_sessions_differ() {
        let mut streams = RandomStreams::from_seed(7);
        let first = streams.session_state();
        streams.begin_session();
        assert_ne!(first, streams.session_state());
    }

    #[test]
    fn test_helpers_stay_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..200 {
            let v = rng.range_f32(2.0, 3.0);
            assert!((2.0..=3.0).contains(&v));
            assert!((rng.on_unit_sphere().length() - 1.0).abs() < 1e-4);
            assert!(rng.inside_unit_sphere().length() <= 1.0 + 1e-4);
            assert_eq!(rng.index_in(4, 4), 4);
            assert_eq!(rng.range_inclusive(5, 5), 5);
        }
        assert_eq!(rng.range_f32(1.5, 1.5), 1.5);
    }
}

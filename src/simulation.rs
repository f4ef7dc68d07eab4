//! Synthetic gait sensor stream for simulated sessions
//!
//! Produces one frame per tick shaped like a pair of shank gyroscopes:
//! a sinusoid at the stride frequency per side plus Gaussian-ish noise.

use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::GaitSettings;
use crate::data::{DataSnapshot, SensorFrame};
use crate::session::SnapshotSource;

/// Frames kept in the rolling snapshot
pub const DEFAULT_WINDOW_FRAMES: usize = 2_000;

pub struct SyntheticGaitSource {
    gait: GaitSettings,
    noise_level: f64,
    window_frames: usize,
    rng: StdRng,
    snapshot: DataSnapshot,
}

impl SyntheticGaitSource {
    pub fn new(gait: GaitSettings, noise_level: f64) -> Self {
        Self::with_rng(gait, noise_level, StdRng::from_entropy())
    }

    /// Reproducible stream
    pub fn seeded(gait: GaitSettings, noise_level: f64, seed: u64) -> Self {
        Self::with_rng(gait, noise_level, StdRng::seed_from_u64(seed))
    }

    fn with_rng(gait: GaitSettings, noise_level: f64, rng: StdRng) -> Self {
        Self {
            gait,
            noise_level,
            window_frames: DEFAULT_WINDOW_FRAMES,
            rng,
            snapshot: DataSnapshot::new(),
        }
    }

    pub fn with_window(mut self, window_frames: usize) -> Self {
        self.window_frames = window_frames.max(1);
        self
    }

    fn noise(&mut self) -> f64 {
        // Sum of uniforms: cheap bell-shaped noise
        let sum: f64 = (0..4).map(|_| self.rng.gen_range(-1.0f64..1.0)).sum();
        sum * 0.5 * self.noise_level
    }

    fn frame(&mut self, time: f64) -> SensorFrame {
        let left_phase = time / self.gait.stride_period_s;
        let right_phase = left_phase + self.gait.right_offset;
        let left = (TAU * left_phase).sin() + self.noise();
        let right = (TAU * right_phase).sin() + self.noise();
        SensorFrame {
            time,
            left: vec![left],
            right: vec![right],
        }
    }
}

impl SnapshotSource for SyntheticGaitSource {
    fn snapshot(&mut self, current_time: f64) -> &DataSnapshot {
        let frame = self.frame(current_time);
        self.snapshot.append(frame);
        self.snapshot.retain_last(self.window_frames);
        &self.snapshot
    }
}

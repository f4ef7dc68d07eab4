//! Gait analyser seam
//!
//! Estimating gait phase from raw sensors is someone else's job; the planner
//! only needs a total function from (side, time, snapshot) to a stride
//! completion in [0, 1].

use tracing::warn;

use crate::config::constants::gait::{MAX_PHASE, MIN_PHASE};
use crate::data::{DataSnapshot, Side};

/// Maps a side, the current time and a data snapshot to a stride completion percentage
pub trait GaitAnalyser: Send + Sync {
    /// Stride completion in [0, 1] for `side` at `current_time` (seconds since t0)
    fn phase(&self, side: Side, current_time: f64, data: &DataSnapshot) -> f64;
}

impl<F> GaitAnalyser for F
where
    F: Fn(Side, f64, &DataSnapshot) -> f64 + Send + Sync,
{
    fn phase(&self, side: Side, current_time: f64, data: &DataSnapshot) -> f64 {
        self(side, current_time, data)
    }
}

/// Query `analyser` and force the answer into [0, 1]
pub(crate) fn bounded_phase(analyser: &dyn GaitAnalyser, side: Side, current_time: f64, data: &DataSnapshot) -> f64 {
    let phase = analyser.phase(side, current_time, data);
    if phase.is_nan() {
        warn!(?side, current_time, "gait analyser returned NaN, using phase 0");
        return MIN_PHASE;
    }
    if !(MIN_PHASE..=MAX_PHASE).contains(&phase) {
        warn!(?side, current_time, phase, "gait analyser phase out of range, clamping");
    }
    phase.clamp(MIN_PHASE, MAX_PHASE)
}

/// Phase from elapsed time at a fixed cadence.
///
/// A stand-in for a sensor-driven analyser in simulated sessions: the left
/// side completes one stride every `stride_period_s`, the right side is
/// shifted by `right_offset` of a stride.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CadenceAnalyser {
    pub stride_period_s: f64,
    pub right_offset: f64,
}

impl CadenceAnalyser {
    pub fn new(stride_period_s: f64, right_offset: f64) -> Self {
        Self {
            stride_period_s,
            right_offset,
        }
    }
}

impl GaitAnalyser for CadenceAnalyser {
    fn phase(&self, side: Side, current_time: f64, _data: &DataSnapshot) -> f64 {
        let offset = match side {
            Side::Left => 0.0,
            Side::Right => self.right_offset,
        };
        (current_time / self.stride_period_s + offset).rem_euclid(1.0)
    }
}

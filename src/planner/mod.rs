//! Stimulation decision engine
//!
//! A [`DecisionStrategy`] is asked once per tick what every channel should
//! do. Strategies own their per-channel state; nothing here reads the event
//! log or talks to the device.

pub mod analyser;
pub mod command;
pub mod stride;
pub mod time_based;

pub use analyser::{CadenceAnalyser, GaitAnalyser};
pub use command::Command;
pub use stride::{transition, ChannelCondition, StrideBasedStimulation};
pub use time_based::{TimeBasedStimulation, TimeWindow, TimeWindowRule};

use tracing::error;

use crate::data::DataSnapshot;
use crate::error::{FesError, FesResult};

/// Decision rule selected when a session is built
pub trait DecisionStrategy: Send {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// One slot per channel; `None` leaves the channel as it is.
    ///
    /// `current_time` is in seconds since the session origin.
    fn decide(&mut self, current_time: f64, data: &DataSnapshot) -> FesResult<Vec<Option<Command>>>;

    /// Channel count fixed by the first decision, if any
    fn channel_count(&self) -> Option<usize>;

    /// Forget per-channel state before a new session
    fn reset(&mut self);
}

/// Pins the channel count on first use and latches the first violation.
///
/// Once violated, every later check fails with the same error: the stored
/// per-channel state can no longer be trusted to line up with the channels.
#[derive(Debug, Default, Clone)]
pub(crate) struct ChannelCountGuard {
    established: Option<usize>,
    violation: Option<(usize, usize)>,
}

impl ChannelCountGuard {
    pub(crate) fn check(&mut self, strategy: &'static str, actual: usize) -> FesResult<usize> {
        if let Some((expected, actual)) = self.violation {
            return Err(FesError::ConfigurationMismatch { expected, actual });
        }
        match self.established {
            None => {
                self.established = Some(actual);
                Ok(actual)
            }
            Some(expected) if expected == actual => Ok(actual),
            Some(expected) => {
                error!(strategy, expected, actual, "channel count changed mid-session, halting decisions");
                self.violation = Some((expected, actual));
                Err(FesError::ConfigurationMismatch { expected, actual })
            }
        }
    }

    pub(crate) fn established(&self) -> Option<usize> {
        self.established
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

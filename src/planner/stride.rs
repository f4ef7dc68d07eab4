//! Stride-based stimulation
//!
//! A condition maps the left and right stride completion to one "should
//! stimulate" flag per channel. The engine turns changes of those flags
//! into start and stop commands.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::data::{DataSnapshot, Side};
use crate::error::FesResult;
use crate::planner::analyser::{bounded_phase, GaitAnalyser};
use crate::planner::{ChannelCountGuard, Command, DecisionStrategy};

/// `(left_phase, right_phase) -> one flag per channel`
pub type ChannelCondition = Box<dyn FnMut(f64, f64) -> Vec<bool> + Send>;

/// Command and next state for one channel.
///
/// | want | was   | command               | next  |
/// |------|-------|-----------------------|-------|
/// | true | false | `StartIndefinite`     | true  |
/// | true | true  | none                  | true  |
/// | false| true  | `Stop`                | false |
/// | false| false | none                  | false |
pub fn transition(want: bool, was: bool) -> (Option<Command>, bool) {
    match (want, was) {
        (true, false) => (Some(Command::StartIndefinite), true),
        (true, true) => (None, true),
        (false, true) => (Some(Command::Stop), false),
        (false, false) => (None, false),
    }
}

pub struct StrideBasedStimulation {
    analyser: Arc<dyn GaitAnalyser>,
    condition: ChannelCondition,
    are_stimulating: Vec<bool>,
    guard: ChannelCountGuard,
}

impl StrideBasedStimulation {
    pub fn new<F>(analyser: Arc<dyn GaitAnalyser>, condition: F) -> Self
    where
        F: FnMut(f64, f64) -> Vec<bool> + Send + 'static,
    {
        Self {
            analyser,
            condition: Box::new(condition),
            are_stimulating: Vec::new(),
            guard: ChannelCountGuard::default(),
        }
    }

    /// Stored per-channel state; empty until the first decision
    pub fn is_stimulating(&self) -> &[bool] {
        &self.are_stimulating
    }
}

impl fmt::Debug for StrideBasedStimulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrideBasedStimulation")
            .field("are_stimulating", &self.are_stimulating)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

impl DecisionStrategy for StrideBasedStimulation {
    fn name(&self) -> &'static str {
        "stride-based"
    }

    fn decide(&mut self, current_time: f64, data: &DataSnapshot) -> FesResult<Vec<Option<Command>>> {
        let stride_left = bounded_phase(self.analyser.as_ref(), Side::Left, current_time, data);
        let stride_right = bounded_phase(self.analyser.as_ref(), Side::Right, current_time, data);
        let should_stimulate = (self.condition)(stride_left, stride_right);

        let name = self.name();
        let channel_count = self.guard.check(name, should_stimulate.len())?;
        if self.are_stimulating.len() != channel_count {
            // First decision of the session
            self.are_stimulating = vec![false; channel_count];
        }

        let commands = should_stimulate
            .iter()
            .zip(self.are_stimulating.iter_mut())
            .enumerate()
            .map(|(channel, (&want, was))| {
                let (command, next) = transition(want, *was);
                if let Some(command) = command {
                    debug!(channel, ?command, current_time, stride_left, stride_right, "channel transition");
                }
                *was = next;
                command
            })
            .collect();

        Ok(commands)
    }

    fn channel_count(&self) -> Option<usize> {
        self.guard.established()
    }

    fn reset(&mut self) {
        self.are_stimulating.clear();
        self.guard.reset();
    }
}

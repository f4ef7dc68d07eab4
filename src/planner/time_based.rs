//! Time-based stimulation extension point
//!
//! Stimulation that starts at a stride phase and lasts a fixed time. The
//! decision rule itself is supplied by the caller through [`TimeWindowRule`];
//! this type only enforces the command contract around it.

use std::fmt;

use crate::data::DataSnapshot;
use crate::error::{FesError, FesResult};
use crate::planner::{ChannelCountGuard, Command, DecisionStrategy};

/// Window parameters handed to the rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    /// Stride completion in [0, 1] at which stimulation starts
    pub start_point: f64,
    /// Stimulation length in seconds
    pub end_time: f64,
}

/// Caller-supplied decision rule for [`TimeBasedStimulation`]
pub trait TimeWindowRule: Send {
    fn decide(&mut self, window: &TimeWindow, current_time: f64, data: &DataSnapshot) -> Vec<Option<Command>>;
}

impl<F> TimeWindowRule for F
where
    F: FnMut(&TimeWindow, f64, &DataSnapshot) -> Vec<Option<Command>> + Send,
{
    fn decide(&mut self, window: &TimeWindow, current_time: f64, data: &DataSnapshot) -> Vec<Option<Command>> {
        self(window, current_time, data)
    }
}

pub struct TimeBasedStimulation {
    window: TimeWindow,
    rule: Option<Box<dyn TimeWindowRule>>,
    guard: ChannelCountGuard,
}

impl TimeBasedStimulation {
    /// Without a rule every decision fails with [`FesError::NotImplemented`]
    pub fn new(start_point: f64, end_time: f64) -> Self {
        Self {
            window: TimeWindow { start_point, end_time },
            rule: None,
            guard: ChannelCountGuard::default(),
        }
    }

    pub fn with_rule<R>(mut self, rule: R) -> Self
    where
        R: TimeWindowRule + 'static,
    {
        self.rule = Some(Box::new(rule));
        self
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }
}

impl fmt::Debug for TimeBasedStimulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeBasedStimulation")
            .field("window", &self.window)
            .field("has_rule", &self.rule.is_some())
            .finish()
    }
}

fn validate_commands(commands: &[Option<Command>]) -> FesResult<()> {
    for (slot, command) in commands.iter().enumerate() {
        if let Some(Command::Start(duration)) = command {
            if !duration.is_finite() || *duration <= 0.0 {
                return Err(FesError::InvalidCommand {
                    slot,
                    reason: format!("timed start needs a positive duration, got {}", duration),
                });
            }
        }
    }
    Ok(())
}

impl DecisionStrategy for TimeBasedStimulation {
    fn name(&self) -> &'static str {
        "time-based"
    }

    fn decide(&mut self, current_time: f64, data: &DataSnapshot) -> FesResult<Vec<Option<Command>>> {
        let name = self.name();
        let rule = self.rule.as_mut().ok_or(FesError::NotImplemented("time-based stimulation"))?;
        let commands = rule.decide(&self.window, current_time, data);

        self.guard.check(name, commands.len())?;
        validate_commands(&commands)?;
        Ok(commands)
    }

    fn channel_count(&self) -> Option<usize> {
        self.guard.established()
    }

    fn reset(&mut self) {
        self.guard.reset();
    }
}

//! Stimulation session: one control-loop tick at a time
//!
//! Per tick the session asks the strategy for commands, applies them to the
//! device and records what the device was told to do. The strategy and the
//! log never see each other.

pub mod runner;

pub use runner::{run_session, RunSummary, SnapshotSource};

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::constants::stimulation::IDLE_AMPLITUDE;
use crate::config::FesConfig;
use crate::data::DataSnapshot;
use crate::error::{FesError, FesResult};
use crate::hal::{Channel, DeviceFactory, StimulationDevice};
use crate::planner::{CadenceAnalyser, Command, DecisionStrategy, StrideBasedStimulation};
use crate::stimlog::{EventLog, SharedEventLog};
use crate::utils::time::TimeProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    /// A fatal error stopped stimulation; no further decisions are taken
    Halted,
    Finished,
}

/// Result of one tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    /// Strategy output, one slot per channel
    pub commands: Vec<Option<Command>>,
    /// Channel list sent to the device when the active set changed
    pub delivered: Option<Vec<Channel>>,
}

pub struct StimulationSession {
    strategy: Box<dyn DecisionStrategy>,
    device: Box<dyn StimulationDevice>,
    log: SharedEventLog,
    channels: Vec<Channel>,
    active: Vec<bool>,
    /// Session time at which a timed start ends, per channel
    deadlines: Vec<Option<f64>>,
    state: SessionState,
    ticks: u64,
}

impl StimulationSession {
    /// Drive the channels currently configured on `device`
    pub fn new(
        strategy: Box<dyn DecisionStrategy>,
        device: Box<dyn StimulationDevice>,
        log: SharedEventLog,
    ) -> Self {
        let channels = device.channels().to_vec();
        let count = channels.len();
        info!(
            strategy = strategy.name(),
            device = %device.info().name,
            channels = count,
            "stimulation session created"
        );
        Self {
            strategy,
            device,
            log,
            channels,
            active: vec![false; count],
            deadlines: vec![None; count],
            state: SessionState::Running,
            ticks: 0,
        }
    }

    /// Stride-based session on a cadence analyser, as described by `config`
    pub fn from_config(config: &FesConfig, clock: Arc<dyn TimeProvider>) -> FesResult<Self> {
        config.validate().map_err(crate::config::ConfigError::ValidationError)?;

        let analyser = Arc::new(CadenceAnalyser::new(config.gait.stride_period_s, config.gait.right_offset));
        let strategy = StrideBasedStimulation::new(analyser, config.stride_condition());
        let device = DeviceFactory::create(&config.device, config.device_channels(), clock.clone())?;
        let log = SharedEventLog::new(EventLog::with_time_provider(clock));

        Ok(Self::new(Box::new(strategy), device, log))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Which configured channels are currently stimulating
    pub fn active_channels(&self) -> &[bool] {
        &self.active
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn log(&self) -> &SharedEventLog {
        &self.log
    }

    pub fn device(&self) -> &dyn StimulationDevice {
        self.device.as_ref()
    }

    /// Seconds since the log origin
    pub fn elapsed(&self) -> f64 {
        self.log.with_log(EventLog::elapsed)
    }

    pub fn tick(&mut self, current_time: f64, data: &DataSnapshot) -> FesResult<TickOutcome> {
        if self.state != SessionState::Running {
            return Err(FesError::SessionHalted);
        }
        self.ticks += 1;
        self.device.poll()?;

        let mut changed = self.expire_timed(current_time);

        let commands = match self.decide(current_time, data) {
            Ok(commands) => commands,
            Err(e) => {
                if e.is_fatal() {
                    self.halt(&e);
                }
                return Err(e);
            }
        };

        for (channel, command) in commands.iter().enumerate() {
            changed |= self.apply(channel, *command, current_time);
        }

        // The strategy has already moved on, so a device that missed the
        // change cannot be brought back in step: stop instead.
        let delivered = if changed {
            match self.deliver() {
                Ok(delivered) => Some(delivered),
                Err(e) => {
                    self.halt(&e);
                    return Err(e);
                }
            }
        } else {
            None
        };
        Ok(TickOutcome { commands, delivered })
    }

    /// Close the record, stop and release the device
    pub fn finish(&mut self) -> FesResult<()> {
        if self.state == SessionState::Finished {
            return Ok(());
        }
        self.log.close_pending();
        if self.device.is_stimulating() {
            self.device.stop_stimulation()?;
        }
        self.device.dispose()?;
        self.active.iter_mut().for_each(|a| *a = false);
        self.state = SessionState::Finished;
        info!(ticks = self.ticks, events = self.log.with_log(EventLog::len), "stimulation session finished");
        Ok(())
    }

    fn decide(&mut self, current_time: f64, data: &DataSnapshot) -> FesResult<Vec<Option<Command>>> {
        let commands = self.strategy.decide(current_time, data)?;
        if commands.len() != self.channels.len() {
            error!(
                strategy = self.strategy.name(),
                expected = self.channels.len(),
                actual = commands.len(),
                "strategy does not match the configured channels"
            );
            return Err(FesError::ConfigurationMismatch {
                expected: self.channels.len(),
                actual: commands.len(),
            });
        }
        Ok(commands)
    }

    fn expire_timed(&mut self, current_time: f64) -> bool {
        let mut changed = false;
        for (active, deadline) in self.active.iter_mut().zip(self.deadlines.iter_mut()) {
            if deadline.is_some_and(|end| current_time >= end) {
                *active = false;
                *deadline = None;
                changed = true;
            }
        }
        changed
    }

    /// Update one channel's target state; true when it changed
    fn apply(&mut self, channel: usize, command: Option<Command>, current_time: f64) -> bool {
        let was_active = self.active[channel];
        match command {
            None => false,
            Some(Command::StartIndefinite) => {
                let was_timed = self.deadlines[channel].take().is_some();
                self.active[channel] = true;
                !was_active || was_timed
            }
            Some(Command::Start(duration)) => {
                self.deadlines[channel] = Some(current_time + duration);
                self.active[channel] = true;
                !was_active
            }
            Some(Command::Stop) => {
                self.deadlines[channel] = None;
                self.active[channel] = false;
                was_active
            }
        }
    }

    /// Push the active set to the device, then record it
    fn deliver(&mut self) -> FesResult<Vec<Channel>> {
        let delivered: Vec<Channel> = self
            .channels
            .iter()
            .zip(&self.active)
            .map(|(channel, &active)| {
                if active {
                    channel.clone()
                } else {
                    channel.with_amplitude(IDLE_AMPLITUDE)
                }
            })
            .collect();
        let any_active = self.active.iter().any(|&a| a);

        if any_active {
            self.device.set_channels(delivered.clone())?;
            self.device.start_stimulation(None)?;
        } else if self.device.is_stimulating() {
            self.device.stop_stimulation()?;
        }
        debug!(active = ?self.active, "active channel set changed");

        // The record is observational: a logging failure must not stop control
        let recorded = self.log.update(|log| {
            log.close_pending();
            if any_active {
                log.record(None, Some(&delivered))
            } else {
                Ok(())
            }
        });
        if let Err(e) = recorded {
            warn!(error = %e, "failed to record stimulation event");
        }

        Ok(delivered)
    }

    fn halt(&mut self, cause: &FesError) {
        error!(error = %cause, "halting stimulation session");
        self.state = SessionState::Halted;
        self.active.iter_mut().for_each(|a| *a = false);
        self.deadlines.iter_mut().for_each(|d| *d = None);
        if let Err(e) = self.device.stop_stimulation() {
            error!(error = %e, "device did not acknowledge stop");
        }
        self.log.close_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Side;
    use crate::hal::{HalError, SimulatedStimulator};
    use crate::planner::{GaitAnalyser, TimeBasedStimulation, TimeWindow};
    use crate::utils::time::MockTimeProvider;

    fn session_with<S: DecisionStrategy + 'static>(strategy: S) -> (StimulationSession, Arc<MockTimeProvider>) {
        let clock = Arc::new(MockTimeProvider::new(0));
        let channels = vec![Channel::new(1, 20.0), Channel::new(2, 30.0)];
        let device = SimulatedStimulator::with_time_provider("sim0", channels, clock.clone()).unwrap();
        let log = SharedEventLog::new(EventLog::with_time_provider(clock.clone()));
        (StimulationSession::new(Box::new(strategy), Box::new(device), log), clock)
    }

    fn scripted(script: Vec<Vec<bool>>) -> StrideBasedStimulation {
        let analyser: Arc<dyn GaitAnalyser> = Arc::new(|_s: Side, _t: f64, _d: &DataSnapshot| 0.0);
        let mut ticks = script.into_iter();
        StrideBasedStimulation::new(analyser, move |_, _| ticks.next().expect("script exhausted"))
    }

    #[test]
    fn test_session_records_open_then_closed_events() {
        let (mut session, clock) = session_with(scripted(vec![
            vec![true, false],
            vec![true, false],
            vec![true, true],
            vec![false, false],
        ]));
        let data = DataSnapshot::new();

        let first = session.tick(0.0, &data).unwrap();
        assert_eq!(
            first.delivered,
            Some(vec![Channel::new(1, 20.0), Channel::new(2, 0.0)])
        );
        assert!(session.log().with_log(EventLog::has_pending));

        clock.advance_secs(0.1);
        assert_eq!(session.tick(0.1, &data).unwrap().delivered, None);

        clock.advance_secs(0.1);
        session.tick(0.2, &data).unwrap();

        clock.advance_secs(0.3);
        session.tick(0.5, &data).unwrap();

        let log = session.log().snapshot();
        assert_eq!(log.len(), 2);
        assert!(!log.has_pending());
        let durations = log.duration_series().to_vec();
        assert!((durations[0] - 0.2).abs() < 1e-9);
        assert!((durations[1] - 0.3).abs() < 1e-9);
        assert_eq!(log.amplitude_matrix().shape(), &[2, 2]);
        assert!(!session.device().is_stimulating());
    }

    #[test]
    fn test_mismatch_halts_session() {
        let (mut session, _) = session_with(scripted(vec![vec![true, true], vec![true]]));
        let data = DataSnapshot::new();

        session.tick(0.0, &data).unwrap();
        assert!(session.device().is_stimulating());

        assert!(matches!(
            session.tick(0.001, &data),
            Err(FesError::ConfigurationMismatch { expected: 2, actual: 1 })
        ));
        assert_eq!(session.state(), SessionState::Halted);
        assert!(!session.device().is_stimulating());
        assert!(!session.log().with_log(EventLog::has_pending));
        assert!(matches!(session.tick(0.002, &data), Err(FesError::SessionHalted)));
    }

    #[test]
    fn test_strategy_wider_than_device_is_rejected() {
        let (mut session, _) = session_with(scripted(vec![vec![true, true, true]]));
        assert!(matches!(
            session.tick(0.0, &DataSnapshot::new()),
            Err(FesError::ConfigurationMismatch { expected: 2, actual: 3 })
        ));
        assert_eq!(session.state(), SessionState::Halted);
    }

    #[test]
    fn test_timed_start_expires() {
        let strategy = TimeBasedStimulation::new(0.0, 0.25).with_rule(
            |w: &TimeWindow, t: f64, _d: &DataSnapshot| {
                if t == 0.0 {
                    vec![Some(Command::Start(w.end_time)), None]
                } else {
                    vec![None, None]
                }
            },
        );
        let (mut session, clock) = session_with(strategy);
        let data = DataSnapshot::new();

        session.tick(0.0, &data).unwrap();
        assert_eq!(session.active_channels(), &[true, false]);

        clock.advance_secs(0.1);
        assert_eq!(session.tick(0.1, &data).unwrap().delivered, None);

        clock.advance_secs(0.15);
        let outcome = session.tick(0.25, &data).unwrap();
        assert_eq!(outcome.delivered, Some(vec![Channel::new(1, 0.0), Channel::new(2, 0.0)]));
        assert_eq!(session.active_channels(), &[false, false]);

        let log = session.log().snapshot();
        assert_eq!(log.len(), 1);
        assert!((log.duration_series()[0] - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_unimplemented_strategy_halts() {
        let (mut session, _) = session_with(TimeBasedStimulation::new(0.5, 0.2));
        assert!(matches!(
            session.tick(0.0, &DataSnapshot::new()),
            Err(FesError::NotImplemented(_))
        ));
        assert_eq!(session.state(), SessionState::Halted);
    }

    #[test]
    fn test_finish_closes_and_disposes() {
        let (mut session, clock) = session_with(scripted(vec![vec![true, false]]));
        session.tick(0.0, &DataSnapshot::new()).unwrap();

        clock.advance_secs(0.4);
        session.finish().unwrap();

        assert_eq!(session.state(), SessionState::Finished);
        let log = session.log().snapshot();
        assert!((log.last().unwrap().duration.unwrap() - 0.4).abs() < 1e-9);
        assert!(!session.device().is_stimulating());
        assert!(session.finish().is_ok());
        assert!(matches!(session.tick(0.5, &DataSnapshot::new()), Err(FesError::SessionHalted)));
    }

    /// Simulator whose starts fail once `healthy_starts` have gone through
    struct FlakyDevice {
        inner: SimulatedStimulator,
        healthy_starts: usize,
    }

    impl StimulationDevice for FlakyDevice {
        fn info(&self) -> crate::hal::DeviceInfo {
            self.inner.info()
        }
        fn initialize_stimulation(&mut self) -> Result<(), HalError> {
            self.inner.initialize_stimulation()
        }
        fn set_channels(&mut self, channels: Vec<Channel>) -> Result<(), HalError> {
            self.inner.set_channels(channels)
        }
        fn channels(&self) -> &[Channel] {
            self.inner.channels()
        }
        fn start_stimulation(&mut self, duration: Option<f64>) -> Result<(), HalError> {
            if self.healthy_starts == 0 {
                return Err(HalError::Disposed);
            }
            self.healthy_starts -= 1;
            self.inner.start_stimulation(duration)
        }
        fn stop_stimulation(&mut self) -> Result<(), HalError> {
            self.inner.stop_stimulation()
        }
        fn poll(&mut self) -> Result<(), HalError> {
            self.inner.poll()
        }
        fn is_stimulating(&self) -> bool {
            self.inner.is_stimulating()
        }
        fn dispose(&mut self) -> Result<(), HalError> {
            self.inner.dispose()
        }
    }

    #[test]
    fn test_device_failure_halts_session() {
        let clock = Arc::new(MockTimeProvider::new(0));
        let channels = vec![Channel::new(1, 20.0), Channel::new(2, 30.0)];
        let device = FlakyDevice {
            inner: SimulatedStimulator::with_time_provider("sim0", channels, clock.clone()).unwrap(),
            healthy_starts: 1,
        };
        let log = SharedEventLog::new(EventLog::with_time_provider(clock.clone()));
        let strategy = scripted(vec![vec![true, false], vec![true, true], vec![true, true]]);
        let mut session = StimulationSession::new(Box::new(strategy), Box::new(device), log);
        let data = DataSnapshot::new();

        session.tick(0.0, &data).unwrap();
        clock.advance_secs(0.2);
        assert!(matches!(session.tick(0.2, &data), Err(FesError::Device(HalError::Disposed))));

        assert_eq!(session.state(), SessionState::Halted);
        assert_eq!(session.active_channels(), &[false, false]);
        assert!(!session.device().is_stimulating());

        let log = session.log().snapshot();
        assert_eq!(log.len(), 1);
        assert!((log.duration_series()[0] - 0.2).abs() < 1e-9);
        assert!(matches!(session.tick(0.3, &data), Err(FesError::SessionHalted)));
    }

    #[test]
    fn test_from_config() {
        let clock = Arc::new(MockTimeProvider::new(0));
        let mut session = StimulationSession::from_config(&FesConfig::default(), clock).unwrap();
        assert_eq!(session.channels().len(), 2);

        // Default windows: left late swing at t = 0.84 s (phase 0.7), right at 0.2
        let outcome = session.tick(0.84, &DataSnapshot::new()).unwrap();
        assert_eq!(outcome.commands, vec![Some(Command::StartIndefinite), None]);
    }
}

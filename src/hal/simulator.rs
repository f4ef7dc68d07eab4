//! In-memory stimulator used for simulated sessions and tests
//!
//! Mirrors the command flow of a Rehastim-class device: the first start
//! initializes stimulation with the channel list, later starts only forward
//! the channel list when it changed. Timed stimulations are stopped from
//! [`StimulationDevice::poll`] against an injected clock.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::constants::device::SIMULATOR_NAME;
use crate::hal::types::{
    validate_channels, Channel, DeviceCommand, DeviceInfo, DeviceKind, HalError, StimulationTiming,
};
use crate::hal::StimulationDevice;
use crate::utils::time::{seconds_to_nanos, SystemTimeProvider, TimeProvider, Timestamp};

pub struct SimulatedStimulator {
    port: String,
    channels: Vec<Channel>,
    timing: StimulationTiming,
    show_log: bool,
    is_initialized: bool,
    channels_changed: bool,
    is_stimulating: bool,
    is_disposed: bool,
    stop_deadline: Option<Timestamp>,
    clock: Arc<dyn TimeProvider>,
    history: Vec<DeviceCommand>,
}

impl SimulatedStimulator {
    pub fn new(port: impl Into<String>, channels: Vec<Channel>) -> Result<Self, HalError> {
        Self::with_time_provider(port, channels, Arc::new(SystemTimeProvider))
    }

    pub fn with_time_provider(
        port: impl Into<String>,
        channels: Vec<Channel>,
        clock: Arc<dyn TimeProvider>,
    ) -> Result<Self, HalError> {
        validate_channels(&channels)?;
        let port = port.into();
        info!(port = %port, channels = channels.len(), "simulated stimulator opened");
        Ok(Self {
            port,
            channels,
            timing: StimulationTiming::default(),
            show_log: false,
            is_initialized: false,
            channels_changed: true,
            is_stimulating: false,
            is_disposed: false,
            stop_deadline: None,
            clock,
            history: Vec::new(),
        })
    }

    /// Pulse timing used when stimulation is initialised
    pub fn with_timing(mut self, timing: StimulationTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Log every command sent to the device
    pub fn with_show_log(mut self, show_log: bool) -> Self {
        self.show_log = show_log;
        self
    }

    pub fn timing(&self) -> StimulationTiming {
        self.timing
    }

    /// Every command the device received, oldest first
    pub fn history(&self) -> &[DeviceCommand] {
        &self.history
    }

    pub fn is_initialized(&self) -> bool {
        self.is_initialized
    }

    fn issue(&mut self, command: DeviceCommand) {
        if self.show_log {
            debug!(port = %self.port, ?command, "device command");
        }
        self.history.push(command);
    }

    fn ensure_open(&self) -> Result<(), HalError> {
        if self.is_disposed {
            Err(HalError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl StimulationDevice for SimulatedStimulator {
    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            name: SIMULATOR_NAME.to_string(),
            kind: DeviceKind::Simulator,
            port: self.port.clone(),
            channel_count: self.channels.len(),
            timing: self.timing,
        }
    }

    fn initialize_stimulation(&mut self) -> Result<(), HalError> {
        self.ensure_open()?;
        self.issue(DeviceCommand::Initialize {
            channels: self.channels.clone(),
            timing: self.timing,
        });
        self.is_initialized = true;
        self.channels_changed = false;
        Ok(())
    }

    fn set_channels(&mut self, channels: Vec<Channel>) -> Result<(), HalError> {
        self.ensure_open()?;
        validate_channels(&channels)?;
        if channels != self.channels {
            self.channels = channels;
            self.channels_changed = true;
        }
        Ok(())
    }

    fn channels(&self) -> &[Channel] {
        &self.channels
    }

    fn start_stimulation(&mut self, duration: Option<f64>) -> Result<(), HalError> {
        self.ensure_open()?;
        if !self.is_initialized {
            // Initialisation carries the channel list
            self.initialize_stimulation()?;
        }

        let updated_channels = if self.channels_changed {
            self.channels_changed = false;
            Some(self.channels.clone())
        } else {
            None
        };

        self.issue(DeviceCommand::Start { updated_channels, duration });
        self.is_stimulating = true;
        self.stop_deadline = duration.map(|d| self.clock.now_nanos() + seconds_to_nanos(d));
        debug!(?duration, "stimulation started");
        Ok(())
    }

    fn stop_stimulation(&mut self) -> Result<(), HalError> {
        self.ensure_open()?;
        self.issue(DeviceCommand::Pause);
        self.is_stimulating = false;
        self.stop_deadline = None;
        debug!("stimulation paused");
        Ok(())
    }

    fn poll(&mut self) -> Result<(), HalError> {
        match self.stop_deadline {
            Some(deadline) if self.clock.now_nanos() >= deadline => self.stop_stimulation(),
            _ => Ok(()),
        }
    }

    fn is_stimulating(&self) -> bool {
        self.is_stimulating
    }

    fn dispose(&mut self) -> Result<(), HalError> {
        if self.is_disposed {
            return Ok(());
        }
        self.issue(DeviceCommand::Dispose);
        self.is_stimulating = false;
        self.stop_deadline = None;
        self.is_disposed = true;
        info!(port = %self.port, "simulated stimulator closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time::MockTimeProvider;

    fn two_channels() -> Vec<Channel> {
        vec![Channel::new(1, 20.0), Channel::new(2, 25.0)]
    }

    #[test]
    fn test_first_start_initializes() {
        let mut device = SimulatedStimulator::new("sim0", two_channels()).unwrap();
        device.start_stimulation(None).unwrap();

        assert!(device.is_initialized());
        assert!(device.is_stimulating());
        assert_eq!(
            device.history(),
            &[
                DeviceCommand::Initialize {
                    channels: two_channels(),
                    timing: StimulationTiming::default(),
                },
                DeviceCommand::Start { updated_channels: None, duration: None },
            ]
        );
    }

    #[test]
    fn test_channels_forwarded_only_when_changed() {
        let mut device = SimulatedStimulator::new("sim0", two_channels()).unwrap();
        device.start_stimulation(None).unwrap();

        // Same list: no update
        device.set_channels(two_channels()).unwrap();
        device.start_stimulation(None).unwrap();

        let updated = vec![Channel::new(1, 30.0), Channel::new(2, 25.0)];
        device.set_channels(updated.clone()).unwrap();
        device.start_stimulation(None).unwrap();

        assert_eq!(
            device.history()[2],
            DeviceCommand::Start { updated_channels: None, duration: None }
        );
        assert_eq!(
            device.history()[3],
            DeviceCommand::Start { updated_channels: Some(updated), duration: None }
        );
    }

    #[test]
    fn test_timed_stimulation_stops_on_poll() {
        let clock = Arc::new(MockTimeProvider::new(0));
        let mut device =
            SimulatedStimulator::with_time_provider("sim0", two_channels(), clock.clone()).unwrap();

        device.start_stimulation(Some(0.2)).unwrap();
        clock.advance_secs(0.1);
        device.poll().unwrap();
        assert!(device.is_stimulating());

        clock.advance_secs(0.1);
        device.poll().unwrap();
        assert!(!device.is_stimulating());
        assert_eq!(device.history().last(), Some(&DeviceCommand::Pause));
    }

    #[test]
    fn test_disposed_device_rejects_commands() {
        let mut device = SimulatedStimulator::new("sim0", two_channels()).unwrap();
        device.dispose().unwrap();
        assert_eq!(device.start_stimulation(None), Err(HalError::Disposed));
        // Second dispose is a no-op
        assert!(device.dispose().is_ok());
    }

    #[test]
    fn test_initialization_carries_timing() {
        let timing = StimulationTiming {
            stimulation_interval_ms: 25,
            low_frequency_factor: 2,
        };
        let mut device = SimulatedStimulator::new("sim0", two_channels())
            .unwrap()
            .with_timing(timing)
            .with_show_log(true);
        device.start_stimulation(None).unwrap();

        assert_eq!(device.timing(), timing);
        assert_eq!(
            device.history()[0],
            DeviceCommand::Initialize { channels: two_channels(), timing }
        );
    }

    #[test]
    fn test_invalid_channels_rejected() {
        assert!(SimulatedStimulator::new("sim0", vec![]).is_err());
        let mut device = SimulatedStimulator::new("sim0", two_channels()).unwrap();
        assert!(device.set_channels(vec![Channel::new(12, 1.0)]).is_err());
        assert_eq!(device.channels(), two_channels().as_slice());
    }
}

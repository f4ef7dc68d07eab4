// src/config/mod.rs
//! Session configuration

pub mod constants;
pub mod loader;

pub use loader::{ConfigError, ConfigLoader};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::constants::*;
use crate::data::Side;
use crate::hal::{Channel, DeviceKind, StimulationTiming};

/// Complete system configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FesConfig {
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default = "defaults::channels")]
    pub channels: Vec<ChannelConfig>,
    #[serde(default)]
    pub gait: GaitSettings,
}

/// Control loop settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SessionSettings {
    #[serde(default = "defaults::tick_period_ms")]
    pub tick_period_ms: u64,

    #[serde(default = "defaults::log_path")]
    pub log_path: PathBuf,
}

/// Stimulator settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DeviceConfig {
    #[serde(default = "defaults::device_kind")]
    pub kind: DeviceKind,

    #[serde(default = "defaults::port")]
    pub port: String,

    #[serde(default)]
    pub show_log: bool,

    #[serde(default = "defaults::stimulation_interval_ms")]
    pub stimulation_interval_ms: u32,

    #[serde(default = "defaults::low_frequency_factor")]
    pub low_frequency_factor: u32,
}

impl DeviceConfig {
    /// Pulse timing handed to the device at initialisation
    pub fn timing(&self) -> StimulationTiming {
        StimulationTiming {
            stimulation_interval_ms: self.stimulation_interval_ms,
            low_frequency_factor: self.low_frequency_factor,
        }
    }
}

/// One stimulation channel and the stride window it fires in
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ChannelConfig {
    pub channel_index: u8,

    #[serde(default = "defaults::amplitude")]
    pub amplitude: f64,

    /// Side whose stride phase drives this channel
    pub side: Side,

    /// Window start, stride completion in [0, 1]
    pub phase_on: f64,

    /// Window end; a window with `phase_on > phase_off` wraps past 1.0
    pub phase_off: f64,
}

impl ChannelConfig {
    /// Whether `phase` falls inside the stimulation window
    pub fn is_active(&self, phase: f64) -> bool {
        if self.phase_on <= self.phase_off {
            phase >= self.phase_on && phase < self.phase_off
        } else {
            phase >= self.phase_on || phase < self.phase_off
        }
    }

    pub fn channel(&self) -> Channel {
        Channel::new(self.channel_index, self.amplitude)
    }
}

/// Cadence used by simulated sessions
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GaitSettings {
    #[serde(default = "defaults::stride_period_s")]
    pub stride_period_s: f64,

    #[serde(default = "defaults::right_offset")]
    pub right_offset: f64,
}

/// Default value providers using constants
mod defaults {
    use super::*;

    pub fn tick_period_ms() -> u64 { timing::DEFAULT_TICK_PERIOD_MS }
    pub fn log_path() -> PathBuf { PathBuf::from(persistence::DEFAULT_LOG_PATH) }

    pub fn device_kind() -> DeviceKind { DeviceKind::Simulator }
    pub fn port() -> String { device::DEFAULT_PORT.to_string() }
    pub fn stimulation_interval_ms() -> u32 { device::DEFAULT_STIMULATION_INTERVAL_MS }
    pub fn low_frequency_factor() -> u32 { device::DEFAULT_LOW_FREQUENCY_FACTOR }

    pub fn amplitude() -> f64 { stimulation::DEFAULT_AMPLITUDE_MA }

    pub fn stride_period_s() -> f64 { gait::DEFAULT_STRIDE_PERIOD_S }
    pub fn right_offset() -> f64 { gait::DEFAULT_RIGHT_OFFSET }

    /// Quadriceps-style pair: one channel per leg during late swing
    pub fn channels() -> Vec<ChannelConfig> {
        vec![
            ChannelConfig {
                channel_index: 1,
                amplitude: stimulation::DEFAULT_AMPLITUDE_MA,
                side: Side::Left,
                phase_on: 0.6,
                phase_off: 0.95,
            },
            ChannelConfig {
                channel_index: 2,
                amplitude: stimulation::DEFAULT_AMPLITUDE_MA,
                side: Side::Right,
                phase_on: 0.6,
                phase_off: 0.95,
            },
        ]
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            tick_period_ms: defaults::tick_period_ms(),
            log_path: defaults::log_path(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            kind: defaults::device_kind(),
            port: defaults::port(),
            show_log: false,
            stimulation_interval_ms: defaults::stimulation_interval_ms(),
            low_frequency_factor: defaults::low_frequency_factor(),
        }
    }
}

impl Default for GaitSettings {
    fn default() -> Self {
        Self {
            stride_period_s: defaults::stride_period_s(),
            right_offset: defaults::right_offset(),
        }
    }
}

impl Default for FesConfig {
    fn default() -> Self {
        Self {
            session: SessionSettings::default(),
            device: DeviceConfig::default(),
            channels: defaults::channels(),
            gait: GaitSettings::default(),
        }
    }
}

impl FesConfig {
    /// Validate configuration consistency
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let tick = self.session.tick_period_ms;
        if !(timing::MIN_TICK_PERIOD_MS..=timing::MAX_TICK_PERIOD_MS).contains(&tick) {
            errors.push(format!(
                "tick_period_ms {} outside {}..={}",
                tick,
                timing::MIN_TICK_PERIOD_MS,
                timing::MAX_TICK_PERIOD_MS
            ));
        }

        let interval = self.device.stimulation_interval_ms;
        if !(device::MIN_STIMULATION_INTERVAL_MS..=device::MAX_STIMULATION_INTERVAL_MS).contains(&interval) {
            errors.push(format!(
                "stimulation_interval_ms {} outside {}..={}",
                interval,
                device::MIN_STIMULATION_INTERVAL_MS,
                device::MAX_STIMULATION_INTERVAL_MS
            ));
        }
        if self.device.low_frequency_factor > device::MAX_LOW_FREQUENCY_FACTOR {
            errors.push(format!(
                "low_frequency_factor {} above {}",
                self.device.low_frequency_factor,
                device::MAX_LOW_FREQUENCY_FACTOR
            ));
        }

        let count = self.channels.len();
        if !(stimulation::MIN_CHANNEL_COUNT..=stimulation::MAX_CHANNEL_COUNT).contains(&count) {
            errors.push(format!(
                "{} channels configured, expected {}..={}",
                count,
                stimulation::MIN_CHANNEL_COUNT,
                stimulation::MAX_CHANNEL_COUNT
            ));
        }

        for (i, channel) in self.channels.iter().enumerate() {
            if let Err(e) = channel.channel().validate() {
                errors.push(e.to_string());
            }
            if self.channels[..i].iter().any(|c| c.channel_index == channel.channel_index) {
                errors.push(format!("channel {} configured twice", channel.channel_index));
            }
            for (name, phase) in [("phase_on", channel.phase_on), ("phase_off", channel.phase_off)] {
                if !(gait::MIN_PHASE..=gait::MAX_PHASE).contains(&phase) {
                    errors.push(format!(
                        "channel {} {} {} outside [0, 1]",
                        channel.channel_index, name, phase
                    ));
                }
            }
        }

        if !(self.gait.stride_period_s.is_finite() && self.gait.stride_period_s > 0.0) {
            errors.push(format!("stride_period_s must be positive, got {}", self.gait.stride_period_s));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Channel list handed to the device and the event log
    pub fn device_channels(&self) -> Vec<Channel> {
        self.channels.iter().map(ChannelConfig::channel).collect()
    }

    /// Stride condition: each channel fires while its side is inside its window
    pub fn stride_condition(&self) -> impl FnMut(f64, f64) -> Vec<bool> + Send + 'static {
        let channels = self.channels.clone();
        move |left, right| {
            channels
                .iter()
                .map(|channel| match channel.side {
                    Side::Left => channel.is_active(left),
                    Side::Right => channel.is_active(right),
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = FesConfig::default();
        assert_eq!(config.session.tick_period_ms, timing::DEFAULT_TICK_PERIOD_MS);
        assert_eq!(config.channels.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = FesConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: FesConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_config_validation() {
        let mut config = FesConfig::default();
        config.session.tick_period_ms = 0;
        config.channels[1].channel_index = 1;
        config.channels[0].phase_off = 1.5;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_device_timing_validation() {
        let mut config = FesConfig::default();
        config.device.stimulation_interval_ms = 4;
        config.device.low_frequency_factor = 9;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("stimulation_interval_ms"));
        assert!(errors[1].contains("low_frequency_factor"));

        config.device.stimulation_interval_ms = 25;
        config.device.low_frequency_factor = 2;
        assert!(config.validate().is_ok());
        assert_eq!(config.device.timing().stimulation_interval_ms, 25);
    }

    #[test]
    fn test_window_wraps() {
        let channel = ChannelConfig {
            channel_index: 1,
            amplitude: 10.0,
            side: Side::Left,
            phase_on: 0.9,
            phase_off: 0.1,
        };
        assert!(channel.is_active(0.95));
        assert!(channel.is_active(0.05));
        assert!(!channel.is_active(0.5));
    }

    #[test]
    fn test_stride_condition_follows_sides() {
        let config = FesConfig::default();
        let mut condition = config.stride_condition();

        assert_eq!(condition(0.7, 0.2), vec![true, false]);
        assert_eq!(condition(0.2, 0.7), vec![false, true]);
        assert_eq!(condition(0.99, 0.99), vec![false, false]);
    }
}

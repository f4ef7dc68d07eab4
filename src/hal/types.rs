// src/hal/types.rs
//! Core types for stimulator device abstraction

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::constants::device::{DEFAULT_LOW_FREQUENCY_FACTOR, DEFAULT_STIMULATION_INTERVAL_MS};
use crate::config::constants::stimulation::{MAX_AMPLITUDE_MA, MAX_CHANNEL_INDEX, MIN_CHANNEL_INDEX};

/// One stimulation output and the amplitude it delivers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub channel_index: u8,
    /// Current amplitude in mA
    pub amplitude: f64,
}

impl Channel {
    pub fn new(channel_index: u8, amplitude: f64) -> Self {
        Self { channel_index, amplitude }
    }

    /// Same output, different amplitude
    pub fn with_amplitude(&self, amplitude: f64) -> Self {
        Self {
            channel_index: self.channel_index,
            amplitude,
        }
    }

    /// Check the channel against the stimulator's physical limits
    pub fn validate(&self) -> Result<(), HalError> {
        if !(MIN_CHANNEL_INDEX..=MAX_CHANNEL_INDEX).contains(&self.channel_index) {
            return Err(HalError::InvalidChannel {
                channel_index: self.channel_index,
                reason: format!("index must be within {}..={}", MIN_CHANNEL_INDEX, MAX_CHANNEL_INDEX),
            });
        }
        if !self.amplitude.is_finite() || self.amplitude < 0.0 || self.amplitude > MAX_AMPLITUDE_MA {
            return Err(HalError::InvalidChannel {
                channel_index: self.channel_index,
                reason: format!("amplitude {} outside 0..={} mA", self.amplitude, MAX_AMPLITUDE_MA),
            });
        }
        Ok(())
    }
}

/// Supported stimulator families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Rehastim2,
    RehastimP24,
    Simulator,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceKind::Rehastim2 => write!(f, "Rehastim2"),
            DeviceKind::RehastimP24 => write!(f, "RehastimP24"),
            DeviceKind::Simulator => write!(f, "Simulator"),
        }
    }
}

/// Device information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    pub kind: DeviceKind,
    pub port: String,
    pub channel_count: usize,
    pub timing: StimulationTiming,
}

/// Pulse timing sent with stimulation initialisation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimulationTiming {
    /// Main interval between pulses, in ms
    pub stimulation_interval_ms: u32,
    /// Low-frequency channels skip this many intervals between pulses
    pub low_frequency_factor: u32,
}

impl Default for StimulationTiming {
    fn default() -> Self {
        Self {
            stimulation_interval_ms: DEFAULT_STIMULATION_INTERVAL_MS,
            low_frequency_factor: DEFAULT_LOW_FREQUENCY_FACTOR,
        }
    }
}

/// Low-level command as issued to the stimulator
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// Channel list and pulse timing sent during stimulation initialisation
    Initialize {
        channels: Vec<Channel>,
        timing: StimulationTiming,
    },
    /// Start, forwarding the channel list only when it changed
    Start {
        updated_channels: Option<Vec<Channel>>,
        duration: Option<f64>,
    },
    Pause,
    Dispose,
}

/// Device layer errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HalError {
    #[error("device has been disposed")]
    Disposed,

    #[error("invalid channel {channel_index}: {reason}")]
    InvalidChannel { channel_index: u8, reason: String },

    #[error("no channels configured")]
    NoChannels,

    #[error("{0} devices are not supported by this build")]
    Unsupported(DeviceKind),
}

/// Validate a channel list: each channel in range, indices unique
pub fn validate_channels(channels: &[Channel]) -> Result<(), HalError> {
    if channels.is_empty() {
        return Err(HalError::NoChannels);
    }
    for (i, channel) in channels.iter().enumerate() {
        channel.validate()?;
        if channels[..i].iter().any(|c| c.channel_index == channel.channel_index) {
            return Err(HalError::InvalidChannel {
                channel_index: channel.channel_index,
                reason: "duplicate channel index".to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_with_amplitude_keeps_index() {
        let channel = Channel::new(3, 25.0);
        let idle = channel.with_amplitude(0.0);
        assert_eq!(idle.channel_index, 3);
        assert_eq!(idle.amplitude, 0.0);
        assert_eq!(channel.amplitude, 25.0);
    }

    #[test]
    fn test_channel_validation() {
        assert!(Channel::new(1, 10.0).validate().is_ok());
        assert!(Channel::new(0, 10.0).validate().is_err());
        assert!(Channel::new(9, 10.0).validate().is_err());
        assert!(Channel::new(2, 131.0).validate().is_err());
        assert!(Channel::new(2, f64::NAN).validate().is_err());
    }

    #[test]
    fn test_duplicate_channels_rejected() {
        let channels = vec![Channel::new(1, 10.0), Channel::new(1, 12.0)];
        assert!(matches!(
            validate_channels(&channels),
            Err(HalError::InvalidChannel { channel_index: 1, .. })
        ));
        assert_eq!(validate_channels(&[]), Err(HalError::NoChannels));
    }

    #[test]
    fn test_device_kind_serialization() {
        let json = serde_json::to_string(&DeviceKind::Rehastim2).expect("Failed to serialize");
        assert_eq!(json, "\"rehastim2\"");
        let kind: DeviceKind = serde_json::from_str("\"simulator\"").expect("Failed to deserialize");
        assert_eq!(kind, DeviceKind::Simulator);
    }
}

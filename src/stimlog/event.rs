//! A single recorded stimulation

use serde::{Deserialize, Serialize};

use crate::hal::Channel;
use crate::utils::time::Timestamp;

/// Stimulation as it was executed on the device.
///
/// `duration == None` marks an open event: stimulation started without a
/// known end. Closing it fills in the duration and nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulationEvent {
    pub timestamp: Timestamp,
    /// Seconds, `None` while open
    pub duration: Option<f64>,
    pub channels: Vec<Channel>,
}

impl StimulationEvent {
    pub fn is_open(&self) -> bool {
        self.duration.is_none()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

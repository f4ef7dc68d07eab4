// src/hal/traits.rs
//! Core HAL trait for stimulator abstraction

use crate::hal::types::{Channel, DeviceInfo, HalError};

/// Standardisation layer over stimulator devices.
///
/// The device owns its port and connection lifecycle. Decision and logging
/// components never call it directly; the session does.
pub trait StimulationDevice: Send {
    /// Get device information
    fn info(&self) -> DeviceInfo;

    /// Initialize the stimulation and the channels
    fn initialize_stimulation(&mut self) -> Result<(), HalError>;

    /// Replace the channel configuration. Sent to the device on the next start.
    fn set_channels(&mut self, channels: Vec<Channel>) -> Result<(), HalError>;

    /// Current channel configuration
    fn channels(&self) -> &[Channel];

    /// Start stimulating.
    ///
    /// `Some(duration)` stops automatically after `duration` seconds (see
    /// [`StimulationDevice::poll`]); `None` runs until [`StimulationDevice::stop_stimulation`].
    fn start_stimulation(&mut self, duration: Option<f64>) -> Result<(), HalError>;

    /// Pause the stimulation
    fn stop_stimulation(&mut self) -> Result<(), HalError>;

    /// Service pending timed stops. Called once per tick.
    fn poll(&mut self) -> Result<(), HalError>;

    fn is_stimulating(&self) -> bool;

    /// End stimulation, disconnect and close the port
    fn dispose(&mut self) -> Result<(), HalError>;
}

// src/hal/mod.rs
//! Hardware Abstraction Layer for stimulator devices

pub mod traits;
pub mod types;
pub mod simulator;

use std::sync::Arc;

pub use simulator::SimulatedStimulator;
pub use traits::*;
pub use types::*;

use crate::config::DeviceConfig;
use crate::utils::time::TimeProvider;

/// Builds devices from configuration
pub struct DeviceFactory;

impl DeviceFactory {
    /// Create the device described by `config`, driving `channels`.
    ///
    /// Rehastim hardware needs a wire-protocol backend that this crate does
    /// not ship, so only the simulator can be created here.
    pub fn create(
        config: &DeviceConfig,
        channels: Vec<Channel>,
        clock: Arc<dyn TimeProvider>,
    ) -> Result<Box<dyn StimulationDevice>, HalError> {
        match config.kind {
            DeviceKind::Simulator => {
                let device = SimulatedStimulator::with_time_provider(config.port.clone(), channels, clock)?
                    .with_timing(config.timing())
                    .with_show_log(config.show_log);
                Ok(Box::new(device))
            }
            kind => Err(HalError::Unsupported(kind)),
        }
    }
}

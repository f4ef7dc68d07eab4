//! FES-Core: gait-synchronised functional electrical stimulation
//!
//! This library decides, once per control tick and independently per
//! channel, whether a stimulator should start, stop or keep going based on
//! the patient's gait phase, and keeps a timed record of every stimulation
//! actually delivered. It features:
//!
//! - Pluggable decision strategies with a stride-phase state machine
//! - Append-only stimulation event log with open-event closing
//! - Array views and a checksummed persisted format for clinical review
//! - Hardware abstraction layer with a simulated stimulator
//! - TOML configuration with environment overrides
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gait_fes_core::config::FesConfig;
//! use gait_fes_core::data::DataSnapshot;
//! use gait_fes_core::session::StimulationSession;
//! use gait_fes_core::utils::SystemTimeProvider;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FesConfig::default();
//!     let mut session = StimulationSession::from_config(&config, Arc::new(SystemTimeProvider))?;
//!
//!     let data = DataSnapshot::new();
//!     for step in 0..1000 {
//!         let outcome = session.tick(step as f64 * 0.001, &data)?;
//!         if let Some(channels) = outcome.delivered {
//!             println!("now delivering {:?}", channels);
//!         }
//!     }
//!
//!     session.finish()?;
//!     session.log().snapshot().save("session.fesl")?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod data;
pub mod error;
pub mod hal;
pub mod planner;
pub mod session;
pub mod simulation;
pub mod stimlog;
pub mod utils;

// Re-export commonly used types for convenience
pub use error::{FesError, FesResult};
pub use hal::{Channel, DeviceFactory, HalError, StimulationDevice};
pub use planner::{Command, DecisionStrategy, GaitAnalyser, StrideBasedStimulation, TimeBasedStimulation};
pub use stimlog::{EventLog, SharedEventLog, StimulationEvent};

pub use utils::time::{current_timestamp_nanos, TimeProvider, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

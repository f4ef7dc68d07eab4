// src/error.rs
//! Unified error handling for FES-Core
//!
//! Decision, logging, device and configuration failures all surface as
//! [`FesError`]. Component errors convert into it with `?`.

use thiserror::Error;

use crate::config::ConfigError;
use crate::hal::HalError;
use crate::stimlog::PersistError;

/// Unified error type for the stimulation system
#[derive(Debug, Error)]
pub enum FesError {
    /// A strategy produced a different number of channel slots than it did
    /// on its first tick. Fatal to the session.
    #[error("[CONFIG] channel count mismatch: expected {expected} channels, strategy produced {actual}")]
    ConfigurationMismatch { expected: usize, actual: usize },

    /// `record` was asked to reuse the previous channel set of an empty log
    #[error("[LOG] cannot reuse channels: the event log has no entries yet, channels must be given explicitly")]
    EmptyLog,

    /// `record` was called while the last entry is still open
    #[error("[LOG] the last stimulation is still open, close it before recording another")]
    PendingOpenEvent,

    /// A strategy emitted a command outside the command contract
    #[error("[PLANNER] invalid command on channel slot {slot}: {reason}")]
    InvalidCommand { slot: usize, reason: String },

    /// An extension point was invoked without an implementation
    #[error("[PLANNER] {0} has no decision rule")]
    NotImplemented(&'static str),

    /// The session stopped taking decisions after a fatal error
    #[error("[SESSION] session halted after a fatal configuration error")]
    SessionHalted,

    #[error("[LOG] {0}")]
    Persist(#[from] PersistError),

    #[error("[DEVICE] {0}")]
    Device(#[from] HalError),

    #[error("[CONFIG] {0}")]
    Config(#[from] ConfigError),
}

impl FesError {
    /// Errors after which the control loop must stop stimulating
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FesError::ConfigurationMismatch { .. } | FesError::SessionHalted | FesError::NotImplemented(_)
        )
    }
}

/// Result type alias for FES operations
pub type FesResult<T> = Result<T, FesError>;

//! Utility functions for FES-Core
//!
//! Time and timestamp management shared by the event log, the device
//! layer and the session scheduler.

pub mod time;

pub use time::{
    current_timestamp_nanos,
    elapsed_seconds,
    seconds_to_nanos,
    MockTimeProvider,
    SystemTimeProvider,
    TimeProvider,
    Timestamp,
};

//! Stimulation event log
//!
//! What was actually delivered, per channel, with timing: open events for
//! stimulations whose end is not yet known, derived arrays for analysis and
//! a framed byte format for persistence.

pub mod event;
pub mod log;
pub mod persist;
pub mod shared;

pub use event::StimulationEvent;
pub use log::EventLog;
pub use persist::PersistError;
pub use shared::SharedEventLog;

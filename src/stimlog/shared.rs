//! Event log shared between the control loop and readers

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::FesResult;
use crate::hal::Channel;
use crate::stimlog::log::EventLog;
use crate::utils::time::Timestamp;

/// Cloneable handle to one event log.
///
/// The control loop is the only writer and holds the lock for a single
/// append. Readers never see the live log: [`SharedEventLog::snapshot`]
/// hands them a deep copy.
#[derive(Debug, Clone)]
pub struct SharedEventLog {
    inner: Arc<RwLock<EventLog>>,
}

impl SharedEventLog {
    pub fn new(log: EventLog) -> Self {
        Self {
            inner: Arc::new(RwLock::new(log)),
        }
    }

    pub fn record(&self, duration: Option<f64>, channels: Option<&[Channel]>) -> FesResult<()> {
        self.inner.write().record(duration, channels)
    }

    pub fn close_pending(&self) {
        self.inner.write().close_pending();
    }

    pub fn reset_origin(&self, new_origin: Option<Timestamp>) {
        self.inner.write().reset_origin(new_origin);
    }

    pub fn snapshot(&self) -> EventLog {
        self.inner.read().snapshot()
    }

    /// Run `f` against the live log under the write lock, as one step for readers
    pub fn update<R>(&self, f: impl FnOnce(&mut EventLog) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// Run `f` against the live log under a read lock
    pub fn with_log<R>(&self, f: impl FnOnce(&EventLog) -> R) -> R {
        f(&self.inner.read())
    }
}

impl Default for SharedEventLog {
    fn default() -> Self {
        Self::new(EventLog::new())
    }
}

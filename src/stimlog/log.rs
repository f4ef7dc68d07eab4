//! Append-only stimulation event log

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use ndarray::{Array1, Array2};
use tracing::{debug, warn};

use crate::error::{FesError, FesResult};
use crate::hal::Channel;
use crate::stimlog::event::StimulationEvent;
use crate::utils::time::{elapsed_seconds, SystemTimeProvider, TimeProvider, Timestamp};

/// Temporal record of what every channel actually did.
///
/// Entries are only ever appended; the one exception is the duration of the
/// last entry, which [`EventLog::close_pending`] fills in once. All derived
/// views skip entries that are still open.
///
/// The amplitude matrix assumes every closed entry carries the same number of
/// channels. Keep the channel configuration fixed for a session.
#[derive(Clone)]
pub struct EventLog {
    origin: Timestamp,
    events: Vec<StimulationEvent>,
    clock: Arc<dyn TimeProvider>,
}

impl EventLog {
    /// Empty log with the origin set to now
    pub fn new() -> Self {
        Self::with_time_provider(Arc::new(SystemTimeProvider))
    }

    pub fn with_time_provider(clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            origin: clock.now_nanos(),
            events: Vec::new(),
            clock,
        }
    }

    pub(crate) fn from_parts(origin: Timestamp, events: Vec<StimulationEvent>, clock: Arc<dyn TimeProvider>) -> Self {
        Self { origin, events, clock }
    }

    /// Append an event stamped with the current time.
    ///
    /// `duration == None` records an open event. `channels == None` copies the
    /// channel list of the previous entry, which fails on an empty log.
    /// Only the last entry may be open: recording while it is fails with
    /// [`FesError::PendingOpenEvent`], call [`EventLog::close_pending`] first.
    pub fn record(&mut self, duration: Option<f64>, channels: Option<&[Channel]>) -> FesResult<()> {
        if self.has_pending() {
            return Err(FesError::PendingOpenEvent);
        }
        let channels = match channels {
            Some(channels) => channels.to_vec(),
            None => self.events.last().ok_or(FesError::EmptyLog)?.channels.clone(),
        };

        let timestamp = self.clock.now_nanos();
        debug!(
            elapsed = elapsed_seconds(self.origin, timestamp),
            ?duration,
            channels = channels.len(),
            "stimulation recorded"
        );
        self.events.push(StimulationEvent {
            timestamp,
            duration,
            channels,
        });
        Ok(())
    }

    /// Give the trailing open event its duration, measured up to now.
    ///
    /// No-op when the last event is already closed. On an empty log this
    /// only warns.
    pub fn close_pending(&mut self) {
        let now = self.clock.now_nanos();
        let Some(last) = self.events.last_mut() else {
            warn!("no stimulation recorded, nothing to close");
            return;
        };
        if last.duration.is_some() {
            return;
        }

        let lasted = elapsed_seconds(last.timestamp, now).max(0.0);
        last.duration = Some(lasted);
        debug!(duration = lasted, "open stimulation closed");
    }

    /// Move the origin; `None` means now
    pub fn reset_origin(&mut self, new_origin: Option<Timestamp>) {
        self.origin = new_origin.unwrap_or_else(|| self.clock.now_nanos());
    }

    pub fn origin(&self) -> Timestamp {
        self.origin
    }

    /// Seconds elapsed since the origin, by this log's clock
    pub fn elapsed(&self) -> f64 {
        elapsed_seconds(self.origin, self.clock.now_nanos())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn has_data(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn has_pending(&self) -> bool {
        self.events.last().is_some_and(StimulationEvent::is_open)
    }

    pub fn events(&self) -> &[StimulationEvent] {
        &self.events
    }

    pub fn event(&self, index: usize) -> Option<&StimulationEvent> {
        self.events.get(index)
    }

    pub fn last(&self) -> Option<&StimulationEvent> {
        self.events.last()
    }

    /// A block of consecutive events, `None` if out of range
    pub fn events_in(&self, range: Range<usize>) -> Option<&[StimulationEvent]> {
        self.events.get(range)
    }

    /// Deep copy for readers. Shares nothing mutable with `self`.
    pub fn snapshot(&self) -> EventLog {
        self.clone()
    }

    fn closed(&self) -> impl Iterator<Item = (&StimulationEvent, f64)> {
        self.events.iter().filter_map(|e| e.duration.map(|d| (e, d)))
    }

    /// Seconds from the origin to each closed event
    pub fn elapsed_times(&self) -> Array1<f64> {
        self.closed()
            .map(|(event, _)| elapsed_seconds(self.origin, event.timestamp))
            .collect()
    }

    /// Duration of each closed event
    pub fn duration_series(&self) -> Array1<f64> {
        self.closed().map(|(_, duration)| duration).collect()
    }

    /// Amplitudes as channels × closed events.
    ///
    /// Cells for channels an entry does not carry are NaN; that only happens
    /// when the channel configuration changed mid-session.
    pub fn amplitude_matrix(&self) -> Array2<f64> {
        let closed: Vec<&StimulationEvent> = self.closed().map(|(event, _)| event).collect();
        let rows = closed.iter().map(|e| e.channel_count()).max().unwrap_or(0);
        if rows == 0 {
            return Array2::zeros((0, 0));
        }

        Array2::from_shape_fn((rows, closed.len()), |(channel, entry)| {
            closed[entry]
                .channels
                .get(channel)
                .map_or(f64::NAN, |c| c.amplitude)
        })
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLog")
            .field("origin", &self.origin)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

/// Logs compare by content; the clock is not part of the record
impl PartialEq for EventLog {
    fn eq(&self, other: &Self) -> bool {
        self.origin == other.origin && self.events == other.events
    }
}

//! Fixed-period control loop
//!
//! A crossbeam ticker paces the session; a stop channel or an optional run
//! time ends it. Everything inside a tick is synchronous and in memory.

use std::time::{Duration, Instant};

use crossbeam::channel::{after, never, select, tick, Receiver};
use tracing::{error, info, warn};

use crate::data::DataSnapshot;
use crate::error::FesResult;
use crate::session::StimulationSession;

/// Supplies the data snapshot for each tick
pub trait SnapshotSource {
    fn snapshot(&mut self, current_time: f64) -> &DataSnapshot;
}

/// A fixed snapshot, for replays and tests
impl SnapshotSource for DataSnapshot {
    fn snapshot(&mut self, _current_time: f64) -> &DataSnapshot {
        self
    }
}

/// What a finished run did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    /// Ticks that changed the active channel set
    pub transitions: u64,
    /// Non-fatal tick errors
    pub errors: u64,
    /// Ticks whose work outlasted the period
    pub overruns: u64,
}

/// Tick `session` every `period` until `stop` fires or disconnects, or
/// `run_for` elapses. The session is finished before returning, also when a
/// fatal error ends the run early.
pub fn run_session<S: SnapshotSource>(
    session: &mut StimulationSession,
    source: &mut S,
    period: Duration,
    run_for: Option<Duration>,
    stop: &Receiver<()>,
) -> FesResult<RunSummary> {
    let ticker = tick(period);
    let timeout = run_for.map(after).unwrap_or_else(never);
    let mut summary = RunSummary::default();

    info!(period_us = period.as_micros() as u64, ?run_for, "control loop started");
    loop {
        select! {
            recv(stop) -> _ => break,
            recv(timeout) -> _ => break,
            recv(ticker) -> _ => {
                let started = Instant::now();
                let current_time = session.elapsed();
                let data = source.snapshot(current_time);

                match session.tick(current_time, data) {
                    Ok(outcome) => {
                        if outcome.delivered.is_some() {
                            summary.transitions += 1;
                        }
                    }
                    Err(e) if e.is_fatal() => {
                        error!(error = %e, ticks = summary.ticks, "control loop aborted");
                        session.finish()?;
                        return Err(e);
                    }
                    Err(e) => {
                        warn!(error = %e, "tick failed");
                        summary.errors += 1;
                    }
                }

                summary.ticks += 1;
                if started.elapsed() > period {
                    summary.overruns += 1;
                }
            }
        }
    }

    session.finish()?;
    info!(
        ticks = summary.ticks,
        transitions = summary.transitions,
        errors = summary.errors,
        overruns = summary.overruns,
        "control loop stopped"
    );
    Ok(summary)
}

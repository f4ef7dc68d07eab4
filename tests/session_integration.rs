// tests/session_integration.rs
//! End-to-end sessions: strategy, simulated stimulator and event log together

use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::bounded;
use gait_fes_core::config::FesConfig;
use gait_fes_core::data::{DataSnapshot, Side};
use gait_fes_core::hal::{DeviceCommand, SimulatedStimulator};
use gait_fes_core::session::{run_session, SessionState, StimulationSession};
use gait_fes_core::simulation::SyntheticGaitSource;
use gait_fes_core::utils::{MockTimeProvider, SystemTimeProvider};
use gait_fes_core::{
    Channel, EventLog, FesError, GaitAnalyser, SharedEventLog, StimulationDevice, StrideBasedStimulation,
};

/// Drive a default-config session through `strides` simulated strides
fn walk(strides: usize, tick: f64) -> StimulationSession {
    let config = FesConfig::default();
    let clock = Arc::new(MockTimeProvider::new(0));
    let mut session = StimulationSession::from_config(&config, clock.clone()).unwrap();
    let data = DataSnapshot::new();

    let steps = (strides as f64 * config.gait.stride_period_s / tick).round() as usize;
    for step in 0..steps {
        session.tick(step as f64 * tick, &data).unwrap();
        clock.advance_secs(tick);
    }
    session.finish().unwrap();
    session
}

#[test]
fn test_walking_produces_one_event_per_window_edge() {
    let session = walk(3, 0.01);
    let log = session.log().snapshot();

    assert!(!log.has_pending());
    assert!(log.len() >= 6, "only {} events", log.len());

    // Every event carries both configured channels; idle ones at zero
    for event in log.events() {
        assert_eq!(event.channel_count(), 2);
        assert!(event.channels.iter().any(|c| c.amplitude > 0.0));
    }
    assert_eq!(log.amplitude_matrix().nrows(), 2);
    assert!(log.duration_series().iter().all(|&d| d > 0.0));
}

#[test]
fn test_left_window_duration_matches_cadence() {
    let session = walk(2, 0.001);
    let log = session.log().snapshot();
    let amplitudes = log.amplitude_matrix();
    let durations = log.duration_series();

    // Left is on for phases 0.6..0.95 of a 1.2 s stride
    let left_on: f64 = (0..durations.len())
        .filter(|&i| amplitudes[[0, i]] > 0.0)
        .map(|i| durations[i])
        .sum();
    let expected = 2.0 * 0.35 * 1.2;
    assert!((left_on - expected).abs() < 0.01, "left on for {left_on} s");
}

#[test]
fn test_custom_analyser_session() {
    let clock = Arc::new(MockTimeProvider::new(0));
    let device = SimulatedStimulator::with_time_provider(
        "sim0",
        vec![Channel::new(1, 15.0)],
        clock.clone(),
    )
    .unwrap();
    let analyser: Arc<dyn GaitAnalyser> = Arc::new(|_: Side, t: f64, _: &DataSnapshot| t);
    let strategy = StrideBasedStimulation::new(analyser, |left: f64, _right: f64| vec![left >= 0.5]);
    let log = SharedEventLog::new(EventLog::with_time_provider(clock.clone()));
    let mut session = StimulationSession::new(Box::new(strategy), Box::new(device), log);

    let data = DataSnapshot::new();
    for t in [0.0, 0.5, 0.6, 0.9] {
        session.tick(t, &data).unwrap();
        clock.advance_secs(0.1);
    }
    assert!(session.device().is_stimulating());
    session.finish().unwrap();

    let log = session.log().snapshot();
    assert_eq!(log.len(), 1);
    assert!((log.last().unwrap().duration.unwrap() - 0.3).abs() < 1e-9);
}

#[test]
fn test_device_command_history() {
    let clock = Arc::new(MockTimeProvider::new(0));
    let mut device =
        SimulatedStimulator::with_time_provider("sim0", vec![Channel::new(1, 15.0)], clock).unwrap();

    device.start_stimulation(None).unwrap();
    device.stop_stimulation().unwrap();

    assert!(matches!(device.history()[0], DeviceCommand::Initialize { .. }));
    assert!(matches!(device.history().last(), Some(DeviceCommand::Pause)));
}

#[test]
fn test_runner_with_synthetic_source() {
    let config = FesConfig::default();
    let mut session = StimulationSession::from_config(&config, Arc::new(SystemTimeProvider)).unwrap();
    let mut source = SyntheticGaitSource::seeded(config.gait.clone(), 0.05, 7).with_window(100);
    let (_stop_tx, stop_rx) = bounded::<()>(1);

    let summary = run_session(
        &mut session,
        &mut source,
        Duration::from_millis(2),
        Some(Duration::from_millis(100)),
        &stop_rx,
    )
    .unwrap();

    assert!(summary.ticks > 0);
    assert_eq!(summary.errors, 0);
    assert_eq!(session.state(), SessionState::Finished);
    assert!(!session.log().with_log(EventLog::has_pending));
}

#[test]
fn test_halted_session_refuses_ticks() {
    let mut session = StimulationSession::from_config(&FesConfig::default(), Arc::new(MockTimeProvider::new(0))).unwrap();
    session.finish().unwrap();
    assert!(matches!(session.tick(0.0, &DataSnapshot::new()), Err(FesError::SessionHalted)));
}

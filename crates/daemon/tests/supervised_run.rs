use std::time::Duration;

use boards::{BoardError, SimulatedRcc};
use pipeline::ChannelSink;
use thermo_daemon::app::{run, run_on, Outcome, RunOptions};
use thermo_daemon::config::DaemonConfig;

fn fast_config() -> DaemonConfig {
    let mut config = DaemonConfig::default();
    config.pipeline.sampling_period_ms = 10;
    config.pipeline.elevate_sampling_priority = false;
    config.sensor.seed = Some(7);
    config
}

async fn never() {
    std::future::pending::<()>().await
}

#[tokio::test]
async fn test_stops_after_requested_cycles() {
    let (sink, reports) = ChannelSink::new();
    let summary = tokio::time::timeout(
        Duration::from_secs(10),
        run(fast_config(), sink, RunOptions { cycles: Some(3) }, never()),
    )
    .await
    .expect("run did not finish")
    .unwrap();

    assert_eq!(summary.outcome, Outcome::CyclesDone);
    assert_eq!(summary.reports, 3);
    assert!(!summary.is_failure());
    assert!(reports.try_iter().count() >= 3);
}

#[tokio::test]
async fn test_shutdown_future_stops_run() {
    let mut config = fast_config();
    // every read fails, so nothing is ever reported
    config.sensor.failure_rate = 1.0;
    let (sink, reports) = ChannelSink::new();

    let summary = run(config, sink, RunOptions::default(), tokio::time::sleep(Duration::from_millis(100)))
        .await
        .unwrap();

    assert_eq!(summary.outcome, Outcome::Interrupted);
    assert_eq!(summary.reports, 0);
    assert!(summary.skipped_cycles > 0);
    assert!(reports.try_recv().is_err());
}

#[tokio::test]
async fn test_unreachable_pll_input_is_startup_fatal() {
    let mut config = fast_config();
    config.board.hse_hz = 0;
    let (sink, _reports) = ChannelSink::new();

    let err = run(config, sink, RunOptions { cycles: Some(1) }, never()).await.unwrap_err();
    assert!(format!("{:#}", err).contains("Invalid board configuration"));
    assert!(matches!(err.downcast_ref::<BoardError>(), Some(BoardError::ConfigurationError(_))));
}

#[tokio::test]
async fn test_dead_oscillator_is_startup_fatal() {
    let mut config = fast_config();
    config.board.max_poll_attempts = 20;
    let (sink, reports) = ChannelSink::new();

    let err = run_on(config, SimulatedRcc::default().with_dead_hse(), sink, RunOptions { cycles: Some(1) }, never())
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("Board bring-up failed"));
    assert_eq!(
        err.downcast_ref::<BoardError>(),
        Some(&BoardError::HardwareFault { step: "HSE ready", attempts: 20 })
    );
    assert!(reports.try_recv().is_err());
}

#[tokio::test]
async fn test_invalid_calibration_is_startup_fatal() {
    let mut config = fast_config();
    config.pipeline.calibration.input.scale = 0.0;
    let (sink, reports) = ChannelSink::new();

    let err = run(config, sink, RunOptions { cycles: Some(1) }, never()).await.unwrap_err();
    assert!(format!("{:#}", err).contains("scale"));
    assert!(reports.try_recv().is_err());
}

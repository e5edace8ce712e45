//! Bring-up, startup checks and the supervised run of the pipeline.

use std::future::Future;

use anyhow::Context;
use tracing::{debug, error, info, warn};

use boards::{NucleoF446re, RccController, SimulatedRcc};
use pipeline::{Executor, PipelineGraph, ReferenceModel, ReportSink};
use thermo_sensor::create_sensor;
use thermo_types::{PipelineEvent, StageKind};

use crate::config::DaemonConfig;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Stop after this many reports. `None` runs until the shutdown future resolves.
    pub cycles: Option<u64>,
}

/// Why the run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Interrupted,
    CyclesDone,
    Halted { stage: StageKind, reason: String },
    /// Every stage left its loop on its own.
    Finished,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub outcome: Outcome,
    pub reports: u64,
    pub skipped_cycles: u64,
    pub dropped_samples: u64,
}

impl RunSummary {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Halted { .. })
    }
}

/// Bring the board up, build the pipeline and supervise it until `shutdown`
/// resolves, the cycle budget is spent or a stage halts.
///
/// Anything that fails before the executor starts is startup-fatal and
/// returned as an error; the pipeline is never scheduled.
pub async fn run<K, F>(config: DaemonConfig, sink: K, options: RunOptions, shutdown: F) -> anyhow::Result<RunSummary>
where
    K: ReportSink,
    F: Future<Output = ()>,
{
    run_on(config, SimulatedRcc::default(), sink, options, shutdown).await
}

/// [`run`] against a caller-supplied clock controller.
pub async fn run_on<R, K, F>(
    config: DaemonConfig,
    rcc: R,
    sink: K,
    options: RunOptions,
    shutdown: F,
) -> anyhow::Result<RunSummary>
where
    R: RccController,
    K: ReportSink,
    F: Future<Output = ()>,
{
    let clocks = NucleoF446re::new(config.board.clone(), rcc)
        .context("Invalid board configuration")?
        .bring_up()
        .context("Board bring-up failed")?;
    info!(
        "Clocks up: SYSCLK {} MHz, PCLK1 {} MHz, PCLK2 {} MHz after {} polls",
        clocks.sysclk_hz / 1_000_000,
        clocks.pclk1_hz / 1_000_000,
        clocks.pclk2_hz / 1_000_000,
        clocks.polls
    );

    let sensor = create_sensor(config.sensor.clone()).context("Failed to create sensor driver")?;
    let engine = ReferenceModel::from_config(&config.pipeline).context("Failed to set up inference engine")?;

    let (event_tx, event_rx) = flume::unbounded();
    let graph = PipelineGraph::build(&config.pipeline, sensor, engine, sink, event_tx)
        .context("Pipeline failed its startup checks")?;
    let executor = Executor::start(graph).context("Failed to start pipeline")?;
    info!("Pipeline executor started.");

    let mut summary = RunSummary {
        outcome: Outcome::Finished,
        reports: 0,
        skipped_cycles: 0,
        dropped_samples: 0,
    };
    tokio::pin!(shutdown);

    let outcome = loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received. Stopping pipeline...");
                break Outcome::Interrupted;
            }
            event = event_rx.recv_async() => {
                let Ok(event) = event else {
                    break Outcome::Finished;
                };
                match event {
                    PipelineEvent::Reported { report } => {
                        summary.reports += 1;
                        debug!("Report {} delivered: {}", report.seq, report.label());
                        if options.cycles.is_some_and(|n| summary.reports >= n) {
                            info!("Reached {} reports", summary.reports);
                            break Outcome::CyclesDone;
                        }
                    }
                    PipelineEvent::CycleSkipped { .. } => summary.skipped_cycles += 1,
                    PipelineEvent::SampleDropped { .. } => summary.dropped_samples += 1,
                    PipelineEvent::StageHalted { stage, reason } => {
                        error!("Fatal pipeline error in stage '{}': {}. Shutting down.", stage, reason);
                        break Outcome::Halted { stage, reason };
                    }
                    PipelineEvent::WaitTimedOut { stage } => warn!("Stage '{}' timed out waiting", stage),
                    other => debug!("Pipeline event: {:?}", other),
                }
            }
        }
    };
    summary.outcome = outcome;

    // joining blocks on the stage threads
    tokio::task::spawn_blocking(move || executor.stop())
        .await
        .context("Executor shutdown task failed")?;

    info!(
        "Pipeline stopped: {} reports, {} skipped cycles, {} dropped samples",
        summary.reports, summary.skipped_cycles, summary.dropped_samples
    );
    Ok(summary)
}

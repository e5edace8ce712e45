//! Pipeline graph construction.
//!
//! The graph is fixed: sampling -> sample store -> inference -> result store
//! -> reporting, with one binary signal beside each store. Building it runs
//! every startup-fatal check, so a graph that exists can be scheduled.

use flume::Sender;
use thread_priority::ThreadPriority;
use tracing::info;

use thermo_sensor::TemperatureSensor;
use thermo_types::{PipelineEvent, StageKind};

use crate::config::PipelineConfig;
use crate::engine::{verify_model, InferenceEngine};
use crate::error::PipelineResult;
use crate::signal;
use crate::sink::ReportSink;
use crate::stage::{StageContext, Task};
use crate::stages::{InferenceStage, ReportingStage, SamplingStage};
use crate::store;
use crate::timing::ShutdownHandle;

/// Represents a node in the pipeline graph.
pub struct PipelineNode {
    pub kind: StageKind,
    pub task: Box<dyn Task>,
    pub priority: Option<ThreadPriority>,
}

/// The wired pipeline, ready to hand to the executor.
pub struct PipelineGraph {
    pub nodes: Vec<PipelineNode>,
    pub(crate) shutdown: ShutdownHandle,
    pub(crate) events: Sender<PipelineEvent>,
}

impl PipelineGraph {
    /// Validate, verify the model, initialise the sensor and wire the three stages.
    pub fn build<S, E, K>(
        config: &PipelineConfig,
        mut sensor: S,
        mut engine: E,
        sink: K,
        events: Sender<PipelineEvent>,
    ) -> PipelineResult<Self>
    where
        S: TemperatureSensor,
        E: InferenceEngine,
        K: ReportSink,
    {
        config.validate()?;
        verify_model(&mut engine)?;
        sensor.initialize()?;

        let (sample_writer, sample_reader) = store::slot();
        let (result_writer, result_reader) = store::slot();
        let (sampling_done_giver, sampling_done_taker) = signal::binary("sampling-done");
        let (processing_done_giver, processing_done_taker) = signal::binary("processing-done");
        let shutdown = ShutdownHandle::new();
        let context = |kind| StageContext::new(kind, events.clone());

        let sampling = SamplingStage::new(
            sensor,
            config.sensor_retry,
            sample_writer,
            sampling_done_giver,
            shutdown.pacer(config.sampling_period()),
            context(StageKind::Sampling),
        );

        let inference = InferenceStage::new(
            engine,
            config.calibration,
            sample_reader,
            sampling_done_taker,
            result_writer,
            processing_done_giver,
            config.wait_timeout(),
            context(StageKind::Inference),
        );

        let mut reporting = ReportingStage::new(
            sink,
            config.calibration.output,
            result_reader,
            processing_done_taker,
            config.wait_timeout(),
            context(StageKind::Reporting),
        );
        if let Some(delay) = config.report_delay() {
            reporting = reporting.with_delay(delay, shutdown.pacer(delay));
        }

        let sampling_priority = config.elevate_sampling_priority.then_some(ThreadPriority::Max);
        // spawn order: consumers first
        let nodes = vec![
            PipelineNode { kind: StageKind::Reporting, task: Box::new(reporting), priority: None },
            PipelineNode { kind: StageKind::Inference, task: Box::new(inference), priority: None },
            PipelineNode { kind: StageKind::Sampling, task: Box::new(sampling), priority: sampling_priority },
        ];

        info!(
            "Pipeline built: period {} ms, report delay {} ms, wait timeout {:?}",
            config.sampling_period_ms, config.report_delay_ms, config.wait_timeout_ms
        );
        Ok(Self { nodes, shutdown, events })
    }
}

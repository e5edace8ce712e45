//! Dequantize, pick the class, tell the sink.

use std::time::Duration;

use tracing::{debug, info, warn};

use thermo_types::{PipelineEvent, Report, StageKind};

use crate::error::StageError;
use crate::quant::{classify, QuantParams};
use crate::signal::{SignalError, SignalTaker};
use crate::sink::ReportSink;
use crate::stage::{StageContext, Step, Task};
use crate::store::ResultReader;
use crate::timing::{Pacer, Tick};

pub struct ReportingStage<K: ReportSink> {
    sink: K,
    output_params: QuantParams,
    results: ResultReader,
    processing_done: SignalTaker,
    wait_timeout: Option<Duration>,
    /// Optional pause after each report, interruptible by shutdown.
    delay: Option<(Duration, Pacer)>,
    ctx: StageContext,
}

impl<K: ReportSink> ReportingStage<K> {
    pub fn new(
        sink: K,
        output_params: QuantParams,
        results: ResultReader,
        processing_done: SignalTaker,
        wait_timeout: Option<Duration>,
        ctx: StageContext,
    ) -> Self {
        Self { sink, output_params, results, processing_done, wait_timeout, delay: None, ctx }
    }

    pub fn with_delay(mut self, delay: Duration, pacer: Pacer) -> Self {
        self.delay = Some((delay, pacer));
        self
    }
}

impl<K: ReportSink> Task for ReportingStage<K> {
    fn kind(&self) -> StageKind {
        StageKind::Reporting
    }

    fn step(&mut self) -> Result<Step, StageError> {
        match self.processing_done.wait(self.wait_timeout) {
            Ok(()) => {}
            Err(SignalError::Timeout(name)) => {
                warn!("No '{}' within {:?}", name, self.wait_timeout);
                self.ctx.wait_timed_out();
                return Ok(Step::Continue);
            }
            Err(SignalError::Closed(name)) => {
                info!("'{}' closed, reporting stops", name);
                return Ok(Step::Stop);
            }
        }

        let Some(output) = self.results.take() else {
            debug!("'processing-done' with an empty slot, result already reported");
            return Ok(Step::Continue);
        };
        let report = Report { seq: output.seq, result: classify(&output, self.output_params) };
        info!(
            "Sample {}: {} (confidence {:.4}, probabilities {:?})",
            report.seq,
            report.label(),
            report.confidence(),
            report.result.probabilities
        );

        if let Err(e) = self.sink.emit(&report) {
            warn!("Report {} not delivered: {}", report.seq, e);
        }
        self.ctx.emit(PipelineEvent::Reported { report });

        if let Some((delay, pacer)) = &self.delay {
            if pacer.sleep(*delay) == Tick::Stopped {
                return Ok(Step::Stop);
            }
        }
        Ok(Step::Continue)
    }
}

//! Quantize the latest sample, run the classifier, publish its raw scores.

use std::time::Duration;

use tracing::{debug, info, warn};

use thermo_types::{QuantizedOutput, RawSample, StageKind, NUM_CLASSES};

use crate::config::CalibrationConfig;
use crate::engine::{InferenceEngine, TensorKind};
use crate::error::{CycleError, StageError};
use crate::quant::quantize_normalized;
use crate::signal::{SignalError, SignalGiver, SignalTaker};
use crate::stage::{StageContext, Step, Task};
use crate::store::{ResultWriter, SampleReader};

pub struct InferenceStage<E: InferenceEngine> {
    engine: E,
    calibration: CalibrationConfig,
    samples: SampleReader,
    sampling_done: SignalTaker,
    results: ResultWriter,
    processing_done: SignalGiver,
    wait_timeout: Option<Duration>,
    ctx: StageContext,
}

impl<E: InferenceEngine> InferenceStage<E> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        engine: E,
        calibration: CalibrationConfig,
        samples: SampleReader,
        sampling_done: SignalTaker,
        results: ResultWriter,
        processing_done: SignalGiver,
        wait_timeout: Option<Duration>,
        ctx: StageContext,
    ) -> Self {
        Self { engine, calibration, samples, sampling_done, results, processing_done, wait_timeout, ctx }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn run_cycle(&mut self, sample: RawSample) -> Result<QuantizedOutput, CycleError> {
        let input = self
            .engine
            .input(0)
            .ok_or(CycleError::MissingTensor { kind: TensorKind::Input, index: 0 })?;
        let slot = input.data_mut().first_mut().ok_or(CycleError::TensorShape {
            kind: TensorKind::Input,
            expected: 1,
            actual: 0,
        })?;
        *slot = quantize_normalized(sample.celsius, self.calibration.input, self.calibration.normalization());
        debug!("Sample {} ({:.2}) quantized to {}", sample.seq, sample.celsius, *slot);

        self.engine.invoke()?;

        let output = self
            .engine
            .output(0)
            .ok_or(CycleError::MissingTensor { kind: TensorKind::Output, index: 0 })?;
        let scores: [i8; NUM_CLASSES] = output.data().try_into().map_err(|_| CycleError::TensorShape {
            kind: TensorKind::Output,
            expected: NUM_CLASSES,
            actual: output.len(),
        })?;
        Ok(QuantizedOutput::new(scores, sample.seq))
    }
}

impl<E: InferenceEngine> Task for InferenceStage<E> {
    fn kind(&self) -> StageKind {
        StageKind::Inference
    }

    fn step(&mut self) -> Result<Step, StageError> {
        match self.sampling_done.wait(self.wait_timeout) {
            Ok(()) => {}
            Err(SignalError::Timeout(name)) => {
                warn!("No '{}' within {:?}", name, self.wait_timeout);
                self.ctx.wait_timed_out();
                return Ok(Step::Continue);
            }
            Err(SignalError::Closed(name)) => {
                info!("'{}' closed, inference stops", name);
                return Ok(Step::Stop);
            }
        }

        let Some(sample) = self.samples.take() else {
            debug!("'sampling-done' with an empty slot, sample already consumed");
            return Ok(Step::Continue);
        };

        let output = match self.run_cycle(sample) {
            Ok(output) => output,
            Err(e) => {
                warn!("Inference cycle skipped: {}", e);
                self.ctx.cycle_skipped(e);
                return Ok(Step::Continue);
            }
        };

        self.results.write(output);
        match self.processing_done.give() {
            Ok(_) => Ok(Step::Continue),
            Err(e) => {
                info!("Reporting is gone ({}), inference stops", e);
                Ok(Step::Stop)
            }
        }
    }
}

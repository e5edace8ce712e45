//! Periodic temperature acquisition.

use tracing::{debug, info, warn};

use thermo_sensor::TemperatureSensor;
use thermo_types::{PipelineEvent, RawSample, StageKind};

use crate::error::{CycleError, StageError};
use crate::signal::{Give, SignalGiver};
use crate::stage::{StageContext, Step, Task};
use crate::store::{SampleWriter, WriteOutcome};
use crate::timing::{Pacer, Tick};

pub struct SamplingStage<S: TemperatureSensor> {
    sensor: S,
    retry: bool,
    store: SampleWriter,
    sampling_done: SignalGiver,
    pacer: Pacer,
    ctx: StageContext,
    cycle: u64,
}

impl<S: TemperatureSensor> SamplingStage<S> {
    pub fn new(
        sensor: S,
        retry: bool,
        store: SampleWriter,
        sampling_done: SignalGiver,
        pacer: Pacer,
        ctx: StageContext,
    ) -> Self {
        Self { sensor, retry, store, sampling_done, pacer, ctx, cycle: 0 }
    }

    /// Read, store and signal. Returns `Stop` if nobody is listening any more.
    fn acquire(&mut self) -> Result<Step, CycleError> {
        let celsius = self.sensor.read_measurement(self.retry)?;
        info!("Temperature: {:.2}", celsius);

        if let WriteOutcome::Replaced(stale) = self.store.write(RawSample::new(celsius, self.cycle)) {
            debug!("Sample {} was never consumed", stale.seq);
            self.ctx.emit(PipelineEvent::SampleDropped { seq: stale.seq });
        }

        match self.sampling_done.give() {
            Ok(Give::Raised) => Ok(Step::Continue),
            Ok(Give::Coalesced) => {
                debug!("'{}' already pending, coalesced", self.sampling_done.name());
                Ok(Step::Continue)
            }
            Err(e) => {
                info!("Inference is gone ({}), sampling stops", e);
                Ok(Step::Stop)
            }
        }
    }
}

impl<S: TemperatureSensor> Task for SamplingStage<S> {
    fn kind(&self) -> StageKind {
        StageKind::Sampling
    }

    fn step(&mut self) -> Result<Step, StageError> {
        self.cycle += 1;
        match self.acquire() {
            Ok(Step::Stop) => return Ok(Step::Stop),
            Ok(Step::Continue) => {}
            Err(e) => {
                warn!("Sampling cycle {} skipped: {}", self.cycle, e);
                self.ctx.cycle_skipped(e);
            }
        }

        match self.pacer.wait() {
            Tick::Elapsed => Ok(Step::Continue),
            Tick::Stopped => Ok(Step::Stop),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal;
    use crate::store;
    use crate::timing::ShutdownHandle;
    use std::time::Duration;
    use thermo_sensor::ScriptedSensor;
    use thermo_types::SensorError;

    #[test]
    fn failed_read_skips_only_that_cycle() {
        let (writer, mut reader) = store::slot();
        let (giver, taker) = signal::binary("sampling-done");
        let (events_tx, events_rx) = flume::unbounded();
        let shutdown = ShutdownHandle::new();
        let sensor = ScriptedSensor::new(vec![Err(SensorError::Timeout("no response".into())), Ok(24.5)]);
        let mut stage = SamplingStage::new(
            sensor,
            false,
            writer,
            giver,
            shutdown.pacer(Duration::from_millis(1)),
            StageContext::new(StageKind::Sampling, events_tx),
        );

        assert_eq!(stage.step(), Ok(Step::Continue));
        assert_eq!(taker.try_take(), Ok(false));
        assert!(matches!(
            events_rx.try_recv(),
            Ok(PipelineEvent::CycleSkipped { stage: StageKind::Sampling, .. })
        ));

        assert_eq!(stage.step(), Ok(Step::Continue));
        assert_eq!(taker.try_take(), Ok(true));
        assert_eq!(reader.take(), Some(RawSample::new(24.5, 2)));
    }

    #[test]
    fn unconsumed_sample_is_overwritten() {
        let (writer, mut reader) = store::slot();
        let (giver, taker) = signal::binary("sampling-done");
        let (events_tx, events_rx) = flume::unbounded();
        let shutdown = ShutdownHandle::new();
        let sensor = ScriptedSensor::new(vec![Ok(20.0), Ok(21.0)]);
        let mut stage = SamplingStage::new(
            sensor,
            false,
            writer,
            giver,
            shutdown.pacer(Duration::from_millis(1)),
            StageContext::new(StageKind::Sampling, events_tx),
        );

        stage.step().unwrap();
        stage.step().unwrap();

        // one wake-up, second value
        assert_eq!(taker.try_take(), Ok(true));
        assert_eq!(taker.try_take(), Ok(false));
        assert_eq!(reader.take(), Some(RawSample::new(21.0, 2)));
        assert_eq!(events_rx.try_recv(), Ok(PipelineEvent::SampleDropped { seq: 1 }));
    }

    #[test]
    fn stops_on_shutdown() {
        let (writer, _reader) = store::slot();
        let (giver, _taker) = signal::binary("sampling-done");
        let (events_tx, _events_rx) = flume::unbounded();
        let mut shutdown = ShutdownHandle::new();
        let pacer = shutdown.pacer(Duration::from_secs(60));
        shutdown.stop();
        let mut stage = SamplingStage::new(
            ScriptedSensor::constant(22.0),
            false,
            writer,
            giver,
            pacer,
            StageContext::new(StageKind::Sampling, events_tx),
        );
        assert_eq!(stage.step(), Ok(Step::Stop));
    }

    #[test]
    fn stops_when_inference_is_gone() {
        let (writer, _reader) = store::slot();
        let (giver, taker) = signal::binary("sampling-done");
        drop(taker);
        let (events_tx, _events_rx) = flume::unbounded();
        let shutdown = ShutdownHandle::new();
        let mut stage = SamplingStage::new(
            ScriptedSensor::constant(22.0),
            false,
            writer,
            giver,
            shutdown.pacer(Duration::from_secs(60)),
            StageContext::new(StageKind::Sampling, events_tx),
        );
        assert_eq!(stage.step(), Ok(Step::Stop));
    }
}

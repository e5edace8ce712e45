//! Core pipeline stage trait and types

use flume::Sender;
use tracing::debug;

use thermo_types::{PipelineEvent, StageKind};

use crate::error::StageError;

/// What the executor should do after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// Shutdown was observed; leave the loop.
    Stop,
}

/// One independently scheduled unit of the pipeline.
///
/// The executor calls [`Task::step`] in a loop on a dedicated thread. A step
/// runs one cycle up to and including the unit's blocking point. Recoverable
/// failures are handled inside the step; an `Err` halts the unit for good.
pub trait Task: Send + 'static {
    fn kind(&self) -> StageKind;

    fn step(&mut self) -> Result<Step, StageError>;
}

/// Handle a stage uses to publish events to the supervisor.
#[derive(Debug, Clone)]
pub struct StageContext {
    stage: StageKind,
    events: Sender<PipelineEvent>,
}

impl StageContext {
    pub fn new(stage: StageKind, events: Sender<PipelineEvent>) -> Self {
        Self { stage, events }
    }

    pub fn stage(&self) -> StageKind {
        self.stage
    }

    pub fn emit(&self, event: PipelineEvent) {
        if self.events.send(event).is_err() {
            debug!("Event receiver for stage '{}' is gone", self.stage);
        }
    }

    pub fn cycle_skipped(&self, reason: impl ToString) {
        self.emit(PipelineEvent::CycleSkipped { stage: self.stage, reason: reason.to_string() });
    }

    pub fn wait_timed_out(&self) {
        self.emit(PipelineEvent::WaitTimedOut { stage: self.stage });
    }
}

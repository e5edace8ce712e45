//! Events published by the running pipeline.

use serde::{Deserialize, Serialize};

use crate::data::Report;

/// Which of the three pipeline units an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    Sampling,
    Inference,
    Reporting,
}

impl StageKind {
    pub fn name(self) -> &'static str {
        match self {
            StageKind::Sampling => "sampling",
            StageKind::Inference => "inference",
            StageKind::Reporting => "reporting",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Events sent from the stages and the executor to whoever supervises the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A stage thread has started and is about to enter its loop.
    StageStarted { stage: StageKind },
    /// A cycle was abandoned; the next one proceeds independently.
    CycleSkipped { stage: StageKind, reason: String },
    /// A bounded wait on a stage signal expired.
    WaitTimedOut { stage: StageKind },
    /// The sampling stage overwrote a sample the inference stage never consumed.
    SampleDropped { seq: u64 },
    /// A report was delivered to the sink.
    Reported { report: Report },
    /// A unit failed irrecoverably and halted. It is never restarted.
    StageHalted { stage: StageKind, reason: String },
    /// A unit left its loop after shutdown was requested.
    StageStopped { stage: StageKind },
    /// Every unit has been joined.
    ShutdownAck,
}

impl PipelineEvent {
    /// Fatal events end the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineEvent::StageHalted { .. })
    }
}

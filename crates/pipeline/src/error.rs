//! Error types for the pipeline system
//!
//! Errors fall into three tiers:
//! - [`PipelineError`]: startup-fatal. The pipeline is never scheduled.
//! - [`CycleError`]: recoverable. The current cycle is abandoned and the next
//!   one proceeds independently.
//! - [`StageError`]: unrecoverable at runtime. The unit halts for good.

use thiserror::Error;

use thermo_sensor::DriverError;
use thermo_types::SensorError;

use crate::engine::{EngineError, TensorKind};

/// Pipeline-specific error types
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid pipeline configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Model contract violated: {message}")]
    ModelContract { message: String },

    #[error("Operator registration failed: {0}")]
    OpRegistration(String),

    #[error("Tensor allocation failed: {0}")]
    TensorAllocation(String),

    #[error("Sensor setup failed: {0}")]
    Sensor(#[from] DriverError),

    #[error("Failed to spawn stage '{stage}': {message}")]
    Spawn { stage: String, message: String },
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Reasons a single cycle is abandoned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CycleError {
    #[error("sensor read failed: {0}")]
    Sensor(#[from] SensorError),
    #[error("{kind} tensor {index} is unavailable")]
    MissingTensor { kind: TensorKind, index: usize },
    #[error("inference failed: {0}")]
    Invoke(#[from] EngineError),
    #[error("{kind} tensor has {actual} elements, expected {expected}")]
    TensorShape { kind: TensorKind, expected: usize, actual: usize },
}

/// Error types that halt a stage permanently.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StageError {
    #[error("fatal: {0}")]
    Fatal(String),
    #[error("stage panicked: {0}")]
    Panicked(String),
}

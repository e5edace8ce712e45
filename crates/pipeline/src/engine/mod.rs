//! The inference engine as seen by the pipeline.
//!
//! The engine is a black box with one int8 input tensor holding a single
//! element and one int8 output tensor holding one score per class. The shape
//! and schema version are agreed when the model is built and checked once by
//! [`verify_model`] before anything is scheduled.

pub mod reference;
pub mod resolver;
pub mod scripted;

use std::fmt;

use thiserror::Error;
use tracing::info;

use thermo_types::NUM_CLASSES;

use crate::error::{PipelineError, PipelineResult};
use crate::quant::QuantParams;

pub use reference::ReferenceModel;
pub use resolver::{Op, OpResolver};
pub use scripted::{InputLog, ScriptedEngine};

/// Flatbuffer schema version the pipeline was built against.
pub const SUPPORTED_SCHEMA_VERSION: u32 = 3;
pub const INPUT_ELEMENTS: usize = 1;
pub const OUTPUT_ELEMENTS: usize = NUM_CLASSES;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("tensors have not been allocated")]
    NotAllocated,
    #[error("operator {0:?} is not registered")]
    UnregisteredOp(Op),
    #[error("tensor arena too small: need {needed} bytes, have {available}")]
    ArenaExhausted { needed: usize, available: usize },
    #[error("invoke failed: {0}")]
    InvokeFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorKind {
    Input,
    Output,
}

impl fmt::Display for TensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TensorKind::Input => f.write_str("input"),
            TensorKind::Output => f.write_str("output"),
        }
    }
}

/// An int8 tensor buffer owned by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    name: &'static str,
    shape: Vec<usize>,
    params: QuantParams,
    data: Vec<i8>,
}

impl Tensor {
    /// A zero-filled tensor.
    pub fn new(name: &'static str, shape: Vec<usize>, params: QuantParams) -> Self {
        let len = shape.iter().product();
        Self { name, shape, params, data: vec![0; len] }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn params(&self) -> QuantParams {
        self.params
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[i8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [i8] {
        &mut self.data
    }
}

/// The operations the pipeline needs from an inference engine.
pub trait InferenceEngine: Send + 'static {
    /// Schema version of the loaded model.
    fn schema_version(&self) -> u32;

    /// Plan tensors into the arena. Called once before the first invoke.
    fn allocate_tensors(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    fn input(&mut self, index: usize) -> Option<&mut Tensor>;

    /// Run the graph synchronously.
    fn invoke(&mut self) -> Result<(), EngineError>;

    fn output(&self, index: usize) -> Option<&Tensor>;
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for Box<E> {
    fn schema_version(&self) -> u32 {
        (**self).schema_version()
    }

    fn allocate_tensors(&mut self) -> Result<(), EngineError> {
        (**self).allocate_tensors()
    }

    fn input(&mut self, index: usize) -> Option<&mut Tensor> {
        (**self).input(index)
    }

    fn invoke(&mut self) -> Result<(), EngineError> {
        (**self).invoke()
    }

    fn output(&self, index: usize) -> Option<&Tensor> {
        (**self).output(index)
    }
}

/// Check the loaded model against what the pipeline assumes. Any failure is
/// startup-fatal.
pub fn verify_model<E: InferenceEngine + ?Sized>(engine: &mut E) -> PipelineResult<()> {
    let version = engine.schema_version();
    if version != SUPPORTED_SCHEMA_VERSION {
        return Err(PipelineError::ModelContract {
            message: format!(
                "model schema version {} does not match supported version {}",
                version, SUPPORTED_SCHEMA_VERSION
            ),
        });
    }

    engine
        .allocate_tensors()
        .map_err(|e| PipelineError::TensorAllocation(e.to_string()))?;

    let input_len = engine.input(0).map(|t| t.len()).ok_or_else(|| PipelineError::ModelContract {
        message: "model has no input tensor 0".to_string(),
    })?;
    if input_len != INPUT_ELEMENTS {
        return Err(PipelineError::ModelContract {
            message: format!("input tensor has {} elements, expected {}", input_len, INPUT_ELEMENTS),
        });
    }

    let output_len = engine.output(0).map(|t| t.len()).ok_or_else(|| PipelineError::ModelContract {
        message: "model has no output tensor 0".to_string(),
    })?;
    if output_len != OUTPUT_ELEMENTS {
        return Err(PipelineError::ModelContract {
            message: format!("output tensor has {} elements, expected {}", output_len, OUTPUT_ELEMENTS),
        });
    }

    info!("Model verified: schema v{}, {} input, {} outputs", version, input_len, output_len);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tensor_is_zero_filled_to_shape() {
        let t = Tensor::new("scores", vec![1, 3], QuantParams::new(1.0 / 256.0, -128));
        assert_eq!(t.len(), 3);
        assert_eq!(t.data(), &[0, 0, 0]);
        assert_eq!(t.shape(), &[1, 3]);
    }

    #[test]
    fn accepts_matching_model() {
        let mut engine = ScriptedEngine::new();
        assert!(verify_model(&mut engine).is_ok());
    }

    #[test]
    fn schema_mismatch_is_fatal() {
        let mut engine = ScriptedEngine::new().with_schema_version(2);
        assert!(matches!(verify_model(&mut engine), Err(PipelineError::ModelContract { .. })));
    }

    #[test]
    fn wrong_output_shape_is_fatal() {
        let mut engine = ScriptedEngine::new().with_output_elements(4);
        let err = verify_model(&mut engine).unwrap_err();
        assert!(err.to_string().contains("expected 3"));
    }

    #[test]
    fn missing_input_tensor_is_fatal() {
        let mut engine = ScriptedEngine::new().with_missing_input();
        assert!(matches!(verify_model(&mut engine), Err(PipelineError::ModelContract { .. })));
    }

    #[test]
    fn allocation_failure_is_fatal() {
        let mut model = ReferenceModel::new(OpResolver::new(), 4096);
        assert!(matches!(verify_model(&mut model), Err(PipelineError::TensorAllocation(_))));
    }
}

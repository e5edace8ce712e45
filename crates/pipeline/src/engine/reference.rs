//! A small int8 classifier: one fully-connected layer followed by softmax.
//!
//! The input is the standardised temperature. Logits are linear in it, so
//! the three classes split the line at two thresholds: roughly 18 °C between
//! Cold and Warm and 26 °C between Warm and Hot with the default calibration.

use tracing::debug;

use crate::config::{CalibrationConfig, PipelineConfig};
use crate::error::PipelineResult;
use crate::quant::{dequantize, quantize, QuantParams};

use super::resolver::{Op, OpResolver};
use super::{EngineError, InferenceEngine, Tensor, INPUT_ELEMENTS, OUTPUT_ELEMENTS, SUPPORTED_SCHEMA_VERSION};

/// Bytes of bookkeeping the arena needs per tensor.
const TENSOR_OVERHEAD_BYTES: usize = 64;
/// Float scratch for the layer: weights, biases and logits.
const SCRATCH_BYTES: usize = 3 * OUTPUT_ELEMENTS * std::mem::size_of::<f32>();

const WEIGHTS: [f32; OUTPUT_ELEMENTS] = [-5.0, 0.0, 5.0];
const BIASES: [f32; OUTPUT_ELEMENTS] = [-3.0, 0.0, -3.5];

pub struct ReferenceModel {
    resolver: OpResolver,
    arena_bytes: usize,
    input_params: QuantParams,
    output_params: QuantParams,
    tensors: Option<(Tensor, Tensor)>,
    invocations: u64,
}

impl ReferenceModel {
    /// Input and output quantization default to [`CalibrationConfig::default`].
    pub fn new(resolver: OpResolver, arena_bytes: usize) -> Self {
        let calibration = CalibrationConfig::default();
        Self {
            resolver,
            arena_bytes,
            input_params: calibration.input,
            output_params: calibration.output,
            tensors: None,
            invocations: 0,
        }
    }

    /// Register the required operators and size the arena from `config`.
    /// Registration failure is startup-fatal.
    pub fn from_config(config: &PipelineConfig) -> PipelineResult<Self> {
        let resolver = OpResolver::with_required_ops()?;
        Ok(Self::new(resolver, config.arena_bytes)
            .with_quant(config.calibration.input, config.calibration.output))
    }

    pub fn with_quant(mut self, input: QuantParams, output: QuantParams) -> Self {
        self.input_params = input;
        self.output_params = output;
        self
    }

    /// Arena bytes needed once tensors are planned.
    pub fn required_arena_bytes() -> usize {
        2 * TENSOR_OVERHEAD_BYTES + INPUT_ELEMENTS + OUTPUT_ELEMENTS + SCRATCH_BYTES
    }

    pub fn invocations(&self) -> u64 {
        self.invocations
    }
}

fn softmax(logits: &[f32; OUTPUT_ELEMENTS]) -> [f32; OUTPUT_ELEMENTS] {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps = logits.map(|l| (l - max).exp());
    let sum: f32 = exps.iter().sum();
    exps.map(|e| e / sum)
}

impl InferenceEngine for ReferenceModel {
    fn schema_version(&self) -> u32 {
        SUPPORTED_SCHEMA_VERSION
    }

    fn allocate_tensors(&mut self) -> Result<(), EngineError> {
        if let Some(op) = self.resolver.first_missing(&Op::REQUIRED) {
            return Err(EngineError::UnregisteredOp(op));
        }
        let needed = Self::required_arena_bytes();
        if needed > self.arena_bytes {
            return Err(EngineError::ArenaExhausted { needed, available: self.arena_bytes });
        }
        self.tensors = Some((
            Tensor::new("temperature", vec![1, INPUT_ELEMENTS], self.input_params),
            Tensor::new("class_scores", vec![1, OUTPUT_ELEMENTS], self.output_params),
        ));
        debug!("Allocated {} of {} arena bytes", needed, self.arena_bytes);
        Ok(())
    }

    fn input(&mut self, index: usize) -> Option<&mut Tensor> {
        match (index, self.tensors.as_mut()) {
            (0, Some((input, _))) => Some(input),
            _ => None,
        }
    }

    fn invoke(&mut self) -> Result<(), EngineError> {
        let (input, output) = self.tensors.as_mut().ok_or(EngineError::NotAllocated)?;
        let x = dequantize(input.data()[0], input.params());
        let mut logits = [0.0f32; OUTPUT_ELEMENTS];
        for (i, logit) in logits.iter_mut().enumerate() {
            *logit = WEIGHTS[i] * x + BIASES[i];
        }
        let probabilities = softmax(&logits);
        let params = output.params();
        for (q, p) in output.data_mut().iter_mut().zip(probabilities) {
            *q = quantize(p, params);
        }
        self.invocations += 1;
        Ok(())
    }

    fn output(&self, index: usize) -> Option<&Tensor> {
        match (index, self.tensors.as_ref()) {
            (0, Some((_, output))) => Some(output),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quant::{classify, quantize_normalized, Normalization};
    use thermo_types::{Class, QuantizedOutput};

    const NORM: Normalization = Normalization { mean: 21.7625, std: 6.1161 };

    fn model() -> ReferenceModel {
        let mut model = ReferenceModel::new(OpResolver::with_required_ops().unwrap(), 4096);
        model.allocate_tensors().unwrap();
        model
    }

    fn run(model: &mut ReferenceModel, celsius: f32) -> Class {
        let params = model.input(0).unwrap().params();
        model.input(0).unwrap().data_mut()[0] = quantize_normalized(celsius, params, NORM);
        model.invoke().unwrap();
        let output = model.output(0).unwrap();
        let scores = [output.data()[0], output.data()[1], output.data()[2]];
        classify(&QuantizedOutput::new(scores, 1), output.params()).class
    }

    #[test]
    fn tensors_use_default_calibration() {
        let calibration = CalibrationConfig::default();
        let mut model = model();
        assert_eq!(model.input(0).unwrap().params(), calibration.input);
        assert_eq!(model.output(0).unwrap().params(), calibration.output);
    }

    #[test]
    fn separates_three_bands() {
        let mut model = model();
        assert_eq!(run(&mut model, 5.0), Class::Cold);
        assert_eq!(run(&mut model, 22.0), Class::Warm);
        assert_eq!(run(&mut model, 35.0), Class::Hot);
        assert_eq!(model.invocations(), 3);
    }

    #[test]
    fn scores_behave_like_probabilities() {
        let mut model = model();
        run(&mut model, 22.0);
        let output = model.output(0).unwrap();
        let total: f32 = output.data().iter().map(|&q| dequantize(q, output.params())).sum();
        assert!((total - 1.0).abs() < 0.02, "sum was {}", total);
    }

    #[test]
    fn invoke_before_allocation_fails() {
        let mut model = ReferenceModel::new(OpResolver::with_required_ops().unwrap(), 4096);
        assert!(model.input(0).is_none());
        assert_eq!(model.invoke(), Err(EngineError::NotAllocated));
    }

    #[test]
    fn small_arena_is_rejected() {
        let mut model = ReferenceModel::new(OpResolver::with_required_ops().unwrap(), 16);
        assert!(matches!(model.allocate_tensors(), Err(EngineError::ArenaExhausted { .. })));
    }

    #[test]
    fn missing_softmax_is_rejected() {
        let mut resolver = OpResolver::new();
        resolver.add(Op::FullyConnected).unwrap();
        let mut model = ReferenceModel::new(resolver, 4096);
        assert_eq!(model.allocate_tensors(), Err(EngineError::UnregisteredOp(Op::Softmax)));
    }
}

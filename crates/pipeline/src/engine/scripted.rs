//! Engine double that replays canned outputs and records what it was fed.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::config::CalibrationConfig;
use crate::quant::QuantParams;

use super::{EngineError, InferenceEngine, Tensor, INPUT_ELEMENTS, OUTPUT_ELEMENTS, SUPPORTED_SCHEMA_VERSION};

/// Shared record of every input value an engine was invoked with.
#[derive(Debug, Clone, Default)]
pub struct InputLog {
    inner: Arc<Mutex<Vec<i8>>>,
}

impl InputLog {
    pub fn values(&self) -> Vec<i8> {
        self.inner.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn push(&self, value: i8) {
        if let Ok(mut values) = self.inner.lock() {
            values.push(value);
        }
    }
}

pub struct ScriptedEngine {
    schema_version: u32,
    input: Option<Tensor>,
    output: Option<Tensor>,
    script: VecDeque<Result<Vec<i8>, EngineError>>,
    fallback: Vec<i8>,
    log: InputLog,
}

impl ScriptedEngine {
    /// An engine that answers every invoke with "Warm".
    pub fn new() -> Self {
        let calibration = CalibrationConfig::default();
        Self {
            schema_version: SUPPORTED_SCHEMA_VERSION,
            input: Some(Tensor::new("input", vec![1, INPUT_ELEMENTS], calibration.input)),
            output: Some(Tensor::new("output", vec![1, OUTPUT_ELEMENTS], calibration.output)),
            script: VecDeque::new(),
            fallback: vec![-128, 127, -128],
            log: InputLog::default(),
        }
    }

    /// Queue the results of the next invokes, in order. Once exhausted the
    /// last successful scores are repeated.
    pub fn with_script<I>(mut self, script: I) -> Self
    where
        I: IntoIterator<Item = Result<[i8; OUTPUT_ELEMENTS], EngineError>>,
    {
        self.script.extend(script.into_iter().map(|r| r.map(|s| s.to_vec())));
        self
    }

    pub fn with_schema_version(mut self, version: u32) -> Self {
        self.schema_version = version;
        self
    }

    pub fn with_output_elements(mut self, elements: usize) -> Self {
        let params = self.output.as_ref().map(|t| t.params()).unwrap_or(QuantParams::new(1.0, 0));
        self.output = Some(Tensor::new("output", vec![1, elements], params));
        self.fallback = vec![0; elements];
        self
    }

    pub fn with_missing_input(mut self) -> Self {
        self.input = None;
        self
    }

    pub fn input_log(&self) -> InputLog {
        self.log.clone()
    }
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceEngine for ScriptedEngine {
    fn schema_version(&self) -> u32 {
        self.schema_version
    }

    fn input(&mut self, index: usize) -> Option<&mut Tensor> {
        if index == 0 {
            self.input.as_mut()
        } else {
            None
        }
    }

    fn invoke(&mut self) -> Result<(), EngineError> {
        if let Some(value) = self.input.as_ref().and_then(|t| t.data().first().copied()) {
            self.log.push(value);
        }
        let scores = match self.script.pop_front() {
            Some(Ok(scores)) => {
                self.fallback = scores.clone();
                scores
            }
            Some(Err(e)) => return Err(e),
            None => self.fallback.clone(),
        };
        if let Some(output) = self.output.as_mut() {
            for (dst, src) in output.data_mut().iter_mut().zip(scores) {
                *dst = src;
            }
        }
        Ok(())
    }

    fn output(&self, index: usize) -> Option<&Tensor> {
        if index == 0 {
            self.output.as_ref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tensors_match_default_calibration() {
        let calibration = CalibrationConfig::default();
        let mut engine = ScriptedEngine::new();
        assert_eq!(engine.input(0).unwrap().params(), calibration.input);
        assert_eq!(engine.output(0).unwrap().params(), calibration.output);
    }

    #[test]
    fn replays_script_then_repeats_last_success() {
        let mut engine = ScriptedEngine::new().with_script([
            Ok([1, 2, 3]),
            Err(EngineError::InvokeFailed("boom".into())),
        ]);
        engine.input(0).unwrap().data_mut()[0] = 17;
        engine.invoke().unwrap();
        assert_eq!(engine.output(0).unwrap().data(), &[1, 2, 3]);
        assert!(engine.invoke().is_err());
        engine.invoke().unwrap();
        assert_eq!(engine.output(0).unwrap().data(), &[1, 2, 3]);
        assert_eq!(engine.input_log().values(), vec![17, 17, 17]);
    }
}

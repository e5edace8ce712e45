use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of classes the classifier scores.
pub const NUM_CLASSES: usize = 3;

/// Represents errors that can occur while reading the temperature sensor.
///
/// All of these are recoverable: the sampling stage logs them and tries again
/// on its next period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum SensorError {
    /// The sensor did not answer within its response window.
    #[error("Sensor timeout: {0}")]
    Timeout(String),
    /// The frame checksum did not match the payload.
    #[error("Sensor checksum mismatch (expected {expected:#04x}, got {actual:#04x})")]
    Checksum { expected: u8, actual: u8 },
    /// The sensor reported a value outside its physical range.
    #[error("Sensor value out of range: {0}")]
    OutOfRange(f32),
    /// A hardware-related fault.
    #[error("Sensor hardware fault: {0}")]
    HardwareFault(String),
    /// The sensor was disconnected.
    #[error("Sensor disconnected")]
    Disconnected,
}

/// A single physical measurement, in degrees Celsius.
///
/// `seq` is the sampling cycle that produced it, so later stages can tell
/// which cycle a result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub celsius: f32,
    pub seq: u64,
}

impl RawSample {
    pub fn new(celsius: f32, seq: u64) -> Self {
        Self { celsius, seq }
    }
}

/// The classifier's int8 output scores, one per [`Class`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantizedOutput {
    pub scores: [i8; NUM_CLASSES],
    /// Sequence number of the sample these scores were computed from.
    pub seq: u64,
}

impl QuantizedOutput {
    pub fn new(scores: [i8; NUM_CLASSES], seq: u64) -> Self {
        Self { scores, seq }
    }
}

/// Temperature classes, in the order of the classifier's output tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Class {
    Cold,
    Warm,
    Hot,
}

impl Class {
    pub const ALL: [Class; NUM_CLASSES] = [Class::Cold, Class::Warm, Class::Hot];

    /// Maps an output tensor index to its class.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Class::Cold => "Cold",
            Class::Warm => "Warm",
            Class::Hot => "Hot",
        }
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The winning class of one cycle together with the dequantized scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub class: Class,
    /// Probability of the winning class.
    pub confidence: f32,
    pub probabilities: [f32; NUM_CLASSES],
}

/// What the reporting stage hands to its sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub seq: u64,
    pub result: ClassificationResult,
}

impl Report {
    pub fn label(&self) -> &'static str {
        self.result.class.label()
    }

    pub fn confidence(&self) -> f32 {
        self.result.confidence
    }
}

//! Pipeline configuration types and serialization

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{PipelineError, PipelineResult};
use crate::quant::{Normalization, QuantParams};

/// Quantization constants the model was trained and exported with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub input: QuantParams,
    pub output: QuantParams,
    /// Standardisation applied before input quantization. `None` feeds the
    /// raw Celsius value straight to the quantizer.
    pub normalization: Option<Normalization>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            input: QuantParams::new(0.017_953_398, -12),
            output: QuantParams::new(0.003_906_25, -128),
            normalization: Some(Normalization { mean: 21.7625, std: 6.1161 }),
        }
    }
}

impl CalibrationConfig {
    pub fn normalization(&self) -> Normalization {
        self.normalization.unwrap_or(Normalization::IDENTITY)
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Time between the starts of consecutive sampling cycles.
    pub sampling_period_ms: u64,
    /// Pause after each printed report. Zero means none.
    pub report_delay_ms: u64,
    /// Let the sensor driver make one extra attempt per read.
    pub sensor_retry: bool,
    /// Upper bound on how long the inference and reporting stages wait for
    /// their upstream signal. `None` waits forever.
    pub wait_timeout_ms: Option<u64>,
    /// Raise the sampling thread to the highest priority.
    pub elevate_sampling_priority: bool,
    /// Working memory available to the inference engine.
    pub arena_bytes: usize,
    pub calibration: CalibrationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sampling_period_ms: 1000,
            report_delay_ms: 0,
            sensor_retry: false,
            wait_timeout_ms: None,
            elevate_sampling_priority: true,
            arena_bytes: 4096,
            calibration: CalibrationConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn sampling_period(&self) -> Duration {
        Duration::from_millis(self.sampling_period_ms)
    }

    pub fn report_delay(&self) -> Option<Duration> {
        (self.report_delay_ms > 0).then(|| Duration::from_millis(self.report_delay_ms))
    }

    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout_ms.map(Duration::from_millis)
    }

    /// Validate the configuration
    pub fn validate(&self) -> PipelineResult<()> {
        let invalid = |message: String| PipelineError::InvalidConfiguration { message };

        if self.sampling_period_ms == 0 {
            return Err(invalid("sampling_period_ms must be greater than zero".to_string()));
        }
        if self.wait_timeout_ms == Some(0) {
            return Err(invalid("wait_timeout_ms must be greater than zero when set".to_string()));
        }
        if self.arena_bytes == 0 {
            return Err(invalid("arena_bytes must be greater than zero".to_string()));
        }
        self.calibration.input.validate("calibration.input").map_err(invalid)?;
        self.calibration.output.validate("calibration.output").map_err(invalid)?;
        if let Some(norm) = &self.calibration.normalization {
            norm.validate().map_err(invalid)?;
        }
        Ok(())
    }
}

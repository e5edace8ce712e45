//! Common types and traits for temperature sensor drivers

use serde::{Deserialize, Serialize};
use thiserror::Error;

use thermo_types::SensorError;

use crate::mock_dht::driver::MockDht;

/// Which driver backs the sampling stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Simulated single-wire humidity/temperature sensor.
    MockDht,
}

/// Configuration for temperature sensor drivers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub kind: SensorKind,
    /// Temperature the simulated environment drifts around, in degrees Celsius.
    pub base_celsius: f32,
    /// Standard deviation of the per-read random walk step.
    pub drift_std: f32,
    /// Standard deviation of the per-read measurement noise.
    pub noise_std: f32,
    /// Probability in [0, 1] that a single read attempt fails.
    pub failure_rate: f64,
    /// Seed for reproducible simulations. `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Lowest temperature the sensor can report.
    pub min_celsius: f32,
    /// Highest temperature the sensor can report.
    pub max_celsius: f32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            kind: SensorKind::MockDht,
            base_celsius: 22.0,
            drift_std: 0.4,
            noise_std: 0.1,
            failure_rate: 0.0,
            seed: None,
            // DHT22 operating range
            min_celsius: -40.0,
            max_celsius: 80.0,
        }
    }
}

impl SensorConfig {
    pub fn validate(&self) -> Result<(), DriverError> {
        if !self.base_celsius.is_finite() {
            return Err(DriverError::ConfigurationError(format!(
                "base_celsius must be a finite temperature, got {}",
                self.base_celsius
            )));
        }
        if !(0.0..=1.0).contains(&self.failure_rate) {
            return Err(DriverError::ConfigurationError(format!(
                "failure_rate must be within [0, 1], got {}",
                self.failure_rate
            )));
        }
        if !(self.min_celsius < self.max_celsius) {
            return Err(DriverError::ConfigurationError(format!(
                "min_celsius ({}) must be below max_celsius ({})",
                self.min_celsius, self.max_celsius
            )));
        }
        if !self.drift_std.is_finite() || self.drift_std < 0.0 {
            return Err(DriverError::ConfigurationError("drift_std must be a non-negative number".to_string()));
        }
        if !self.noise_std.is_finite() || self.noise_std < 0.0 {
            return Err(DriverError::ConfigurationError("noise_std must be a non-negative number".to_string()));
        }
        Ok(())
    }

    /// Accept a reading only if it is a number inside the sensor's range.
    pub fn check_range(&self, celsius: f32) -> Result<f32, SensorError> {
        if (self.min_celsius..=self.max_celsius).contains(&celsius) {
            Ok(celsius)
        } else {
            Err(SensorError::OutOfRange(celsius))
        }
    }
}

/// Status of a sensor driver
#[derive(Debug, Clone, PartialEq)]
pub enum DriverStatus {
    /// Driver is not initialized
    NotInitialized,
    /// Driver is ready to be read
    Ok,
    /// The last read failed
    Error(String),
}

/// Errors that can occur while setting up a sensor driver
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    /// A sensor-specific error.
    #[error("Sensor error: {0}")]
    SensorError(#[from] SensorError),
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    /// Driver not initialized
    #[error("Driver not initialized")]
    NotInitialized,
}

/// Trait that all temperature sensors must implement.
pub trait TemperatureSensor: Send + 'static {
    /// Initialize the driver and underlying hardware.
    fn initialize(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    /// Read one temperature measurement in degrees Celsius.
    ///
    /// This is a blocking call. With `retry` set the driver makes one more
    /// attempt before giving up on a failed read.
    fn read_measurement(&mut self, retry: bool) -> Result<f32, SensorError>;

    /// Get current driver status
    fn get_status(&self) -> DriverStatus;
}

impl<S: TemperatureSensor + ?Sized> TemperatureSensor for Box<S> {
    fn initialize(&mut self) -> Result<(), DriverError> {
        (**self).initialize()
    }

    fn read_measurement(&mut self, retry: bool) -> Result<f32, SensorError> {
        (**self).read_measurement(retry)
    }

    fn get_status(&self) -> DriverStatus {
        (**self).get_status()
    }
}

/// Build the driver selected by `config.kind`.
pub fn create_sensor(config: SensorConfig) -> Result<Box<dyn TemperatureSensor>, DriverError> {
    match config.kind {
        SensorKind::MockDht => Ok(Box::new(MockDht::new(config)?)),
    }
}

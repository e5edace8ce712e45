use log::trace;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::types::{DriverError, SensorConfig};

/// Mean-reverting random walk used to simulate room temperature.
///
/// The underlying "true" temperature wanders around `base_celsius` and every
/// read adds independent measurement noise on top of it.
pub struct TemperatureWalk {
    current: f32,
    base: f32,
    reversion: f32,
    step: Normal<f32>,
    noise: Normal<f32>,
    min: f32,
    max: f32,
}

impl TemperatureWalk {
    pub fn new(config: &SensorConfig) -> Result<Self, DriverError> {
        let step = Normal::new(0.0, config.drift_std)
            .map_err(|e| DriverError::ConfigurationError(format!("drift_std: {}", e)))?;
        let noise = Normal::new(0.0, config.noise_std)
            .map_err(|e| DriverError::ConfigurationError(format!("noise_std: {}", e)))?;
        Ok(Self {
            current: config.base_celsius.clamp(config.min_celsius, config.max_celsius),
            base: config.base_celsius,
            reversion: 0.05,
            step,
            noise,
            min: config.min_celsius,
            max: config.max_celsius,
        })
    }

    /// Advance the walk by one read and return the noisy measurement.
    pub fn next_reading<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f32 {
        let pull = (self.base - self.current) * self.reversion;
        self.current = (self.current + pull + self.step.sample(rng)).clamp(self.min, self.max);
        let reading = self.current + self.noise.sample(rng);
        trace!("Simulated temperature {:.3} (true {:.3})", reading, self.current);
        reading
    }

    pub fn current(&self) -> f32 {
        self.current
    }
}

/// Integral and decimal bytes of a DHT temperature frame, plus its checksum.
///
/// Used to produce realistic checksum failures.
pub fn encode_frame(celsius: f32) -> ([u8; 4], u8) {
    let tenths = (celsius * 10.0).round() as i32;
    let magnitude = tenths.unsigned_abs().min(0x7FFF) as u16;
    let mut high = (magnitude >> 8) as u8;
    if tenths < 0 {
        high |= 0x80;
    }
    let bytes = [0, 0, high, (magnitude & 0xFF) as u8];
    let checksum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    (bytes, checksum)
}

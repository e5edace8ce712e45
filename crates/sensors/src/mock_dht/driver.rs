use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use thermo_types::SensorError;

use super::generator::{encode_frame, TemperatureWalk};
use crate::types::{DriverError, DriverStatus, SensorConfig, SensorKind, TemperatureSensor};

/// A simulated single-wire temperature sensor that does not access any hardware.
///
/// Readings follow a mean-reverting random walk. Read attempts fail with
/// probability `failure_rate`, alternating between response timeouts and
/// corrupted frames, which exercises the sampling stage's retry-next-period path.
pub struct MockDht {
    config: SensorConfig,
    rng: StdRng,
    walk: TemperatureWalk,
    status: DriverStatus,
    reads: u64,
    failures: u64,
}

impl MockDht {
    pub fn new(config: SensorConfig) -> Result<Self, DriverError> {
        if config.kind != SensorKind::MockDht {
            return Err(DriverError::ConfigurationError(
                "MockDht requires config.kind=SensorKind::MockDht".to_string(),
            ));
        }
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let walk = TemperatureWalk::new(&config)?;

        info!("MockDht created with config: {:?}", config);

        Ok(Self {
            config,
            rng,
            walk,
            status: DriverStatus::NotInitialized,
            reads: 0,
            failures: 0,
        })
    }

    /// Total read attempts, including failed ones.
    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// Read attempts that failed.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    fn read_once(&mut self) -> Result<f32, SensorError> {
        self.reads += 1;
        let reading = self.walk.next_reading(&mut self.rng);

        if self.config.failure_rate > 0.0 && self.rng.gen_bool(self.config.failure_rate) {
            self.failures += 1;
            return Err(if self.failures % 2 == 1 {
                SensorError::Timeout("no response to start signal".to_string())
            } else {
                let (_, expected) = encode_frame(reading);
                let flipped_bit = 1u8 << self.rng.gen_range(0..8);
                SensorError::Checksum { expected, actual: expected ^ flipped_bit }
            });
        }

        let checked = self.config.check_range(reading);
        if checked.is_err() {
            self.failures += 1;
        }
        checked
    }
}

impl TemperatureSensor for MockDht {
    fn initialize(&mut self) -> Result<(), DriverError> {
        // No hardware to initialize for the mock driver
        self.status = DriverStatus::Ok;
        debug!("MockDht initialized at {:.2} C", self.walk.current());
        Ok(())
    }

    fn read_measurement(&mut self, retry: bool) -> Result<f32, SensorError> {
        let result = match self.read_once() {
            Err(e) if retry => {
                debug!("MockDht read failed ({}), retrying once", e);
                self.read_once()
            }
            other => other,
        };

        match &result {
            Ok(_) => self.status = DriverStatus::Ok,
            Err(e) => {
                warn!("MockDht read failed: {}", e);
                self.status = DriverStatus::Error(e.to_string());
            }
        }
        result
    }

    fn get_status(&self) -> DriverStatus {
        self.status.clone()
    }
}

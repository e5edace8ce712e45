//! A sensor that replays a fixed script of readings.

use std::collections::VecDeque;

use thermo_types::SensorError;

use crate::types::{DriverStatus, TemperatureSensor};

/// Replays scripted results in order, then repeats the last one.
///
/// Useful for driving the pipeline through exact scenarios such as
/// "fail on cycle N, succeed on cycle N+1".
pub struct ScriptedSensor {
    script: VecDeque<Result<f32, SensorError>>,
    last: Result<f32, SensorError>,
    status: DriverStatus,
}

impl ScriptedSensor {
    pub fn new<I>(script: I) -> Self
    where
        I: IntoIterator<Item = Result<f32, SensorError>>,
    {
        Self {
            script: script.into_iter().collect(),
            last: Err(SensorError::Disconnected),
            status: DriverStatus::NotInitialized,
        }
    }

    /// A sensor that always reads `celsius`.
    pub fn constant(celsius: f32) -> Self {
        Self::new([Ok(celsius)])
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl TemperatureSensor for ScriptedSensor {
    fn read_measurement(&mut self, _retry: bool) -> Result<f32, SensorError> {
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.status = match &self.last {
            Ok(_) => DriverStatus::Ok,
            Err(e) => DriverStatus::Error(e.to_string()),
        };
        self.last.clone()
    }

    fn get_status(&self) -> DriverStatus {
        self.status.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_then_repeats_last() {
        let mut sensor = ScriptedSensor::new([Ok(20.0), Err(SensorError::Disconnected), Ok(25.0)]);
        assert_eq!(sensor.read_measurement(false), Ok(20.0));
        assert_eq!(sensor.read_measurement(false), Err(SensorError::Disconnected));
        assert_eq!(sensor.read_measurement(false), Ok(25.0));
        assert_eq!(sensor.read_measurement(false), Ok(25.0));
        assert_eq!(sensor.remaining(), 0);
    }

    #[test]
    fn empty_script_reads_as_disconnected() {
        let mut sensor = ScriptedSensor::new(Vec::new());
        assert_eq!(sensor.read_measurement(true), Err(SensorError::Disconnected));
    }
}

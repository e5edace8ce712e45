pub mod types;
pub mod mock_dht;
pub mod scripted;

// Re-export the main types that users need
pub use types::{create_sensor, DriverError, DriverStatus, SensorConfig, SensorKind, TemperatureSensor};
pub use mock_dht::driver::MockDht;
pub use scripted::ScriptedSensor;
pub use thermo_types::SensorError;

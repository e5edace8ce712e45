//! Shared types for the temperature classification system
//!
//! This crate holds the data model that flows between the sensor, the pipeline
//! stages and the daemon: raw samples, quantized classifier outputs, the
//! classification result and the events the pipeline publishes.

pub mod data;
pub mod event;

// Re-export commonly used types
pub use data::*;
pub use event::*;

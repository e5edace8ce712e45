//! Three-stage temperature classification pipeline.
//!
//! Sampling reads the sensor once per period into a single-slot store and
//! raises `sampling-done`. Inference quantizes the latest sample, runs the
//! classifier and publishes the raw scores with `processing-done`. Reporting
//! dequantizes the scores, picks the class and hands a report to the sink.
//! Each stage runs on its own thread and blocks only on its signal or its
//! sleep.

pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod graph;
pub mod quant;
pub mod signal;
pub mod sink;
pub mod stage;
pub mod stages;
pub mod store;
pub mod timing;


// Re-export commonly used types
pub use config::*;
pub use engine::{verify_model, InferenceEngine, OpResolver, ReferenceModel, ScriptedEngine, Tensor};
pub use error::*;
pub use executor::Executor;
pub use graph::PipelineGraph;
pub use sink::{ChannelSink, LineSink, ReportSink, SinkError};
pub use stage::{Step, Task};
pub use timing::ShutdownHandle;

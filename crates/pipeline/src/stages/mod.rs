//! The three pipeline units.

pub mod inference;
pub mod reporting;
pub mod sampling;

pub use inference::InferenceStage;
pub use reporting::ReportingStage;
pub use sampling::SamplingStage;

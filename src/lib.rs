//! AI images dataset processor library.
//!
//! Loads an image dataset from a hosted dataset repository, splits it into
//! train/test partitions and republishes it, supervising every network stage
//! with a fixed-delay retry wrapper.

pub mod config;
pub mod dataset;
pub mod hub;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::ProcessorConfig;
pub use lifecycle::PipelineError;
pub use resilience::RetryPolicy;

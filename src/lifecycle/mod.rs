//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Apply overrides → Validate → Read credential → Build client
//!
//! Pipeline (pipeline.rs):
//!     Load dataset (retried) → Split → Publish batches (each retried)
//! ```
//!
//! # Design Decisions
//! - Ordered, sequential stages; nothing runs in the background
//! - An exhausted retry aborts the run with the stage's original error

use thiserror::Error;

use crate::config::{ConfigError, CredentialError};
use crate::dataset::DatasetError;
use crate::hub::HubError;

pub mod pipeline;
pub mod startup;

pub use startup::{bootstrap, resolve_config, Context, Overrides};

/// Any error that ends a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Hub(#[from] HubError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

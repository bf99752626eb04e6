//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Network-facing stage (load dataset, commit batch):
//!     → retries.rs (attempt, on failure: notice + fixed delay, re-invoke)
//!     → retry_limit exhausted: original error returned to the pipeline
//! ```
//!
//! # Design Decisions
//! - Request deadlines live in the hub client (reqwest timeout), not here
//! - The wrapper is agnostic to the error type; it only needs `Display`

pub mod retries;

pub use retries::RetryPolicy;

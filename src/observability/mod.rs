//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events on stderr)
//!
//! Each pipeline run opens a span carrying its run_id, so every event of one
//! run can be correlated.
//! ```

pub mod logging;

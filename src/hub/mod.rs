//! Dataset hub integration.
//!
//! # Data Flow
//! ```text
//! loader   → client.rs list_files / download_file → RepoEntry, bytes
//! publisher → client.rs create_commit
//!               ├─ preupload        → inline or LFS per file
//!               ├─ LFS batch/upload → sha256-addressed objects
//!               └─ commit (NDJSON)  → CommitInfo
//! ```
//!
//! # Design Decisions
//! - Only the endpoints the pipeline needs are wrapped
//! - Every hub request carries the bearer token when one was configured;
//!   presigned LFS upload URLs do not
//! - Retries are the caller's job (see `resilience`)

pub mod client;
pub mod types;

pub use client::HubClient;
pub use types::{
    Commit, CommitFile, CommitInfo, EntryKind, HubError, HubResult, LfsPointer, RepoEntry, UploadMode,
};

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → CLI overrides (main.rs)
//!     → validation.rs (semantic checks)
//!     → ProcessorConfig (validated, immutable)
//!
//! settings file (dotenv)
//!     → credentials.rs (read access token once)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once validated
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Secrets stay out of the TOML file and out of the process environment

pub mod credentials;
pub mod loader;
pub mod schema;
pub mod validation;

pub use credentials::{AccessToken, CredentialError};
pub use loader::ConfigError;
pub use schema::ProcessorConfig;
pub use schema::{HubConfig, PublishConfig, RetryConfig, SourceConfig, SplitConfig, VerificationMode};

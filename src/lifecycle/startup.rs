//! Startup orchestration.
//!
//! # Responsibilities
//! - Load configuration (file or defaults) and apply CLI overrides
//! - Validate the final configuration
//! - Read the access token once
//! - Build the hub client
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Overrides are applied before validation, so they are checked too

use std::path::{Path, PathBuf};

use crate::config::loader::{load_config, ConfigError};
use crate::config::validation::validate_config;
use crate::config::{credentials, AccessToken, ProcessorConfig};
use crate::hub::HubClient;
use crate::lifecycle::PipelineError;

/// Values passed on the command line that win over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub settings_path: Option<PathBuf>,
    pub retry_limit: Option<u32>,
    pub delay_secs: Option<f64>,
    pub log_level: Option<String>,
}

impl Overrides {
    pub fn apply(&self, config: &mut ProcessorConfig) {
        if let Some(path) = &self.settings_path {
            config.credentials.settings_path = path.clone();
        }
        if let Some(limit) = self.retry_limit {
            config.retry.retry_limit = limit;
        }
        if let Some(delay) = self.delay_secs {
            config.retry.delay_secs = delay;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}

/// Resolve the effective configuration.
///
/// Without a path the built-in defaults are used.
pub fn resolve_config(path: Option<&Path>, overrides: &Overrides) -> Result<ProcessorConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => ProcessorConfig::default(),
    };

    overrides.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Everything the pipeline needs once startup succeeded.
pub struct Context {
    pub config: ProcessorConfig,
    pub client: HubClient,
}

/// Read the credential and build the hub client for a validated config.
pub fn bootstrap(config: ProcessorConfig) -> Result<Context, PipelineError> {
    let token: AccessToken = credentials::read_token(
        &config.credentials.settings_path,
        &config.credentials.token_key,
    )?;

    let client = HubClient::new(&config.hub, Some(token))?;

    tracing::info!(
        endpoint = %config.hub.endpoint,
        source = %config.source.repo,
        target = %config.publish.repo,
        retry_limit = config.retry.retry_limit,
        delay_secs = config.retry.delay_secs,
        "Startup complete"
    );

    Ok(Context { config, client })
}

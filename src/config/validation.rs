//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check repository ids, endpoint URL and glob patterns
//! - Validate value ranges (test_size in (0, 1), batch_size > 0, delays >= 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProcessorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use globset::Glob;

use crate::config::schema::ProcessorConfig;

/// Upper bound for `retry.delay_secs` (one day).
pub const MAX_DELAY_SECS: f64 = 86_400.0;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g. "split.test_size").
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &ProcessorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match url::Url::parse(&config.hub.endpoint) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            "hub.endpoint",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("hub.endpoint", e.to_string())),
    }
    if config.hub.timeout_secs == 0 {
        errors.push(ValidationError::new("hub.timeout_secs", "must be at least 1"));
    }

    check_repo_id("source.repo", &config.source.repo, &mut errors);
    check_repo_id("publish.repo", &config.publish.repo, &mut errors);

    if config.source.revision.trim().is_empty() {
        errors.push(ValidationError::new("source.revision", "must not be empty"));
    }
    if config.publish.revision.trim().is_empty() {
        errors.push(ValidationError::new("publish.revision", "must not be empty"));
    }

    let patterns = config.source.patterns();
    if patterns.is_empty() {
        errors.push(ValidationError::new(
            "source.data_files",
            format!("no patterns for split '{}'", config.source.split),
        ));
    }
    for pattern in patterns {
        if let Err(e) = Glob::new(pattern) {
            errors.push(ValidationError::new(
                "source.data_files",
                format!("invalid pattern '{}': {}", pattern, e),
            ));
        }
    }

    let test_size = config.split.test_size;
    if !(test_size > 0.0 && test_size < 1.0) {
        errors.push(ValidationError::new(
            "split.test_size",
            format!("must be between 0 and 1 (exclusive), got {}", test_size),
        ));
    }

    let data_dir = config.publish.data_dir.trim();
    if data_dir.is_empty() || data_dir.starts_with('/') || data_dir.split('/').any(|s| s == "..") {
        errors.push(ValidationError::new(
            "publish.data_dir",
            "must be a non-empty relative path",
        ));
    }
    if config.publish.batch_size == 0 {
        errors.push(ValidationError::new("publish.batch_size", "must be at least 1"));
    }

    let delay = config.retry.delay_secs;
    if !delay.is_finite() || delay < 0.0 {
        errors.push(ValidationError::new(
            "retry.delay_secs",
            format!("must be a non-negative number, got {}", delay),
        ));
    } else if delay > MAX_DELAY_SECS {
        errors.push(ValidationError::new(
            "retry.delay_secs",
            format!("must be at most {} seconds, got {}", MAX_DELAY_SECS, delay),
        ));
    }

    if config.credentials.token_key.trim().is_empty() {
        errors.push(ValidationError::new("credentials.token_key", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_repo_id(field: &str, repo: &str, errors: &mut Vec<ValidationError>) {
    let mut parts = repo.split('/');
    let valid = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
    );
    if !valid {
        errors.push(ValidationError::new(
            field,
            format!("expected 'owner/name', got '{}'", repo),
        ));
    }
}

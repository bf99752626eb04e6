//! Access token lookup from a local dotenv-style settings file.
//!
//! The file is read once at startup. A missing file or a missing key is fatal.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while reading the credential file.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// File could not be opened or a line could not be parsed.
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    /// The expected key is absent or blank.
    #[error("settings file {path} has no value for '{key}'")]
    MissingKey { path: PathBuf, key: String },
}

/// Bearer token for the dataset hub. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Read `key` from the dotenv file at `path` without touching the process environment.
pub fn read_token(path: &Path, key: &str) -> Result<AccessToken, CredentialError> {
    let read_err = |source| CredentialError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut token = None;
    for item in dotenvy::from_path_iter(path).map_err(read_err)? {
        let (name, value) = item.map_err(read_err)?;
        if name == key {
            // Later assignments win, same as sourcing the file.
            token = Some(value);
        }
    }

    match token {
        Some(value) if !value.trim().is_empty() => {
            tracing::debug!(path = %path.display(), key, "Access token loaded");
            Ok(AccessToken::new(value.trim()))
        }
        _ => Err(CredentialError::MissingKey {
            path: path.to_path_buf(),
            key: key.to_string(),
        }),
    }
}

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the processor.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the dataset processor.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Hosting platform connection settings.
    pub hub: HubConfig,

    /// Where the raw images are loaded from.
    pub source: SourceConfig,

    /// Train/test partitioning.
    pub split: SplitConfig,

    /// Where the converted dataset is published.
    pub publish: PublishConfig,

    /// Retry configuration.
    pub retry: RetryConfig,

    /// Credential file settings.
    pub credentials: CredentialsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Hosting platform connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HubConfig {
    /// Base URL of the hub (e.g., "https://huggingface.co").
    pub endpoint: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://huggingface.co".to_string(),
            timeout_secs: 60,
        }
    }
}

/// How downloaded files are checked against the repository listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMode {
    /// Trust whatever is in the cache.
    #[default]
    NoChecks,
    /// Compare file sizes with the listing.
    BasicChecks,
}

/// Source dataset configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Dataset repository id ("owner/name").
    pub repo: String,

    /// Branch, tag or commit to read from.
    pub revision: String,

    /// Which entry of `data_files` to load.
    pub split: String,

    /// Glob patterns per split name, relative to the repository root.
    pub data_files: BTreeMap<String, Vec<String>>,

    /// Local download cache.
    pub cache_dir: PathBuf,

    pub verification_mode: VerificationMode,

    /// Skip label inference from parent directory names.
    pub drop_labels: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        let mut data_files = BTreeMap::new();
        data_files.insert(
            "train".to_string(),
            vec!["raw/artificial/*".to_string(), "raw/human/*".to_string()],
        );

        Self {
            repo: "haywoodsloan/ai-images".to_string(),
            revision: "main".to_string(),
            split: "train".to_string(),
            data_files,
            cache_dir: PathBuf::from(".cache"),
            verification_mode: VerificationMode::NoChecks,
            drop_labels: false,
        }
    }
}

impl SourceConfig {
    /// Patterns for the selected split, empty if the split is unknown.
    pub fn patterns(&self) -> &[String] {
        self.data_files
            .get(&self.split)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Train/test split configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of records assigned to the test split, in (0, 1).
    pub test_size: f64,

    /// Seed for the shuffling PRNG.
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.1,
            seed: 42,
        }
    }
}

/// Publish target configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Dataset repository id ("owner/name").
    pub repo: String,

    /// Branch to commit to.
    pub revision: String,

    /// Directory inside the repository that receives the splits.
    pub data_dir: String,

    /// Files per commit.
    pub batch_size: usize,

    /// Commit title prefix.
    pub commit_message: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            repo: "haywoodsloan/ai-images".to_string(),
            revision: "main".to_string(),
            data_dir: "converted".to_string(),
            batch_size: 50,
            commit_message: "Upload converted dataset".to_string(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Fixed delay between attempts in seconds.
    pub delay_secs: f64,

    /// Maximum number of retries after the first attempt.
    pub retry_limit: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delay_secs: 10.0,
            retry_limit: 5,
        }
    }
}

/// Credential file configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// dotenv-style file holding the access token.
    pub settings_path: PathBuf,

    /// Key of the access token inside the file.
    pub token_key: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from("settings.local"),
            token_key: "HF_KEY".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the colored console format.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

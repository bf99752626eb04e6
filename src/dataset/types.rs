//! In-memory dataset handles and error definitions.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::hub::HubError;

pub const TRAIN_SPLIT: &str = "train";
pub const TEST_SPLIT: &str = "test";

/// Errors that can occur while loading, splitting or publishing a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error(transparent)]
    Hub(#[from] HubError),

    /// Cache read/write failure.
    #[error("cache error at {path}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cached file doesn't match the repository listing.
    #[error("size mismatch for {path}: expected {expected} bytes, found {actual}")]
    Verification { path: String, expected: u64, actual: u64 },

    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// No files matched the configured patterns.
    #[error("no image files in {repo}@{revision} match split '{split}'")]
    Empty { repo: String, revision: String, split: String },

    /// The requested partition would leave a subset empty.
    #[error("invalid split: {0}")]
    InvalidSplit(String),

    /// Two source files map to the same destination in the target repo.
    #[error("'{first}' and '{second}' would both be published as '{path}'")]
    DuplicatePath { path: String, first: String, second: String },
}

/// Result type for dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;

/// One image of the dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    /// Path inside the source repository.
    pub path: String,
    pub file_name: String,
    /// Index into `Dataset::labels`, `None` when labels are dropped.
    pub label: Option<usize>,
    pub size: u64,
    /// Cached copy on local disk.
    pub local_path: PathBuf,
}

/// A loaded collection of image records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    pub records: Vec<ImageRecord>,
    /// Sorted class names; record labels index into this.
    pub labels: Vec<String>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn label_name(&self, record: &ImageRecord) -> Option<&str> {
        record.label.and_then(|i| self.labels.get(i)).map(String::as_str)
    }

    /// Record count per label name; unlabeled records are not counted.
    pub fn label_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            if let Some(name) = self.label_name(record) {
                *counts.entry(name).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Named subsets of a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetDict {
    pub splits: BTreeMap<String, Dataset>,
}

impl DatasetDict {
    pub fn get(&self, split: &str) -> Option<&Dataset> {
        self.splits.get(split)
    }

    pub fn total_len(&self) -> usize {
        self.splits.values().map(Dataset::len).sum()
    }
}

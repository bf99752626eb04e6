//! Hub wire types and error definitions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors that can occur while talking to the dataset hub.
#[derive(Debug, Error)]
pub enum HubError {
    /// Connection failure, timeout or unreadable body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The hub answered with a non-success status.
    #[error("hub returned {status} for {url}: {body}")]
    Status { status: u16, url: String, body: String },

    /// Response body was not the expected JSON.
    #[error("failed to decode hub response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A request URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The large-file store refused an object.
    #[error("LFS object {oid} rejected: {message}")]
    Lfs { oid: String, message: String },
}

/// Result type for hub operations.
pub type HubResult<T> = Result<T, HubError>;

/// Kind of a repository tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One entry of a recursive tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub oid: String,
}

impl RepoEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// A file to add or replace in a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitFile {
    /// Destination path inside the repository.
    pub path: String,
    pub content: Vec<u8>,
}

/// A single commit made of file additions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Commit {
    pub summary: String,
    pub description: String,
    pub files: Vec<CommitFile>,
}

/// What the hub reports after a successful commit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitInfo {
    #[serde(default)]
    pub commit_oid: String,
    #[serde(default)]
    pub commit_url: String,
}

/// How the hub wants a file delivered, as answered by the preupload endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    /// Inline base64 inside the commit body.
    Regular,
    /// Out-of-band upload to the large-file store, referenced by oid.
    Lfs,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreuploadFile {
    pub path: String,
    pub upload_mode: UploadMode,
    #[serde(default)]
    pub should_ignore: bool,
}

#[derive(Debug, Deserialize)]
pub struct PreuploadResponse {
    pub files: Vec<PreuploadFile>,
}

/// Content address of a file stored in the large-file store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LfsPointer {
    /// Hex sha256 of the content.
    pub oid: String,
    pub size: u64,
}

impl LfsPointer {
    pub fn of(content: &[u8]) -> Self {
        Self {
            oid: format!("{:x}", Sha256::digest(content)),
            size: content.len() as u64,
        }
    }
}

/// Answer of the git-lfs batch API.
#[derive(Debug, Deserialize)]
pub struct LfsBatchResponse {
    #[serde(default)]
    pub objects: Vec<LfsObject>,
}

#[derive(Debug, Deserialize)]
pub struct LfsObject {
    pub oid: String,
    #[serde(default)]
    pub size: u64,
    /// Absent when the store already has the object.
    #[serde(default)]
    pub actions: Option<LfsActions>,
    #[serde(default)]
    pub error: Option<LfsObjectError>,
}

#[derive(Debug, Deserialize)]
pub struct LfsActions {
    #[serde(default)]
    pub upload: Option<LfsAction>,
    #[serde(default)]
    pub verify: Option<LfsAction>,
}

#[derive(Debug, Deserialize)]
pub struct LfsAction {
    pub href: String,
    #[serde(default)]
    pub header: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct LfsObjectError {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
}

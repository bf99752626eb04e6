//! Dataset hub HTTP client.
//!
//! # Responsibilities
//! - List repository trees (following pagination)
//! - Download raw files
//! - Create commits from in-memory file contents
//! - Route files the hub flags as large through the git-lfs batch API
//! - Turn non-success responses into typed errors
//!
//! # Design Decisions
//! - The preupload endpoint decides per file between inline and LFS delivery
//! - LFS uploads go to the presigned `href` without the bearer token

use std::collections::HashMap;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::{ACCEPT, CONTENT_TYPE, LINK};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::json;
use url::Url;

use crate::config::schema::HubConfig;
use crate::config::AccessToken;
use crate::hub::types::{
    Commit, CommitFile, CommitInfo, HubError, HubResult, LfsAction, LfsBatchResponse, LfsPointer,
    PreuploadFile, PreuploadResponse, RepoEntry, UploadMode,
};

const LFS_MEDIA_TYPE: &str = "application/vnd.git-lfs+json";

/// Bytes of each file shown to the preupload endpoint.
const PREUPLOAD_SAMPLE_LEN: usize = 512;

/// How a single file travels in a commit.
#[derive(Debug)]
enum FileUpload<'c> {
    Inline(&'c CommitFile),
    Lfs { file: &'c CommitFile, pointer: LfsPointer },
}

/// Async client for the dataset hub REST API.
#[derive(Clone)]
pub struct HubClient {
    http: Client,
    endpoint: Url,
    token: Option<AccessToken>,
}

impl HubClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `config` - Endpoint and request timeout
    /// * `token` - Bearer token sent with every request, if any
    pub fn new(config: &HubConfig, token: Option<AccessToken>) -> HubResult<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| HubError::InvalidUrl(format!("'{}': {}", config.endpoint, e)))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        tracing::debug!(endpoint = %endpoint, authenticated = token.is_some(), "Hub client initialized");

        Ok(Self {
            http,
            endpoint,
            token,
        })
    }

    /// List every entry of a dataset repository at `revision`, recursively.
    pub async fn list_files(&self, repo: &str, revision: &str) -> HubResult<Vec<RepoEntry>> {
        let mut url = self.dataset_url(&["api", "datasets"], repo, &["tree", revision], "")?;
        url.query_pairs_mut().append_pair("recursive", "true");

        let mut entries = Vec::new();
        let mut next = Some(url);
        while let Some(url) = next.take() {
            let response = self.send(self.http.get(url)).await?;
            next = next_page(&response);

            let text = response.text().await?;
            let page: Vec<RepoEntry> = serde_json::from_str(&text)?;
            tracing::debug!(repo, revision, count = page.len(), "Fetched tree page");
            entries.extend(page);
        }

        Ok(entries)
    }

    /// Download one file from a dataset repository.
    pub async fn download_file(&self, repo: &str, revision: &str, path: &str) -> HubResult<Vec<u8>> {
        let url = self.dataset_url(&["datasets"], repo, &["resolve", revision], path)?;
        let response = self.send(self.http.get(url)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Commit file additions to a dataset repository branch.
    ///
    /// Files the hub classifies as large are pushed to the LFS store first and
    /// referenced from the commit by their sha256 oid.
    pub async fn create_commit(&self, repo: &str, revision: &str, commit: &Commit) -> HubResult<CommitInfo> {
        let modes = self.preupload(repo, revision, &commit.files).await?;

        let mut uploads = Vec::with_capacity(commit.files.len());
        for file in &commit.files {
            match modes.get(file.path.as_str()) {
                Some(PreuploadFile { should_ignore: true, .. }) => {
                    tracing::debug!(repo, path = %file.path, "Hub ignores file, skipping");
                }
                Some(PreuploadFile { upload_mode: UploadMode::Lfs, .. }) => uploads.push(FileUpload::Lfs {
                    file,
                    pointer: LfsPointer::of(&file.content),
                }),
                _ => uploads.push(FileUpload::Inline(file)),
            }
        }

        let lfs: Vec<_> = uploads
            .iter()
            .filter_map(|u| match u {
                FileUpload::Lfs { file, pointer } => Some((pointer, file.content.as_slice())),
                FileUpload::Inline(_) => None,
            })
            .collect();
        if !lfs.is_empty() {
            self.upload_lfs(repo, revision, &lfs).await?;
        }

        let url = self.dataset_url(&["api", "datasets"], repo, &["commit", revision], "")?;
        let body = commit_payload(commit, &uploads)?;

        let request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(body);
        let response = self.send(request).await?;

        let text = response.text().await?;
        let info: CommitInfo = serde_json::from_str(&text)?;
        tracing::debug!(
            repo,
            revision,
            commit = %info.commit_oid,
            files = uploads.len(),
            lfs_files = lfs.len(),
            "Commit created"
        );
        Ok(info)
    }

    /// Ask the hub how each file should be uploaded, keyed by path.
    async fn preupload(
        &self,
        repo: &str,
        revision: &str,
        files: &[CommitFile],
    ) -> HubResult<HashMap<String, PreuploadFile>> {
        let url = self.dataset_url(&["api", "datasets"], repo, &["preupload", revision], "")?;
        let samples: Vec<_> = files
            .iter()
            .map(|file| {
                let sample = &file.content[..file.content.len().min(PREUPLOAD_SAMPLE_LEN)];
                json!({
                    "path": file.path,
                    "size": file.content.len(),
                    "sample": BASE64.encode(sample),
                })
            })
            .collect();

        let response = self
            .send(self.http.post(url).json(&json!({ "files": samples })))
            .await?;
        let text = response.text().await?;
        let answer: PreuploadResponse = serde_json::from_str(&text)?;

        Ok(answer
            .files
            .into_iter()
            .map(|file| (file.path.clone(), file))
            .collect())
    }

    /// Push objects through the git-lfs batch API: one batch request, then an
    /// upload and optional verify call for each object the store is missing.
    async fn upload_lfs(&self, repo: &str, revision: &str, objects: &[(&LfsPointer, &[u8])]) -> HubResult<()> {
        let url = self.lfs_batch_url(repo)?;
        let pointers: Vec<&LfsPointer> = objects.iter().map(|(pointer, _)| *pointer).collect();
        let body = json!({
            "operation": "upload",
            "transfers": ["basic"],
            "hash_algo": "sha256",
            "ref": { "name": revision },
            "objects": pointers,
        });

        let request = self
            .http
            .post(url)
            .header(ACCEPT, LFS_MEDIA_TYPE)
            .header(CONTENT_TYPE, LFS_MEDIA_TYPE)
            .body(serde_json::to_vec(&body)?);
        let response = self.send(request).await?;
        let text = response.text().await?;
        let batch: LfsBatchResponse = serde_json::from_str(&text)?;

        let contents: HashMap<&str, &[u8]> = objects
            .iter()
            .map(|(pointer, content)| (pointer.oid.as_str(), *content))
            .collect();

        for object in batch.objects {
            if let Some(error) = object.error {
                return Err(HubError::Lfs {
                    oid: object.oid,
                    message: format!("{} ({})", error.message, error.code),
                });
            }
            let Some(actions) = object.actions else {
                tracing::debug!(oid = %object.oid, "LFS object already stored");
                continue;
            };

            if let Some(upload) = actions.upload {
                let content = contents.get(object.oid.as_str()).ok_or_else(|| HubError::Lfs {
                    oid: object.oid.clone(),
                    message: "store asked for an object that was not offered".into(),
                })?;
                let request = with_action_headers(self.http.put(upload.href.as_str()), &upload)
                    .body(content.to_vec());
                check_status(request.send().await?).await?;
                tracing::debug!(oid = %object.oid, size = content.len(), "LFS object uploaded");
            }

            if let Some(verify) = actions.verify {
                let pointer = LfsPointer {
                    oid: object.oid.clone(),
                    size: object.size,
                };
                let request = with_action_headers(self.http.post(verify.href.as_str()), &verify)
                    .header(ACCEPT, LFS_MEDIA_TYPE)
                    .json(&pointer);
                self.send(request).await?;
            }
        }

        Ok(())
    }

    async fn send(&self, request: RequestBuilder) -> HubResult<Response> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token.expose()),
            None => request,
        };

        check_status(request.send().await?).await
    }

    /// `{endpoint}/{prefix..}/{owner}/{name}/{suffix..}/{path..}` with each piece
    /// percent-encoded as a single segment.
    fn dataset_url(&self, prefix: &[&str], repo: &str, suffix: &[&str], path: &str) -> HubResult<Url> {
        let (owner, name) = split_repo(repo)?;
        self.join(
            prefix
                .iter()
                .copied()
                .chain([owner, name])
                .chain(suffix.iter().copied())
                .chain(path.split('/').filter(|s| !s.is_empty())),
        )
    }

    /// `{endpoint}/datasets/{owner}/{name}.git/info/lfs/objects/batch`
    fn lfs_batch_url(&self, repo: &str) -> HubResult<Url> {
        let (owner, name) = split_repo(repo)?;
        let git_dir = format!("{}.git", name);
        self.join(["datasets", owner, git_dir.as_str(), "info", "lfs", "objects", "batch"])
    }

    fn join<'s>(&self, segments: impl IntoIterator<Item = &'s str>) -> HubResult<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| HubError::InvalidUrl(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn split_repo(repo: &str) -> HubResult<(&str, &str)> {
    repo.split_once('/')
        .filter(|(owner, name)| !owner.is_empty() && !name.is_empty() && !name.contains('/'))
        .ok_or_else(|| HubError::InvalidUrl(format!("bad repository id '{}'", repo)))
}

/// Non-success responses become [`HubError::Status`] carrying the body.
async fn check_status(response: Response) -> HubResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(HubError::Status {
        status: status.as_u16(),
        url,
        body,
    })
}

fn with_action_headers(request: RequestBuilder, action: &LfsAction) -> RequestBuilder {
    action
        .header
        .iter()
        .fold(request, |request, (name, value)| request.header(name.as_str(), value.as_str()))
}

/// NDJSON commit body: a header line, then one line per file.
fn commit_payload(commit: &Commit, uploads: &[FileUpload<'_>]) -> HubResult<String> {
    let mut lines = Vec::with_capacity(uploads.len() + 1);
    lines.push(serde_json::to_string(&json!({
        "key": "header",
        "value": {
            "summary": commit.summary,
            "description": commit.description,
        },
    }))?);

    for upload in uploads {
        let line = match upload {
            FileUpload::Inline(file) => json!({
                "key": "file",
                "value": {
                    "path": file.path,
                    "content": BASE64.encode(&file.content),
                    "encoding": "base64",
                },
            }),
            FileUpload::Lfs { file, pointer } => json!({
                "key": "lfsFile",
                "value": {
                    "path": file.path,
                    "algo": "sha256",
                    "oid": pointer.oid,
                    "size": pointer.size,
                },
            }),
        };
        lines.push(serde_json::to_string(&line)?);
    }

    Ok(lines.join("\n"))
}

/// Extract the `rel="next"` target from a `Link` header.
fn next_page(response: &Response) -> Option<Url> {
    let header = response.headers().get(LINK)?.to_str().ok()?;
    parse_next_link(header)
}

fn parse_next_link(header: &str) -> Option<Url> {
    header.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        if !params.split(';').any(|p| p.trim() == "rel=\"next\"") {
            return None;
        }
        let target = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        Url::parse(target).ok()
    })
}

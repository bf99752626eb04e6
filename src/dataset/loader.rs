//! Remote dataset loading.
//!
//! # Responsibilities
//! - Select the repository files belonging to the configured split
//! - Download them into the local cache (reusing cached copies)
//! - Optionally verify cached sizes against the listing
//! - Infer class labels from parent directory names

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::schema::{SourceConfig, VerificationMode};
use crate::dataset::types::{Dataset, DatasetError, DatasetResult, ImageRecord};
use crate::hub::{HubClient, RepoEntry};

/// File extensions treated as images.
pub const IMAGE_EXTENSIONS: &[&str] = &["bmp", "gif", "jpeg", "jpg", "png", "tif", "tiff", "webp"];

/// Loads one split of a hosted image dataset.
pub struct DatasetLoader<'a> {
    client: &'a HubClient,
    source: &'a SourceConfig,
}

impl<'a> DatasetLoader<'a> {
    pub fn new(client: &'a HubClient, source: &'a SourceConfig) -> Self {
        Self { client, source }
    }

    /// Fetch the listing, download missing files and build the dataset.
    ///
    /// Files already in the cache are not downloaded again, so re-running a
    /// failed load only fetches what is still missing.
    pub async fn load(&self) -> DatasetResult<Dataset> {
        let source = self.source;
        let matcher = build_matcher(source.patterns())?;

        let entries = self.client.list_files(&source.repo, &source.revision).await?;
        let files = select_files(&entries, &matcher);
        tracing::info!(
            repo = %source.repo,
            revision = %source.revision,
            split = %source.split,
            listed = entries.len(),
            matched = files.len(),
            "Repository listing fetched"
        );

        if files.is_empty() {
            return Err(DatasetError::Empty {
                repo: source.repo.clone(),
                revision: source.revision.clone(),
                split: source.split.clone(),
            });
        }

        let labels: Vec<String> = if source.drop_labels {
            Vec::new()
        } else {
            files
                .iter()
                .filter_map(|f| parent_label(&f.path))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(str::to_string)
                .collect()
        };

        let mut records = Vec::with_capacity(files.len());
        for entry in files {
            let local_path = self.fetch(entry).await?;
            let label = parent_label(&entry.path)
                .and_then(|name| labels.iter().position(|l| l == name));

            records.push(ImageRecord {
                path: entry.path.clone(),
                file_name: file_name(&entry.path).to_string(),
                label,
                size: entry.size,
                local_path,
            });
        }

        Ok(Dataset { records, labels })
    }

    /// Local cache location for a repository file.
    pub fn cache_path(&self, path: &str) -> PathBuf {
        let source = self.source;
        let mut local = source
            .cache_dir
            .join(source.repo.replace('/', "--"))
            .join(source.revision.replace('/', "--"));
        for segment in path.split('/').filter(|s| !s.is_empty() && *s != "..") {
            local.push(segment);
        }
        local
    }

    async fn fetch(&self, entry: &RepoEntry) -> DatasetResult<PathBuf> {
        let local = self.cache_path(&entry.path);

        if tokio::fs::try_exists(&local).await.map_err(|e| cache_err(&local, e))? {
            tracing::debug!(path = %entry.path, "Using cached file");
        } else {
            let bytes = self
                .client
                .download_file(&self.source.repo, &self.source.revision, &entry.path)
                .await?;
            write_atomically(&local, &bytes).await?;
            tracing::debug!(path = %entry.path, bytes = bytes.len(), "Downloaded file");
        }

        if self.source.verification_mode == VerificationMode::BasicChecks {
            let actual = tokio::fs::metadata(&local)
                .await
                .map_err(|e| cache_err(&local, e))?
                .len();
            if actual != entry.size {
                // Drop the bad copy so the next attempt downloads it again.
                if let Err(e) = tokio::fs::remove_file(&local).await {
                    tracing::warn!(
                        path = %local.display(),
                        error = %e,
                        "Failed to drop mismatched cache entry; it will fail verification again"
                    );
                }
                return Err(DatasetError::Verification {
                    path: entry.path.clone(),
                    expected: entry.size,
                    actual,
                });
            }
        }

        Ok(local)
    }
}

/// Compile split patterns; `*` never matches across `/`.
pub fn build_matcher(patterns: &[String]) -> DatasetResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| DatasetError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| DatasetError::Pattern {
        pattern: patterns.join(", "),
        source,
    })
}

/// Image files matching the split, sorted by path.
pub fn select_files<'e>(entries: &'e [RepoEntry], matcher: &GlobSet) -> Vec<&'e RepoEntry> {
    let mut files: Vec<_> = entries
        .iter()
        .filter(|e| e.is_file() && is_image(&e.path) && matcher.is_match(&e.path))
        .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    files
}

pub fn is_image(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

fn parent_label(path: &str) -> Option<&str> {
    let mut parts = path.rsplit('/');
    parts.next()?;
    parts.next().filter(|p| !p.is_empty())
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn cache_err(path: &Path, source: std::io::Error) -> DatasetError {
    DatasetError::Cache {
        path: path.to_path_buf(),
        source,
    }
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> DatasetResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| cache_err(parent, e))?;
    }

    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    tokio::fs::write(&partial, bytes)
        .await
        .map_err(|e| cache_err(&partial, e))?;
    tokio::fs::rename(&partial, path)
        .await
        .map_err(|e| cache_err(path, e))
}

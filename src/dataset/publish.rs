//! Publishing a split dataset back to the hub.
//!
//! # Responsibilities
//! - Map records to `{data_dir}/{split}/{label}/{file_name}`
//! - Group them into commit-sized batches
//! - Upload one batch per commit
//!
//! # Design Decisions
//! - A batch is the unit of work handed to the retry wrapper; batches that
//!   already landed are not re-sent when a later one fails
//! - File contents are read from the cache only when their batch is committed
//! - Planning fails if two records land on the same destination path, since
//!   the later commit would silently overwrite the earlier file

use std::collections::HashMap;

use crate::config::schema::PublishConfig;
use crate::dataset::types::{DatasetDict, DatasetError, DatasetResult, ImageRecord};
use crate::hub::{Commit, CommitFile, CommitInfo, HubClient};

/// One file scheduled for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpload<'d> {
    /// Destination path in the target repository.
    pub path_in_repo: String,
    pub record: &'d ImageRecord,
}

/// A group of uploads committed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadBatch<'d> {
    pub split: String,
    /// 1-based position of this batch within its split.
    pub index: usize,
    /// Number of batches in this split.
    pub of: usize,
    pub uploads: Vec<PlannedUpload<'d>>,
}

/// Totals reported after publishing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub files: usize,
    pub commits: Vec<CommitInfo>,
}

/// Uploads dataset splits in imagefolder layout.
pub struct DatasetPublisher<'a> {
    client: &'a HubClient,
    config: &'a PublishConfig,
}

impl<'a> DatasetPublisher<'a> {
    pub fn new(client: &'a HubClient, config: &'a PublishConfig) -> Self {
        Self { client, config }
    }

    /// Lay out every record of every split and cut the result into batches.
    pub fn plan<'d>(&self, dict: &'d DatasetDict) -> DatasetResult<Vec<UploadBatch<'d>>> {
        let data_dir = self.config.data_dir.trim_matches('/');
        let batch_size = self.config.batch_size.max(1);
        let mut batches = Vec::new();
        let mut claimed: HashMap<String, &'d str> = HashMap::new();

        for (split, dataset) in &dict.splits {
            let uploads: Vec<_> = dataset
                .records
                .iter()
                .map(|record| {
                    let path_in_repo = match dataset.label_name(record) {
                        Some(label) => format!("{}/{}/{}/{}", data_dir, split, label, record.file_name),
                        None => format!("{}/{}/{}", data_dir, split, record.file_name),
                    };
                    PlannedUpload { path_in_repo, record }
                })
                .collect();

            for upload in &uploads {
                if let Some(first) = claimed.insert(upload.path_in_repo.clone(), &upload.record.path) {
                    return Err(DatasetError::DuplicatePath {
                        path: upload.path_in_repo.clone(),
                        first: first.to_string(),
                        second: upload.record.path.clone(),
                    });
                }
            }

            let of = uploads.len().div_ceil(batch_size);
            for (i, chunk) in uploads.chunks(batch_size).enumerate() {
                batches.push(UploadBatch {
                    split: split.clone(),
                    index: i + 1,
                    of,
                    uploads: chunk.to_vec(),
                });
            }
        }

        Ok(batches)
    }

    /// Commit one batch.
    pub async fn publish_batch(&self, batch: &UploadBatch<'_>) -> DatasetResult<CommitInfo> {
        let mut files = Vec::with_capacity(batch.uploads.len());
        for upload in &batch.uploads {
            let local = &upload.record.local_path;
            let content = tokio::fs::read(local).await.map_err(|source| DatasetError::Cache {
                path: local.clone(),
                source,
            })?;
            files.push(CommitFile {
                path: upload.path_in_repo.clone(),
                content,
            });
        }

        let commit = Commit {
            summary: format!(
                "{} ({} {}/{})",
                self.config.commit_message, batch.split, batch.index, batch.of
            ),
            description: format!("{} files", files.len()),
            files,
        };

        let info = self
            .client
            .create_commit(&self.config.repo, &self.config.revision, &commit)
            .await?;

        tracing::info!(
            repo = %self.config.repo,
            split = %batch.split,
            batch = batch.index,
            of = batch.of,
            files = batch.uploads.len(),
            commit = %info.commit_oid,
            "Batch published"
        );
        Ok(info)
    }
}

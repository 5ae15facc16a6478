use chrono::{DateTime, Local, TimeZone};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::db_dump::SnapshotProducer;
use super::s3_upload::ArchiveUploader;
use crate::config::AppConfig;
use crate::errors::{CycleFailure, SnapshotError, UploadError};

/// Sortable, second-resolution, filesystem-safe.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// One cycle's dump: where it lives locally and where it goes remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotArtifact {
    pub label: String,
    pub local_path: PathBuf,
    pub remote_key: String,
}

impl SnapshotArtifact {
    pub fn new<Tz: TimeZone>(at: &DateTime<Tz>, dump_dir: &Path, prefix: &str) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        let label = at.format(TIMESTAMP_FORMAT).to_string();
        let file_name = format!("dump-{}.rdb", label);
        Self {
            local_path: dump_dir.join(&file_name),
            remote_key: format!("{}/{}", prefix, file_name),
            label,
        }
    }
}

#[derive(Debug)]
pub enum CycleOutcome {
    Success { key: String },
    Failed(CycleFailure),
}

impl CycleOutcome {
    #[cfg(test)]
    pub fn is_success(&self) -> bool {
        matches!(self, CycleOutcome::Success { .. })
    }
}

/// Runs snapshot -> upload -> cleanup, one step after the other.
pub struct BackupOrchestrator<P, U> {
    config: AppConfig,
    producer: P,
    uploader: U,
}

impl<P: SnapshotProducer, U: ArchiveUploader> BackupOrchestrator<P, U> {
    pub fn new(config: AppConfig, producer: P, uploader: U) -> Self {
        Self {
            config,
            producer,
            uploader,
        }
    }

    pub async fn run_cycle(&self) -> CycleOutcome {
        self.run_cycle_at(&Local::now()).await
    }

    /// Runs one cycle labelled with `at`. Failures are logged and returned, never propagated.
    pub async fn run_cycle_at<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> CycleOutcome
    where
        Tz::Offset: std::fmt::Display,
    {
        let artifact = SnapshotArtifact::new(at, &self.config.dump_dir, &self.config.storage.folder_prefix);
        debug!(label = %artifact.label, path = %artifact.local_path.display(), "Starting backup cycle");

        if let Err(e) = self.producer.produce(&artifact.local_path).await {
            error!(path = %artifact.local_path.display(), "Backup failed: {}", e);
            self.discard_partial_dump(&artifact.local_path, &e).await;
            return CycleOutcome::Failed(e.into());
        }

        let upload = match self.config.storage.bucket_name.as_deref() {
            Some(bucket) => {
                self.uploader
                    .upload(&artifact.local_path, bucket, &artifact.remote_key)
                    .await
            }
            None => Err(UploadError::MissingBucket),
        };
        if let Err(e) = upload {
            // The dump stays on disk so it can be recovered by hand.
            error!(
                path = %artifact.local_path.display(),
                "Backup failed: {}. Local dump retained.",
                e
            );
            return CycleOutcome::Failed(e.into());
        }

        if let Err(e) = tokio::fs::remove_file(&artifact.local_path).await {
            warn!(path = %artifact.local_path.display(), "Failed to remove local dump after upload: {}", e);
        }
        info!(key = %artifact.remote_key, "Backup completed successfully");
        CycleOutcome::Success {
            key: artifact.remote_key,
        }
    }

    async fn discard_partial_dump(&self, path: &Path, cause: &SnapshotError) {
        // Never touch a file that was already there before this cycle.
        if matches!(cause, SnapshotError::DestinationExists(_)) {
            return;
        }
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            match tokio::fs::remove_file(path).await {
                Ok(()) => info!(path = %path.display(), "Removed partial dump"),
                Err(e) => warn!(path = %path.display(), "Failed to remove partial dump: {}", e),
            }
        }
    }
}

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Failure of the dump step.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("dump destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("redis-cli exited with {status}: {stderr}")]
    Command { status: ExitStatus, stderr: String },

    #[error("redis-cli reported success but no dump was written to {}", .0.display())]
    MissingOutput(PathBuf),
}

/// Failure of the upload step.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("no destination bucket configured (set S3_BUCKET)")]
    MissingBucket,

    #[error("failed to read {}: {message}", .path.display())]
    Read { path: PathBuf, message: String },

    #[error("S3 upload of s3://{bucket}/{key} failed: {message}")]
    S3Sdk { bucket: String, key: String, message: String },
}

/// Reason a backup cycle was abandoned.
#[derive(Error, Debug)]
pub enum CycleFailure {
    #[error("snapshot failed: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("upload failed: {0}")]
    Upload(#[from] UploadError),
}

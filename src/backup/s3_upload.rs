// redis-s3-backup/src/backup/s3_upload.rs
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::config::Region;
use s3::primitives::ByteStream;
use std::path::Path;
use tracing::info;

use crate::config::StorageConfig;
use crate::errors::UploadError;

/// Transfers a local file to object storage.
#[async_trait]
pub trait ArchiveUploader: Send + Sync {
    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<(), UploadError>;
}

/// Uploads to S3 or any S3-compatible service.
#[derive(Debug, Clone)]
pub struct S3Uploader {
    client: s3::Client,
}

impl S3Uploader {
    pub async fn from_config(storage: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(s3::config::BehaviorVersion::latest())
            .region(Region::new(storage.region.clone()));

        if let Some(endpoint) = &storage.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        if let Some(credentials) = &storage.credentials {
            loader = loader.credentials_provider(s3::config::Credentials::new(
                &credentials.access_key_id,
                &credentials.secret_access_key,
                None, // session_token
                None, // expiry
                "Static", // provider_name
            ));
        }

        let sdk_config = loader.load().await;

        // Custom endpoints (MinIO and friends) rarely support virtual-hosted buckets.
        let s3_config = s3::config::Builder::from(&sdk_config)
            .force_path_style(storage.endpoint_url.is_some())
            .build();

        Self {
            client: s3::Client::from_conf(s3_config),
        }
    }
}

#[async_trait]
impl ArchiveUploader for S3Uploader {
    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<(), UploadError> {
        info!("Uploading to s3://{}/{}", bucket, key);

        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| UploadError::Read {
                path: local_path.to_path_buf(),
                message: e.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| UploadError::S3Sdk {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: s3::error::DisplayErrorContext(&e).to_string(),
            })?;

        info!(
            path = %local_path.display(),
            "Successfully uploaded to s3://{}/{}",
            bucket,
            key
        );
        Ok(())
    }
}

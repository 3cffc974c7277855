//! S3 client implementation.

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};
use transcode_models::ObjectLocation;

use crate::error::{StorageError, StorageResult};

/// Moves whole files between the local disk and object storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download `location` to `path`, creating parent directories.
    async fn download_file(&self, location: &ObjectLocation, path: &Path) -> StorageResult<u64>;

    /// Upload the file at `path` to `location`.
    async fn upload_file(
        &self,
        path: &Path,
        location: &ObjectLocation,
        content_type: &str,
    ) -> StorageResult<()>;
}

/// Configuration for the S3 client.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub region: String,
    /// S3-compatible endpoint (MinIO, LocalStack, R2)
    pub endpoint_url: Option<String>,
    /// Path-style addressing, required by most S3-compatible services
    pub force_path_style: bool,
}

impl S3Config {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            endpoint_url: None,
            force_path_style: false,
        }
    }

    /// Use a custom endpoint with path-style addressing.
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self.force_path_style = true;
        self
    }
}

/// S3-backed [`ObjectStore`]. Buckets are chosen per call.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Create a new S3 store; credentials come from the SDK default chain.
    pub async fn new(config: S3Config) -> StorageResult<Self> {
        if config.region.trim().is_empty() {
            return Err(StorageError::config_error("region is empty"));
        }

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = Builder::from(&sdk_config).force_path_style(config.force_path_style);
        if let Some(endpoint_url) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint_url);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
        })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn download_file(&self, location: &ObjectLocation, path: &Path) -> StorageResult<u64> {
        debug!("Downloading {} to {}", location, path.display());

        let response = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StorageError::not_found(location.to_string())
                } else {
                    StorageError::download_failed(DisplayErrorContext(&e).to_string())
                }
            })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut reader = response.body.into_async_read();
        let mut file = tokio::fs::File::create(path).await?;
        let bytes = tokio::io::copy(&mut reader, &mut file).await?;

        info!("Downloaded {} to {} ({} bytes)", location, path.display(), bytes);
        Ok(bytes)
    }

    async fn upload_file(
        &self,
        path: &Path,
        location: &ObjectLocation,
        content_type: &str,
    ) -> StorageResult<()> {
        debug!("Uploading {} to {}", path.display(), location);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(DisplayErrorContext(&e).to_string()))?;

        info!("Uploaded {} to {}", path.display(), location);
        Ok(())
    }
}

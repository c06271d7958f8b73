//! Image storage abstraction
//!
//! A single "store named byte blob, return retrievable URL" operation
//! behind the [`ImageStore`] trait, with two backends selected by
//! configuration:
//! - S3 object storage (AWS SDK)
//! - local filesystem (tokio::fs), served back under a URL prefix
//!
//! A storage failure for any single image fails the whole submission;
//! there is no partial-success mode. Missing configuration degrades to
//! a configuration error, not a panic.

use crate::config::StorageConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Store a named byte blob, returning its retrievable URL
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: Option<&str>) -> Result<String>;
}

/// Build the configured store. `backend` selects the strategy; an
/// unknown backend or missing required settings yields a
/// configuration error (surfaced as a 500 at the API edge).
pub async fn from_config(config: &StorageConfig) -> Result<Arc<dyn ImageStore>> {
    match config.backend.as_str() {
        "s3" => {
            let bucket = config.bucket.clone().ok_or_else(|| AppError::Configuration {
                message: "storage.bucket is required for the s3 backend".to_string(),
            })?;
            let store = S3ImageStore::new(
                bucket,
                config.region.clone(),
                config.public_base_url.clone(),
            )
            .await;
            Ok(Arc::new(store))
        }
        "local" => {
            if config.local_dir.trim().is_empty() {
                return Err(AppError::Configuration {
                    message: "storage.local_dir is required for the local backend".to_string(),
                });
            }
            Ok(Arc::new(LocalImageStore::new(
                config.local_dir.clone(),
                config.local_base_url.clone(),
            )))
        }
        other => Err(AppError::Configuration {
            message: format!("unknown storage backend: {}", other),
        }),
    }
}

/// Collision-resistant object key: millisecond timestamp + bike id +
/// sanitized original filename, matching the URL-safe character set.
pub fn image_key(now_millis: i64, bike_id: Uuid, filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!("{}-{}-{}", now_millis, bike_id, safe)
}

/// S3-backed image store
pub struct S3ImageStore {
    client: S3Client,
    bucket: String,
    region: Option<String>,
    public_base_url: Option<String>,
}

impl S3ImageStore {
    pub async fn new(
        bucket: String,
        region: Option<String>,
        public_base_url: Option<String>,
    ) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(ref region) = region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        info!(bucket = %bucket, "Using S3 image store");

        Self {
            client: S3Client::new(&sdk_config),
            bucket,
            region,
            public_base_url,
        }
    }

    fn object_url(&self, key: &str) -> String {
        match self.public_base_url {
            Some(ref base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => {
                let region = self.region.as_deref().unwrap_or("us-east-1");
                format!("https://{}.s3.{}.amazonaws.com/{}", self.bucket, region, key)
            }
        }
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: Option<&str>) -> Result<String> {
        let size = bytes.len();

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes));

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        request.send().await.map_err(|e| AppError::Storage {
            message: format!("S3 put_object failed for {}: {}", key, e),
        })?;

        debug!(key = %key, size, "Image stored to S3");

        Ok(self.object_url(key))
    }
}

/// Local-filesystem image store
pub struct LocalImageStore {
    dir: PathBuf,
    base_url: String,
}

impl LocalImageStore {
    pub fn new(dir: impl Into<PathBuf>, base_url: String) -> Self {
        Self {
            dir: dir.into(),
            base_url,
        }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: Option<&str>) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(key);
        tokio::fs::write(&path, &bytes).await?;

        debug!(path = %path.display(), size = bytes.len(), "Image stored to disk");

        Ok(format!("{}/{}", self.base_url.trim_end_matches('/'), key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_key_shape() {
        let bike_id = Uuid::nil();
        let key = image_key(1700000000000, bike_id, "front wheel.jpg");
        assert_eq!(
            key,
            "1700000000000-00000000-0000-0000-0000-000000000000-front_wheel.jpg"
        );
    }

    #[test]
    fn test_image_key_sanitizes_path_separators() {
        let key = image_key(1, Uuid::nil(), "../../etc/passwd");
        assert!(!key.contains('/'));
        assert!(key.ends_with("_.._etc_passwd"));
    }

    #[test]
    fn test_unknown_backend_is_configuration_error() {
        let config = StorageConfig {
            backend: "ftp".to_string(),
            bucket: None,
            region: None,
            public_base_url: None,
            local_dir: "uploads".to_string(),
            local_base_url: "/uploads".to_string(),
        };

        let err = tokio_test::block_on(from_config(&config)).err().unwrap();
        assert!(matches!(err, AppError::Configuration { .. }));
    }

    #[test]
    fn test_s3_backend_requires_bucket() {
        let config = StorageConfig {
            backend: "s3".to_string(),
            bucket: None,
            region: None,
            public_base_url: None,
            local_dir: "uploads".to_string(),
            local_base_url: "/uploads".to_string(),
        };

        let err = tokio_test::block_on(from_config(&config)).err().unwrap();
        assert!(matches!(err, AppError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_local_store_writes_and_shapes_url() {
        let dir = std::env::temp_dir().join(format!("moto-registry-test-{}", Uuid::new_v4()));
        let store = LocalImageStore::new(dir.clone(), "/uploads/".to_string());

        let url = store
            .put("123-abc-photo.jpg", b"jpeg bytes".to_vec(), Some("image/jpeg"))
            .await
            .unwrap();

        assert_eq!(url, "/uploads/123-abc-photo.jpg");
        let written = tokio::fs::read(dir.join("123-abc-photo.jpg")).await.unwrap();
        assert_eq!(written, b"jpeg bytes");

        tokio::fs::remove_dir_all(dir).await.unwrap();
    }
}

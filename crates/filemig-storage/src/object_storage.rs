//! S3-compatible object storage backend.
//!
//! # Design
//! - `GetObject`/`PutObject` through the AWS SDK with static credentials.
//! - Uploads send `Content-MD5`, then compare the returned `ETag` against the
//!   quoted MD5 hex digest of the payload. The comparison runs only after the
//!   service accepted the write; a mismatch fails the store.
//! - ETag verification assumes single-part uploads.
//! - A custom endpoint (MinIO and other S3-compatible services) switches to
//!   path-style addressing.
//! - SDK retries are disabled; a failed request fails the item.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{
    BehaviorVersion, Credentials, Region, RequestChecksumCalculation,
    ResponseChecksumValidation,
};
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use base64::{Engine as _, engine::general_purpose};
use filemig_config::ObjectStorageConfig;
use md5::{Digest, Md5};
use tracing::debug;

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};

const KIND: &str = "object_storage";
const CREDENTIALS_SOURCE: &str = "filemig-config";
const MAX_ERROR_BODY: usize = 512;

/// Backend storing payloads as objects in a single bucket.
#[derive(Debug, Clone)]
pub struct ObjectStorageBackend {
    client: Client,
    bucket: String,
}

impl ObjectStorageBackend {
    /// Build a backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket name is empty.
    pub fn new(config: &ObjectStorageConfig) -> StorageResult<Self> {
        if config.bucket.trim().is_empty() {
            return Err(StorageError::InvalidConfig {
                field: "bucket",
                reason: "must not be empty",
                value: None,
            });
        }
        Ok(Self::from_client(build_s3_client(config), &config.bucket))
    }

    /// Wrap an existing SDK client.
    #[must_use]
    pub fn from_client(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Bucket objects are read from and written to.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Quoted MD5 hex digest, the form S3 uses for single-part `ETag`s.
    #[must_use]
    pub fn expected_etag(payload: &[u8]) -> String {
        format!("\"{:x}\"", Md5::digest(payload))
    }

    fn content_md5(payload: &[u8]) -> String {
        general_purpose::STANDARD.encode(Md5::digest(payload))
    }
}

fn build_s3_client(config: &ObjectStorageConfig) -> Client {
    let credentials = Credentials::new(
        config.access_key_id.clone(),
        config.secret_access_key.clone(),
        None,
        None,
        CREDENTIALS_SOURCE,
    );
    let mut builder = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(config.region_or_default().to_string()))
        .credentials_provider(credentials)
        .retry_config(RetryConfig::disabled())
        .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
        .response_checksum_validation(ResponseChecksumValidation::WhenRequired);
    if let Some(endpoint) = &config.endpoint {
        builder = builder.endpoint_url(endpoint).force_path_style(true);
    }
    Client::from_conf(builder.build())
}

fn ensure_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::invalid_path(key, "empty"));
    }
    Ok(())
}

#[async_trait]
impl StorageBackend for ObjectStorageBackend {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn fetch(&self, path: &str) -> StorageResult<Vec<u8>> {
        let operation = "object_storage.get";
        ensure_key(path)?;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|err| sdk_error(operation, path, err))?;

        let payload = output
            .body
            .collect()
            .await
            .map_err(|source| StorageError::Transport {
                operation,
                key: path.to_string(),
                source: Box::new(source),
            })?
            .into_bytes();
        debug!(bucket = %self.bucket, key = path, bytes = payload.len(), "fetched object");
        Ok(payload.to_vec())
    }

    async fn store(&self, path: &str, payload: &[u8]) -> StorageResult<()> {
        let operation = "object_storage.put";
        ensure_key(path)?;
        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .content_md5(Self::content_md5(payload))
            .content_type("application/octet-stream")
            .body(ByteStream::from(payload.to_vec()))
            .send()
            .await
            .map_err(|err| sdk_error(operation, path, err))?;

        let expected = Self::expected_etag(payload);
        match output.e_tag() {
            Some(etag) if etag.eq_ignore_ascii_case(&expected) => {
                debug!(bucket = %self.bucket, key = path, bytes = payload.len(), "stored object");
                Ok(())
            }
            actual => Err(StorageError::IntegrityMismatch {
                path: path.to_string(),
                expected,
                actual: actual.map(str::to_string),
            }),
        }
    }
}

/// Service answers keep their HTTP status and the start of the body; every
/// other SDK failure is a transport error.
fn sdk_error<E>(operation: &'static str, key: &str, err: SdkError<E, HttpResponse>) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    match err {
        SdkError::ServiceError(context) => {
            let raw = context.raw();
            let status = raw.status().as_u16();
            if status == 404 {
                return StorageError::NotFound {
                    backend: KIND,
                    path: key.to_string(),
                };
            }
            let body = raw
                .body()
                .bytes()
                .map(|bytes| {
                    String::from_utf8_lossy(bytes)
                        .chars()
                        .take(MAX_ERROR_BODY)
                        .collect::<String>()
                })
                .filter(|text| !text.is_empty());
            StorageError::Status {
                operation,
                key: key.to_string(),
                status,
                body,
            }
        }
        other => StorageError::Transport {
            operation,
            key: key.to_string(),
            source: Box::new(other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(bucket: &str, endpoint: Option<&str>) -> ObjectStorageConfig {
        ObjectStorageConfig {
            access_key_id: "AKID".to_string(),
            secret_access_key: "secret".to_string(),
            region: Some("us-west-2".to_string()),
            bucket: bucket.to_string(),
            endpoint: endpoint.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn builds_for_aws_and_custom_endpoints() -> StorageResult<()> {
        let aws = ObjectStorageBackend::new(&config("some-bucket", None))?;
        assert_eq!(aws.bucket(), "some-bucket");
        assert_eq!(
            aws.client.config().region().map(ToString::to_string).as_deref(),
            Some("us-west-2")
        );

        let minio =
            ObjectStorageBackend::new(&config("some-bucket", Some("http://127.0.0.1:9000")))?;
        assert_eq!(minio.kind(), "object_storage");
        Ok(())
    }

    #[tokio::test]
    async fn empty_bucket_and_key_are_rejected() -> StorageResult<()> {
        assert!(matches!(
            ObjectStorageBackend::new(&config(" ", None)),
            Err(StorageError::InvalidConfig { field: "bucket", .. })
        ));
        let backend = ObjectStorageBackend::new(&config("b", Some("http://127.0.0.1:9")))?;
        assert!(matches!(
            backend.fetch("").await,
            Err(StorageError::InvalidPath { .. })
        ));
        assert!(matches!(
            backend.store("", b"x").await,
            Err(StorageError::InvalidPath { .. })
        ));
        Ok(())
    }

    #[test]
    fn digests_match_s3_conventions() {
        assert_eq!(
            ObjectStorageBackend::expected_etag(b"somefiledata"),
            "\"ff5932086d0c4612f0c9b98f4ab6f4d5\""
        );
        assert_eq!(
            ObjectStorageBackend::content_md5(b"somefiledata"),
            "/1kyCG0MRhLwybmPSrb01Q=="
        );
    }
}

//! Artifact storage for audit reports.
//!
//! Reports are written once under a key derived from the audited URL and the
//! upload time, then served from their public URL. Supports both AWS S3 and
//! MinIO for development.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use tracing::info;

use crate::config::StorageSettings;
use crate::error::{AppError, AppResult};

/// Write-once blob store returning a retrievable URL per object.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `data` under `key` and return its public URL.
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> AppResult<String>;
}

/// The two report renderings a worker uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    HtmlReport,
    JsonReport,
}

impl ArtifactKind {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::HtmlReport => "html",
            Self::JsonReport => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::HtmlReport => "text/html",
            Self::JsonReport => "application/json",
        }
    }
}

/// Flatten a URL into a key-safe token: ASCII alphanumerics kept, everything
/// else `_`, lowercased.
pub fn sanitize_url(url: &str) -> String {
    url.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Build the object key for one report.
///
/// # Returns
/// S3 key in format: {category}/{sanitized-url}_{epoch-millis}.{ext}
pub fn artifact_key(category: &str, url: &str, epoch_millis: i64, kind: ArtifactKind) -> String {
    format!(
        "{}/{}_{}.{}",
        category,
        sanitize_url(url),
        epoch_millis,
        kind.extension()
    )
}

/// S3 storage client wrapper.
#[derive(Clone)]
pub struct S3ArtifactStore {
    client: Client,
    bucket: String,
    endpoint: Option<String>,
}

impl S3ArtifactStore {
    /// Create a new S3 storage client from configuration.
    ///
    /// No request is made; an unreachable store surfaces on the first upload.
    pub fn new(config: &StorageSettings) -> Self {
        let credentials =
            Credentials::new(&config.access_key, &config.secret_key, None, None, "perfprobe");

        let region = Region::new(config.region.clone());

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(region)
            .credentials_provider(credentials);

        // MinIO needs path-style addressing on its custom endpoint
        if let Some(ref endpoint) = config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint).force_path_style(true);
        }

        info!(
            bucket = %config.bucket,
            endpoint = config.endpoint.as_deref().unwrap_or("aws"),
            "S3 artifact store configured"
        );

        Self {
            client: Client::from_conf(s3_config_builder.build()),
            bucket: config.bucket.clone(),
            endpoint: config.endpoint.clone(),
        }
    }

    /// Ensure the bucket exists, creating it if necessary.
    pub async fn ensure_bucket_exists(&self) -> AppResult<()> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(()),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    info!("Creating S3 bucket '{}'", self.bucket);
                    self.client
                        .create_bucket()
                        .bucket(&self.bucket)
                        .send()
                        .await
                        .map_err(|e| {
                            AppError::Storage(format!("Failed to create bucket: {}", e))
                        })?;
                    Ok(())
                } else {
                    Err(AppError::Storage(format!(
                        "Failed to access bucket '{}': {}",
                        self.bucket, service_error
                    )))
                }
            }
        }
    }

    /// Public URL of an object in this store.
    pub fn public_url(&self, key: &str) -> String {
        public_url(&self.bucket, self.endpoint.as_deref(), key)
    }
}

fn public_url(bucket: &str, endpoint: Option<&str>, key: &str) -> String {
    match endpoint {
        Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key),
        None => format!("https://{}.s3.amazonaws.com/{}", bucket, key),
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> AppResult<String> {
        let body = aws_sdk_s3::primitives::ByteStream::from(data);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                AppError::Storage(format!(
                    "Failed to upload '{}' to S3: {}",
                    key,
                    e.into_service_error()
                ))
            })?;

        Ok(self.public_url(key))
    }
}

/// Artifact store kept in memory, for tests and local runs without S3.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    objects: Mutex<HashMap<String, (String, Vec<u8>)>>,
}

impl MemoryArtifactStore {
    pub const BUCKET: &'static str = "memory";

    pub fn new() -> Self {
        Self::default()
    }

    /// Content type and bytes stored under `key`.
    pub fn get(&self, key: &str) -> Option<(String, Vec<u8>)> {
        self.objects.lock().ok()?.get(key).cloned()
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> AppResult<String> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| AppError::Storage("Artifact store lock poisoned".to_string()))?;
        if objects.contains_key(key) {
            return Err(AppError::Storage(format!("Artifact '{}' already exists", key)));
        }
        objects.insert(key.to_string(), (content_type.to_string(), data));
        Ok(public_url(Self::BUCKET, None, key))
    }
}

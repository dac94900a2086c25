//! Snapshot sinks
//!
//! Every writer receives the identical serialized snapshot. Paths and keys
//! are writer configuration.

use async_trait::async_trait;
use axum::body::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use std::path::PathBuf;
use std::sync::Arc;
use ticker_common::config::ObjectStoreConfig;
use ticker_common::symbols::whitelist_json;
use ticker_common::{Result, TickerError};
use tokio::sync::RwLock;
use tracing::info;

const RATES_FILE: &str = "rates";
const WHITELIST_FILE: &str = "whitelist";

#[async_trait]
pub trait SnapshotWriter: Send + Sync {
    fn name(&self) -> &str;

    async fn write(&self, snapshot: &[u8]) -> Result<()>;
}

/// Publishes `rates` and the `whitelist` artifact into a local directory
pub struct FileSystemWriter {
    out_dir: PathBuf,
}

impl FileSystemWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    async fn write_file(&self, file: &str, data: &[u8]) -> Result<()> {
        let path = self.out_dir.join(file);
        tokio::fs::write(&path, data)
            .await
            .map_err(|source| TickerError::Writer {
                sink: format!("file_system.{}", file),
                source,
            })?;
        info!(path = %path.display(), bytes = data.len(), "wrote {}", file);
        Ok(())
    }
}

#[async_trait]
impl SnapshotWriter for FileSystemWriter {
    fn name(&self) -> &str {
        "file_system"
    }

    async fn write(&self, snapshot: &[u8]) -> Result<()> {
        self.write_file(RATES_FILE, snapshot).await?;
        self.write_file(WHITELIST_FILE, &whitelist_json()?).await
    }
}

/// Uploads `rates` and `whitelist` as JSON objects to a bucket
pub struct ObjectStoreWriter {
    store: Arc<dyn ObjectStore>,
    location: String,
}

impl ObjectStoreWriter {
    pub fn new(store: Arc<dyn ObjectStore>, location: impl Into<String>) -> Self {
        Self {
            store,
            location: location.into(),
        }
    }

    /// S3 bucket from config; credentials come from the usual `AWS_*` variables
    pub fn s3(config: &ObjectStoreConfig) -> Result<Self> {
        let location = format!("s3://{}", config.bucket);
        let store = AmazonS3Builder::from_env()
            .with_region(config.region.as_str())
            .with_bucket_name(config.bucket.as_str())
            .build()
            .map_err(|e| TickerError::Upload {
                sink: location.clone(),
                source: Box::new(e),
            })?;
        Ok(Self::new(Arc::new(store), location))
    }

    async fn put_json(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let bytes = data.len();
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, "application/json".into());
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        self.store
            .put_opts(&ObjectPath::from(key), PutPayload::from(data), options)
            .await
            .map_err(|e| TickerError::Upload {
                sink: format!("{}/{}", self.location, key),
                source: Box::new(e),
            })?;
        info!(location = %self.location, key, bytes, "uploaded object");
        Ok(())
    }
}

#[async_trait]
impl SnapshotWriter for ObjectStoreWriter {
    fn name(&self) -> &str {
        "object_store"
    }

    async fn write(&self, snapshot: &[u8]) -> Result<()> {
        self.put_json(RATES_FILE, snapshot.to_vec()).await?;
        self.put_json(WHITELIST_FILE, whitelist_json()?).await
    }
}

/// Latest published snapshot, read by the HTTP server
#[derive(Clone)]
pub struct SnapshotCache {
    latest: Arc<RwLock<Bytes>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self {
            latest: Arc::new(RwLock::new(Bytes::from_static(b"{}"))),
        }
    }

    pub async fn latest(&self) -> Bytes {
        self.latest.read().await.clone()
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotWriter for SnapshotCache {
    fn name(&self) -> &str {
        "memory"
    }

    async fn write(&self, snapshot: &[u8]) -> Result<()> {
        *self.latest.write().await = Bytes::copy_from_slice(snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    #[tokio::test]
    async fn test_file_writer_publishes_rates_and_whitelist() {
        // Given
        let dir = tempfile::tempdir().unwrap();
        let writer = FileSystemWriter::new(dir.path());

        // When
        writer.write(br#"{"BTC":{}}"#).await.unwrap();

        // Then
        let rates = std::fs::read(dir.path().join("rates")).unwrap();
        let whitelist = std::fs::read(dir.path().join("whitelist")).unwrap();
        assert_eq!(rates, br#"{"BTC":{}}"#);
        assert_eq!(whitelist, whitelist_json().unwrap());
    }

    #[tokio::test]
    async fn test_file_writer_reports_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FileSystemWriter::new(dir.path().join("does-not-exist"));

        let err = writer.write(b"{}").await.unwrap_err();

        assert!(matches!(err, TickerError::Writer { ref sink, .. } if sink == "file_system.rates"));
    }

    #[tokio::test]
    async fn test_object_store_writer_uploads_rates_and_whitelist() {
        // Given
        let store = Arc::new(InMemory::new());
        let writer = ObjectStoreWriter::new(store.clone(), "memory://rates-bucket");

        // When
        writer.write(br#"{"USD":{}}"#).await.unwrap();

        // Then
        let rates = store.get(&ObjectPath::from("rates")).await.unwrap().bytes().await.unwrap();
        let whitelist = store.get(&ObjectPath::from("whitelist")).await.unwrap().bytes().await.unwrap();
        assert_eq!(&rates[..], br#"{"USD":{}}"#);
        assert_eq!(whitelist.to_vec(), whitelist_json().unwrap());
    }

    #[tokio::test]
    async fn test_object_store_writer_replaces_previous_upload() {
        let store = Arc::new(InMemory::new());
        let writer = ObjectStoreWriter::new(store.clone(), "memory://rates-bucket");

        writer.write(b"{\"v\":1}").await.unwrap();
        writer.write(b"{\"v\":2}").await.unwrap();

        let rates = store.get(&ObjectPath::from("rates")).await.unwrap().bytes().await.unwrap();
        assert_eq!(&rates[..], b"{\"v\":2}");
    }

    #[test]
    fn test_s3_writer_builds_from_bucket_config() {
        let config = ObjectStoreConfig {
            region: "eu-west-1".to_string(),
            bucket: "rates-bucket".to_string(),
        };

        let writer = ObjectStoreWriter::s3(&config).unwrap();

        assert_eq!(writer.name(), "object_store");
        assert_eq!(writer.location, "s3://rates-bucket");
    }

    #[tokio::test]
    async fn test_cache_serves_latest_write() {
        let cache = SnapshotCache::new();
        assert_eq!(cache.latest().await, Bytes::from_static(b"{}"));

        cache.write(b"{\"USD\":1}").await.unwrap();
        let reader = cache.clone();

        assert_eq!(reader.latest().await, Bytes::from_static(b"{\"USD\":1}"));
    }
}

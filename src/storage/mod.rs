// Storage layer (S3-compatible)

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use tracing::info;

use crate::config::StorageConfig;
use crate::types::{AppError, AppResult};

pub mod cursor;
pub mod memory;
pub mod pagination;
pub mod s3_client;

pub use memory::MemoryStore;
pub use pagination::list_objects;
pub use s3_client::S3Store;

/// Largest page a single native list call returns (S3 `MaxKeys` ceiling).
pub const NATIVE_MAX_KEYS: usize = 1_000;

/// Metadata for one stored object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub content_type: Option<String>,
}

/// An object's metadata plus its body as a byte stream.
pub struct ObjectBody {
    pub meta: ObjectMeta,
    pub stream: BoxStream<'static, AppResult<Bytes>>,
}

/// One page of a listing. `next_token` is set iff more records follow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPage {
    pub records: Vec<ObjectMeta>,
    pub next_token: Option<String>,
}

/// Key/value blob store with prefix listing.
///
/// Continuation tokens are issued by the implementation and must be handed
/// back unchanged; a token already carries the prefix it was issued for.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;

    /// Most records one `list_page` call will return.
    fn native_page_size(&self) -> usize {
        NATIVE_MAX_KEYS
    }

    async fn exists(&self, key: &str) -> AppResult<bool>;

    async fn head(&self, key: &str) -> AppResult<ObjectMeta>;

    async fn get(&self, key: &str) -> AppResult<ObjectBody>;

    /// Write `data` under `key`, replacing any existing object.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> AppResult<()>;

    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Fetch a single native page of at most `max_keys` records.
    /// `prefix` is ignored when `continuation_token` is given.
    async fn list_page(
        &self,
        prefix: Option<&str>,
        max_keys: usize,
        continuation_token: Option<&str>,
    ) -> AppResult<ListingPage>;
}

/// Build the store named by `STORAGE_PROVIDER`.
pub fn from_config(config: &StorageConfig) -> AppResult<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match config.provider.as_str() {
        "s3" => Arc::new(S3Store::new(config)?),
        "memory" => Arc::new(MemoryStore::new()),
        other => {
            return Err(AppError::Internal(format!(
                "Unsupported storage provider: {}",
                other
            )))
        }
    };

    info!(provider = store.name(), bucket = %config.s3_bucket_name, "Object store ready");
    Ok(store)
}

// In-process object store, ordered by key like S3

use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio::sync::RwLock;

use super::cursor::StoreCursor;
use super::{ListingPage, ObjectBody, ObjectMeta, ObjectStore, NATIVE_MAX_KEYS};
use crate::types::{AppError, AppResult};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    last_modified: DateTime<Utc>,
}

impl StoredObject {
    fn meta(&self, key: &str) -> ObjectMeta {
        ObjectMeta {
            key: key.to_string(),
            size: self.data.len() as u64,
            last_modified: self.last_modified,
            content_type: Some(self.content_type.clone()),
        }
    }
}

/// Map-backed store for tests and `STORAGE_PROVIDER=memory`.
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    native_page_size: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(NATIVE_MAX_KEYS)
    }

    /// Cap each native list call, to exercise multi-page listings.
    pub fn with_page_size(native_page_size: usize) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            native_page_size: native_page_size.max(1),
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn native_page_size(&self) -> usize {
        self.native_page_size
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn head(&self, key: &str) -> AppResult<ObjectMeta> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|object| object.meta(key))
            .ok_or_else(|| AppError::NotFound(key.to_string()))
    }

    async fn get(&self, key: &str) -> AppResult<ObjectBody> {
        let objects = self.objects.read().await;
        let object = objects
            .get(key)
            .ok_or_else(|| AppError::NotFound(key.to_string()))?;

        Ok(ObjectBody {
            meta: object.meta(key),
            stream: stream::once(futures::future::ready(Ok(object.data.clone()))).boxed(),
        })
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> AppResult<()> {
        let object = StoredObject {
            data,
            content_type: content_type.to_string(),
            last_modified: Utc::now(),
        };
        self.objects.write().await.insert(key.to_string(), object);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn list_page(
        &self,
        prefix: Option<&str>,
        max_keys: usize,
        continuation_token: Option<&str>,
    ) -> AppResult<ListingPage> {
        let (prefix, lower) = match continuation_token {
            Some(token) => {
                let cursor = StoreCursor::decode(token)?;
                (cursor.prefix, Bound::Excluded(cursor.position))
            }
            None => {
                let prefix = prefix.map(str::to_owned);
                let lower = prefix.clone().map_or(Bound::Unbounded, Bound::Included);
                (prefix, lower)
            }
        };
        let limit = max_keys.min(self.native_page_size);

        // keys under a prefix are contiguous in the map
        let objects = self.objects.read().await;
        let mut matching = objects
            .range::<String, _>((lower, Bound::Unbounded))
            .take_while(|(key, _)| prefix.as_deref().map_or(true, |p| key.starts_with(p)));

        let records: Vec<ObjectMeta> = matching
            .by_ref()
            .take(limit)
            .map(|(key, object)| object.meta(key))
            .collect();

        let next_token = match (records.last(), matching.next()) {
            (Some(last), Some(_)) => Some(StoreCursor::new(prefix.as_deref(), &last.key).encode()?),
            _ => None,
        };

        Ok(ListingPage {
            records,
            next_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    async fn seeded(keys: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        for key in keys {
            store
                .put(key, Bytes::from_static(b"Hello, world!"), "text/plain")
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_exists_tracks_put_and_delete() {
        let store = MemoryStore::new();
        assert!(!store.exists("test.txt").await.unwrap());

        store
            .put("test.txt", Bytes::from_static(b"Hello"), "text/plain")
            .await
            .unwrap();
        assert!(store.exists("test.txt").await.unwrap());

        store.delete("test.txt").await.unwrap();
        assert!(!store.exists("test.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_returns_content_and_type() {
        let store = MemoryStore::new();
        store
            .put("a/b.json", Bytes::from_static(b"{}"), "application/json")
            .await
            .unwrap();

        let object = store.get("a/b.json").await.unwrap();
        assert_eq!(object.meta.content_type.as_deref(), Some("application/json"));
        assert_eq!(object.meta.size, 2);

        let chunks: Vec<Bytes> = object.stream.try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"{}");
    }

    #[tokio::test]
    async fn test_list_page_orders_and_truncates() {
        let store = seeded(&["test3.txt", "test0.txt", "test2.txt", "test1.txt", "test4.txt"]).await;

        let page = store.list_page(None, 3, None).await.unwrap();
        let keys: Vec<_> = page.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["test0.txt", "test1.txt", "test2.txt"]);
        assert!(page.next_token.is_some());

        let rest = store
            .list_page(None, 3, page.next_token.as_deref())
            .await
            .unwrap();
        let keys: Vec<_> = rest.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["test3.txt", "test4.txt"]);
        assert!(rest.next_token.is_none());
    }

    #[tokio::test]
    async fn test_exact_fit_has_no_token() {
        let store = seeded(&["a.txt", "b.txt"]).await;
        let page = store.list_page(None, 2, None).await.unwrap();
        assert_eq!(page.records.len(), 2);
        assert!(page.next_token.is_none());
    }

    #[tokio::test]
    async fn test_token_remembers_prefix() {
        let store = seeded(&["docs/1.txt", "docs/2.txt", "docs/3.txt", "images/1.png"]).await;

        let first = store.list_page(Some("docs/"), 2, None).await.unwrap();
        assert_eq!(first.records.len(), 2);

        // the prefix argument is ignored once a token is supplied
        let second = store
            .list_page(None, 10, first.next_token.as_deref())
            .await
            .unwrap();
        let keys: Vec<_> = second.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["docs/3.txt"]);
        assert!(second.next_token.is_none());
    }

    #[tokio::test]
    async fn test_native_page_size_caps_each_call() {
        let store = MemoryStore::with_page_size(2);
        for i in 0..5 {
            store
                .put(&format!("f{}.txt", i), Bytes::new(), "text/plain")
                .await
                .unwrap();
        }

        let page = store.list_page(None, 100, None).await.unwrap();
        assert_eq!(page.records.len(), 2);
        assert!(page.next_token.is_some());
    }

    #[tokio::test]
    async fn test_prefix_listing_skips_neighbours() {
        let store = seeded(&["a/1.txt", "b/1.txt", "b/2.txt", "b0.txt", "c/1.txt"]).await;

        let page = store.list_page(Some("b/"), 10, None).await.unwrap();
        let keys: Vec<_> = page.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["b/1.txt", "b/2.txt"]);
        assert!(page.next_token.is_none());

        let first = store.list_page(Some("b/"), 1, None).await.unwrap();
        assert!(first.next_token.is_some());
        let rest = store
            .list_page(None, 10, first.next_token.as_deref())
            .await
            .unwrap();
        let keys: Vec<_> = rest.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["b/2.txt"]);
        assert!(rest.next_token.is_none());

        let none = store.list_page(Some("z/"), 10, None).await.unwrap();
        assert!(none.records.is_empty());
    }
}

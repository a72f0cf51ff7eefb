//! In-memory object store.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, trace};

use super::conditional::body_permitted;
use super::{GetOptions, HttpMetadata, ObjectStore, StoredObject, clamp_range, compute_etag};
use crate::error::GatewayResult;

#[derive(Debug, Clone)]
struct Entry {
    data: Bytes,
    etag: String,
    last_modified: DateTime<Utc>,
    http_metadata: HttpMetadata,
}

impl Entry {
    fn describe(&self, key: &str) -> StoredObject {
        StoredObject {
            key: key.to_owned(),
            size: self.data.len() as u64,
            etag: self.etag.clone(),
            last_modified: self.last_modified,
            http_metadata: self.http_metadata.clone(),
            body: None,
            range: None,
        }
    }
}

/// Object store keeping every object in a concurrent map.
///
/// Contents are lost when the process exits.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use imgbucket_core::store::{GetOptions, HttpMetadata, MemoryStore, ObjectStore};
///
/// # tokio_test::block_on(async {
/// let store = MemoryStore::new();
/// store
///     .put("hello.png", Bytes::from("hello"), HttpMetadata::with_content_type("image/png"))
///     .await
///     .unwrap();
///
/// let obj = store.get("hello.png", GetOptions::default()).await.unwrap().unwrap();
/// assert_eq!(obj.body.unwrap().as_ref(), b"hello");
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: DashMap<String, Entry>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        debug!("creating MemoryStore");
        Self::default()
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, key: &str, options: GetOptions) -> GatewayResult<Option<StoredObject>> {
        let Some(entry) = self.objects.get(key).map(|e| e.value().clone()) else {
            trace!(key, "object not found");
            return Ok(None);
        };

        let mut object = entry.describe(key);
        if let Some(ref headers) = options.only_if {
            if !body_permitted(headers, &entry.etag, entry.last_modified) {
                trace!(key, "precondition suppressed body");
                return Ok(Some(object));
            }
        }

        match options.range {
            Some(range) => {
                let range = clamp_range(range, object.size)?;
                // Offsets are bounded by the length of data already in memory.
                #[allow(clippy::cast_possible_truncation)]
                let (start, len) = (range.offset as usize, range.length as usize);
                object.body = Some(entry.data.slice(start..start + len));
                object.range = Some(range);
            }
            None => object.body = Some(entry.data),
        }

        Ok(Some(object))
    }

    async fn head(&self, key: &str) -> GatewayResult<Option<StoredObject>> {
        Ok(self.objects.get(key).map(|e| e.value().describe(key)))
    }

    async fn put(
        &self,
        key: &str,
        data: Bytes,
        http_metadata: HttpMetadata,
    ) -> GatewayResult<StoredObject> {
        let entry = Entry {
            etag: compute_etag(&data),
            data,
            last_modified: Utc::now(),
            http_metadata,
        };
        let object = entry.describe(key);
        trace!(key, size = object.size, "stored object");
        self.objects.insert(key.to_owned(), entry);
        Ok(object)
    }
}

//! Object store abstraction.
//!
//! The gateway never touches bytes on its own; every read and write goes
//! through an [`ObjectStore`]. Two backends ship with the crate:
//!
//! - [`MemoryStore`]: a [`DashMap`](dashmap::DashMap) keyed by object name.
//! - [`DirStore`]: a directory on disk, one data file and one JSON metadata
//!   sidecar per object.
//!
//! Both backends evaluate conditional headers themselves (see
//! [`conditional`]) and materialize byte ranges, so the router only has to
//! look at whether a body came back.

pub mod conditional;
mod dir;
mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use digest::Digest;
use http::HeaderMap;
use http::header::{self, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::GatewayResult;
use crate::range::ByteRange;

pub use dir::DirStore;
pub use memory::MemoryStore;

/// Format used for `Last-Modified` and other HTTP-date headers.
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// HTTP metadata stored alongside an object and replayed on reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpMetadata {
    /// `Content-Type`.
    pub content_type: Option<String>,
    /// `Cache-Control`.
    pub cache_control: Option<String>,
    /// `Content-Disposition`.
    pub content_disposition: Option<String>,
    /// `Content-Encoding`.
    pub content_encoding: Option<String>,
    /// `Content-Language`.
    pub content_language: Option<String>,
    /// `Expires`.
    pub expires: Option<String>,
}

impl HttpMetadata {
    /// Metadata carrying only a content type.
    pub fn with_content_type(content_type: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            ..Self::default()
        }
    }

    /// Write every present field into `headers`, skipping values that are not
    /// valid header values.
    pub fn write_headers(&self, headers: &mut HeaderMap) {
        let fields = [
            (header::CONTENT_TYPE, &self.content_type),
            (header::CACHE_CONTROL, &self.cache_control),
            (header::CONTENT_DISPOSITION, &self.content_disposition),
            (header::CONTENT_ENCODING, &self.content_encoding),
            (header::CONTENT_LANGUAGE, &self.content_language),
            (header::EXPIRES, &self.expires),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                if let Ok(hv) = HeaderValue::from_str(value) {
                    headers.insert(name, hv);
                }
            }
        }
    }
}

/// Options for [`ObjectStore::get`].
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    /// Byte range to materialize instead of the whole object.
    pub range: Option<ByteRange>,
    /// Request headers carrying `If-Match`, `If-None-Match`,
    /// `If-Modified-Since` and `If-Unmodified-Since`.
    pub only_if: Option<HeaderMap>,
}

/// An object as returned by the store.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Object key.
    pub key: String,
    /// Full object size in bytes.
    pub size: u64,
    /// Unquoted ETag (hex MD5 of the content).
    pub etag: String,
    /// Time of the last write.
    pub last_modified: DateTime<Utc>,
    /// Replayed HTTP metadata.
    pub http_metadata: HttpMetadata,
    /// Materialized body. `None` for `head` results and when a precondition
    /// suppressed the body.
    pub body: Option<Bytes>,
    /// The range actually served, after clamping to the object end.
    pub range: Option<ByteRange>,
}

impl StoredObject {
    /// The ETag in quoted form, as sent in the `ETag` header.
    #[must_use]
    pub fn http_etag(&self) -> String {
        format!("\"{}\"", self.etag)
    }

    /// Write the object's HTTP metadata and `Last-Modified` into `headers`.
    pub fn write_http_metadata(&self, headers: &mut HeaderMap) {
        self.http_metadata.write_headers(headers);
        let last_modified = self.last_modified.format(HTTP_DATE_FORMAT).to_string();
        if let Ok(hv) = HeaderValue::from_str(&last_modified) {
            headers.insert(header::LAST_MODIFIED, hv);
        }
    }

    /// `Content-Range` value for a ranged read, e.g. `bytes 0-99/2048`.
    #[must_use]
    pub fn content_range(&self) -> Option<String> {
        self.range.map(|r| {
            format!(
                "bytes {}-{}/{}",
                r.offset,
                r.end_inclusive(),
                self.size
            )
        })
    }
}

/// Key/value blob store the gateway delegates all persistence to.
///
/// Implementations must be safe to share across request tasks.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug + 'static {
    /// Fetch an object, honoring an optional range and preconditions.
    ///
    /// Returns `Ok(None)` if the key does not exist. When a precondition in
    /// [`GetOptions::only_if`] fails, the object is returned with
    /// [`StoredObject::body`] set to `None`.
    async fn get(&self, key: &str, options: GetOptions) -> GatewayResult<Option<StoredObject>>;

    /// Fetch object metadata without a body.
    async fn head(&self, key: &str) -> GatewayResult<Option<StoredObject>>;

    /// Store `data` under `key`, replacing any previous object.
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        http_metadata: HttpMetadata,
    ) -> GatewayResult<StoredObject>;
}

/// Compute the unquoted ETag for `data`.
pub(crate) fn compute_etag(data: &[u8]) -> String {
    hex::encode(md5::Md5::digest(data))
}

/// Resolve a requested range against an object of `size` bytes.
///
/// The length is clamped to the end of the object.
pub(crate) fn clamp_range(range: ByteRange, size: u64) -> GatewayResult<ByteRange> {
    if range.offset >= size {
        return Err(crate::error::GatewayError::RangeNotSatisfiable);
    }
    Ok(ByteRange {
        offset: range.offset,
        length: range.length.min(size - range.offset),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;

    fn sample(range: Option<ByteRange>) -> StoredObject {
        StoredObject {
            key: "a.png".to_owned(),
            size: 2048,
            etag: "abc".to_owned(),
            last_modified: DateTime::from_timestamp(784_111_777, 0).expect("valid timestamp"),
            http_metadata: HttpMetadata::with_content_type("image/png"),
            body: None,
            range,
        }
    }

    #[test]
    fn test_should_quote_http_etag() {
        assert_eq!(sample(None).http_etag(), "\"abc\"");
    }

    #[test]
    fn test_should_write_http_metadata_headers() {
        let mut obj = sample(None);
        obj.http_metadata.cache_control = Some("max-age=3600".to_owned());
        let mut headers = HeaderMap::new();
        obj.write_http_metadata(&mut headers);

        assert_eq!(headers.get("content-type").unwrap(), "image/png");
        assert_eq!(headers.get("cache-control").unwrap(), "max-age=3600");
        assert_eq!(
            headers.get("last-modified").unwrap(),
            "Sun, 06 Nov 1994 08:49:37 GMT"
        );
        assert!(headers.get("content-disposition").is_none());
    }

    #[test]
    fn test_should_format_content_range() {
        let obj = sample(Some(ByteRange {
            offset: 0,
            length: 100,
        }));
        assert_eq!(obj.content_range().as_deref(), Some("bytes 0-99/2048"));
        assert_eq!(sample(None).content_range(), None);
    }

    #[test]
    fn test_should_clamp_range_to_object_end() {
        let range = clamp_range(
            ByteRange {
                offset: 10,
                length: 1000,
            },
            20,
        )
        .expect("satisfiable");
        assert_eq!(
            range,
            ByteRange {
                offset: 10,
                length: 10
            }
        );
    }

    #[test]
    fn test_should_reject_range_past_end() {
        let result = clamp_range(
            ByteRange {
                offset: 20,
                length: 1,
            },
            20,
        );
        assert!(matches!(result, Err(GatewayError::RangeNotSatisfiable)));
    }

    #[test]
    fn test_should_compute_md5_etag() {
        assert_eq!(compute_etag(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }
}

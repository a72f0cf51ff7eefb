//! Directory-backed object store.
//!
//! Layout for a key `k` under the bucket root:
//!
//! ```text
//! <root>/<encoded k>.blob        object bytes
//! <root>/<encoded k>.meta.json   ObjectMeta as JSON
//! ```
//!
//! Keys are percent-encoded into a single flat file name, so slashes and
//! dot segments in a key can never escape the root. An encoded key longer
//! than [`MAX_ENCODED_KEY`] bytes is stored as `~` plus the hex SHA-1 of the
//! key instead; `~` is always percent-encoded, so hashed names never collide
//! with encoded ones. Writes land in a temp file inside the root and are
//! renamed into place.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use digest::Digest;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, trace};

use super::conditional::body_permitted;
use super::{GetOptions, HttpMetadata, ObjectStore, StoredObject, clamp_range, compute_etag};
use crate::error::{GatewayError, GatewayResult};

/// Characters kept verbatim in on-disk file names.
const FILE_NAME_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

const DATA_SUFFIX: &str = ".blob";
const META_SUFFIX: &str = ".meta.json";

/// Longest encoded key used verbatim as a file name; leaves room for
/// [`META_SUFFIX`] under the common 255-byte name limit.
const MAX_ENCODED_KEY: usize = 200;

/// Prefix of file names derived from a key digest.
const HASHED_PREFIX: char = '~';

/// Metadata sidecar persisted next to each object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMeta {
    size: u64,
    etag: String,
    last_modified: DateTime<Utc>,
    http_metadata: HttpMetadata,
}

impl ObjectMeta {
    fn describe(self, key: &str) -> StoredObject {
        StoredObject {
            key: key.to_owned(),
            size: self.size,
            etag: self.etag,
            last_modified: self.last_modified,
            http_metadata: self.http_metadata,
            body: None,
            range: None,
        }
    }
}

/// Object store persisting objects as files in a directory.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Open (and create if needed) a bucket rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> GatewayResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        debug!(root = %root.display(), "opened DirStore");
        Ok(Self { root })
    }

    /// The bucket root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str, suffix: &str) -> PathBuf {
        let mut name = file_stem(key);
        name.push_str(suffix);
        self.root.join(name)
    }

    async fn read_meta(&self, key: &str) -> GatewayResult<Option<ObjectMeta>> {
        let path = self.path_for(key, META_SUFFIX);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let meta = serde_json::from_slice(&raw)
            .with_context(|| format!("corrupt metadata file {}", path.display()))
            .map_err(GatewayError::Storage)?;
        Ok(Some(meta))
    }

    async fn read_data(&self, key: &str, offset: u64, length: u64) -> GatewayResult<Bytes> {
        let path = self.path_for(key, DATA_SUFFIX);
        let mut file = tokio::fs::File::open(&path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))
            .map_err(GatewayError::Storage)?;
        if offset > 0 {
            file.seek(SeekFrom::Start(offset)).await?;
        }
        let capacity = usize::try_from(length).unwrap_or(usize::MAX);
        let mut buf = BytesMut::with_capacity(capacity);
        let mut limited = file.take(length);
        while limited.read_buf(&mut buf).await? > 0 {}
        Ok(buf.freeze())
    }

    /// Write `contents` to a temp file in the root, then rename it to `dest`.
    async fn write_atomic(&self, dest: &Path, contents: &[u8]) -> GatewayResult<()> {
        let temp = tempfile::NamedTempFile::new_in(&self.root)?.into_temp_path();
        tokio::fs::write(&temp, contents).await?;
        temp.persist(dest)
            .with_context(|| format!("failed to persist {}", dest.display()))
            .map_err(GatewayError::Storage)?;
        Ok(())
    }
}

/// The file name stem for `key`, without suffix.
fn file_stem(key: &str) -> String {
    let encoded = utf8_percent_encode(key, FILE_NAME_SET).to_string();
    if encoded.len() <= MAX_ENCODED_KEY {
        return encoded;
    }
    let mut stem = String::with_capacity(41);
    stem.push(HASHED_PREFIX);
    stem.push_str(&hex::encode(Sha1::digest(key.as_bytes())));
    stem
}

#[async_trait]
impl ObjectStore for DirStore {
    async fn get(&self, key: &str, options: GetOptions) -> GatewayResult<Option<StoredObject>> {
        let Some(meta) = self.read_meta(key).await? else {
            trace!(key, "object not found");
            return Ok(None);
        };

        let mut object = meta.describe(key);
        if let Some(ref headers) = options.only_if {
            if !body_permitted(headers, &object.etag, object.last_modified) {
                trace!(key, "precondition suppressed body");
                return Ok(Some(object));
            }
        }

        let (offset, length) = match options.range {
            Some(range) => {
                let range = clamp_range(range, object.size)?;
                object.range = Some(range);
                (range.offset, range.length)
            }
            None => (0, object.size),
        };
        object.body = Some(self.read_data(key, offset, length).await?);

        Ok(Some(object))
    }

    async fn head(&self, key: &str) -> GatewayResult<Option<StoredObject>> {
        Ok(self.read_meta(key).await?.map(|meta| meta.describe(key)))
    }

    async fn put(
        &self,
        key: &str,
        data: Bytes,
        http_metadata: HttpMetadata,
    ) -> GatewayResult<StoredObject> {
        let meta = ObjectMeta {
            size: data.len() as u64,
            etag: compute_etag(&data),
            last_modified: Utc::now(),
            http_metadata,
        };
        let meta_json = serde_json::to_vec(&meta)
            .context("failed to encode object metadata")
            .map_err(GatewayError::Storage)?;

        self.write_atomic(&self.path_for(key, DATA_SUFFIX), &data)
            .await?;
        self.write_atomic(&self.path_for(key, META_SUFFIX), &meta_json)
            .await?;

        trace!(key, size = meta.size, "stored object on disk");
        Ok(meta.describe(key))
    }
}

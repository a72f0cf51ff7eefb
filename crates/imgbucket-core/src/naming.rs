//! Content-addressed object names for uploads.

use digest::Digest;
use sha1::Sha1;

/// Number of leading digest bytes kept in a key.
const KEY_DIGEST_BYTES: usize = 8;

/// Suffix appended to every uploaded key.
pub const UPLOAD_SUFFIX: &str = ".png";

/// Content type stored with every upload, whatever the bytes really are.
pub const UPLOAD_CONTENT_TYPE: &str = "image/png";

/// Derive the storage key for an uploaded blob.
///
/// The key is the lowercase hex of the first 8 bytes of the SHA-1 digest
/// followed by [`UPLOAD_SUFFIX`], so identical uploads share one key.
///
/// # Examples
///
/// ```
/// use imgbucket_core::naming::content_key;
///
/// assert_eq!(content_key(b""), "da39a3ee5e6b4b0d.png");
/// ```
#[must_use]
pub fn content_key(data: &[u8]) -> String {
    let digest = Sha1::digest(data);
    let mut key = hex::encode(&digest[..KEY_DIGEST_BYTES]);
    key.push_str(UPLOAD_SUFFIX);
    key
}

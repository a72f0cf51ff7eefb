//! HTTP Basic authentication for uploads.
//!
//! Each upload is authenticated on its own: the `Authorization` header is
//! decoded with [`parse_basic`] and compared against the configured
//! [`Credentials`]. Nothing is remembered between requests.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use unicode_normalization::UnicodeNormalization;

/// Realm announced in the `WWW-Authenticate` challenge.
pub const BASIC_REALM: &str = "Enter username and password.";

/// Errors that can occur while authenticating an upload.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    /// The request carries no `Authorization` header.
    #[error("Missing Authorization header")]
    MissingHeader,

    /// The scheme is not `Basic` or the encoded segment is missing.
    #[error("Malformed authorization header")]
    MalformedHeader,

    /// The encoded segment is not valid base64.
    #[error("Invalid authorization encoding")]
    InvalidEncoding,

    /// The decoded value has no `:` separator or contains control characters.
    #[error("Invalid authorization value")]
    InvalidValue,

    /// No upload credentials are configured on this gateway.
    #[error("Upload credentials are not configured")]
    NotConfigured,

    /// The supplied credentials do not match the configured ones.
    #[error("Credentials do not match")]
    Mismatch,
}

/// A username and password pair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// The user name.
    pub username: String,
    /// The password.
    #[serde(skip_serializing)]
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"...")
            .finish()
    }
}

impl Credentials {
    /// Create a credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Compare both fields exactly, in constant time.
    #[must_use]
    pub fn matches(&self, expected: &Self) -> bool {
        let username_ok = self.username.as_bytes().ct_eq(expected.username.as_bytes());
        let password_ok = self.password.as_bytes().ct_eq(expected.password.as_bytes());
        (username_ok & password_ok).into()
    }
}

/// Decode a `Basic <base64>` authorization header value.
///
/// The decoded bytes are read as UTF-8 when valid and as Latin-1 (one char
/// per byte) otherwise, then NFC-normalized.
///
/// # Errors
///
/// - [`AuthError::MalformedHeader`] if the scheme is not exactly `Basic` or
///   nothing follows it.
/// - [`AuthError::InvalidEncoding`] if the payload is not base64.
/// - [`AuthError::InvalidValue`] if the decoded payload lacks a `:` or
///   contains a control character.
///
/// # Examples
///
/// ```
/// use imgbucket_core::auth::parse_basic;
///
/// let creds = parse_basic("Basic YWRtaW46c2VjcmV0").unwrap();
/// assert_eq!(creds.username, "admin");
/// assert_eq!(creds.password, "secret");
/// ```
pub fn parse_basic(header: &str) -> Result<Credentials, AuthError> {
    let mut segments = header.split(' ');
    let scheme = segments.next().unwrap_or_default();
    let encoded = segments.next().unwrap_or_default();
    if scheme != "Basic" || encoded.is_empty() {
        return Err(AuthError::MalformedHeader);
    }

    let raw = BASE64_STANDARD
        .decode(encoded)
        .map_err(|_| AuthError::InvalidEncoding)?;
    let decoded = match String::from_utf8(raw) {
        Ok(text) => text,
        Err(err) => err.into_bytes().into_iter().map(char::from).collect(),
    };
    let decoded: String = decoded.nfc().collect();

    if decoded.chars().any(|c| c <= '\u{1f}' || c == '\u{7f}') {
        return Err(AuthError::InvalidValue);
    }
    let (username, password) = decoded.split_once(':').ok_or(AuthError::InvalidValue)?;

    Ok(Credentials::new(username, password))
}

/// Authenticate an optional `Authorization` header against the configured
/// credentials.
///
/// # Errors
///
/// Returns the first [`AuthError`] encountered; callers are expected to treat
/// every variant identically.
pub fn authenticate(header: Option<&str>, expected: Option<&Credentials>) -> Result<(), AuthError> {
    let header = header.ok_or(AuthError::MissingHeader)?;
    let supplied = parse_basic(header)?;
    let expected = expected.ok_or(AuthError::NotConfigured)?;
    if supplied.matches(expected) {
        Ok(())
    } else {
        Err(AuthError::Mismatch)
    }
}

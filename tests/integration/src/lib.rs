//! Integration tests for the imgbucket server.
//!
//! These tests require a running server at `localhost:8787` started with
//! `GYAZO_USERNAME` and `GYAZO_PASSWORD` set. They are marked `#[ignore]` so
//! they don't run during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! GYAZO_USERNAME=test GYAZO_PASSWORD=test imgbucket-server &
//! cargo test -p imgbucket-integration -- --ignored
//! ```

use std::sync::Once;

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};

static INIT: Once = Once::new();

/// Boundary used by [`multipart_body`].
pub const BOUNDARY: &str = "imgbucket-integration-boundary";

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the server.
#[must_use]
pub fn endpoint_url() -> String {
    std::env::var("IMGBUCKET_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:8787".to_owned())
}

/// Upload credentials the server was started with.
#[must_use]
pub fn credentials() -> (String, String) {
    let username = std::env::var("GYAZO_USERNAME").unwrap_or_else(|_| "test".to_owned());
    let password = std::env::var("GYAZO_PASSWORD").unwrap_or_else(|_| "test".to_owned());
    (username, password)
}

/// Build an HTTP client whose requests look forwarded from a TLS terminator.
#[must_use]
pub fn client() -> reqwest::Client {
    init_tracing();

    let mut headers = HeaderMap::new();
    headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .unwrap_or_else(|e| panic!("failed to build client: {e}"))
}

/// URL of `path` on the server.
#[must_use]
pub fn url(path: &str) -> String {
    format!("{}/{}", endpoint_url(), path.trim_start_matches('/'))
}

/// Unique image-like bytes so each test uploads a fresh object.
#[must_use]
pub fn unique_image(prefix: &str) -> Bytes {
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    data.extend_from_slice(format!("{prefix}-{}", uuid::Uuid::new_v4()).as_bytes());
    Bytes::from(data)
}

/// Encode `data` as a `multipart/form-data` body with a single `field`.
#[must_use]
pub fn multipart_body(field: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"gyazo.com\"\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Build an upload request for `data` without any credentials.
#[must_use]
pub fn upload_request(client: &reqwest::Client, data: &[u8]) -> reqwest::RequestBuilder {
    client
        .post(url("/"))
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(multipart_body("imagedata", data))
}

/// Upload `data` with the configured credentials and return the object key.
pub async fn upload(client: &reqwest::Client, data: &[u8]) -> String {
    let (username, password) = credentials();
    let resp = upload_request(client, data)
        .basic_auth(username, Some(password))
        .send()
        .await
        .unwrap_or_else(|e| panic!("upload failed: {e}"));
    assert_eq!(resp.status(), reqwest::StatusCode::OK, "upload status");

    let location = resp
        .text()
        .await
        .unwrap_or_else(|e| panic!("upload body: {e}"));
    location
        .rsplit('/')
        .next()
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| panic!("unexpected upload response {location}"))
}

mod test_landing;
mod test_object;
mod test_upload;

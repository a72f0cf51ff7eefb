//! Response builders shared by the router and the service.

use http::header::{self, HeaderValue};
use http::{Response, StatusCode};
use imgbucket_core::auth::BASIC_REALM;
use imgbucket_core::error::GatewayError;

use crate::body::GatewayBody;

/// `Content-Type` for HTML pages.
pub const HTML_UTF8: &str = "text/html; charset=UTF-8";

/// `Content-Type` for plain-text bodies.
pub const TEXT_UTF8: &str = "text/plain; charset=UTF-8";

const LANDING_PAGE: &str = r#"<!doctype html>
<meta charset="utf-8" />
<title>imgbucket</title>
<style>
body {
  font-family: sans-serif;
  font-size: 32px;
  text-align: center;
  margin-top: 20vh;
}
h1 {
  letter-spacing: -0.05em;
}
</style>
<body>
  <h1>imgbucket</h1>
  <p>Upload with a Gyazo-compatible client. Images are served from this host.</p>
</body>
"#;

/// Build a response with a status, a content type and a body.
pub(crate) fn with_body(
    status: StatusCode,
    content_type: &'static str,
    body: GatewayBody,
) -> Response<GatewayBody> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// The static landing page served at `/`.
#[must_use]
pub fn landing_page() -> Response<GatewayBody> {
    with_body(
        StatusCode::OK,
        HTML_UTF8,
        GatewayBody::from_string(LANDING_PAGE),
    )
}

/// `404` page naming the missing key.
#[must_use]
pub fn object_not_found(key: &str) -> Response<GatewayBody> {
    let body = format!(
        "<html><body>Object \"<b>{}</b>\" not found</body></html>",
        html_escape(key)
    );
    with_body(
        StatusCode::NOT_FOUND,
        HTML_UTF8,
        GatewayBody::from_string(body),
    )
}

/// `401` challenge asking the client to retry with Basic credentials.
#[must_use]
pub fn not_authenticated() -> Response<GatewayBody> {
    let mut response = with_body(
        StatusCode::UNAUTHORIZED,
        TEXT_UTF8,
        GatewayBody::from_string("Not Authenticated"),
    );
    let headers = response.headers_mut();
    headers.insert(header::ACCEPT_CHARSET, HeaderValue::from_static("utf-8"));
    if let Ok(hv) = HeaderValue::from_str(&format!("Basic realm=\"{BASIC_REALM}\"")) {
        headers.insert(header::WWW_AUTHENTICATE, hv);
    }
    response
}

/// `400` for methods the gateway does not serve.
#[must_use]
pub fn unsupported_method() -> Response<GatewayBody> {
    with_body(
        StatusCode::BAD_REQUEST,
        TEXT_UTF8,
        GatewayBody::from_string("Unsupported method"),
    )
}

/// Plain-text response for an error that escaped the router.
#[must_use]
pub fn error_to_response(err: &GatewayError) -> Response<GatewayBody> {
    let status = err.status_code();
    let message = if status.is_server_error() {
        status
            .canonical_reason()
            .unwrap_or("Internal Server Error")
            .to_owned()
    } else {
        err.to_string()
    };
    with_body(status, TEXT_UTF8, GatewayBody::from_string(message))
}

/// Escape a string for safe inclusion in HTML content.
///
/// # Examples
///
/// ```
/// use imgbucket_http::response::html_escape;
///
/// assert_eq!(html_escape("a<b>c"), "a&lt;b&gt;c");
/// assert_eq!(html_escape("hello.png"), "hello.png");
/// ```
#[must_use]
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

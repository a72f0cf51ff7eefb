//! Request routing.
//!
//! [`route`] is the whole gateway: it dispatches on method and path and
//! performs at most one object-store round trip.
//!
//! | Method | Path | Outcome |
//! |--------|------|---------|
//! | GET/HEAD | `/` | landing page |
//! | GET | `/{key}` | 200 / 206 / 304 / 404 |
//! | HEAD | `/{key}` | 200 / 404, never a body |
//! | POST | `/` | Basic-authenticated upload |
//! | other | any | 400 `Unsupported method` |

use bytes::Bytes;
use http::header::{self, HeaderValue};
use http::request::Parts;
use http::{Method, Request, Response, StatusCode};
use tracing::{debug, info, warn};

use imgbucket_core::auth;
use imgbucket_core::config::GatewayConfig;
use imgbucket_core::error::{GatewayError, GatewayResult};
use imgbucket_core::naming::{UPLOAD_CONTENT_TYPE, content_key};
use imgbucket_core::range::parse_range;
use imgbucket_core::store::{GetOptions, HttpMetadata, ObjectStore, StoredObject};

use crate::body::GatewayBody;
use crate::multipart;
use crate::response::{
    TEXT_UTF8, landing_page, not_authenticated, object_not_found, unsupported_method, with_body,
};

/// Form field carrying the uploaded image.
pub const UPLOAD_FIELD: &str = "imagedata";

/// Handle a single request whose body has already been collected.
///
/// # Errors
///
/// Returns a [`GatewayError`] for unhandled failures: transport policy
/// violations, malformed ranges, invalid uploads and storage errors. Missing
/// objects, failed authentication and unsupported methods are ordinary
/// responses.
pub async fn route(
    req: Request<Bytes>,
    store: &dyn ObjectStore,
    config: &GatewayConfig,
) -> GatewayResult<Response<GatewayBody>> {
    let (parts, body) = req.into_parts();

    if config.enforce_https {
        check_transport(&parts)?;
    }

    let key = object_key(parts.uri.path()).to_owned();
    info!(method = %parts.method, key = %key, uri = %parts.uri, "handling request");

    match parts.method {
        Method::GET | Method::HEAD if key.is_empty() => Ok(landing_page()),
        Method::GET => get_object(&parts, &key, store).await,
        Method::HEAD => head_object(&key, store).await,
        Method::POST if key.is_empty() => upload(&parts, body, store, config).await,
        _ => Ok(unsupported_method()),
    }
}

/// The object key addressed by a request path: the path without its leading slash.
#[must_use]
pub fn object_key(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Require that the request was forwarded over HTTPS.
fn check_transport(parts: &Parts) -> GatewayResult<()> {
    let scheme_ok = parts
        .uri
        .scheme_str()
        .is_none_or(|scheme| scheme.eq_ignore_ascii_case("https"));
    let forwarded_ok = parts
        .headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"));

    if scheme_ok && forwarded_ok {
        Ok(())
    } else {
        warn!(uri = %parts.uri, "rejecting request not forwarded over HTTPS");
        Err(GatewayError::InsecureTransport)
    }
}

async fn get_object(
    parts: &Parts,
    key: &str,
    store: &dyn ObjectStore,
) -> GatewayResult<Response<GatewayBody>> {
    let range_header = parts
        .headers
        .get(header::RANGE)
        .map(|v| v.to_str().map_err(|_| GatewayError::MalformedRange))
        .transpose()?;
    let range = parse_range(range_header)?;

    let options = GetOptions {
        range,
        only_if: Some(parts.headers.clone()),
    };
    let Some(mut object) = store.get(key, options).await? else {
        debug!(key, "object not found");
        return Ok(object_not_found(key));
    };

    let (status, body) = match object.body.take() {
        None => (StatusCode::NOT_MODIFIED, GatewayBody::empty()),
        Some(data) if range.is_some() => (StatusCode::PARTIAL_CONTENT, GatewayBody::from_bytes(data)),
        Some(data) => (StatusCode::OK, GatewayBody::from_bytes(data)),
    };

    let mut response = object_response(&object, status, body);
    if status != StatusCode::NOT_MODIFIED {
        let headers = response.headers_mut();
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        if status == StatusCode::PARTIAL_CONTENT {
            if let Some(hv) = object
                .content_range()
                .and_then(|v| HeaderValue::from_str(&v).ok())
            {
                headers.insert(header::CONTENT_RANGE, hv);
            }
        }
    }
    debug!(key, status = %status, "served object");
    Ok(response)
}

async fn head_object(key: &str, store: &dyn ObjectStore) -> GatewayResult<Response<GatewayBody>> {
    match store.head(key).await? {
        Some(object) => Ok(object_response(&object, StatusCode::OK, GatewayBody::empty())),
        None => Ok(object_not_found(key)),
    }
}

async fn upload(
    parts: &Parts,
    body: Bytes,
    store: &dyn ObjectStore,
    config: &GatewayConfig,
) -> GatewayResult<Response<GatewayBody>> {
    let authorization = parts
        .headers
        .get(header::AUTHORIZATION)
        .map(|v| v.to_str().unwrap_or_default());
    if let Err(err) = auth::authenticate(authorization, config.credentials.as_ref()) {
        warn!(error = %err, "upload not authenticated");
        return Ok(not_authenticated());
    }

    let host = request_host(parts).ok_or(GatewayError::MissingHost)?;
    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| GatewayError::InvalidUpload("missing Content-Type".to_owned()))?;
    let boundary = multipart::extract_boundary(content_type)?;
    let mut form = multipart::parse_multipart(&body, &boundary)?;
    let image = form.take(UPLOAD_FIELD).ok_or_else(|| {
        GatewayError::InvalidUpload(format!("missing {UPLOAD_FIELD} field"))
    })?;

    let key = content_key(&image.data);
    let stored = store
        .put(
            &key,
            image.data,
            HttpMetadata::with_content_type(UPLOAD_CONTENT_TYPE),
        )
        .await?;
    info!(key = %key, size = stored.size, "stored upload");

    let url = format!("https://{host}/{key}");
    let mut response = with_body(StatusCode::OK, TEXT_UTF8, GatewayBody::from_string(url));
    if let Ok(hv) = HeaderValue::from_str(&stored.http_etag()) {
        response.headers_mut().insert(header::ETAG, hv);
    }
    Ok(response)
}

/// Build a response carrying the object's metadata headers and ETag.
fn object_response(
    object: &StoredObject,
    status: StatusCode,
    body: GatewayBody,
) -> Response<GatewayBody> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();
    object.write_http_metadata(headers);
    if let Ok(hv) = HeaderValue::from_str(&object.http_etag()) {
        headers.insert(header::ETAG, hv);
    }
    response
}

/// The request host without any port: `Host` header first, then the URI authority.
fn request_host(parts: &Parts) -> Option<String> {
    let authority = parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<http::uri::Authority>().ok())
        .or_else(|| parts.uri.authority().cloned())?;
    let host = authority.host();
    (!host.is_empty()).then(|| host.to_owned())
}

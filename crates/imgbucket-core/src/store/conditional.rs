//! Conditional request evaluation.
//!
//! Stores call [`body_permitted`] with the inbound request headers before
//! materializing a body. A failing precondition never turns into an error:
//! the object is still returned, just without its body, and the router
//! answers `304 Not Modified`.

use chrono::{DateTime, Utc};
use http::HeaderMap;
use http::header;

/// Decide whether the object body should be returned for these headers.
///
/// Conditions are checked in order `If-Match`, `If-Unmodified-Since`,
/// `If-None-Match`, `If-Modified-Since`; the first one that fails suppresses
/// the body. `If-Modified-Since` is ignored when `If-None-Match` is present.
/// Unparsable dates are ignored.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use http::HeaderMap;
/// use imgbucket_core::store::conditional::body_permitted;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("if-none-match", "\"abc\"".parse().unwrap());
/// assert!(!body_permitted(&headers, "abc", Utc::now()));
/// assert!(body_permitted(&HeaderMap::new(), "abc", Utc::now()));
/// ```
#[must_use]
pub fn body_permitted(headers: &HeaderMap, etag: &str, last_modified: DateTime<Utc>) -> bool {
    let last_modified = truncate_to_seconds(last_modified);

    if let Some(if_match) = header_str(headers, &header::IF_MATCH) {
        if !etag_list_matches(if_match, etag) {
            return false;
        }
    }

    if let Some(since) = header_date(headers, &header::IF_UNMODIFIED_SINCE) {
        if last_modified > since {
            return false;
        }
    }

    if let Some(if_none_match) = header_str(headers, &header::IF_NONE_MATCH) {
        return !etag_list_matches(if_none_match, etag);
    }

    if let Some(since) = header_date(headers, &header::IF_MODIFIED_SINCE) {
        if last_modified <= since {
            return false;
        }
    }

    true
}

/// Check whether an `If-Match`/`If-None-Match` list names `etag`.
fn etag_list_matches(list: &str, etag: &str) -> bool {
    let etag = normalize_etag(etag);
    list.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || (!candidate.is_empty() && normalize_etag(candidate) == etag)
    })
}

/// Normalize an ETag by stripping a weak `W/` prefix and surrounding quotes.
fn normalize_etag(etag: &str) -> &str {
    let etag = etag.strip_prefix("W/").unwrap_or(etag);
    etag.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(etag)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn header_date(headers: &HeaderMap, name: &header::HeaderName) -> Option<DateTime<Utc>> {
    header_str(headers, name).and_then(parse_http_date)
}

/// Parse an HTTP-date (IMF-fixdate, which is RFC 2822 compatible).
fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// HTTP-dates carry whole seconds only.
fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(dt.timestamp(), 0).unwrap_or(dt)
}

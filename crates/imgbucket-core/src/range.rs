//! `Range` request header parsing.
//!
//! Only the closed form `bytes=<start>-<end>` is accepted. Suffix ranges
//! (`bytes=-500`), open-ended ranges (`bytes=500-`) and multi-range requests
//! are rejected with [`GatewayError::MalformedRange`] rather than resolved
//! against the object size.

use crate::error::GatewayError;

/// A contiguous byte range expressed as an offset and a length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte of the range.
    pub offset: u64,
    /// Number of bytes requested.
    pub length: u64,
}

impl ByteRange {
    /// Last byte of the range (inclusive), saturating at `u64::MAX`.
    #[must_use]
    pub fn end_inclusive(&self) -> u64 {
        self.offset.saturating_add(self.length.saturating_sub(1))
    }
}

/// Parse an optional `Range` header value.
///
/// Returns `Ok(None)` when no header was sent.
///
/// # Errors
///
/// Returns [`GatewayError::MalformedRange`] for any value other than
/// `bytes=<start>-<end>` with numeric endpoints and `start <= end`.
///
/// # Examples
///
/// ```
/// use imgbucket_core::range::{ByteRange, parse_range};
///
/// let range = parse_range(Some("bytes=0-99")).unwrap();
/// assert_eq!(range, Some(ByteRange { offset: 0, length: 100 }));
/// assert!(parse_range(Some("bytes=100-")).is_err());
/// assert_eq!(parse_range(None).unwrap(), None);
/// ```
pub fn parse_range(header: Option<&str>) -> Result<Option<ByteRange>, GatewayError> {
    let Some(header) = header else {
        return Ok(None);
    };

    let spec = header
        .trim()
        .strip_prefix("bytes=")
        .ok_or(GatewayError::MalformedRange)?;
    let (start, end) = spec.split_once('-').ok_or(GatewayError::MalformedRange)?;

    let start = parse_endpoint(start)?;
    let end = parse_endpoint(end)?;
    if start > end {
        return Err(GatewayError::MalformedRange);
    }

    // Saturates for `bytes=0-18446744073709551615`; stores clamp to the object.
    Ok(Some(ByteRange {
        offset: start,
        length: (end - start).saturating_add(1),
    }))
}

fn parse_endpoint(value: &str) -> Result<u64, GatewayError> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GatewayError::MalformedRange);
    }
    value.parse().map_err(|_| GatewayError::MalformedRange)
}

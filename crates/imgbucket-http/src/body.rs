//! Response body type for the gateway.
//!
//! [`GatewayBody`] is either a buffered chunk of bytes (pages, object data,
//! upload URLs) or empty (`304`, `HEAD` responses).

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body_util::Full;

/// HTTP response body supporting buffered and empty modes.
///
/// Implements [`http_body::Body`] so it can be used directly with hyper responses.
#[derive(Debug, Default)]
pub enum GatewayBody {
    /// Buffered body.
    Buffered(Full<Bytes>),
    /// No body.
    #[default]
    Empty,
}

impl GatewayBody {
    /// Create a buffered body from bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(data.into()))
    }

    /// Create an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Create a buffered body from a UTF-8 string.
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self::Buffered(Full::new(Bytes::from(s.into())))
    }
}

impl http_body::Body for GatewayBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Empty => http_body::SizeHint::with_exact(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use http_body::Body;

    use super::*;

    #[test]
    fn test_should_report_empty_body_as_end_of_stream() {
        let body = GatewayBody::empty();
        assert!(body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(0));
    }

    #[test]
    fn test_should_size_buffered_body() {
        let body = GatewayBody::from_string("https://img.example/a.png");
        assert!(!body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(25));
    }

    #[test]
    fn test_should_default_to_empty() {
        assert!(GatewayBody::default().is_end_stream());
    }
}

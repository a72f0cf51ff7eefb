//! Gateway error types.
//!
//! [`GatewayError`] covers every failure the request pipeline can propagate.
//! Outcomes the client is expected to see as ordinary responses (object not
//! found, authentication failure, unsupported method) are not errors; they are
//! built directly by the router.
//!
//! # Usage
//!
//! ```
//! use imgbucket_core::error::GatewayError;
//!
//! let err = GatewayError::MalformedRange;
//! assert_eq!(err.status_code(), http::StatusCode::INTERNAL_SERVER_ERROR);
//! ```

use http::StatusCode;

/// Convenience alias used throughout the gateway.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors raised while handling a gateway request.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The `Range` header is present but not of the form `bytes=<start>-<end>`.
    #[error("Not supported to skip specifying the beginning/ending byte of a range")]
    MalformedRange,

    /// The requested range starts at or beyond the end of the object.
    #[error("The requested range is not satisfiable")]
    RangeNotSatisfiable,

    /// The request did not arrive over HTTPS.
    #[error("Please use a HTTPS connection")]
    InsecureTransport,

    /// The upload body could not be interpreted.
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    /// The request carries no host to build the object URL from.
    #[error("Missing Host header")]
    MissingHost,

    /// The request body exceeds the configured upload limit.
    #[error("Request body exceeds the limit of {limit} bytes")]
    PayloadTooLarge {
        /// The configured limit in bytes.
        limit: usize,
    },

    /// The object store reported a failure.
    #[error("Storage failure: {0}")]
    Storage(#[source] anyhow::Error),

    /// Filesystem I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Wrap any error as a storage failure.
    pub fn storage(err: impl Into<anyhow::Error>) -> Self {
        Self::Storage(err.into())
    }

    /// The HTTP status this error is reported with.
    ///
    /// Errors without a dedicated status are unhandled failures and map to
    /// `500 Internal Server Error`.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidUpload(_) | Self::MissingHost => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RangeNotSatisfiable => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::MalformedRange | Self::InsecureTransport | Self::Storage(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

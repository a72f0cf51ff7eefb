//! The gateway HTTP service implementing hyper's `Service` trait.
//!
//! [`GatewayService`] wraps the router with the per-request plumbing:
//!
//! 1. Request id generation
//! 2. Request body collection, bounded by `max_upload_size`
//! 3. Routing via [`route`]
//! 4. Error response formatting
//! 5. Common response headers (`x-request-id`, `Server`)

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Limited};
use hyper::service::Service;
use tracing::{debug, error, warn};
use uuid::Uuid;

use imgbucket_core::config::GatewayConfig;
use imgbucket_core::error::GatewayError;
use imgbucket_core::store::ObjectStore;

use crate::body::GatewayBody;
use crate::response::error_to_response;
use crate::router::route;

/// Value of the `Server` response header.
const SERVER_NAME: &str = "imgbucket";

/// The gateway service: one shared store, one immutable configuration.
#[derive(Debug, Clone)]
pub struct GatewayService {
    store: Arc<dyn ObjectStore>,
    config: Arc<GatewayConfig>,
}

impl GatewayService {
    /// Create a new service owning `store`.
    #[must_use]
    pub fn new(store: impl ObjectStore, config: GatewayConfig) -> Self {
        Self::from_shared(Arc::new(store), config)
    }

    /// Create a new service from an already shared store.
    #[must_use]
    pub fn from_shared(store: Arc<dyn ObjectStore>, config: GatewayConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// The configuration this service was built with.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run a buffered request through the gateway, converting errors into
    /// responses.
    pub async fn handle(&self, req: http::Request<Bytes>) -> http::Response<GatewayBody> {
        match route(req, self.store.as_ref(), &self.config).await {
            Ok(response) => response,
            Err(err) => {
                if err.status_code().is_server_error() {
                    error!(error = %err, "request failed");
                } else {
                    warn!(error = %err, "request rejected");
                }
                error_to_response(&err)
            }
        }
    }
}

impl<B> Service<http::Request<B>> for GatewayService
where
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    type Response = http::Response<GatewayBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let service = self.clone();

        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();
            debug!(method = %req.method(), uri = %req.uri(), request_id = %request_id, "received request");

            let (parts, incoming) = req.into_parts();
            let response = match collect_body(incoming, service.config.max_upload_size).await {
                Ok(body) => {
                    service
                        .handle(http::Request::from_parts(parts, body))
                        .await
                }
                Err(err) => {
                    warn!(error = %err, request_id = %request_id, "failed to collect request body");
                    error_to_response(&err)
                }
            };

            Ok(add_common_headers(response, &request_id))
        })
    }
}

/// Collect the full body into `Bytes`, failing once it exceeds `limit`.
async fn collect_body<B>(body: B, limit: usize) -> Result<Bytes, GatewayError>
where
    B: http_body::Body<Data = Bytes>,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.is::<http_body_util::LengthLimitError>() => {
            Err(GatewayError::PayloadTooLarge { limit })
        }
        Err(err) => Err(GatewayError::Io(std::io::Error::other(err))),
    }
}

/// Add common response headers to every response.
fn add_common_headers(
    mut response: http::Response<GatewayBody>,
    request_id: &str,
) -> http::Response<GatewayBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::header::HeaderValue::from_str(request_id) {
        headers.insert("x-request-id", hv);
    }
    headers.insert(
        http::header::SERVER,
        http::header::HeaderValue::from_static(SERVER_NAME),
    );

    response
}

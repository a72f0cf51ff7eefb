//! HTTP routing, multipart parsing, and hyper service for imgbucket.
//!
//! - **Routing** ([`router`]): dispatches on method and path, talks to the
//!   object store, and builds the response.
//! - **Responses** ([`response`]): the landing page, 404 page, Basic challenge
//!   and error responses.
//! - **Multipart** ([`multipart`]): `multipart/form-data` parsing for uploads.
//! - **Service** ([`service`]): the [`GatewayService`](service::GatewayService)
//!   implementing hyper's `Service` trait.
//! - **Body** ([`body`]): the [`GatewayBody`](body::GatewayBody) response body.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> GatewayService (hyper Service)
//!     -> Body collection (bounded)
//!     -> route (transport policy, method/path dispatch)
//!       -> ObjectStore get / head / put
//!     -> Error formatting
//!     -> Common response headers (x-request-id, Server)
//!   <- HTTP Response
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use imgbucket_core::{GatewayConfig, MemoryStore};
//! use imgbucket_http::service::GatewayService;
//!
//! let service = GatewayService::new(MemoryStore::new(), GatewayConfig::default());
//! // Use `service` with hyper server.
//! ```

pub mod body;
pub mod multipart;
pub mod response;
pub mod router;
pub mod service;

pub use body::GatewayBody;
pub use router::route;
pub use service::GatewayService;

//! Core building blocks for imgbucket, a small image-hosting gateway in front
//! of an object-storage bucket.
//!
//! This crate holds everything that does not depend on the HTTP server:
//!
//! - **Configuration** ([`config`]): the immutable [`GatewayConfig`] read once
//!   at startup.
//! - **Errors** ([`error`]): [`GatewayError`] and its status mapping.
//! - **Range parsing** ([`range`]): the `bytes=<start>-<end>` parser.
//! - **Naming** ([`naming`]): SHA-1 content-addressed upload keys.
//! - **Authentication** ([`auth`]): HTTP Basic decoding and credential checks.
//! - **Storage** ([`store`]): the [`ObjectStore`] trait plus memory and
//!   directory backends.
//!
//! # Architecture
//!
//! ```text
//! imgbucket-http router
//!        |
//!        v
//!   dyn ObjectStore  (get / head / put)
//!        |
//!        +-- MemoryStore (DashMap)
//!        +-- DirStore    (files + JSON sidecars)
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod naming;
pub mod range;
pub mod store;

pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use store::{DirStore, MemoryStore, ObjectStore};

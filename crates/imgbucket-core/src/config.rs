//! Gateway configuration.
//!
//! Provides [`GatewayConfig`], built once at process start (usually through
//! [`GatewayConfig::from_env`]) and shared read-only with every request.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::auth::Credentials;

/// Default upload limit (10 MiB).
const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Gateway configuration.
///
/// # Examples
///
/// ```
/// use imgbucket_core::config::GatewayConfig;
///
/// let config = GatewayConfig::default();
/// assert_eq!(config.gateway_listen, "0.0.0.0:8787");
/// assert!(config.enforce_https);
/// assert!(config.credentials.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Bind address for the gateway (e.g. `"0.0.0.0:8787"`).
    #[builder(default = String::from("0.0.0.0:8787"))]
    pub gateway_listen: String,

    /// Directory backing the bucket. `None` keeps objects in memory.
    #[builder(default, setter(strip_option))]
    pub bucket_dir: Option<String>,

    /// Credentials required for uploads. `None` rejects every upload.
    #[builder(default, setter(strip_option))]
    pub credentials: Option<Credentials>,

    /// Reject requests that were not forwarded over HTTPS.
    #[builder(default = true)]
    pub enforce_https: bool,

    /// Maximum accepted request body in bytes.
    #[builder(default = DEFAULT_MAX_UPLOAD_SIZE)]
    pub max_upload_size: usize,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            gateway_listen: String::from("0.0.0.0:8787"),
            bucket_dir: None,
            credentials: None,
            enforce_https: true,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            log_level: String::from("info"),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:8787` |
    /// | `BUCKET_DIR` | *(unset, in-memory bucket)* |
    /// | `GYAZO_USERNAME` | *(unset)* |
    /// | `GYAZO_PASSWORD` | *(unset)* |
    /// | `ENFORCE_HTTPS` | `true` |
    /// | `MAX_UPLOAD_SIZE` | `10485760` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// Credentials are only set when both `GYAZO_USERNAME` and
    /// `GYAZO_PASSWORD` are present.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Some(v) = lookup("BUCKET_DIR") {
            if !v.is_empty() {
                config.bucket_dir = Some(v);
            }
        }
        if let (Some(username), Some(password)) =
            (lookup("GYAZO_USERNAME"), lookup("GYAZO_PASSWORD"))
        {
            config.credentials = Some(Credentials::new(username, password));
        }
        if let Some(v) = lookup("ENFORCE_HTTPS") {
            config.enforce_https = parse_bool(&v);
        }
        if let Some(v) = lookup("MAX_UPLOAD_SIZE") {
            if let Ok(n) = v.parse::<usize>() {
                config.max_upload_size = n;
            }
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

//! imgbucket server - a Gyazo-compatible image upload gateway.
//!
//! Serves images out of a bucket and accepts Basic-authenticated multipart
//! uploads keyed by content hash.
//!
//! # Usage
//!
//! ```text
//! GYAZO_USERNAME=me GYAZO_PASSWORD=secret BUCKET_DIR=/var/lib/imgbucket imgbucket-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:8787` | Bind address |
//! | `BUCKET_DIR` | *(unset)* | Directory backing the bucket; in-memory when unset |
//! | `GYAZO_USERNAME` | *(unset)* | Upload username |
//! | `GYAZO_PASSWORD` | *(unset)* | Upload password |
//! | `ENFORCE_HTTPS` | `true` | Require `X-Forwarded-Proto: https` |
//! | `MAX_UPLOAD_SIZE` | `10485760` | Request body limit in bytes |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use imgbucket_core::{DirStore, GatewayConfig, MemoryStore, ObjectStore};
use imgbucket_http::GatewayService;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Open the bucket selected by the configuration.
async fn open_store(config: &GatewayConfig) -> Result<Arc<dyn ObjectStore>> {
    match config.bucket_dir.as_deref() {
        Some(dir) => {
            let store = DirStore::open(dir)
                .await
                .with_context(|| format!("failed to open bucket directory {dir}"))?;
            info!(bucket_dir = %dir, "serving bucket from directory");
            Ok(Arc::new(store))
        }
        None => {
            warn!("BUCKET_DIR not set, objects are kept in memory only");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(listener: TcpListener, service: GatewayService) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Raw request sent by `--health-check`.
fn health_check_request(addr: &str) -> String {
    format!(
        "GET / HTTP/1.1\r\nHost: {addr}\r\nX-Forwarded-Proto: https\r\nConnection: close\r\n\r\n"
    )
}

/// Request the landing page and require a `200 OK`.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    writer.write_all(health_check_request(addr).as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.starts_with("HTTP/1.1 200 OK") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --health-check flag for Docker HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let config = GatewayConfig::from_env();
        let addr = config.gateway_listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    let config = GatewayConfig::from_env();

    init_tracing(&config.log_level)?;

    info!(
        gateway_listen = %config.gateway_listen,
        enforce_https = config.enforce_https,
        max_upload_size = config.max_upload_size,
        uploads_enabled = config.credentials.is_some(),
        version = VERSION,
        "starting imgbucket server",
    );
    if config.credentials.is_none() {
        warn!("GYAZO_USERNAME/GYAZO_PASSWORD not set, every upload will be rejected");
    }

    let store = open_store(&config).await?;

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let service = GatewayService::from_shared(store, config);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}

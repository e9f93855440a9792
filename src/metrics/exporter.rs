//! Prometheus metrics exporter
//!
//! HTTP endpoint for Prometheus scraping, served by axum. `enable` validates
//! the address, spawns the server task and returns right away. Failing to
//! bind later is logged and leaves the host process running without
//! exposition.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::encoder::{self, CONTENT_TYPE};
use super::registry::Registry;
use crate::error::{MetricsError, Result};
use crate::util::create_tcp_listener;

/// Route serving the snapshot
pub const METRICS_PATH: &str = "/metrics";

/// Address the exporter listens on, `host:port`
///
/// An empty host (`:9090`) binds all interfaces. IPv6 hosts are written in
/// brackets (`[::1]:9090`). Host names are resolved when the server starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindAddress {
    host: String,
    port: u16,
}

impl BindAddress {
    pub fn parse(addr: &str) -> Result<Self> {
        let invalid = |reason: &str| MetricsError::InvalidAddress {
            addr: addr.to_string(),
            reason: reason.to_string(),
        };

        let (host, port) = addr.rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
        let port: u16 = port.parse().map_err(|_| invalid("port must be 0-65535"))?;

        let host = if host.is_empty() {
            "0.0.0.0"
        } else if let Some(inner) = host.strip_prefix('[') {
            inner
                .strip_suffix(']')
                .ok_or_else(|| invalid("unterminated '['"))?
        } else if host.contains(':') {
            return Err(invalid("IPv6 hosts must be enclosed in brackets"));
        } else {
            host
        };

        if host.is_empty() || host.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(invalid("malformed host"));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    async fn resolve(&self) -> io::Result<SocketAddr> {
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await?
            .next()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("{} did not resolve", self.host))
            })
    }
}

impl FromStr for BindAddress {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for BindAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Handle to a running exporter
///
/// Dropping it leaves the server running.
#[derive(Debug)]
pub struct ExporterHandle {
    bound_rx: Option<oneshot::Receiver<Option<SocketAddr>>>,
    bound: Option<SocketAddr>,
    task: JoinHandle<()>,
}

impl ExporterHandle {
    /// Wait until the listener is up
    ///
    /// Returns the local address, or `None` when binding failed.
    pub async fn bound(&mut self) -> Option<SocketAddr> {
        if let Some(rx) = self.bound_rx.take() {
            self.bound = rx.await.ok().flatten();
        }
        self.bound
    }

    /// Whether the server task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Start serving `registry` on `addr` in the background
///
/// Must be called from within a tokio runtime. Only a malformed address or a
/// missing runtime are reported here.
pub fn enable(registry: Arc<Registry>, addr: &str) -> Result<ExporterHandle> {
    let bind = BindAddress::parse(addr)?;
    let runtime = Handle::try_current().map_err(|_| MetricsError::NoRuntime)?;

    let (bound_tx, bound_rx) = oneshot::channel();
    info!(addr = %bind, path = METRICS_PATH, "Starting metrics exporter");
    let task = runtime.spawn(serve(registry, bind, bound_tx));

    Ok(ExporterHandle {
        bound_rx: Some(bound_rx),
        bound: None,
        task,
    })
}

async fn serve(
    registry: Arc<Registry>,
    bind: BindAddress,
    bound_tx: oneshot::Sender<Option<SocketAddr>>,
) {
    let listener = match bind_listener(&bind).await {
        Ok(listener) => listener,
        Err(e) => {
            warn!(addr = %bind, error = %e, "Cannot start metrics server");
            let _ = bound_tx.send(None);
            return;
        }
    };

    let local_addr = listener.local_addr().ok();
    if let Some(addr) = local_addr {
        info!(%addr, "Metrics endpoint listening");
    }
    let _ = bound_tx.send(local_addr);

    if let Err(e) = axum::serve(listener, router(registry)).await {
        warn!(error = %e, "Metrics server stopped");
    }
}

async fn bind_listener(bind: &BindAddress) -> io::Result<TcpListener> {
    let addr = bind.resolve().await?;
    let listener = create_tcp_listener(addr)?;
    TcpListener::from_std(listener)
}

/// `GET`/`HEAD /metrics`; axum answers 404 and 405 for everything else
fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route(METRICS_PATH, get(metrics_handler))
        .with_state(registry)
}

async fn metrics_handler(State(registry): State<Arc<Registry>>) -> Response {
    match encoder::encode(&registry.snapshot()) {
        Ok(body) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bind_address() {
        let all = BindAddress::parse(":9090").unwrap();
        assert_eq!(all.host(), "0.0.0.0");
        assert_eq!(all.port(), 9090);

        let local: BindAddress = "127.0.0.1:0".parse().unwrap();
        assert_eq!(local.to_string(), "127.0.0.1:0");

        let v6 = BindAddress::parse("[::1]:9962").unwrap();
        assert_eq!(v6.host(), "::1");
        assert_eq!(v6.to_string(), "[::1]:9962");

        let named = BindAddress::parse("localhost:9962").unwrap();
        assert_eq!(named.host(), "localhost");
    }

    #[test]
    fn test_reject_malformed_address() {
        for bad in ["9090", "host:", ":99999", ":http", "::1:80", "[::1:80", "[]:80", "a b:80"] {
            assert!(
                matches!(BindAddress::parse(bad), Err(MetricsError::InvalidAddress { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_enable_without_runtime() {
        let registry = Arc::new(Registry::new("cilium"));
        assert_eq!(
            enable(registry, ":0").unwrap_err(),
            MetricsError::NoRuntime
        );
    }
}

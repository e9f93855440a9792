//! Agent metrics - Entry Point
//!
//! Builds the metric registry and serves it until shutdown.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use agent_metrics::metrics::{self, NAMESPACE};
use agent_metrics::{AgentMetrics, Config, Registry, VERSION};

/// Application entry point
#[tokio::main]
async fn main() -> Result<()> {
    // Optional config path; defaults apply without one
    let config_path = std::env::args().nth(1).map(PathBuf::from);

    let config = match &config_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => Config::default(),
    };

    agent_metrics::util::init_tracing(&config.logging)?;

    info!(
        version = VERSION,
        config_path = ?config_path,
        "Starting agent metrics"
    );

    // Metric definitions are fixed from here on
    let mut registry = Registry::new(NAMESPACE);
    registry
        .register_process_collector()
        .context("Failed to register process metrics")?;
    let agent =
        AgentMetrics::register(&mut registry).context("Failed to register agent metrics")?;
    let registry = Arc::new(registry);

    info!(metrics = registry.len(), "Metrics registered");
    agent.endpoint_count.set(0.0);

    if config.metrics.enabled {
        metrics::enable(registry.clone(), &config.metrics.bind_addr)?;
    }

    shutdown_signal().await;
    info!("Shutdown signal received");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

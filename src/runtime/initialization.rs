//! # Initialization
//!
//! Process start-up shared by the controller binary: crypto provider, logging, metrics and
//! the Kubernetes client.

use crate::config::ControllerConfig;
use crate::observability::metrics;
use anyhow::{anyhow, Context, Result};
use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "edge_provider_controller=info";

/// Install ring as the rustls crypto provider
///
/// Must run before anything opens a TLS connection.
pub fn install_crypto_provider() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("a rustls crypto provider is already installed"))
}

/// Text or JSON logs filtered by `RUST_LOG`
pub fn init_tracing(config: &ControllerConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    if config.json_logs() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Everything a controller run needs before the registry is built
pub async fn initialize(config: &ControllerConfig) -> Result<Client> {
    metrics::register_metrics().context("Failed to register metrics")?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig or in-cluster config is available.")?;
    info!("Kubernetes client ready");
    Ok(client)
}

/// Cancel `token` on SIGTERM or Ctrl-C
pub fn cancel_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        token.cancel();
    });
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(_) => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

//! # Edge Provider Controller
//!
//! Converges `Monitor`, `Pool`, `LoadBalancer` and `WorkerScript` resources against the
//! upstream edge provider API.
//!
//! Configuration comes from the environment (see [`ControllerConfig`]). Credentials come from
//! cluster-scoped `ProviderConfig` resources.

use anyhow::Result;
use edge_provider_controller::config::ControllerConfig;
use edge_provider_controller::runtime::initialization::{
    cancel_on_signal, init_tracing, initialize, install_crypto_provider,
};
use edge_provider_controller::runtime::{start_server, ControllerRegistry, ServerState};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    install_crypto_provider()?;

    let config = ControllerConfig::from_env();
    init_tracing(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("BUILD_GIT_HASH"),
        built_at = env!("BUILD_DATETIME"),
        cache_ttl_secs = config.cache_ttl_secs,
        rate_limit_max_retries = config.rate_limit_max_retries,
        max_concurrent_reconciles = config.max_concurrent_reconciles,
        "Starting Edge Provider Controller"
    );

    let shutdown = CancellationToken::new();
    cancel_on_signal(shutdown.clone());

    let server_state = Arc::new(ServerState::default());
    let server = tokio::spawn({
        let state = Arc::clone(&server_state);
        let shutdown = shutdown.clone();
        let port = config.metrics_port;
        async move {
            if let Err(e) = start_server(port, state, shutdown).await {
                error!("HTTP server error: {}", e);
            }
        }
    });

    let client = initialize(&config).await?;
    let registry = ControllerRegistry::with_all_kinds(client, config, shutdown.clone());

    server_state.set_ready(true);
    registry.run().await;
    server_state.set_ready(false);

    shutdown.cancel();
    let _ = server.await;
    info!("Controller stopped");
    Ok(())
}

//! Fusion Resolver - Cross-chain atomic swap orchestration
//!
//! This service watches two chains, coordinates hashlock/timelock escrows on
//! both, and guarantees atomicity: a swap completes on both chains or on
//! neither.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use fusion_resolver::chain::EvmChainClient;
use fusion_resolver::config::{Settings, WalletConfig};
use fusion_resolver::metrics::{self, MetricsServer, SwapMetrics};
use fusion_resolver::resolver::Resolver;
use fusion_resolver::{api, ChainClient};

use ethers::signers::LocalWallet;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting Fusion Resolver v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load()?;
    info!(
        "Loaded configuration for chain pair {} <-> {}",
        settings.resolver.chain_a, settings.resolver.chain_b
    );

    // Chain clients for both sides of the pair
    let wallet = load_wallet(&settings.wallet)?;
    let chain_a = Arc::new(EvmChainClient::new(settings.chain_a().clone(), wallet.clone())?);
    let chain_b = Arc::new(EvmChainClient::new(settings.chain_b().clone(), wallet)?);
    info!("Chain connections initialized");

    // Event loops poll both chains until shutdown
    let (event_shutdown_tx, event_shutdown_rx) = watch::channel(false);
    chain_a.spawn_event_loop(event_shutdown_rx.clone());
    chain_b.spawn_event_loop(event_shutdown_rx);

    // Metrics server
    let metrics_server = if settings.metrics.enabled {
        Some(MetricsServer::new(settings.metrics.port))
    } else {
        None
    };

    // Orchestrator
    let swap_metrics = Arc::new(SwapMetrics::new());
    let resolver = Resolver::new(
        settings.resolver.clone(),
        chain_a.clone() as Arc<dyn ChainClient>,
        chain_b.clone() as Arc<dyn ChainClient>,
        swap_metrics.clone(),
    );
    info!("Resolver initialized");

    // Start API server
    let api_handle = tokio::spawn({
        let api_config = settings.api.clone();
        let resolver = resolver.clone();
        async move {
            if let Err(e) = api::run_server(api_config, resolver).await {
                error!("API server error: {}", e);
            }
        }
    });

    // Start metrics server
    let metrics_handle = metrics_server.map(|server| {
        tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        })
    });

    // Periodic flat export of swap metrics for log-based collectors
    let export_handle = tokio::spawn({
        let swap_metrics = swap_metrics.clone();
        let interval = settings.resolver.metrics_interval_secs;
        async move {
            loop {
                tokio::time::sleep(tokio::time::Duration::from_secs(interval)).await;
                match serde_json::to_string(&swap_metrics.export_for_monitoring()) {
                    Ok(payload) => info!("Swap metrics: {}", payload),
                    Err(e) => warn!("Metrics export failed: {}", e),
                }
            }
        }
    });

    // Health check loop
    let health_handle = tokio::spawn({
        let chain_a = chain_a.clone();
        let chain_b = chain_b.clone();
        let interval = settings.resolver.health_check_interval_secs;
        async move {
            loop {
                tokio::time::sleep(tokio::time::Duration::from_secs(interval)).await;

                for client in [&chain_a, &chain_b] {
                    let healthy = client.health_check().await;
                    metrics::record_chain_health(client.chain_id(), healthy);
                    if !healthy {
                        warn!("Chain {} health check failed", client.chain_id());
                    }
                }
            }
        }
    });

    info!("Fusion Resolver is running");
    info!("API server: http://{}:{}", settings.api.host, settings.api.port);
    if settings.metrics.enabled {
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutdown signal received, stopping...");

    // Graceful shutdown: drain swap drivers, then stop event loops
    resolver.stop().await;
    let _ = event_shutdown_tx.send(true);

    api_handle.abort();
    export_handle.abort();
    health_handle.abort();
    if let Some(h) = metrics_handle {
        h.abort();
    }

    info!("Fusion Resolver stopped");
    Ok(())
}

fn load_wallet(config: &WalletConfig) -> Result<LocalWallet> {
    let env_var = config
        .private_key_env
        .as_deref()
        .unwrap_or("RESOLVER_PRIVATE_KEY");
    let key = std::env::var(env_var)
        .with_context(|| format!("Wallet private key env var {} is not set", env_var))?;
    key.trim_start_matches("0x")
        .parse::<LocalWallet>()
        .context("Failed to parse wallet private key")
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,fusion_resolver=debug,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

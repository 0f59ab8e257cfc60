use anyhow::Result;
use axum::serve;
use relay_core::{
    cache::ResponseCache,
    chain::{seed_chains, StoreChainResolver},
    config::AppConfig,
    proxy::ProxyEngine,
    store::{run_expiry_sweep, KvStore, MemoryStore},
    upstream::{EndpointSelector, HttpClient, HttpClientConfig},
    utils::SystemClock,
};
use server::AppState;
use std::{sync::Arc, time::Duration};
use tokio::{signal, sync::broadcast};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the logging system based on the configuration.
fn init_logging(config: &AppConfig) {
    let filter = if let Ok(env_filter) = std::env::var("RUST_LOG") {
        if env_filter == "debug" {
            EnvFilter::new("warn,relay_core=debug,server=debug,tests=debug")
        } else if env_filter == "trace" {
            EnvFilter::new("warn,relay_core=trace,server=trace,tests=trace")
        } else {
            EnvFilter::try_from_env("RUST_LOG")
                .unwrap_or_else(|_| EnvFilter::new("warn,relay_core=debug,server=debug,tests=debug"))
        }
    } else {
        let level = &config.logging.level;
        EnvFilter::try_new(format!("warn,relay_core={level},server={level}"))
            .unwrap_or_else(|_| EnvFilter::new("warn,relay_core=info,server=info"))
    };

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer().json();
        registry.with(fmt_layer).init();
    } else {
        // "pretty" and any other format default to pretty logging
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

/// Builds the resolver, transport, selector and cache over `memory_store`, and wires them into
/// the engine.
async fn init_core_services(config: &AppConfig, memory_store: Arc<MemoryStore>) -> Result<AppState> {
    let store: Arc<dyn KvStore> = memory_store;

    seed_chains(store.as_ref(), &config.chains)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to seed chain configuration: {e}"))?;
    info!(chains = config.chains.len(), "Chain configuration seeded");

    let resolver = Arc::new(
        StoreChainResolver::new(store.clone())
            .with_cache_ttl(Duration::from_secs(config.store.chain_config_cache_ttl_seconds)),
    );

    let transport = Arc::new(
        HttpClient::with_config(HttpClientConfig {
            concurrent_limit: config.server.max_concurrent_requests,
            ..HttpClientConfig::default()
        })
        .map_err(|e| anyhow::anyhow!("HTTP client initialization failed: {e}"))?,
    );

    let mut engine = ProxyEngine::new(resolver, Arc::new(EndpointSelector::new()), transport)
        .with_retry_policy(config.retry_policy())
        .with_default_chain(config.proxy.default_chain.clone())
        .with_failover_exclusion(config.proxy.exclude_failed_on_retry);

    if config.cache.enabled {
        let cache = ResponseCache::new(store).with_min_compress_size(config.cache.compression_threshold_bytes);
        engine = engine.with_cache(Arc::new(cache), config.cache_policy());
    }

    Ok(AppState {
        engine: Arc::new(engine),
        chains: config.chains.iter().map(|c| c.chain_id.clone()).collect(),
        request_timeout: config.request_timeout(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().map_err(|e| anyhow::anyhow!("Configuration loading failed: {e}"))?;
    config.validate().map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;

    init_logging(&config);
    info!("Starting relay");
    debug!(
        chains_count = config.chains.len(),
        cache_enabled = config.cache.enabled,
        max_retries = config.proxy.max_retries,
        bind_port = config.server.bind_port,
        "Configuration loaded"
    );

    let memory_store = Arc::new(MemoryStore::with_clock(
        Arc::new(SystemClock),
        Duration::from_secs(config.store.min_ttl_seconds),
    ));
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let sweep = tokio::spawn(run_expiry_sweep(
        memory_store.clone(),
        Duration::from_secs(config.store.sweep_interval_seconds),
        shutdown_tx.subscribe(),
    ));

    let state = init_core_services(&config, memory_store).await?;
    let app = server::create_app(state, &config.server);

    let addr = config.socket_addr().map_err(anyhow::Error::msg)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "RPC server listening");

    if let Err(e) = serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %e, "Server error occurred");
    }

    let _ = shutdown_tx.send(());
    if let Err(e) = sweep.await {
        error!(error = %e, "Store sweep task failed");
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, draining in-flight requests");
}

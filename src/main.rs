//! KV Cache-Aside - A key-value server with a bounded LRU cache in front of
//! a durable SQLite store

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kv_cache_aside::api::{create_router, AppState};
use kv_cache_aside::Config;

/// Main entry point for the key-value server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables and arguments
/// 3. Build a runtime with a fixed number of worker threads
/// 4. Open the durable store and create the cache
/// 5. Serve HTTP until SIGINT/SIGTERM, then close the store
fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kv_cache_aside=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()
        .context("Invalid configuration")?
        .with_args(std::env::args().skip(1));
    config.validate().context("Invalid configuration")?;
    info!(
        "Configuration loaded: capacity={}, shards={}, port={}, workers={}, store={:?}, pool={}",
        config.cache_capacity,
        config.cache_shards,
        config.server_port,
        config.worker_threads,
        config.store_backend,
        config.db_pool_size
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .max_blocking_threads(config.worker_threads)
        .enable_all()
        .build()
        .context("Failed to build runtime")?;

    runtime.block_on(serve(config))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let state = AppState::from_config(&config).context("Failed to open durable store")?;
    let service = state.service.clone();
    info!("Cache-aside service initialized");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(
        "Server listening on http://{} with {} worker threads",
        addr, config.worker_threads
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    service.shutdown();
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}

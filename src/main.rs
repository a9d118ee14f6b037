//! StoryHub Server: real-time collaborative story editing.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt};

use storyhub_core::config::{AppConfig, StoreBackend};
use storyhub_database::{DatabasePool, SessionStore};
use storyhub_realtime::CollabEngine;
use storyhub_realtime::bridge::RedisPubSubBridge;

#[tokio::main]
async fn main() {
    let env = std::env::var("STORYHUB_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e:#}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting StoryHub v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Session store ────────────────────────────────────
    let (store, db_pool) = match config.store.backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory session store");
            (SessionStore::memory(), None)
        }
        StoreBackend::Postgres => {
            let db = DatabasePool::connect(&config.database)
                .await
                .context("Database connection failed")?;
            tracing::info!("Running database migrations...");
            storyhub_database::migration::run_migrations(db.pool())
                .await
                .context("Migration failed")?;
            tracing::info!("Database migrations complete");
            (SessionStore::postgres(db.pool().clone()), Some(db))
        }
    };

    // ── Step 2: Collaboration engine ─────────────────────────────
    let engine = Arc::new(CollabEngine::new(store, config.collab.clone()));
    tracing::info!(
        max_connections_per_session = config.collab.max_connections_per_session,
        host_grace_seconds = config.collab.host_grace_seconds,
        "Collaboration engine initialized"
    );

    // ── Step 3: Cross-process relay ──────────────────────────────
    let shutdown = CancellationToken::new();
    if config.redis.is_enabled() {
        let bridge = Arc::new(
            RedisPubSubBridge::connect(&config.redis.url)
                .await
                .context("Redis relay initialization failed")?,
        );
        engine.attach_relay(Arc::clone(&bridge));
        bridge.spawn_subscriber(engine.broadcaster().clone(), shutdown.child_token());
        tracing::info!("Redis relay attached");
    }

    // ── Step 4: HTTP router ──────────────────────────────────────
    let state = storyhub_api::AppState::new(config.clone(), Arc::clone(&engine));
    let app = storyhub_api::build_app(state);

    // ── Step 5: Serve ────────────────────────────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("StoryHub listening on {addr}");

    let signal_engine = Arc::clone(&engine);
    let signal_token = shutdown.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, closing collaboration sockets...");
        signal_token.cancel();
        // Sockets hold the server open; close them so serve can return.
        signal_engine.shutdown();
    });

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let served = server.await;

    // ── Step 6: Drain ────────────────────────────────────────────
    shutdown.cancel();
    engine.shutdown();
    let drained = tokio::time::timeout(grace, async {
        while engine.connection_count() > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    if drained.is_err() {
        tracing::warn!(
            remaining = engine.connection_count(),
            "Connections still open after shutdown grace"
        );
    }
    if let Some(db) = db_pool {
        db.close().await;
    }

    served.context("Server error")?;
    tracing::info!("StoryHub server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
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

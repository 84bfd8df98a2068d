//! # Tally API Server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Startup                                          │
//! │                                                                         │
//! │  tracing ──► ApiConfig::load ──► Database::new (migrations) ──► serve   │
//! │                                                            │            │
//! │                                       Ctrl+C / SIGTERM ────┘            │
//! │                                       (graceful shutdown, pool closed)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tally_api::{build_router, ApiConfig, AppState};
use tally_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::load().context("invalid configuration")?;

    init_tracing(config.log_json);

    info!("Starting Tally API server...");
    info!(
        port = config.http_port,
        database = %config.database_path,
        auth = config.jwt_secret.is_some(),
        low_stock_threshold = config.low_stock_threshold,
        "Configuration loaded"
    );

    if config.jwt_secret.is_none() {
        warn!("TALLY_JWT_SECRET is not set, /api routes are open");
    }

    let db = Database::new(
        DbConfig::new(&config.database_path).max_connections(config.db_max_connections),
    )
    .await
    .context("failed to open database")?;

    let app = build_router(AppState::new(db.clone(), &config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tally_api=debug,tally_db=debug"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, starting graceful shutdown...");
}

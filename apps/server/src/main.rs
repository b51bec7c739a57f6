//! # Convênio Back Office Server
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. ServerConfig::load          defaults → server.toml → CONVENIO_*    │
//! │  2. tracing-subscriber          RUST_LOG, else config.log_filter       │
//! │  3. Database::new               SQLite (WAL), migrations applied       │
//! │  4. axum::serve                 until Ctrl+C / SIGTERM                 │
//! │  5. Database::close             drain the pool                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```bash
//! convenio-server                         # default config search
//! convenio-server --config ./server.toml
//! CONVENIO_PORT=9000 convenio-server
//! ```

use std::path::PathBuf;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use convenio_db::{Database, DbConfig};
use convenio_server::{router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load(config_path_arg())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_target(true)
        .init();

    info!("Starting Convênio back office server...");
    info!(
        addr = %config.socket_addr(),
        database = %config.database_path.display(),
        "Configuration loaded"
    );

    let db = Database::new(
        DbConfig::new(config.database_path.clone()).max_connections(config.max_connections),
    )
    .await
    .context("Failed to open database")?;
    info!("Database ready");

    let addr = config.socket_addr();
    let state = AppState::new(db.clone(), config);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// `--config PATH` / `-c PATH`, if given.
fn config_path_arg() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" || arg == "-c" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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

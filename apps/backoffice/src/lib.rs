//! # AquaRoute Back Office Service
//!
//! HTTP JSON service between the web front end and `aquaroute-db`.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Back Office Startup                                  │
//! │                                                                         │
//! │  1. init_tracing()           RUST_LOG or "info,aquaroute=debug,..."    │
//! │  2. AppConfig::load()        defaults → TOML → AQUAROUTE_* → validate  │
//! │  3. Database::new()          SQLite pool + embedded migrations         │
//! │  4. AppState::new()          db + config + empty session store         │
//! │     + idle-session sweeper   every minute, [server] idle limit         │
//! │  5. routes::router(state)    /health + /api/...                        │
//! │  6. axum::serve()            until Ctrl+C / SIGTERM                    │
//! │  7. db.close()                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - TOML + environment configuration
//! - [`error`] - `ApiError` and its HTTP mapping
//! - [`extract`] - `CurrentActor` from the identity headers
//! - [`state`] - Shared state and session carts
//! - [`handlers`] - One module per screen
//! - [`routes`] - The route table

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod state;

use std::path::PathBuf;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use aquaroute_db::Database;

pub use config::{AppConfig, ConfigError};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use state::AppState;

const SESSION_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// The full router for `state`.
pub fn app(state: AppState) -> axum::Router {
    routes::router(state)
}

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,aquaroute=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Loads configuration, opens the database and serves until shutdown.
pub async fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(config_path)?;
    info!(
        business = %config.business.name,
        db_path = %config.database.path.display(),
        tax_rate_bps = config.business.tax_rate_bps,
        "Configuration loaded"
    );

    let db = Database::new(config.db_config()).await?;
    info!("Database ready");

    let bind_addr = config.bind_address();
    let session_idle = config.session_idle();
    let state = AppState::new(db.clone(), config);
    tokio::spawn(
        state
            .sessions
            .clone()
            .run_idle_sweeper(session_idle, SESSION_SWEEP_INTERVAL),
    );

    let listener = TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "Back office listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

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

    info!("Shutdown signal received, draining requests");
}

// =============================================================================
// Router Tests
// =============================================================================

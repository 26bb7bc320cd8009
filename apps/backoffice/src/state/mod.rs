//! # State Module
//!
//! Shared state handed to every handler through `axum::extract::State`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────────┐  ┌──────────────────────┐      │
//! │  │   Database   │  │  SessionStore    │  │  Arc<AppConfig>      │      │
//! │  │              │  │                  │  │                      │      │
//! │  │  SqlitePool  │  │  RwLock<HashMap< │  │  business name       │      │
//! │  │  (clone =    │  │   id, Mutex<     │  │  tax rate            │      │
//! │  │   Arc bump)  │  │   SessionCart>>> │  │  read-only           │      │
//! │  └──────────────┘  └──────────────────┘  └──────────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod session;

use std::sync::Arc;

use aquaroute_db::Database;

use crate::config::AppConfig;

pub use session::{EditTarget, SessionCart, SessionStore, SessionView, SharedSession};

#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        AppState {
            db,
            config: Arc::new(config),
            sessions: SessionStore::new(),
        }
    }
}

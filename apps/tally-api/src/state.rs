//! # Application State
//!
//! Shared by every handler through axum's `State` extractor.
//!
//! `Database` wraps a pooled `SqlitePool`, so cloning the state is a
//! reference-count bump. Nothing here is mutated after startup, so no
//! locks are needed.

use std::sync::Arc;

use tally_db::Database;

use crate::auth::JwtManager;
use crate::config::ApiConfig;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,

    /// `None` disables the bearer-token gate on `/api`.
    pub jwt: Option<Arc<JwtManager>>,

    pub low_stock_threshold: i64,
}

impl AppState {
    /// Creates state from an open database and the loaded configuration.
    pub fn new(db: Database, config: &ApiConfig) -> Self {
        let jwt = config
            .jwt_secret
            .as_ref()
            .map(|secret| Arc::new(JwtManager::new(secret.clone(), config.jwt_access_lifetime_secs)));

        AppState {
            db,
            jwt,
            low_stock_threshold: config.low_stock_threshold,
        }
    }
}

//! # Tally API
//!
//! HTTP JSON server for the Tally POS frontend.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally API Routes                                 │
//! │                                                                         │
//! │  GET /health ─────────────────────────────────────────► health          │
//! │                                                                         │
//! │  /api  (require_auth: bearer JWT when TALLY_JWT_SECRET is set)          │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │ /products      │  │ /sales         │  │ /dashboard                 ││
//! │  │ • list, get    │  │ • list, get    │  │ • stats                    ││
//! │  │ • create       │  │ • create       │  │ • sales-trend              ││
//! │  └────────────────┘  │ • PATCH status │  │ • revenue-expenses         ││
//! │  ┌────────────────┐  │ • cancel       │  │ • category-distribution    ││
//! │  │ /bills         │  │ • delete       │  │ • low-stock                ││
//! │  │ • list, get    │  └────────────────┘  └────────────────────────────┘│
//! │  │ • create       │  ┌────────────────┐                                 │
//! │  │ • PATCH status │  │ /transactions  │  all routes ──► tally-db       │
//! │  └────────────────┘  │ • list, create │              ──► SQLite        │
//! │                      └────────────────┘                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config::ApiConfig`] for the environment variables.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use state::AppState;

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/products", handlers::products::routes())
        .nest("/sales", handlers::sales::routes())
        .nest("/bills", handlers::bills::routes())
        .nest("/transactions", handlers::transactions::routes())
        .nest("/dashboard", handlers::dashboard::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

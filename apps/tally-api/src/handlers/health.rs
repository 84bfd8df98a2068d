//! Liveness endpoint. Mounted outside `/api`, so it needs no token.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub version: &'static str,
}

/// `GET /health` - 200 when the database answers, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = state.db.health_check().await;

    let (status, label) = if database {
        (StatusCode::OK, "ok")
    } else {
        warn!("Health check failed: database unreachable");
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(HealthResponse {
            status: label,
            database,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

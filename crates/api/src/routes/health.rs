//! Liveness endpoint.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `healthy` when the ledger answers.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Number of vaults the ledger holds.
    pub vaults: usize,
}

/// GET `/health` - Reports whether the ledger is reachable.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.ledger.list_vaults().await {
        Ok(vaults) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                version: env!("CARGO_PKG_VERSION"),
                vaults: vaults.len(),
            }),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unavailable",
                version: env!("CARGO_PKG_VERSION"),
                vaults: 0,
            }),
        ),
    }
}

/// Creates health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

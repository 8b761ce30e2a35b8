//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes over the [`VaultLedger`] facade
//! - Actor identification middleware
//! - Request extractors
//! - Error rendering

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;

use axum::{Router, http::Uri, response::Response};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use boveda_db::VaultLedger;
use boveda_shared::AppError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The ledger every command and query goes through.
    pub ledger: Arc<VaultLedger>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn route_not_found(uri: Uri) -> Response {
    error::app_error_response(&AppError::RouteNotFound(uri.path().to_string()))
}

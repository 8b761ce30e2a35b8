//! JSON error responses.
//!
//! Every error body has the shape `{ "error": CODE, "message": text }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

use boveda_core::LedgerError;
use boveda_shared::AppError;

/// Renders a ledger error with its mapped status code.
pub fn ledger_error_response(err: &LedgerError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(code = err.error_code(), error = %err, "Request failed");
    } else {
        warn!(code = err.error_code(), error = %err, "Request rejected");
    }
    (
        status,
        Json(json!({
            "error": err.error_code(),
            "message": err.to_string()
        })),
    )
        .into_response()
}

/// Renders an error raised before the request reached the ledger.
pub fn app_error_response(err: &AppError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    warn!(code = err.error_code(), error = %err, "Request rejected");
    (
        status,
        Json(json!({
            "error": err.error_code(),
            "message": err.to_string()
        })),
    )
        .into_response()
}

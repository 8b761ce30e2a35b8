//! Transfer routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use boveda_core::transfer::TransferRequest;
use boveda_shared::types::{TransferId, VaultKey};

use crate::{
    AppState, error::ledger_error_response, extractors::IdempotencyKey, middleware::Actor,
};

/// Creates the transfer routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transfers", post(create_transfer))
        .route("/transfers/{id}", get(get_transfer))
}

/// Request body for a transfer.
#[derive(Debug, Deserialize)]
pub struct CreateTransferRequest {
    /// Vault debited.
    pub origin: VaultKey,
    /// Vault credited.
    pub destination: VaultKey,
    /// Positive amount.
    pub amount: Decimal,
    /// Description shared by both legs.
    pub concept: String,
    /// Business date; defaults to today.
    pub occurred_on: Option<NaiveDate>,
}

/// POST `/transfers` - Moves money between two vaults.
async fn create_transfer(
    State(state): State<AppState>,
    actor: Actor,
    IdempotencyKey(operation_id): IdempotencyKey,
    Json(payload): Json<CreateTransferRequest>,
) -> impl IntoResponse {
    let request = TransferRequest {
        origin: payload.origin,
        destination: payload.destination,
        amount: payload.amount,
        concept: payload.concept,
        occurred_on: payload.occurred_on,
        actor: actor.id(),
        operation_id,
    };
    match state.ledger.transfer(request).await {
        Ok(transfer) => (StatusCode::CREATED, Json(transfer)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/transfers/{id}` - One transfer.
async fn get_transfer(
    State(state): State<AppState>,
    Path(id): Path<TransferId>,
) -> impl IntoResponse {
    match state.ledger.get_transfer(id).await {
        Ok(transfer) => (StatusCode::OK, Json(transfer)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

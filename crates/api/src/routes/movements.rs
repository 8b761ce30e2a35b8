//! Movement routes: recording, pending approval and reversal.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use boveda_core::movement::{MovementDraft, MovementKind};
use boveda_shared::types::{ActorId, Currency, MovementId, OperationId, VaultKey};

use crate::{
    AppState, error::ledger_error_response, extractors::IdempotencyKey, middleware::Actor,
};

/// Creates the movement routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/movements", post(record_movement))
        .route("/movements/pending", post(submit_pending))
        .route("/movements/{id}", get(get_movement))
        .route("/movements/{id}/confirm", post(confirm_movement))
        .route("/movements/{id}/cancel", post(cancel_movement))
        .route("/movements/{id}/reverse", post(reverse_movement))
}

/// Request body for a new movement.
#[derive(Debug, Deserialize)]
pub struct CreateMovementRequest {
    /// Vault key.
    pub vault: VaultKey,
    /// Movement kind, e.g. `expense`.
    pub kind: MovementKind,
    /// Amount; signed by the kind except for adjustments.
    pub amount: Decimal,
    /// Currency; defaults to the vault's.
    pub currency: Option<Currency>,
    /// Description.
    pub concept: String,
    /// Grouping.
    pub category: Option<String>,
    /// External reference.
    pub reference: Option<String>,
    /// Notes.
    pub notes: Option<String>,
    /// Business date; defaults to today.
    pub occurred_on: Option<NaiveDate>,
}

impl CreateMovementRequest {
    fn into_draft(self, actor: ActorId, operation_id: Option<OperationId>) -> MovementDraft {
        let mut draft = MovementDraft::new(
            self.vault,
            self.kind,
            self.amount,
            self.concept,
            self.occurred_on.unwrap_or_else(|| Utc::now().date_naive()),
            actor,
        );
        draft.currency = self.currency;
        draft.category = self.category;
        draft.reference = self.reference;
        draft.notes = self.notes;
        draft.operation_id = operation_id;
        draft
    }
}

/// Request body for reversing a movement.
#[derive(Debug, Deserialize)]
pub struct ReverseRequest {
    /// Why the movement is reversed.
    pub reason: String,
}

/// POST `/movements` - Records and applies a movement.
async fn record_movement(
    State(state): State<AppState>,
    actor: Actor,
    IdempotencyKey(operation_id): IdempotencyKey,
    Json(payload): Json<CreateMovementRequest>,
) -> impl IntoResponse {
    match state
        .ledger
        .record_movement(payload.into_draft(actor.id(), operation_id))
        .await
    {
        Ok(movement) => (StatusCode::CREATED, Json(movement)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/movements/pending` - Stores a movement without applying it.
async fn submit_pending(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateMovementRequest>,
) -> impl IntoResponse {
    match state
        .ledger
        .submit_pending_movement(payload.into_draft(actor.id(), None))
        .await
    {
        Ok(movement) => (StatusCode::CREATED, Json(movement)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/movements/{id}` - One movement.
async fn get_movement(
    State(state): State<AppState>,
    Path(id): Path<MovementId>,
) -> impl IntoResponse {
    match state.ledger.get_movement(id).await {
        Ok(movement) => (StatusCode::OK, Json(movement)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/movements/{id}/confirm` - Applies a pending movement.
async fn confirm_movement(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<MovementId>,
) -> impl IntoResponse {
    match state.ledger.confirm_movement(id, actor.id()).await {
        Ok(movement) => (StatusCode::OK, Json(movement)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/movements/{id}/cancel` - Cancels a pending movement.
async fn cancel_movement(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<MovementId>,
) -> impl IntoResponse {
    match state.ledger.cancel_movement(id, actor.id()).await {
        Ok(movement) => (StatusCode::OK, Json(movement)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/movements/{id}/reverse` - Books an offsetting adjustment.
async fn reverse_movement(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<MovementId>,
    Json(payload): Json<ReverseRequest>,
) -> impl IntoResponse {
    match state
        .ledger
        .reverse_movement(id, &payload.reason, actor.id())
        .await
    {
        Ok(reversal) => (StatusCode::CREATED, Json(reversal)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

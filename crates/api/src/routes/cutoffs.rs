//! Cut-off routes.

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

use boveda_core::Period;
use boveda_shared::types::{CutOffId, VaultKey};

use crate::{AppState, error::ledger_error_response, middleware::Actor};

/// Creates the cut-off routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cutoffs", post(open_cut_off))
        .route("/cutoffs/{id}", get(get_cut_off))
        .route("/cutoffs/{id}/close", post(close_cut_off))
        .route("/cutoffs/{id}/audit", post(audit_cut_off))
        .route("/cutoffs/{id}/reconcile", post(reconcile_cut_off))
}

/// Request body for opening a cut-off.
#[derive(Debug, Deserialize)]
pub struct OpenCutOffRequest {
    /// Vault key.
    pub vault: VaultKey,
    /// First day.
    pub start: NaiveDate,
    /// Last day.
    pub end: NaiveDate,
    /// Balance at the start; defaults to the completed balance before `start`.
    pub opening_balance: Option<Decimal>,
}

/// Request body for closing a cut-off.
#[derive(Debug, Deserialize)]
pub struct CloseCutOffRequest {
    /// Balance actually counted.
    pub actual_closing: Decimal,
    /// Closing notes.
    pub notes: Option<String>,
}

/// Request body for auditing a cut-off.
#[derive(Debug, Default, Deserialize)]
pub struct AuditCutOffRequest {
    /// Audit notes.
    pub notes: Option<String>,
}

/// POST `/cutoffs` - Opens a cut-off.
async fn open_cut_off(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<OpenCutOffRequest>,
) -> impl IntoResponse {
    let period = match Period::new(payload.start, payload.end) {
        Ok(period) => period,
        Err(e) => return ledger_error_response(&e),
    };
    match state
        .ledger
        .open_cut_off(&payload.vault, period, payload.opening_balance, actor.id())
        .await
    {
        Ok(cut_off) => (StatusCode::CREATED, Json(cut_off.view())).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/cutoffs/{id}` - One cut-off; open ones carry live totals.
async fn get_cut_off(State(state): State<AppState>, Path(id): Path<CutOffId>) -> impl IntoResponse {
    match state.ledger.get_cut_off(id).await {
        Ok(cut_off) => (StatusCode::OK, Json(cut_off.view())).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/cutoffs/{id}/close` - Closes with the counted balance.
async fn close_cut_off(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<CutOffId>,
    Json(payload): Json<CloseCutOffRequest>,
) -> impl IntoResponse {
    match state
        .ledger
        .close_cut_off(id, payload.actual_closing, actor.id(), payload.notes)
        .await
    {
        Ok(cut_off) => (StatusCode::OK, Json(cut_off.view())).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/cutoffs/{id}/audit` - Audits a closed cut-off.
async fn audit_cut_off(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<CutOffId>,
    Json(payload): Json<AuditCutOffRequest>,
) -> impl IntoResponse {
    match state.ledger.audit_cut_off(id, actor.id(), payload.notes).await {
        Ok(cut_off) => (StatusCode::OK, Json(cut_off.view())).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/cutoffs/{id}/reconcile` - Marks an audited cut-off as reconciled.
async fn reconcile_cut_off(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<CutOffId>,
) -> impl IntoResponse {
    match state.ledger.mark_cut_off_reconciled(id, actor.id()).await {
        Ok(cut_off) => (StatusCode::OK, Json(cut_off.view())).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

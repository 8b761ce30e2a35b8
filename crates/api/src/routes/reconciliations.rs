//! Reconciliation routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::Deserialize;

use boveda_core::Period;
use boveda_core::reconciliation::{ResolutionAction, RunRequest, StatementLine};
use boveda_shared::types::{DifferenceId, ReconciliationRunId, VaultKey};

use crate::{AppState, error::ledger_error_response, middleware::Actor};

/// Creates the reconciliation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reconciliations", post(run_reconciliation))
        .route("/reconciliations/{id}", get(get_reconciliation))
        .route(
            "/reconciliations/{id}/differences/{diff}/resolve",
            post(resolve_difference),
        )
        .route("/reconciliations/{id}/review", post(review_reconciliation))
        .route("/reconciliations/{id}/approve", post(approve_reconciliation))
}

/// Request body for a reconciliation run.
#[derive(Debug, Deserialize)]
pub struct RunReconciliationRequest {
    /// Vault key.
    pub vault: VaultKey,
    /// First day covered.
    pub start: NaiveDate,
    /// Last day covered.
    pub end: NaiveDate,
    /// Statement source, e.g. the bank name.
    pub source: String,
    /// Statement lines.
    pub lines: Vec<StatementLine>,
}

/// Request body for resolving a difference.
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    /// Explanation; required.
    pub note: String,
    /// How the difference is settled.
    pub action: ResolutionAction,
}

/// POST `/reconciliations` - Matches a statement against the ledger.
async fn run_reconciliation(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<RunReconciliationRequest>,
) -> impl IntoResponse {
    let period = match Period::new(payload.start, payload.end) {
        Ok(period) => period,
        Err(e) => return ledger_error_response(&e),
    };
    let request = RunRequest {
        vault: payload.vault,
        period,
        source: payload.source,
        lines: payload.lines,
        actor: actor.id(),
    };
    match state.ledger.run_reconciliation(request).await {
        Ok(run) => (StatusCode::CREATED, Json(run.view())).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/reconciliations/{id}` - One run with its derived figures.
async fn get_reconciliation(
    State(state): State<AppState>,
    Path(id): Path<ReconciliationRunId>,
) -> impl IntoResponse {
    match state.ledger.get_reconciliation(id).await {
        Ok(run) => (StatusCode::OK, Json(run.view())).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/reconciliations/{id}/differences/{diff}/resolve` - Resolves a difference.
async fn resolve_difference(
    State(state): State<AppState>,
    actor: Actor,
    Path((id, diff)): Path<(ReconciliationRunId, DifferenceId)>,
    Json(payload): Json<ResolveRequest>,
) -> impl IntoResponse {
    match state
        .ledger
        .resolve_difference(id, diff, &payload.note, payload.action, actor.id())
        .await
    {
        Ok(run) => (StatusCode::OK, Json(run.view())).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/reconciliations/{id}/review` - Records a reviewer.
async fn review_reconciliation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<ReconciliationRunId>,
) -> impl IntoResponse {
    match state.ledger.review_reconciliation(id, actor.id()).await {
        Ok(run) => (StatusCode::OK, Json(run.view())).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/reconciliations/{id}/approve` - Approves a reconciled run.
async fn approve_reconciliation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<ReconciliationRunId>,
) -> impl IntoResponse {
    match state.ledger.approve_reconciliation(id, actor.id()).await {
        Ok(run) => (StatusCode::OK, Json(run.view())).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

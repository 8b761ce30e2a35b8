//! Vault routes: balances and per-vault listings.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use boveda_core::cutoff::CutOff;
use boveda_shared::types::VaultKey;

use crate::{
    AppState, error::ledger_error_response, middleware::Actor, routes::PeriodParams,
};

/// Creates the vault routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/vaults", get(list_vaults))
        .route("/vaults/{key}", get(get_vault))
        .route("/vaults/{key}/active", put(set_active))
        .route("/vaults/{key}/balance", get(get_balance))
        .route("/vaults/{key}/movements", get(list_movements))
        .route("/vaults/{key}/transfers", get(list_transfers))
        .route("/vaults/{key}/cutoffs", get(list_cut_offs))
}

/// Request body for enabling or disabling a vault.
#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    /// Whether the vault accepts movements.
    pub active: bool,
}

/// GET `/vaults` - Every vault with its balance.
async fn list_vaults(State(state): State<AppState>) -> impl IntoResponse {
    match state.ledger.list_vaults().await {
        Ok(vaults) => (StatusCode::OK, Json(json!({ "vaults": vaults }))).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/vaults/{key}` - One vault.
async fn get_vault(State(state): State<AppState>, Path(key): Path<VaultKey>) -> impl IntoResponse {
    match state.ledger.get_vault(&key).await {
        Ok(vault) => (StatusCode::OK, Json(vault)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// PUT `/vaults/{key}/active` - Enables or disables a vault.
async fn set_active(
    State(state): State<AppState>,
    actor: Actor,
    Path(key): Path<VaultKey>,
    Json(payload): Json<SetActiveRequest>,
) -> impl IntoResponse {
    match state.ledger.set_vault_active(&key, payload.active).await {
        Ok(vault) => {
            info!(vault = %key, active = payload.active, actor = %actor.0, "Vault activity changed");
            (StatusCode::OK, Json(vault)).into_response()
        }
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/vaults/{key}/balance` - Current balance.
async fn get_balance(State(state): State<AppState>, Path(key): Path<VaultKey>) -> impl IntoResponse {
    match state.ledger.get_vault_balance(&key).await {
        Ok(balance) => (
            StatusCode::OK,
            Json(json!({
                "vault": key,
                "balance": balance.amount,
                "currency": balance.currency
            })),
        )
            .into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/vaults/{key}/movements?start=&end=` - Movements dated within the period.
async fn list_movements(
    State(state): State<AppState>,
    Path(key): Path<VaultKey>,
    Query(params): Query<PeriodParams>,
) -> impl IntoResponse {
    let period = match params.period() {
        Ok(period) => period,
        Err(e) => return ledger_error_response(&e),
    };
    match state.ledger.list_movements(&key, &period).await {
        Ok(movements) => (StatusCode::OK, Json(json!({ "movements": movements }))).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/vaults/{key}/transfers` - Transfers touching the vault.
async fn list_transfers(
    State(state): State<AppState>,
    Path(key): Path<VaultKey>,
) -> impl IntoResponse {
    match state.ledger.list_transfers(&key).await {
        Ok(transfers) => (StatusCode::OK, Json(json!({ "transfers": transfers }))).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/vaults/{key}/cutoffs` - Cut-offs of the vault.
async fn list_cut_offs(
    State(state): State<AppState>,
    Path(key): Path<VaultKey>,
) -> impl IntoResponse {
    match state.ledger.list_cut_offs(&key).await {
        Ok(cut_offs) => {
            let views: Vec<_> = cut_offs.iter().map(CutOff::view).collect();
            (StatusCode::OK, Json(json!({ "cut_offs": views }))).into_response()
        }
        Err(e) => ledger_error_response(&e),
    }
}

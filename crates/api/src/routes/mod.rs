//! API route definitions.

use axum::{Router, middleware};
use chrono::NaiveDate;
use serde::Deserialize;

use boveda_core::Period;

use crate::{AppState, middleware::actor_middleware};

pub mod cutoffs;
pub mod health;
pub mod movements;
pub mod reconciliations;
pub mod transfers;
pub mod vaults;

/// Creates the API router.
///
/// Everything except the health check requires an `X-Actor-Id` header.
pub fn api_routes() -> Router<AppState> {
    let ledger_routes = Router::new()
        .merge(vaults::routes())
        .merge(movements::routes())
        .merge(transfers::routes())
        .merge(cutoffs::routes())
        .merge(reconciliations::routes())
        .layer(middleware::from_fn(actor_middleware));

    Router::new().merge(health::routes()).merge(ledger_routes)
}

/// `start`/`end` query or body fields, both inclusive.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PeriodParams {
    /// First day.
    pub start: NaiveDate,
    /// Last day.
    pub end: NaiveDate,
}

impl PeriodParams {
    /// Validated period.
    pub fn period(self) -> Result<Period, boveda_core::LedgerError> {
        Period::new(self.start, self.end)
    }
}

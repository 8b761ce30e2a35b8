//! Reconciliation runs over stored movements.
//!
//! A run is keyed by vault, period and the fingerprints of both sides. Running
//! the same statement against an unchanged ledger returns the stored run
//! instead of creating a second one.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{info, warn};

use boveda_core::reconciliation::fingerprint::{statement_fingerprint, system_fingerprint};
use boveda_core::reconciliation::{
    Matcher, ReconciliationRun, ReconciliationService, ResolutionAction, RunRequest,
};
use boveda_core::{LedgerError, LedgerResult};
use boveda_shared::types::{ActorId, DifferenceId, ReconciliationRunId};

use crate::store::{LedgerStore, RunKey};
use crate::vault_store::VaultStore;

/// Runs and resolves reconciliations.
pub struct ReconciliationEngine {
    store: Arc<dyn LedgerStore>,
    vaults: Arc<VaultStore>,
    matcher: Matcher,
    threshold_pct: Decimal,
    // one writer at a time so concurrent identical runs collapse into one
    writes: Mutex<()>,
}

impl ReconciliationEngine {
    /// Creates a reconciliation engine.
    pub fn new(
        store: Arc<dyn LedgerStore>,
        vaults: Arc<VaultStore>,
        matcher: Matcher,
        threshold_pct: Decimal,
    ) -> Self {
        Self {
            store,
            vaults,
            matcher,
            threshold_pct,
            writes: Mutex::new(()),
        }
    }

    /// Matches a statement against the vault's completed movements in the period.
    pub async fn reconcile(&self, request: RunRequest) -> LedgerResult<ReconciliationRun> {
        self.vaults.get_vault(&request.vault).await?;
        ReconciliationService::validate_lines(&request.lines)?;
        let _write = self.writes.lock().await;

        let movements = self.store.movements_by_vault(&request.vault).await?;
        let system = ReconciliationService::system_side(&request.vault, &request.period, &movements);
        let key = RunKey {
            vault: request.vault.clone(),
            period: request.period,
            statement_fingerprint: statement_fingerprint(&request.lines),
            system_fingerprint: system_fingerprint(&system),
        };
        if let Some(existing) = self.store.find_run(&key).await? {
            info!(run_id = %existing.id, vault = %key.vault, "Reconciliation already run, returning stored run");
            return Ok(existing);
        }

        let run = ReconciliationService::run(request, &system, self.matcher, self.threshold_pct, Utc::now())?;
        self.store.save_run(run.clone()).await?;
        info!(
            run_id = %run.id,
            vault = %run.vault,
            period = %run.period,
            matched = run.matched_count(),
            differences = run.differences.len(),
            match_pct = %run.match_pct(),
            "Reconciliation run stored"
        );
        Ok(run)
    }

    /// Resolves one difference of a run.
    pub async fn resolve_difference(
        &self,
        run_id: ReconciliationRunId,
        difference: DifferenceId,
        note: &str,
        action: ResolutionAction,
        actor: ActorId,
    ) -> LedgerResult<ReconciliationRun> {
        let _write = self.writes.lock().await;
        let run = self.get(run_id).await?;
        let resolved = ReconciliationService::resolve(&run, difference, note, action, actor, Utc::now())
            .inspect_err(|e| warn!(run_id = %run_id, difference_id = %difference, error = %e, "Resolution rejected"))?;
        self.store.save_run(resolved.clone()).await?;
        info!(
            run_id = %run_id,
            difference_id = %difference,
            pending = resolved.pending_count(),
            reconciled = resolved.is_reconciled(),
            "Difference resolved"
        );
        Ok(resolved)
    }

    /// Records a reviewer on a run.
    pub async fn review(&self, run_id: ReconciliationRunId, actor: ActorId) -> LedgerResult<ReconciliationRun> {
        let _write = self.writes.lock().await;
        let run = self.get(run_id).await?;
        let reviewed = ReconciliationService::review(&run, actor, Utc::now())?;
        self.store.save_run(reviewed.clone()).await?;
        info!(run_id = %run_id, "Reconciliation reviewed");
        Ok(reviewed)
    }

    /// Approves a reconciled run.
    pub async fn approve(&self, run_id: ReconciliationRunId, actor: ActorId) -> LedgerResult<ReconciliationRun> {
        let _write = self.writes.lock().await;
        let run = self.get(run_id).await?;
        let approved = ReconciliationService::approve(&run, actor, Utc::now())?;
        self.store.save_run(approved.clone()).await?;
        info!(run_id = %run_id, "Reconciliation approved");
        Ok(approved)
    }

    /// Fetches one run.
    pub async fn get(&self, run_id: ReconciliationRunId) -> LedgerResult<ReconciliationRun> {
        self.store
            .get_run(run_id)
            .await?
            .ok_or(LedgerError::RunNotFound(run_id))
    }
}

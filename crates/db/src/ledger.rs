//! The `VaultLedger` facade: the single entry point for commands and queries.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

use boveda_core::cutoff::CutOff;
use boveda_core::movement::{Movement, MovementDraft, MovementKind};
use boveda_core::period::Period;
use boveda_core::reconciliation::{Matcher, ReconciliationRun, ResolutionAction, RunRequest};
use boveda_core::transfer::{Transfer, TransferRequest};
use boveda_core::vault::{Vault, VaultSummary};
use boveda_core::{LedgerError, LedgerResult};
use boveda_shared::config::{AppConfig, LedgerConfig, VaultSeed};
use boveda_shared::types::{
    ActorId, CutOffId, DifferenceId, Money, MovementId, ReconciliationRunId,
    TransferId, VaultKey,
};

use crate::cutoff_engine::CutOffEngine;
use crate::idempotency::{IdempotencyCache, Outcome};
use crate::movement_ledger::MovementLedger;
use crate::reconciliation_engine::ReconciliationEngine;
use crate::retry::RetryPolicy;
use crate::store::{InMemoryStore, LedgerStore};
use crate::transfer_coordinator::TransferCoordinator;
use crate::vault_store::VaultStore;

/// Actor recorded on movements the ledger books by itself.
pub const SYSTEM_ACTOR: &str = "system";

/// Concept of the movement that books a vault's opening balance.
pub const OPENING_CONCEPT: &str = "Saldo inicial";

/// Multi-vault ledger with transfers, cut-offs and reconciliation.
pub struct VaultLedger {
    vaults: Arc<VaultStore>,
    movements: MovementLedger,
    transfers: TransferCoordinator,
    cut_offs: CutOffEngine,
    reconciliations: ReconciliationEngine,
    idempotency: IdempotencyCache,
}

impl VaultLedger {
    /// Wires the ledger components over a store. No vaults are created.
    pub fn new(config: &LedgerConfig, store: Arc<dyn LedgerStore>) -> Self {
        let retry = RetryPolicy::from(&config.retry);
        let vaults = Arc::new(VaultStore::new(Arc::clone(&store), retry));
        Self {
            movements: MovementLedger::new(Arc::clone(&store), Arc::clone(&vaults), retry),
            transfers: TransferCoordinator::new(
                Arc::clone(&store),
                Arc::clone(&vaults),
                retry,
                Duration::from_millis(config.saga_step_timeout_ms),
            ),
            cut_offs: CutOffEngine::new(Arc::clone(&store), Arc::clone(&vaults)),
            reconciliations: ReconciliationEngine::new(
                store,
                Arc::clone(&vaults),
                Matcher::new(config.reconciliation.date_window_days),
                config.reconciliation.match_threshold_pct,
            ),
            idempotency: IdempotencyCache::with_config(
                config.idempotency_capacity,
                config.idempotency_ttl_secs,
            ),
            vaults,
        }
    }

    /// Builds the ledger and creates every configured vault that does not exist yet.
    pub async fn bootstrap(config: &AppConfig, store: Arc<dyn LedgerStore>) -> LedgerResult<Self> {
        let ledger = Self::new(&config.ledger, store);
        for seed in &config.vaults {
            ledger.seed_vault(seed).await?;
        }
        Ok(ledger)
    }

    /// Builds a ledger over a fresh in-memory store.
    pub async fn in_memory(config: &AppConfig) -> LedgerResult<Self> {
        Self::bootstrap(config, Arc::new(InMemoryStore::new())).await
    }

    /// Creates a vault from its configuration entry and books its opening
    /// balance as a completed deposit. Existing vaults are left alone.
    pub async fn seed_vault(&self, seed: &VaultSeed) -> LedgerResult<()> {
        let vault = Vault::from_seed(seed)?;
        let key = vault.key.clone();
        if self.vaults.get_vault(&key).await.is_ok() {
            return Ok(());
        }

        // book the opening balance while the vault still accepts movements
        let mut staged = vault.clone();
        staged.active = true;
        self.vaults.register(staged).await?;

        if seed.opening_balance > Decimal::ZERO {
            let actor = ActorId::new(SYSTEM_ACTOR).map_err(LedgerError::Internal)?;
            let draft = MovementDraft::new(
                key.clone(),
                MovementKind::Deposit,
                seed.opening_balance,
                OPENING_CONCEPT,
                Utc::now().date_naive(),
                actor,
            )
            .with_category("apertura");
            self.movements.record(draft).await?;
            info!(vault = %key, opening = %seed.opening_balance, "Opening balance booked");
        }
        if !vault.active {
            self.vaults.set_active(&key, false).await?;
        }
        Ok(())
    }

    // ========== Vaults ==========

    /// Every vault, ordered by key.
    pub async fn list_vaults(&self) -> LedgerResult<Vec<VaultSummary>> {
        Ok(self
            .vaults
            .list_vaults()
            .await?
            .iter()
            .map(Vault::summary)
            .collect())
    }

    /// One vault.
    pub async fn get_vault(&self, key: &VaultKey) -> LedgerResult<VaultSummary> {
        Ok(self.vaults.get_vault(key).await?.summary())
    }

    /// Current balance of a vault, rounded for reporting.
    pub async fn get_vault_balance(&self, key: &VaultKey) -> LedgerResult<Money> {
        Ok(self.get_vault(key).await?.balance)
    }

    /// Enables or disables a vault.
    pub async fn set_vault_active(&self, key: &VaultKey, active: bool) -> LedgerResult<VaultSummary> {
        Ok(self.vaults.set_active(key, active).await?.summary())
    }

    // ========== Movements ==========

    /// Records a movement and applies it to its vault.
    ///
    /// A draft carrying an operation id replays the first outcome for that id.
    pub async fn record_movement(&self, draft: MovementDraft) -> LedgerResult<Movement> {
        let Some(key) = draft.operation_id.clone() else {
            return self.movements.record(draft).await;
        };
        let outcome = self
            .idempotency
            .execute(&key, "record_movement", async {
                self.movements.record(draft).await.map(Outcome::Movement)
            })
            .await?;
        match outcome {
            Outcome::Movement(movement) => Ok(movement),
            Outcome::Transfer(_) => Err(LedgerError::IdempotencyConflict(key)),
        }
    }

    /// Stores a movement as pending without touching the balance.
    pub async fn submit_pending_movement(&self, draft: MovementDraft) -> LedgerResult<Movement> {
        self.movements.submit_pending(draft).await
    }

    /// Applies a pending movement.
    pub async fn confirm_movement(&self, id: MovementId, actor: ActorId) -> LedgerResult<Movement> {
        self.movements.confirm(id, actor).await
    }

    /// Cancels a pending movement.
    pub async fn cancel_movement(&self, id: MovementId, actor: ActorId) -> LedgerResult<Movement> {
        self.movements.cancel(id, actor).await
    }

    /// Reverses a completed movement with an offsetting adjustment.
    pub async fn reverse_movement(
        &self,
        id: MovementId,
        reason: &str,
        actor: ActorId,
    ) -> LedgerResult<Movement> {
        self.movements.reverse(id, reason, actor).await
    }

    /// One movement.
    pub async fn get_movement(&self, id: MovementId) -> LedgerResult<Movement> {
        self.movements.get(id).await
    }

    /// Movements of a vault in a period, ordered by date then sequence.
    pub async fn list_movements(&self, key: &VaultKey, period: &Period) -> LedgerResult<Vec<Movement>> {
        self.movements.list_by_vault_and_period(key, period).await
    }

    // ========== Transfers ==========

    /// Moves money between two vaults.
    ///
    /// A request carrying an operation id replays the first outcome for that id.
    pub async fn transfer(&self, request: TransferRequest) -> LedgerResult<Transfer> {
        let Some(key) = request.operation_id.clone() else {
            return self.transfers.transfer(request).await;
        };
        let outcome = self
            .idempotency
            .execute(&key, "transfer", async {
                self.transfers.transfer(request).await.map(Outcome::Transfer)
            })
            .await?;
        match outcome {
            Outcome::Transfer(transfer) => Ok(transfer),
            Outcome::Movement(_) => Err(LedgerError::IdempotencyConflict(key)),
        }
    }

    /// One transfer.
    pub async fn get_transfer(&self, id: TransferId) -> LedgerResult<Transfer> {
        self.transfers.get_transfer(id).await
    }

    /// Transfers touching a vault.
    pub async fn list_transfers(&self, key: &VaultKey) -> LedgerResult<Vec<Transfer>> {
        self.transfers.list_transfers(key).await
    }

    // ========== Cut-offs ==========

    /// Opens a cut-off.
    pub async fn open_cut_off(
        &self,
        key: &VaultKey,
        period: Period,
        opening_balance: Option<Decimal>,
        actor: ActorId,
    ) -> LedgerResult<CutOff> {
        self.cut_offs.open(key, period, opening_balance, actor).await
    }

    /// Closes a cut-off with the counted balance.
    pub async fn close_cut_off(
        &self,
        id: CutOffId,
        actual_closing: Decimal,
        actor: ActorId,
        notes: Option<String>,
    ) -> LedgerResult<CutOff> {
        self.cut_offs.close(id, actual_closing, actor, notes).await
    }

    /// Audits a closed cut-off.
    pub async fn audit_cut_off(
        &self,
        id: CutOffId,
        auditor: ActorId,
        notes: Option<String>,
    ) -> LedgerResult<CutOff> {
        self.cut_offs.audit(id, auditor, notes).await
    }

    /// Marks an audited cut-off as reconciled.
    pub async fn mark_cut_off_reconciled(&self, id: CutOffId, actor: ActorId) -> LedgerResult<CutOff> {
        self.cut_offs.mark_reconciled(id, actor).await
    }

    /// One cut-off.
    pub async fn get_cut_off(&self, id: CutOffId) -> LedgerResult<CutOff> {
        self.cut_offs.get(id).await
    }

    /// Cut-offs of a vault.
    pub async fn list_cut_offs(&self, key: &VaultKey) -> LedgerResult<Vec<CutOff>> {
        self.cut_offs.list(key).await
    }

    // ========== Reconciliation ==========

    /// Reconciles a vault against a statement.
    pub async fn run_reconciliation(&self, request: RunRequest) -> LedgerResult<ReconciliationRun> {
        self.reconciliations.reconcile(request).await
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
        self.reconciliations
            .resolve_difference(run_id, difference, note, action, actor)
            .await
    }

    /// Records a reviewer on a run.
    pub async fn review_reconciliation(
        &self,
        run_id: ReconciliationRunId,
        actor: ActorId,
    ) -> LedgerResult<ReconciliationRun> {
        self.reconciliations.review(run_id, actor).await
    }

    /// Approves a reconciled run.
    pub async fn approve_reconciliation(
        &self,
        run_id: ReconciliationRunId,
        actor: ActorId,
    ) -> LedgerResult<ReconciliationRun> {
        self.reconciliations.approve(run_id, actor).await
    }

    /// One run.
    pub async fn get_reconciliation(&self, run_id: ReconciliationRunId) -> LedgerResult<ReconciliationRun> {
        self.reconciliations.get(run_id).await
    }
}

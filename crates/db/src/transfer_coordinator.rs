//! Transfer saga execution.
//!
//! Both vaults are locked in key order for the whole saga. Each step runs under
//! the configured timeout; a failed or timed-out step hands the recorded
//! [`SagaProgress`] to the core planner, which names the compensations to run.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use boveda_core::movement::{Movement, MovementService, MovementStatus};
use boveda_core::transfer::{
    Compensation, SagaProgress, SagaStep, Transfer, TransferPlan, TransferRequest,
    TransferService, TransferStatus,
};
use boveda_core::vault::Vault;
use boveda_core::{LedgerError, LedgerResult};
use boveda_shared::types::{MovementId, TransferId, VaultKey};

use crate::retry::RetryPolicy;
use crate::store::LedgerStore;
use crate::vault_store::{VaultGuard, VaultStore};

/// Runs transfers between vaults.
pub struct TransferCoordinator {
    store: Arc<dyn LedgerStore>,
    vaults: Arc<VaultStore>,
    retry: RetryPolicy,
    step_timeout: Duration,
}

impl TransferCoordinator {
    /// Creates a coordinator.
    pub fn new(
        store: Arc<dyn LedgerStore>,
        vaults: Arc<VaultStore>,
        retry: RetryPolicy,
        step_timeout: Duration,
    ) -> Self {
        Self {
            store,
            vaults,
            retry,
            step_timeout,
        }
    }

    /// Moves money between two vaults.
    ///
    /// Either both legs end up completed, or no balance is left changed and
    /// the transfer is stored as failed or compensated.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Origin and destination are the same vault
    /// - The amount is not positive or the concept is invalid
    /// - Either vault is unknown or inactive, or currencies differ
    /// - The origin lacks funds
    /// - A saga step fails or times out (after compensation)
    pub async fn transfer(&self, request: TransferRequest) -> LedgerResult<Transfer> {
        TransferService::validate_request(&request).inspect_err(|e| {
            warn!(origin = %request.origin, destination = %request.destination, error = %e, "Transfer rejected");
        })?;

        let (origin_guard, destination_guard) =
            self.vaults.lock_pair(&request.origin, &request.destination).await;
        let origin = self.vaults.get_vault(&request.origin).await?;
        let destination = self.vaults.get_vault(&request.destination).await?;
        let sequences = (
            self.store.next_sequence(&origin.key).await?,
            self.store.next_sequence(&destination.key).await?,
        );

        let now = Utc::now();
        let plan = TransferService::plan(request, &origin, &destination, sequences, now.date_naive(), now)
            .inspect_err(|e| {
                warn!(origin = %origin.key, destination = %destination.key, error = %e, "Transfer rejected");
            })?;
        self.save_transfer(&plan.transfer).await?;

        let mut progress = SagaProgress::default();
        match self
            .execute(&plan, &origin_guard, &destination_guard, &mut progress)
            .await
        {
            Ok(transfer) => {
                info!(
                    transfer_id = %transfer.id,
                    origin = %transfer.origin,
                    destination = %transfer.destination,
                    amount = %transfer.amount,
                    "Transfer completed"
                );
                Ok(transfer)
            }
            Err((step, e)) => {
                warn!(transfer_id = %plan.transfer.id, step = step.as_str(), error = %e, "Transfer step failed, compensating");
                self.compensate(&plan, progress, step, &e, &origin_guard, &destination_guard)
                    .await?;
                Err(e)
            }
        }
    }

    /// Fetches one transfer.
    pub async fn get_transfer(&self, id: TransferId) -> LedgerResult<Transfer> {
        self.store
            .get_transfer(id)
            .await?
            .ok_or(LedgerError::TransferNotFound(id))
    }

    /// Transfers touching a vault, oldest first.
    pub async fn list_transfers(&self, key: &VaultKey) -> LedgerResult<Vec<Transfer>> {
        self.vaults.get_vault(key).await?;
        self.store.transfers_by_vault(key).await
    }

    async fn execute(
        &self,
        plan: &TransferPlan,
        origin: &VaultGuard,
        destination: &VaultGuard,
        progress: &mut SagaProgress,
    ) -> Result<Transfer, (SagaStep, LedgerError)> {
        self.step(SagaStep::WriteOutLeg, self.insert_leg(&plan.out_leg))
            .await?;
        progress.out_written = true;

        self.step(SagaStep::WriteInLeg, self.insert_leg(&plan.in_leg))
            .await?;
        progress.in_written = true;

        let at = Utc::now();
        let origin_after = self
            .apply_leg(SagaStep::ApplyOutLeg, origin, &plan.out_leg, at, &mut progress.out_applied)
            .await?;
        let destination_after = self
            .apply_leg(SagaStep::ApplyInLeg, destination, &plan.in_leg, at, &mut progress.in_applied)
            .await?;

        self.step(SagaStep::Commit, async {
            let now = Utc::now();
            let out_leg = MovementService::complete(&plan.out_leg, origin_after.balance(), now)?;
            let in_leg = MovementService::complete(&plan.in_leg, destination_after.balance(), now)?;
            self.persist_leg(&out_leg).await?;
            self.persist_leg(&in_leg).await?;
            let mut transfer = plan.transfer.clone();
            transfer.status = TransferStatus::Completed;
            self.save_transfer(&transfer).await?;
            Ok(transfer)
        })
        .await
    }

    /// Applies one leg's balance effect.
    ///
    /// When the step fails the vault version is compared with the one read
    /// before the step, so a write that landed just before a timeout is still
    /// recorded in `applied` and gets compensated.
    async fn apply_leg(
        &self,
        step: SagaStep,
        guard: &VaultGuard,
        leg: &Movement,
        at: DateTime<Utc>,
        applied: &mut bool,
    ) -> Result<Vault, (SagaStep, LedgerError)> {
        let before = self
            .vaults
            .get_vault(guard.key())
            .await
            .map_err(|e| (step, e))?
            .version();
        match self
            .step(step, self.vaults.apply_movement_locked(guard, leg, at))
            .await
        {
            Ok(vault) => {
                *applied = true;
                Ok(vault)
            }
            Err(failure) => {
                if let Ok(current) = self.vaults.get_vault(guard.key()).await {
                    *applied = current.version() != before;
                }
                Err(failure)
            }
        }
    }

    /// Undoes whatever the saga managed to do and records the final status.
    async fn compensate(
        &self,
        plan: &TransferPlan,
        progress: SagaProgress,
        failed_at: SagaStep,
        cause: &LedgerError,
        origin: &VaultGuard,
        destination: &VaultGuard,
    ) -> LedgerResult<()> {
        let (actions, status) = progress.compensations(plan, failed_at);
        let actor = plan.transfer.created_by.clone();

        for action in actions {
            let result = match action {
                Compensation::CancelLeg(id) => {
                    let leg = self.current_leg(plan, id).await?;
                    match MovementService::cancel(&leg, actor.clone(), Utc::now()) {
                        Ok(cancelled) => self.persist_leg(&cancelled).await,
                        Err(e) => Err(e),
                    }
                }
                Compensation::FailLeg(id) => {
                    let leg = self.current_leg(plan, id).await?;
                    match MovementService::fail(&leg, Utc::now()) {
                        Ok(failed) => self.persist_leg(&failed).await,
                        Err(e) => Err(e),
                    }
                }
                Compensation::RevertLeg(id) => {
                    let leg = self.current_leg(plan, id).await?;
                    let guard = if leg.vault == plan.out_leg.vault { origin } else { destination };
                    self.revert_leg(&leg, guard).await
                }
            };
            if let Err(e) = result {
                error!(transfer_id = %plan.transfer.id, ?action, error = %e, "Compensation failed");
                return Err(LedgerError::ManualReconciliationRequired(format!(
                    "transfer {} could not be compensated: {e}",
                    plan.transfer.id
                )));
            }
        }

        let mut transfer = plan.transfer.clone();
        transfer.status = status;
        transfer.failure_reason = Some(format!("{}: {cause}", failed_at.as_str()));
        self.save_transfer(&transfer).await?;
        info!(transfer_id = %transfer.id, status = %status, "Transfer rolled back");
        Ok(())
    }

    /// Undoes an applied leg's balance effect and marks it reversed.
    async fn revert_leg(&self, leg: &Movement, guard: &VaultGuard) -> LedgerResult<()> {
        let vault = self.vaults.revert_locked(guard, leg.amount, Utc::now()).await?;
        let completed = if leg.status == MovementStatus::Pending {
            MovementService::complete(leg, vault.balance() + leg.amount, Utc::now())?
        } else {
            leg.clone()
        };
        let reversed = MovementService::mark_compensated(&completed, Utc::now())?;
        self.persist_leg(&reversed).await
    }

    /// Latest stored version of a leg, falling back to the planned one.
    async fn current_leg(&self, plan: &TransferPlan, id: MovementId) -> LedgerResult<Movement> {
        if let Some(stored) = self.store.get_movement(id).await? {
            return Ok(stored);
        }
        Ok(if plan.out_leg.id == id {
            plan.out_leg.clone()
        } else {
            plan.in_leg.clone()
        })
    }

    async fn step<T>(
        &self,
        step: SagaStep,
        work: impl Future<Output = LedgerResult<T>>,
    ) -> Result<T, (SagaStep, LedgerError)> {
        match tokio::time::timeout(self.step_timeout, work).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err((step, e)),
            Err(_) => Err((step, LedgerError::StepTimedOut { step: step.as_str() })),
        }
    }

    async fn insert_leg(&self, leg: &Movement) -> LedgerResult<()> {
        self.retry
            .run("insert_leg", || self.store.insert_movement(leg.clone()))
            .await
    }

    async fn persist_leg(&self, leg: &Movement) -> LedgerResult<()> {
        self.retry
            .run("update_leg", || self.store.update_movement(leg.clone()))
            .await
    }

    async fn save_transfer(&self, transfer: &Transfer) -> LedgerResult<()> {
        self.retry
            .run("save_transfer", || self.store.save_transfer(transfer.clone()))
            .await
    }
}

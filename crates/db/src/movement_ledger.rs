//! Movement recording, confirmation, cancellation and reversal.
//!
//! Every command runs under the target vault's lock: the movement is stored as
//! pending, the vault store applies it exactly once, and only then is it marked
//! completed. A movement whose application fails is kept as failed so the
//! attempt stays visible without counting toward the balance.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use boveda_core::movement::validation::validate_draft;
use boveda_core::movement::{Movement, MovementDraft, MovementService, MovementStatus};
use boveda_core::period::Period;
use boveda_core::{LedgerError, LedgerResult};
use boveda_shared::types::{ActorId, MovementId, VaultKey};

use crate::retry::RetryPolicy;
use crate::store::LedgerStore;
use crate::vault_store::{VaultGuard, VaultStore};

/// Movement side of the ledger.
pub struct MovementLedger {
    store: Arc<dyn LedgerStore>,
    vaults: Arc<VaultStore>,
    retry: RetryPolicy,
}

impl MovementLedger {
    /// Creates a movement ledger.
    pub fn new(store: Arc<dyn LedgerStore>, vaults: Arc<VaultStore>, retry: RetryPolicy) -> Self {
        Self {
            store,
            vaults,
            retry,
        }
    }

    /// Records a movement and applies it to its vault.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The vault does not exist
    /// - The draft is invalid (amount, sign, concept, notes, currency)
    /// - The vault is inactive or lacks funds; the movement is then kept as failed
    pub async fn record(&self, draft: MovementDraft) -> LedgerResult<Movement> {
        let guard = self.vaults.lock(&draft.vault).await;
        let pending = self.stage(draft).await?;
        self.apply_pending(&guard, &pending).await
    }

    /// Stores a movement as pending without touching the balance.
    pub async fn submit_pending(&self, draft: MovementDraft) -> LedgerResult<Movement> {
        let _guard = self.vaults.lock(&draft.vault).await;
        let pending = self.stage(draft).await?;
        info!(movement_id = %pending.id, vault = %pending.vault, amount = %pending.amount, "Movement submitted as pending");
        Ok(pending)
    }

    /// Applies a pending movement.
    pub async fn confirm(&self, id: MovementId, actor: ActorId) -> LedgerResult<Movement> {
        let vault = self.get(id).await?.vault;
        let guard = self.vaults.lock(&vault).await;
        let mut pending = self.get(id).await?;
        if pending.status != MovementStatus::Pending {
            return Err(LedgerError::NotPending(id));
        }
        pending.updated_by = actor;
        self.apply_pending(&guard, &pending).await
    }

    /// Cancels a pending movement.
    pub async fn cancel(&self, id: MovementId, actor: ActorId) -> LedgerResult<Movement> {
        let vault = self.get(id).await?.vault;
        let _guard = self.vaults.lock(&vault).await;
        let movement = self.get(id).await?;
        let cancelled = MovementService::cancel(&movement, actor, Utc::now())?;
        self.persist(&cancelled).await?;
        info!(movement_id = %id, vault = %vault, "Movement cancelled");
        Ok(cancelled)
    }

    /// Books an adjustment that offsets a completed movement.
    ///
    /// The original keeps its status and points at the reversal through
    /// `reversed_by`. A reversal is an ordinary completed movement and may
    /// itself be reversed.
    pub async fn reverse(
        &self,
        id: MovementId,
        reason: &str,
        actor: ActorId,
    ) -> LedgerResult<Movement> {
        let vault = self.get(id).await?.vault;
        let guard = self.vaults.lock(&vault).await;
        let original = self.get(id).await?;

        let now = Utc::now();
        let sequence = self.store.next_sequence(&vault).await?;
        let pending =
            MovementService::reversal(&original, reason, actor, sequence, now.date_naive(), now)
                .inspect_err(|e| warn!(movement_id = %id, error = %e, "Reversal rejected"))?;
        self.insert(&pending).await?;

        let reversal = self.apply_pending(&guard, &pending).await?;
        let linked = MovementService::link_reversal(&original, &reversal, Utc::now())?;
        if let Err(e) = self.persist(&linked).await {
            // an unlinked original could be reversed again: undo this one
            error!(movement_id = %id, reversal_id = %reversal.id, error = %e, "Reversal link not persisted, reverting balance");
            self.vaults.revert_locked(&guard, reversal.amount, Utc::now()).await?;
            self.mark_failed(&pending).await;
            return Err(e);
        }
        info!(movement_id = %id, reversal_id = %reversal.id, vault = %vault, "Movement reversed");
        Ok(reversal)
    }

    /// Fetches one movement.
    pub async fn get(&self, id: MovementId) -> LedgerResult<Movement> {
        self.store
            .get_movement(id)
            .await?
            .ok_or(LedgerError::MovementNotFound(id))
    }

    /// Movements of a vault dated within the period, in ledger order.
    ///
    /// Every status is listed; callers filter on `status` as needed.
    pub async fn list_by_vault_and_period(
        &self,
        key: &VaultKey,
        period: &Period,
    ) -> LedgerResult<Vec<Movement>> {
        self.vaults.get_vault(key).await?;
        let mut movements: Vec<Movement> = self
            .store
            .movements_by_vault(key)
            .await?
            .into_iter()
            .filter(|m| period.contains(m.occurred_on))
            .collect();
        movements.sort_by_key(Movement::ordering_key);
        Ok(movements)
    }

    /// Validates a draft against its vault and stores it as pending.
    /// The caller holds the vault's lock.
    async fn stage(&self, draft: MovementDraft) -> LedgerResult<Movement> {
        let vault = self.vaults.get_vault(&draft.vault).await?;
        validate_draft(&draft, vault.currency)
            .inspect_err(|e| warn!(vault = %draft.vault, kind = %draft.kind, error = %e, "Movement rejected"))?;
        let sequence = self.store.next_sequence(&vault.key).await?;
        let pending = MovementService::build(draft, vault.currency, sequence, Utc::now())?;
        self.insert(&pending).await?;
        Ok(pending)
    }

    /// Applies a stored pending movement and records the outcome on it.
    async fn apply_pending(&self, guard: &VaultGuard, pending: &Movement) -> LedgerResult<Movement> {
        match self.vaults.apply_movement_locked(guard, pending, Utc::now()).await {
            Ok(vault) => {
                let completed = MovementService::complete(pending, vault.balance(), Utc::now())?;
                if let Err(e) = self.persist(&completed).await {
                    // the balance moved but the movement could not say so: undo it
                    error!(movement_id = %pending.id, vault = %pending.vault, error = %e, "Completion not persisted, reverting balance");
                    self.vaults.revert_locked(guard, pending.amount, Utc::now()).await?;
                    self.mark_failed(pending).await;
                    return Err(e);
                }
                info!(
                    movement_id = %completed.id,
                    vault = %completed.vault,
                    kind = %completed.kind,
                    amount = %completed.amount,
                    balance = %vault.balance(),
                    "Movement completed"
                );
                Ok(completed)
            }
            Err(e) => {
                warn!(movement_id = %pending.id, vault = %pending.vault, error = %e, "Movement failed");
                self.mark_failed(pending).await;
                Err(e)
            }
        }
    }

    async fn mark_failed(&self, pending: &Movement) {
        let result = match MovementService::fail(pending, Utc::now()) {
            Ok(failed) => self.persist(&failed).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            error!(movement_id = %pending.id, error = %e, "Could not mark movement failed");
        }
    }

    async fn insert(&self, movement: &Movement) -> LedgerResult<()> {
        self.retry
            .run("insert_movement", || self.store.insert_movement(movement.clone()))
            .await
    }

    async fn persist(&self, movement: &Movement) -> LedgerResult<()> {
        self.retry
            .run("update_movement", || self.store.update_movement(movement.clone()))
            .await
    }
}

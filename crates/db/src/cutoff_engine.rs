//! Cut-off lifecycle over stored movements.
//!
//! Totals are always recomputed from the ledger: an open cut-off shows live
//! figures on read, and closing freezes them. Reads take a snapshot of the
//! vault's movements and never wait on vault locks.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{info, warn};

use boveda_core::cutoff::{CutOff, CutOffService};
use boveda_core::movement::Movement;
use boveda_core::period::Period;
use boveda_core::{LedgerError, LedgerResult};
use boveda_shared::types::{ActorId, CutOffId, VaultKey};

use crate::store::LedgerStore;
use crate::vault_store::VaultStore;

/// Opens, closes and audits cut-offs.
pub struct CutOffEngine {
    store: Arc<dyn LedgerStore>,
    vaults: Arc<VaultStore>,
    // serializes cut-off writes so overlap checks see every open cut-off
    writes: Mutex<()>,
}

impl CutOffEngine {
    /// Creates a cut-off engine.
    pub fn new(store: Arc<dyn LedgerStore>, vaults: Arc<VaultStore>) -> Self {
        Self {
            store,
            vaults,
            writes: Mutex::new(()),
        }
    }

    /// Opens a cut-off for a vault and period.
    ///
    /// Without an explicit `opening_balance` the sum of completed movements
    /// dated before the period is used.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The vault does not exist
    /// - An open or closed cut-off of the vault overlaps the period
    pub async fn open(
        &self,
        vault: &VaultKey,
        period: Period,
        opening_balance: Option<Decimal>,
        actor: ActorId,
    ) -> LedgerResult<CutOff> {
        self.vaults.get_vault(vault).await?;
        let _write = self.writes.lock().await;

        let opening = match opening_balance {
            Some(opening) => opening,
            None => self.balance_before(vault, &period).await?,
        };
        let existing = self.store.cut_offs_by_vault(vault).await?;
        let cut_off = CutOffService::open(vault.clone(), period, opening, actor, &existing, Utc::now())
            .inspect_err(|e| warn!(vault = %vault, period = %period, error = %e, "Cut-off rejected"))?;
        let movements = self.store.movements_by_vault(vault).await?;
        let cut_off = CutOffService::refresh(&cut_off, &movements);
        self.store.save_cut_off(cut_off.clone()).await?;

        info!(cut_off_id = %cut_off.id, vault = %vault, period = %period, opening = %opening, "Cut-off opened");
        Ok(cut_off)
    }

    /// Closes an open cut-off with the balance actually counted.
    pub async fn close(
        &self,
        id: CutOffId,
        actual_closing: Decimal,
        actor: ActorId,
        notes: Option<String>,
    ) -> LedgerResult<CutOff> {
        let _write = self.writes.lock().await;
        let cut_off = self.stored(id).await?;
        let movements = self.store.movements_by_vault(&cut_off.vault).await?;
        let closed = CutOffService::close(&cut_off, &movements, actual_closing, actor, notes, Utc::now())?;
        self.store.save_cut_off(closed.clone()).await?;

        if closed.is_balanced() {
            info!(cut_off_id = %id, vault = %closed.vault, "Cut-off closed balanced");
        } else {
            warn!(
                cut_off_id = %id,
                vault = %closed.vault,
                expected = %closed.expected_closing(),
                actual = %actual_closing,
                difference = ?closed.difference(),
                "Cut-off closed with a difference"
            );
        }
        Ok(closed)
    }

    /// Audits a closed cut-off. The auditor must not be the actor who closed it.
    pub async fn audit(
        &self,
        id: CutOffId,
        auditor: ActorId,
        notes: Option<String>,
    ) -> LedgerResult<CutOff> {
        let _write = self.writes.lock().await;
        let cut_off = self.stored(id).await?;
        let audited = CutOffService::audit(&cut_off, auditor, notes, Utc::now())?;
        self.store.save_cut_off(audited.clone()).await?;
        info!(cut_off_id = %id, vault = %audited.vault, "Cut-off audited");
        Ok(audited)
    }

    /// Marks an audited cut-off as reconciled.
    pub async fn mark_reconciled(&self, id: CutOffId, actor: ActorId) -> LedgerResult<CutOff> {
        let _write = self.writes.lock().await;
        let cut_off = self.stored(id).await?;
        let reconciled = CutOffService::mark_reconciled(&cut_off, actor, Utc::now())?;
        self.store.save_cut_off(reconciled.clone()).await?;
        info!(cut_off_id = %id, vault = %reconciled.vault, "Cut-off reconciled");
        Ok(reconciled)
    }

    /// Fetches a cut-off; open ones carry live totals.
    pub async fn get(&self, id: CutOffId) -> LedgerResult<CutOff> {
        let cut_off = self.stored(id).await?;
        let movements = self.store.movements_by_vault(&cut_off.vault).await?;
        Ok(CutOffService::refresh(&cut_off, &movements))
    }

    /// Cut-offs of a vault ordered by period start; open ones carry live totals.
    pub async fn list(&self, vault: &VaultKey) -> LedgerResult<Vec<CutOff>> {
        self.vaults.get_vault(vault).await?;
        let movements = self.store.movements_by_vault(vault).await?;
        Ok(self
            .store
            .cut_offs_by_vault(vault)
            .await?
            .iter()
            .map(|c| CutOffService::refresh(c, &movements))
            .collect())
    }

    async fn stored(&self, id: CutOffId) -> LedgerResult<CutOff> {
        self.store
            .get_cut_off(id)
            .await?
            .ok_or(LedgerError::CutOffNotFound(id))
    }

    async fn balance_before(&self, vault: &VaultKey, period: &Period) -> LedgerResult<Decimal> {
        Ok(self
            .store
            .movements_by_vault(vault)
            .await?
            .iter()
            .filter(|m| m.counts_toward_balance() && m.occurred_on < period.start)
            .map(|m: &Movement| m.amount)
            .sum())
    }
}

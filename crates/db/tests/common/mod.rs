//! Shared fixtures for ledger integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use boveda_core::cutoff::CutOff;
use boveda_core::movement::{Movement, MovementDraft, MovementKind};
use boveda_core::reconciliation::ReconciliationRun;
use boveda_core::transfer::Transfer;
use boveda_core::vault::Vault;
use boveda_core::{LedgerError, LedgerResult};
use boveda_db::{InMemoryStore, LedgerStore, RunKey};
use boveda_shared::config::{AppConfig, default_vaults};
use boveda_shared::types::{
    ActorId, CutOffId, MovementId, ReconciliationRunId, TransferId, VaultKey,
};

/// Configuration with the default catalog, fast retries and the given opening balances.
pub fn config_with_openings(openings: &[(&str, Decimal)]) -> AppConfig {
    let mut config = AppConfig::default();
    config.ledger.retry.backoff_ms = 1;
    config.vaults = default_vaults()
        .into_iter()
        .map(|mut seed| {
            if let Some((_, opening)) = openings.iter().find(|(key, _)| *key == seed.key) {
                seed.opening_balance = *opening;
            }
            seed
        })
        .collect();
    config
}

pub fn key(value: &str) -> VaultKey {
    VaultKey::new(value).unwrap()
}

pub fn actor(value: &str) -> ActorId {
    ActorId::new(value).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn draft(vault: &str, kind: MovementKind, amount: Decimal, concept: &str, on: NaiveDate) -> MovementDraft {
    MovementDraft::new(key(vault), kind, amount, concept, on, actor("ana"))
}

/// Store that injects failures into an [`InMemoryStore`].
#[derive(Default)]
pub struct FlakyStore {
    pub inner: InMemoryStore,
    /// Movement inserts for this vault fail permanently.
    pub fail_insert_movement_for: Mutex<Option<VaultKey>>,
    /// Vault writes for this vault fail permanently.
    pub fail_update_vault_for: Mutex<Option<VaultKey>>,
    /// Vault writes for this vault are delayed before reaching the store.
    pub delay_update_vault_for: Mutex<Option<(VaultKey, Duration)>>,
    /// Updates of this movement fail permanently.
    pub fail_update_movement: Mutex<Option<MovementId>>,
    /// Number of upcoming vault writes that fail as temporarily unavailable.
    pub transient_update_vault_failures: AtomicU32,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for FlakyStore {
    async fn list_vaults(&self) -> LedgerResult<Vec<Vault>> {
        self.inner.list_vaults().await
    }

    async fn get_vault(&self, key: &VaultKey) -> LedgerResult<Option<Vault>> {
        self.inner.get_vault(key).await
    }

    async fn insert_vault(&self, vault: Vault) -> LedgerResult<()> {
        self.inner.insert_vault(vault).await
    }

    async fn update_vault(&self, vault: Vault, expected_version: u64) -> LedgerResult<()> {
        let delay = self
            .delay_update_vault_for
            .lock()
            .unwrap()
            .as_ref()
            .filter(|(k, _)| *k == vault.key)
            .map(|(_, d)| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_update_vault_for.lock().unwrap().as_ref() == Some(&vault.key) {
            return Err(LedgerError::Storage("vault write rejected".into()));
        }
        let transient = self
            .transient_update_vault_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if transient {
            return Err(LedgerError::StorageUnavailable("connection reset".into()));
        }
        self.inner.update_vault(vault, expected_version).await
    }

    async fn next_sequence(&self, key: &VaultKey) -> LedgerResult<u64> {
        self.inner.next_sequence(key).await
    }

    async fn insert_movement(&self, movement: Movement) -> LedgerResult<()> {
        if self.fail_insert_movement_for.lock().unwrap().as_ref() == Some(&movement.vault) {
            return Err(LedgerError::Storage("movement insert rejected".into()));
        }
        self.inner.insert_movement(movement).await
    }

    async fn update_movement(&self, movement: Movement) -> LedgerResult<()> {
        if *self.fail_update_movement.lock().unwrap() == Some(movement.id) {
            return Err(LedgerError::Storage("movement update rejected".into()));
        }
        self.inner.update_movement(movement).await
    }

    async fn get_movement(&self, id: MovementId) -> LedgerResult<Option<Movement>> {
        self.inner.get_movement(id).await
    }

    async fn movements_by_vault(&self, key: &VaultKey) -> LedgerResult<Vec<Movement>> {
        self.inner.movements_by_vault(key).await
    }

    async fn save_transfer(&self, transfer: Transfer) -> LedgerResult<()> {
        self.inner.save_transfer(transfer).await
    }

    async fn get_transfer(&self, id: TransferId) -> LedgerResult<Option<Transfer>> {
        self.inner.get_transfer(id).await
    }

    async fn transfers_by_vault(&self, key: &VaultKey) -> LedgerResult<Vec<Transfer>> {
        self.inner.transfers_by_vault(key).await
    }

    async fn save_cut_off(&self, cut_off: CutOff) -> LedgerResult<()> {
        self.inner.save_cut_off(cut_off).await
    }

    async fn get_cut_off(&self, id: CutOffId) -> LedgerResult<Option<CutOff>> {
        self.inner.get_cut_off(id).await
    }

    async fn cut_offs_by_vault(&self, key: &VaultKey) -> LedgerResult<Vec<CutOff>> {
        self.inner.cut_offs_by_vault(key).await
    }

    async fn save_run(&self, run: ReconciliationRun) -> LedgerResult<()> {
        self.inner.save_run(run).await
    }

    async fn get_run(&self, id: ReconciliationRunId) -> LedgerResult<Option<ReconciliationRun>> {
        self.inner.get_run(id).await
    }

    async fn find_run(&self, key: &RunKey) -> LedgerResult<Option<ReconciliationRun>> {
        self.inner.find_run(key).await
    }
}

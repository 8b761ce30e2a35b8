//! In-process [`LedgerStore`] backed by hash maps.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use boveda_core::cutoff::CutOff;
use boveda_core::movement::Movement;
use boveda_core::reconciliation::ReconciliationRun;
use boveda_core::transfer::Transfer;
use boveda_core::vault::Vault;
use boveda_core::{LedgerError, LedgerResult};
use boveda_shared::types::{CutOffId, MovementId, ReconciliationRunId, TransferId, VaultKey};

use super::{LedgerStore, RunKey};

#[derive(Debug, Default)]
struct Tables {
    vaults: HashMap<VaultKey, Vault>,
    sequences: HashMap<VaultKey, u64>,
    movements: HashMap<MovementId, Movement>,
    movements_by_vault: HashMap<VaultKey, Vec<MovementId>>,
    transfers: HashMap<TransferId, Transfer>,
    cut_offs: HashMap<CutOffId, CutOff>,
    runs: HashMap<ReconciliationRunId, ReconciliationRun>,
    run_keys: HashMap<RunKey, ReconciliationRunId>,
}

/// Store keeping everything in memory. State is lost on drop.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn list_vaults(&self) -> LedgerResult<Vec<Vault>> {
        let tables = self.tables.read().await;
        let mut vaults: Vec<Vault> = tables.vaults.values().cloned().collect();
        vaults.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(vaults)
    }

    async fn get_vault(&self, key: &VaultKey) -> LedgerResult<Option<Vault>> {
        Ok(self.tables.read().await.vaults.get(key).cloned())
    }

    async fn insert_vault(&self, vault: Vault) -> LedgerResult<()> {
        let mut tables = self.tables.write().await;
        tables.vaults.entry(vault.key.clone()).or_insert(vault);
        Ok(())
    }

    async fn update_vault(&self, vault: Vault, expected_version: u64) -> LedgerResult<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .vaults
            .get_mut(&vault.key)
            .ok_or_else(|| LedgerError::VaultNotFound(vault.key.clone()))?;
        if stored.version() != expected_version {
            return Err(LedgerError::VersionMismatch {
                vault: vault.key.clone(),
                expected: expected_version,
                actual: stored.version(),
            });
        }
        *stored = vault;
        Ok(())
    }

    async fn next_sequence(&self, key: &VaultKey) -> LedgerResult<u64> {
        let mut tables = self.tables.write().await;
        let counter = tables.sequences.entry(key.clone()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn insert_movement(&self, movement: Movement) -> LedgerResult<()> {
        let mut tables = self.tables.write().await;
        if tables.movements.contains_key(&movement.id) {
            return Err(LedgerError::Storage(format!(
                "movement {} already exists",
                movement.id
            )));
        }
        tables
            .movements_by_vault
            .entry(movement.vault.clone())
            .or_default()
            .push(movement.id);
        tables.movements.insert(movement.id, movement);
        Ok(())
    }

    async fn update_movement(&self, movement: Movement) -> LedgerResult<()> {
        let mut tables = self.tables.write().await;
        match tables.movements.get_mut(&movement.id) {
            Some(stored) => {
                *stored = movement;
                Ok(())
            }
            None => Err(LedgerError::MovementNotFound(movement.id)),
        }
    }

    async fn get_movement(&self, id: MovementId) -> LedgerResult<Option<Movement>> {
        Ok(self.tables.read().await.movements.get(&id).cloned())
    }

    async fn movements_by_vault(&self, key: &VaultKey) -> LedgerResult<Vec<Movement>> {
        let tables = self.tables.read().await;
        Ok(tables
            .movements_by_vault
            .get(key)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| tables.movements.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn save_transfer(&self, transfer: Transfer) -> LedgerResult<()> {
        self.tables
            .write()
            .await
            .transfers
            .insert(transfer.id, transfer);
        Ok(())
    }

    async fn get_transfer(&self, id: TransferId) -> LedgerResult<Option<Transfer>> {
        Ok(self.tables.read().await.transfers.get(&id).cloned())
    }

    async fn transfers_by_vault(&self, key: &VaultKey) -> LedgerResult<Vec<Transfer>> {
        let tables = self.tables.read().await;
        let mut transfers: Vec<Transfer> = tables
            .transfers
            .values()
            .filter(|t| t.touches(key))
            .cloned()
            .collect();
        transfers.sort_by_key(|t| (t.created_at, t.id));
        Ok(transfers)
    }

    async fn save_cut_off(&self, cut_off: CutOff) -> LedgerResult<()> {
        self.tables
            .write()
            .await
            .cut_offs
            .insert(cut_off.id, cut_off);
        Ok(())
    }

    async fn get_cut_off(&self, id: CutOffId) -> LedgerResult<Option<CutOff>> {
        Ok(self.tables.read().await.cut_offs.get(&id).cloned())
    }

    async fn cut_offs_by_vault(&self, key: &VaultKey) -> LedgerResult<Vec<CutOff>> {
        let tables = self.tables.read().await;
        let mut cut_offs: Vec<CutOff> = tables
            .cut_offs
            .values()
            .filter(|c| &c.vault == key)
            .cloned()
            .collect();
        cut_offs.sort_by_key(|c| (c.period.start, c.id));
        Ok(cut_offs)
    }

    async fn save_run(&self, run: ReconciliationRun) -> LedgerResult<()> {
        let mut tables = self.tables.write().await;
        tables.run_keys.insert(RunKey::of(&run), run.id);
        tables.runs.insert(run.id, run);
        Ok(())
    }

    async fn get_run(&self, id: ReconciliationRunId) -> LedgerResult<Option<ReconciliationRun>> {
        Ok(self.tables.read().await.runs.get(&id).cloned())
    }

    async fn find_run(&self, key: &RunKey) -> LedgerResult<Option<ReconciliationRun>> {
        let tables = self.tables.read().await;
        Ok(tables
            .run_keys
            .get(key)
            .and_then(|id| tables.runs.get(id))
            .cloned())
    }
}

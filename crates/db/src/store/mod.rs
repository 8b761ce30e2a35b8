//! Storage abstraction for ledger state.
//!
//! The ledger treats persistence as an external collaborator. Every write to a
//! vault is a compare-and-swap on its version; every other record is written
//! whole. Implementations report transient failures as
//! [`boveda_core::LedgerError::StorageUnavailable`] so callers can retry them.

mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;

use boveda_core::LedgerResult;
use boveda_core::cutoff::CutOff;
use boveda_core::movement::Movement;
use boveda_core::period::Period;
use boveda_core::reconciliation::ReconciliationRun;
use boveda_core::transfer::Transfer;
use boveda_core::vault::Vault;
use boveda_shared::types::{CutOffId, MovementId, ReconciliationRunId, TransferId, VaultKey};

/// Lookup key of a reconciliation run: the same statement against the same
/// movement set of the same vault and period always maps to one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunKey {
    /// Vault reconciled.
    pub vault: VaultKey,
    /// Period covered.
    pub period: Period,
    /// Fingerprint of the statement lines.
    pub statement_fingerprint: String,
    /// Fingerprint of the movements considered.
    pub system_fingerprint: String,
}

impl RunKey {
    /// Builds the key of a stored run.
    #[must_use]
    pub fn of(run: &ReconciliationRun) -> Self {
        Self {
            vault: run.vault.clone(),
            period: run.period,
            statement_fingerprint: run.statement_fingerprint.clone(),
            system_fingerprint: run.system_fingerprint.clone(),
        }
    }
}

/// Persistence collaborator of the ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // ========== Vaults ==========

    /// Lists every vault, ordered by key.
    async fn list_vaults(&self) -> LedgerResult<Vec<Vault>>;

    /// Fetches one vault.
    async fn get_vault(&self, key: &VaultKey) -> LedgerResult<Option<Vault>>;

    /// Inserts a vault. Existing vaults are left untouched.
    async fn insert_vault(&self, vault: Vault) -> LedgerResult<()>;

    /// Replaces a vault if its stored version still equals `expected_version`.
    ///
    /// Fails with [`boveda_core::LedgerError::VersionMismatch`] otherwise.
    async fn update_vault(&self, vault: Vault, expected_version: u64) -> LedgerResult<()>;

    /// Allocates the next movement sequence number of a vault, starting at 1.
    async fn next_sequence(&self, key: &VaultKey) -> LedgerResult<u64>;

    // ========== Movements ==========

    /// Inserts a new movement.
    async fn insert_movement(&self, movement: Movement) -> LedgerResult<()>;

    /// Replaces an existing movement.
    async fn update_movement(&self, movement: Movement) -> LedgerResult<()>;

    /// Fetches one movement.
    async fn get_movement(&self, id: MovementId) -> LedgerResult<Option<Movement>>;

    /// Every movement of a vault in any status.
    async fn movements_by_vault(&self, key: &VaultKey) -> LedgerResult<Vec<Movement>>;

    // ========== Transfers ==========

    /// Inserts or replaces a transfer.
    async fn save_transfer(&self, transfer: Transfer) -> LedgerResult<()>;

    /// Fetches one transfer.
    async fn get_transfer(&self, id: TransferId) -> LedgerResult<Option<Transfer>>;

    /// Transfers touching a vault on either side.
    async fn transfers_by_vault(&self, key: &VaultKey) -> LedgerResult<Vec<Transfer>>;

    // ========== Cut-offs ==========

    /// Inserts or replaces a cut-off.
    async fn save_cut_off(&self, cut_off: CutOff) -> LedgerResult<()>;

    /// Fetches one cut-off.
    async fn get_cut_off(&self, id: CutOffId) -> LedgerResult<Option<CutOff>>;

    /// Cut-offs of a vault.
    async fn cut_offs_by_vault(&self, key: &VaultKey) -> LedgerResult<Vec<CutOff>>;

    // ========== Reconciliation runs ==========

    /// Inserts or replaces a run.
    async fn save_run(&self, run: ReconciliationRun) -> LedgerResult<()>;

    /// Fetches one run.
    async fn get_run(&self, id: ReconciliationRunId) -> LedgerResult<Option<ReconciliationRun>>;

    /// Finds the run stored under a key.
    async fn find_run(&self, key: &RunKey) -> LedgerResult<Option<ReconciliationRun>>;
}

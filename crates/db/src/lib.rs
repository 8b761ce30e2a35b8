//! Storage and concurrency layer of Bóveda.
//!
//! This crate provides:
//! - The [`LedgerStore`] persistence abstraction and an in-memory implementation
//! - Per-vault serialization of balance writes ([`VaultStore`])
//! - The movement ledger, transfer saga, cut-off and reconciliation engines
//! - The [`VaultLedger`] facade used by the HTTP layer

pub mod cutoff_engine;
pub mod idempotency;
pub mod ledger;
pub mod movement_ledger;
pub mod reconciliation_engine;
pub mod retry;
pub mod store;
pub mod transfer_coordinator;
pub mod vault_store;

pub use ledger::{OPENING_CONCEPT, SYSTEM_ACTOR, VaultLedger};
pub use retry::RetryPolicy;
pub use store::{InMemoryStore, LedgerStore, RunKey};
pub use vault_store::VaultStore;

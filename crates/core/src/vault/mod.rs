//! Vaults: named money containers with a single authoritative balance.
//!
//! A [`Vault`] never changes its balance in place. [`Vault::apply`] checks the
//! overdraft rule and returns the next state with a bumped version, which the
//! store persists with a compare-and-swap.

mod types;

pub use types::{Vault, VaultSummary};

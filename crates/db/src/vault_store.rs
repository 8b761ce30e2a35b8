//! Vault balances and per-vault serialization.
//!
//! Only this module writes balances. Writers to one vault queue on that
//! vault's async mutex; different vaults proceed in parallel. Operations that
//! touch two vaults take both locks in key order, so two transfers running in
//! opposite directions cannot deadlock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use boveda_core::movement::Movement;
use boveda_core::vault::Vault;
use boveda_core::{LedgerError, LedgerResult};
use boveda_shared::types::VaultKey;

use crate::retry::RetryPolicy;
use crate::store::LedgerStore;

/// Proof that the caller holds a vault's lock.
pub struct VaultGuard {
    key: VaultKey,
    _guard: OwnedMutexGuard<()>,
}

impl VaultGuard {
    /// Key of the locked vault.
    #[must_use]
    pub fn key(&self) -> &VaultKey {
        &self.key
    }
}

/// Owner of every vault balance.
pub struct VaultStore {
    store: Arc<dyn LedgerStore>,
    locks: DashMap<VaultKey, Arc<Mutex<()>>>,
    retry: RetryPolicy,
}

impl VaultStore {
    /// Creates a vault store over a persistence collaborator.
    pub fn new(store: Arc<dyn LedgerStore>, retry: RetryPolicy) -> Self {
        Self {
            store,
            locks: DashMap::new(),
            retry,
        }
    }

    /// Waits for exclusive access to one vault.
    pub async fn lock(&self, key: &VaultKey) -> VaultGuard {
        // clone the mutex out so no map shard stays borrowed across the await
        let mutex = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        VaultGuard {
            key: key.clone(),
            _guard: mutex.lock_owned().await,
        }
    }

    /// Waits for exclusive access to two distinct vaults, locking in key order.
    pub async fn lock_pair(&self, a: &VaultKey, b: &VaultKey) -> (VaultGuard, VaultGuard) {
        if a <= b {
            let first = self.lock(a).await;
            let second = self.lock(b).await;
            (first, second)
        } else {
            let second = self.lock(b).await;
            let first = self.lock(a).await;
            (first, second)
        }
    }

    /// Fetches a vault.
    pub async fn get_vault(&self, key: &VaultKey) -> LedgerResult<Vault> {
        self.store
            .get_vault(key)
            .await?
            .ok_or_else(|| LedgerError::VaultNotFound(key.clone()))
    }

    /// Current balance of a vault at full precision.
    pub async fn get_balance(&self, key: &VaultKey) -> LedgerResult<Decimal> {
        Ok(self.get_vault(key).await?.balance())
    }

    /// Every vault, ordered by key.
    pub async fn list_vaults(&self) -> LedgerResult<Vec<Vault>> {
        self.store.list_vaults().await
    }

    /// Registers a vault if it does not exist yet.
    pub async fn register(&self, vault: Vault) -> LedgerResult<()> {
        info!(vault = %vault.key, currency = %vault.currency, "Registering vault");
        self.store.insert_vault(vault).await
    }

    /// Applies a movement's signed amount to its vault and returns the new balance.
    pub async fn apply_movement(&self, movement: &Movement) -> LedgerResult<Decimal> {
        let guard = self.lock(&movement.vault).await;
        let vault = self.apply_movement_locked(&guard, movement, Utc::now()).await?;
        Ok(vault.balance())
    }

    /// Applies a movement while the caller holds its vault's lock.
    ///
    /// The amount must be non-zero and carry the sign its kind requires.
    pub async fn apply_movement_locked(
        &self,
        guard: &VaultGuard,
        movement: &Movement,
        at: DateTime<Utc>,
    ) -> LedgerResult<Vault> {
        if guard.key() != &movement.vault {
            return Err(LedgerError::Internal(format!(
                "movement {} targets vault {} but the lock is held on {}",
                movement.id,
                movement.vault,
                guard.key()
            )));
        }
        if movement.amount.is_zero() || !movement.kind.accepts(movement.amount) {
            return Err(LedgerError::InvalidAmount(format!(
                "sign of {} does not match kind {}",
                movement.amount, movement.kind
            )));
        }
        self.apply_locked(guard, movement.amount, at).await
    }

    /// Applies a signed amount while the caller holds the vault's lock.
    ///
    /// Each attempt rereads the vault and writes with compare-and-swap, so a
    /// writer outside this process shows up as a retried version mismatch.
    pub async fn apply_locked(
        &self,
        guard: &VaultGuard,
        signed_amount: Decimal,
        at: DateTime<Utc>,
    ) -> LedgerResult<Vault> {
        let key = guard.key();
        self.retry
            .run("apply_balance", || async {
                let current = self.get_vault(key).await?;
                let next = current.apply(signed_amount, at)?;
                self.store.update_vault(next.clone(), current.version()).await?;
                debug!(
                    vault = %key,
                    amount = %signed_amount,
                    balance = %next.balance(),
                    version = next.version(),
                    "Balance applied"
                );
                Ok(next)
            })
            .await
    }

    /// Undoes a previously applied amount while the caller holds the lock.
    pub async fn revert_locked(
        &self,
        guard: &VaultGuard,
        signed_amount: Decimal,
        at: DateTime<Utc>,
    ) -> LedgerResult<Vault> {
        let key = guard.key();
        self.retry
            .run("revert_balance", || async {
                let current = self.get_vault(key).await?;
                let next = current.revert(signed_amount, at);
                self.store.update_vault(next.clone(), current.version()).await?;
                info!(vault = %key, amount = %signed_amount, balance = %next.balance(), "Balance reverted");
                Ok(next)
            })
            .await
    }

    /// Enables or disables a vault.
    pub async fn set_active(&self, key: &VaultKey, active: bool) -> LedgerResult<Vault> {
        let _guard = self.lock(key).await;
        self.retry
            .run("set_active", || async {
                let current = self.get_vault(key).await?;
                let next = current.with_active(active);
                self.store.update_vault(next.clone(), current.version()).await?;
                info!(vault = %key, active, "Vault activation changed");
                Ok(next)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use boveda_core::movement::{MovementDraft, MovementKind, MovementService};
    use boveda_shared::types::{ActorId, Currency};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    async fn store_with(keys: &[&str]) -> VaultStore {
        let store = Arc::new(InMemoryStore::new());
        let vaults = VaultStore::new(
            store,
            RetryPolicy {
                max_attempts: 3,
                backoff: Duration::from_millis(1),
            },
        );
        for key in keys {
            vaults
                .register(Vault::new(VaultKey::new(*key).unwrap(), *key, Currency::Mxn))
                .await
                .unwrap();
        }
        vaults
    }

    #[tokio::test]
    async fn test_apply_and_balance() {
        let vaults = store_with(&["azteca"]).await;
        let key = VaultKey::new("azteca").unwrap();
        let guard = vaults.lock(&key).await;
        let vault = vaults.apply_locked(&guard, dec!(100.25), Utc::now()).await.unwrap();
        assert_eq!(vault.balance(), dec!(100.25));
        assert_eq!(vault.version(), 1);
        drop(guard);
        assert_eq!(vaults.get_balance(&key).await.unwrap(), dec!(100.25));
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_balance() {
        let vaults = store_with(&["azteca"]).await;
        let key = VaultKey::new("azteca").unwrap();
        let guard = vaults.lock(&key).await;
        let err = vaults.apply_locked(&guard, dec!(-1), Utc::now()).await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        drop(guard);
        assert_eq!(vaults.get_balance(&key).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_unknown_vault() {
        let vaults = store_with(&[]).await;
        let err = vaults.get_balance(&VaultKey::new("nope").unwrap()).await.unwrap_err();
        assert!(matches!(err, LedgerError::VaultNotFound(_)));
    }

    #[tokio::test]
    async fn test_inactive_vault_rejects_movements() {
        let vaults = store_with(&["leftie"]).await;
        let key = VaultKey::new("leftie").unwrap();
        let disabled = vaults.set_active(&key, false).await.unwrap();
        assert!(!disabled.active);
        let guard = vaults.lock(&key).await;
        let err = vaults.apply_locked(&guard, dec!(5), Utc::now()).await.unwrap_err();
        assert!(matches!(err, LedgerError::VaultInactive(_)));
    }

    fn movement(key: &str, kind: MovementKind, amount: Decimal) -> Movement {
        let draft = MovementDraft::new(
            VaultKey::new(key).unwrap(),
            kind,
            amount,
            "Caja",
            Utc::now().date_naive(),
            ActorId::new("ana").unwrap(),
        );
        MovementService::build(draft, Currency::Mxn, 1, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_apply_movement() {
        let vaults = store_with(&["azteca"]).await;
        let key = VaultKey::new("azteca").unwrap();
        let income = movement("azteca", MovementKind::Income, dec!(100.00));
        assert_eq!(vaults.apply_movement(&income).await.unwrap(), dec!(100.00));

        let expense = movement("azteca", MovementKind::Expense, dec!(40.00));
        assert_eq!(vaults.apply_movement(&expense).await.unwrap(), dec!(60.00));
        assert_eq!(vaults.get_balance(&key).await.unwrap(), dec!(60.00));
    }

    #[tokio::test]
    async fn test_apply_movement_rejects_sign_mismatch() {
        let vaults = store_with(&["azteca"]).await;
        let key = VaultKey::new("azteca").unwrap();
        let mut wrong_sign = movement("azteca", MovementKind::Expense, dec!(10.00));
        wrong_sign.amount = dec!(10.00);

        let err = vaults.apply_movement(&wrong_sign).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
        assert_eq!(vaults.get_balance(&key).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_apply_movement_locked_checks_vault() {
        let vaults = store_with(&["azteca", "profit"]).await;
        let guard = vaults.lock(&VaultKey::new("profit").unwrap()).await;
        let income = movement("azteca", MovementKind::Income, dec!(5.00));
        let err = vaults
            .apply_movement_locked(&guard, &income, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Internal(_)));
    }

    #[tokio::test]
    async fn test_revert_undoes_apply() {
        let vaults = store_with(&["azteca"]).await;
        let key = VaultKey::new("azteca").unwrap();
        let guard = vaults.lock(&key).await;
        vaults.apply_locked(&guard, dec!(80), Utc::now()).await.unwrap();
        let vault = vaults.revert_locked(&guard, dec!(80), Utc::now()).await.unwrap();
        assert_eq!(vault.balance(), Decimal::ZERO);
        assert_eq!(vault.historical_credits(), dec!(80));
    }

    #[tokio::test]
    async fn test_lock_pair_in_both_directions() {
        let vaults = Arc::new(store_with(&["azteca", "profit"]).await);
        let a = VaultKey::new("azteca").unwrap();
        let b = VaultKey::new("profit").unwrap();

        let mut handles = Vec::new();
        for i in 0..20 {
            let vaults = Arc::clone(&vaults);
            let (x, y) = if i % 2 == 0 {
                (a.clone(), b.clone())
            } else {
                (b.clone(), a.clone())
            };
            handles.push(tokio::spawn(async move {
                let (gx, _gy) = vaults.lock_pair(&x, &y).await;
                vaults.apply_locked(&gx, dec!(1), Utc::now()).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let total = vaults.get_balance(&a).await.unwrap() + vaults.get_balance(&b).await.unwrap();
        assert_eq!(total, dec!(20));
    }
}

//! Replay of command outcomes keyed by client operation id.
//!
//! Uses Moka's async cache: concurrent callers presenting the same key wait on
//! a single execution and all receive its result. Only successful outcomes are
//! remembered, so a rejected command may be retried with the same key.

use std::future::Future;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use boveda_core::movement::Movement;
use boveda_core::transfer::Transfer;
use boveda_core::{LedgerError, LedgerResult};
use boveda_shared::types::OperationId;

/// A remembered command outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A recorded movement.
    Movement(Movement),
    /// An executed transfer.
    Transfer(Transfer),
}

impl Outcome {
    /// Name of the command that produced the outcome.
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Movement(_) => "record_movement",
            Self::Transfer(_) => "transfer",
        }
    }
}

/// Cache of outcomes by operation id.
#[derive(Clone)]
pub struct IdempotencyCache {
    cache: Cache<OperationId, Outcome>,
}

impl IdempotencyCache {
    /// Creates a cache holding at most `max_capacity` outcomes for `ttl_secs` each.
    #[must_use]
    pub fn with_config(max_capacity: u64, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();
        Self { cache }
    }

    /// Runs `command` once per key and replays its outcome afterwards.
    ///
    /// Fails with [`LedgerError::IdempotencyConflict`] when the key already
    /// belongs to a different kind of command.
    pub async fn execute<F>(
        &self,
        key: &OperationId,
        operation: &'static str,
        command: F,
    ) -> LedgerResult<Outcome>
    where
        F: Future<Output = LedgerResult<Outcome>>,
    {
        let outcome = self
            .cache
            .try_get_with(key.clone(), command)
            .await
            .map_err(|e| (*e).clone())?;
        if outcome.operation() != operation {
            return Err(LedgerError::IdempotencyConflict(key.clone()));
        }
        debug!(operation_id = %key, operation, "Idempotent outcome served");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boveda_core::movement::{MovementDraft, MovementKind, MovementService};
    use boveda_shared::types::{ActorId, Currency, VaultKey};
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn movement() -> Movement {
        let draft = MovementDraft::new(
            VaultKey::new("azteca").unwrap(),
            MovementKind::Income,
            dec!(10),
            "venta",
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            ActorId::new("ana").unwrap(),
        );
        MovementService::build(draft, Currency::Mxn, 1, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_second_call_replays() {
        let cache = IdempotencyCache::with_config(10, 60);
        let key = OperationId::new("op-1").unwrap();
        let calls = AtomicU32::new(0);
        let m = movement();

        let first = cache
            .execute(&key, "record_movement", async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Outcome::Movement(m.clone()))
            })
            .await
            .unwrap();
        let second = cache
            .execute(&key, "record_movement", async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Outcome::Movement(movement()))
            })
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_remembered() {
        let cache = IdempotencyCache::with_config(10, 60);
        let key = OperationId::new("op-2").unwrap();
        let err = cache
            .execute(&key, "record_movement", async {
                Err(LedgerError::VaultNotFound(VaultKey::new("x").unwrap()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::VaultNotFound(_)));

        let ok = cache
            .execute(&key, "record_movement", async { Ok(Outcome::Movement(movement())) })
            .await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_key_reused_for_other_command() {
        let cache = IdempotencyCache::with_config(10, 60);
        let key = OperationId::new("op-3").unwrap();
        cache
            .execute(&key, "record_movement", async { Ok(Outcome::Movement(movement())) })
            .await
            .unwrap();
        let err = cache
            .execute(&key, "transfer", async { Ok(Outcome::Movement(movement())) })
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::IdempotencyConflict(_)));
    }

    #[tokio::test]
    async fn test_concurrent_callers_coalesce() {
        let cache = IdempotencyCache::with_config(10, 60);
        let key = OperationId::new("op-4").unwrap();
        let calls = Arc::new(AtomicU32::new(0));

        let runs = (0..8).map(|_| {
            let cache = cache.clone();
            let key = key.clone();
            let calls = Arc::clone(&calls);
            async move {
                cache
                    .execute(&key, "record_movement", async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(Outcome::Movement(movement()))
                    })
                    .await
            }
        });
        let results = futures::future::join_all(runs).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let first = results[0].as_ref().unwrap();
        assert!(results.iter().all(|r| r.as_ref().unwrap() == first));
    }
}

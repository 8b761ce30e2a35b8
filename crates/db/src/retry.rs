//! Bounded retries for retryable ledger errors.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use boveda_core::{LedgerError, LedgerResult};
use boveda_shared::config::RetryConfig;

/// How often and how patiently to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first one. Zero behaves like one.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or exhausts the attempts.
    ///
    /// Exhaustion is reported as [`LedgerError::ManualReconciliationRequired`]
    /// naming the operation and the last error.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut attempt_fn: F) -> LedgerResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = LedgerResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match attempt_fn().await {
                Err(e) if e.is_retryable() => {
                    if attempt >= max_attempts {
                        error!(operation, attempts = attempt, error = %e, "Retries exhausted");
                        return Err(LedgerError::ManualReconciliationRequired(format!(
                            "{operation} failed after {attempt} attempts: {e}"
                        )));
                    }
                    warn!(operation, attempt, error = %e, "Retrying after consistency failure");
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }
}

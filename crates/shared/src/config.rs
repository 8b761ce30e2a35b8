//! Application configuration management.
//!
//! Sources are layered in order: `config/default`, `config/{RUN_MODE}`, then
//! `BOVEDA__*` environment variables (`__` separates nested keys, e.g.
//! `BOVEDA__LEDGER__RETRY__MAX_ATTEMPTS=5`).

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::AppResult;
use crate::types::Currency;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Ledger behaviour.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Vaults created at startup.
    #[serde(default = "default_vaults")]
    pub vaults: Vec<VaultSeed>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            ledger: LedgerConfig::default(),
            vaults: default_vaults(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Ledger configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Reconciliation matching settings.
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
    /// Retry policy for consistency failures.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Timeout applied to each transfer saga step, in milliseconds.
    #[serde(default = "default_saga_step_timeout_ms")]
    pub saga_step_timeout_ms: u64,
    /// How long an operation outcome is replayed for the same client key.
    #[serde(default = "default_idempotency_ttl_secs")]
    pub idempotency_ttl_secs: u64,
    /// Maximum number of remembered operation outcomes.
    #[serde(default = "default_idempotency_capacity")]
    pub idempotency_capacity: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            reconciliation: ReconciliationConfig::default(),
            retry: RetryConfig::default(),
            saga_step_timeout_ms: default_saga_step_timeout_ms(),
            idempotency_ttl_secs: default_idempotency_ttl_secs(),
            idempotency_capacity: default_idempotency_capacity(),
        }
    }
}

fn default_saga_step_timeout_ms() -> u64 {
    2_000
}

fn default_idempotency_ttl_secs() -> u64 {
    86_400 // 24 hours
}

fn default_idempotency_capacity() -> u64 {
    10_000
}

/// Reconciliation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationConfig {
    /// Minimum match percentage for a run to count as reconciled.
    #[serde(default = "default_match_threshold_pct")]
    pub match_threshold_pct: Decimal,
    /// Days either side of a statement date searched in the tolerant pass.
    #[serde(default = "default_date_window_days")]
    pub date_window_days: u32,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            match_threshold_pct: default_match_threshold_pct(),
            date_window_days: default_date_window_days(),
        }
    }
}

fn default_match_threshold_pct() -> Decimal {
    Decimal::from(90)
}

fn default_date_window_days() -> u32 {
    3
}

/// Retry policy for retryable ledger errors.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Attempts before giving up, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Pause between attempts, in milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    25
}

/// A vault to create at startup.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct VaultSeed {
    /// Stable key, e.g. `boveda-monte`.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Currency the vault holds.
    #[serde(default)]
    pub currency: Currency,
    /// Whether debits may take the balance below `min_balance`.
    #[serde(default)]
    pub allow_overdraft: bool,
    /// Lowest balance a debit may leave when overdraft is disallowed.
    #[serde(default)]
    pub min_balance: Decimal,
    /// Balance booked as the vault's first movement.
    #[serde(default)]
    pub opening_balance: Decimal,
    /// Whether the vault accepts movements.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl VaultSeed {
    fn catalog(key: &str, name: &str, currency: Currency) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            currency,
            allow_overdraft: false,
            min_balance: Decimal::ZERO,
            opening_balance: Decimal::ZERO,
            active: true,
        }
    }
}

/// The company's seven operating vaults.
#[must_use]
pub fn default_vaults() -> Vec<VaultSeed> {
    vec![
        VaultSeed::catalog("boveda-monte", "Bóveda Monte", Currency::Mxn),
        VaultSeed::catalog("boveda-usa", "Bóveda USA", Currency::Usd),
        VaultSeed::catalog("azteca", "Azteca", Currency::Mxn),
        VaultSeed::catalog("utilidades", "Utilidades", Currency::Mxn),
        VaultSeed::catalog("fletes", "Flete Sur", Currency::Mxn),
        VaultSeed::catalog("leftie", "Leftie", Currency::Mxn),
        VaultSeed::catalog("profit", "Profit", Currency::Mxn),
    ]
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> AppResult<Self> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("BOVEDA").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_without_sources() {
        temp_env::with_vars_unset(["BOVEDA__SERVER__PORT", "BOVEDA__SERVER__HOST"], || {
            let config = AppConfig::load().unwrap();
            assert_eq!(config.server.host, "0.0.0.0");
            assert_eq!(config.server.port, 8080);
            assert_eq!(config.ledger.reconciliation.match_threshold_pct, dec!(90));
            assert_eq!(config.ledger.reconciliation.date_window_days, 3);
            assert_eq!(config.ledger.retry.max_attempts, 3);
            assert_eq!(config.vaults.len(), 7);
        });
    }

    #[test]
    fn test_env_overrides_nested_keys() {
        temp_env::with_vars(
            [
                ("BOVEDA__SERVER__PORT", Some("9191")),
                ("BOVEDA__LEDGER__RETRY__MAX_ATTEMPTS", Some("5")),
                ("BOVEDA__LEDGER__SAGA_STEP_TIMEOUT_MS", Some("150")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.server.port, 9191);
                assert_eq!(config.ledger.retry.max_attempts, 5);
                assert_eq!(config.ledger.saga_step_timeout_ms, 150);
            },
        );
    }

    #[test]
    fn test_default_catalog() {
        let vaults = default_vaults();
        let usa = vaults.iter().find(|v| v.key == "boveda-usa").unwrap();
        assert_eq!(usa.currency, Currency::Usd);
        assert_eq!(usa.name, "Bóveda USA");

        let fletes = vaults.iter().find(|v| v.key == "fletes").unwrap();
        assert_eq!(fletes.name, "Flete Sur");
        assert!(vaults.iter().all(|v| v.active && !v.allow_overdraft));
        assert!(vaults.iter().all(|v| v.opening_balance.is_zero()));
    }
}

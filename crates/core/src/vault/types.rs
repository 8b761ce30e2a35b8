//! Vault state and balance rules.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use boveda_shared::config::VaultSeed;
use boveda_shared::types::{Currency, Money, VaultKey, round_money};

use crate::error::LedgerError;

/// A named vault.
///
/// `balance`, `historical_credits` and `version` only move through
/// [`Vault::apply`] and [`Vault::revert`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    /// Stable key.
    pub key: VaultKey,
    /// Display name.
    pub name: String,
    /// Currency held.
    pub currency: Currency,
    /// Whether the vault accepts movements.
    pub active: bool,
    /// Whether debits may take the balance below `min_balance`.
    pub allow_overdraft: bool,
    /// Lowest balance a debit may leave when overdraft is disallowed.
    pub min_balance: Decimal,
    balance: Decimal,
    historical_credits: Decimal,
    version: u64,
    last_movement_at: Option<DateTime<Utc>>,
}

/// Read model returned by balance queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSummary {
    /// Stable key.
    pub key: VaultKey,
    /// Display name.
    pub name: String,
    /// Balance rounded for reporting.
    pub balance: Money,
    /// Cumulative credits, rounded for reporting.
    pub historical_credits: Decimal,
    /// Whether the vault accepts movements.
    pub active: bool,
    /// Whether debits may take the balance below the minimum.
    pub allow_overdraft: bool,
    /// Minimum balance.
    pub min_balance: Decimal,
    /// Timestamp of the last applied movement.
    pub last_movement_at: Option<DateTime<Utc>>,
}

impl Vault {
    /// Creates an empty vault.
    #[must_use]
    pub fn new(key: VaultKey, name: impl Into<String>, currency: Currency) -> Self {
        Self {
            key,
            name: name.into(),
            currency,
            active: true,
            allow_overdraft: false,
            min_balance: Decimal::ZERO,
            balance: Decimal::ZERO,
            historical_credits: Decimal::ZERO,
            version: 0,
            last_movement_at: None,
        }
    }

    /// Builds an empty vault from its configuration entry.
    ///
    /// The opening balance is not applied here; it is booked as a movement so
    /// the balance always equals the sum of completed movements.
    pub fn from_seed(seed: &VaultSeed) -> Result<Self, LedgerError> {
        let key = VaultKey::new(&seed.key).map_err(LedgerError::Internal)?;
        let mut vault = Self::new(key, seed.name.clone(), seed.currency);
        vault.active = seed.active;
        vault.allow_overdraft = seed.allow_overdraft;
        vault.min_balance = seed.min_balance;
        Ok(vault)
    }

    /// Current balance at full precision.
    #[must_use]
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Sum of every credit ever applied. Never decreases.
    #[must_use]
    pub fn historical_credits(&self) -> Decimal {
        self.historical_credits
    }

    /// Version used for compare-and-swap writes.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Timestamp of the last applied movement.
    #[must_use]
    pub fn last_movement_at(&self) -> Option<DateTime<Utc>> {
        self.last_movement_at
    }

    /// Amount that can still be debited without breaching the minimum.
    #[must_use]
    pub fn available(&self) -> Decimal {
        (self.balance - self.min_balance).max(Decimal::ZERO)
    }

    /// Checks that the vault can take a signed amount.
    pub fn check_can_apply(&self, signed_amount: Decimal) -> Result<Decimal, LedgerError> {
        if !self.active {
            return Err(LedgerError::VaultInactive(self.key.clone()));
        }
        if signed_amount.is_zero() {
            return Err(LedgerError::InvalidAmount("amount cannot be zero".into()));
        }
        let next = self.balance + signed_amount;
        if signed_amount.is_sign_negative() && !self.allow_overdraft && next < self.min_balance {
            return Err(LedgerError::InsufficientFunds {
                vault: self.key.clone(),
                available: self.available(),
                requested: signed_amount.abs(),
            });
        }
        Ok(next)
    }

    /// Returns the state after applying a signed amount.
    pub fn apply(&self, signed_amount: Decimal, at: DateTime<Utc>) -> Result<Self, LedgerError> {
        let balance = self.check_can_apply(signed_amount)?;
        let mut next = self.clone();
        next.balance = balance;
        if signed_amount.is_sign_positive() {
            next.historical_credits += signed_amount;
        }
        next.version += 1;
        next.last_movement_at = Some(at);
        Ok(next)
    }

    /// Returns the state after undoing a previously applied amount.
    ///
    /// Used only by saga compensation: skips the overdraft and active checks
    /// and leaves `historical_credits` untouched.
    #[must_use]
    pub fn revert(&self, signed_amount: Decimal, at: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.balance -= signed_amount;
        next.version += 1;
        next.last_movement_at = Some(at);
        next
    }

    /// Returns a copy with a different active flag and a bumped version.
    #[must_use]
    pub fn with_active(&self, active: bool) -> Self {
        let mut next = self.clone();
        next.active = active;
        next.version += 1;
        next
    }

    /// Rounded read model.
    #[must_use]
    pub fn summary(&self) -> VaultSummary {
        VaultSummary {
            key: self.key.clone(),
            name: self.name.clone(),
            balance: Money::new(round_money(self.balance), self.currency),
            historical_credits: round_money(self.historical_credits),
            active: self.active,
            allow_overdraft: self.allow_overdraft,
            min_balance: self.min_balance,
            last_movement_at: self.last_movement_at,
        }
    }
}

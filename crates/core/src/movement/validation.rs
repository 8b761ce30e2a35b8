//! Movement validation rules.
//!
//! These checks are pure and run before anything is persisted. Balance rules
//! (active vault, overdraft) belong to [`crate::vault::Vault`].

use rust_decimal::Decimal;

use boveda_shared::types::{Currency, MONEY_SCALE};

use super::types::MovementDraft;
use crate::error::LedgerError;

/// Largest absolute amount a single movement may carry.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 2);

/// Largest absolute balance a caller may report or assume for a vault.
pub const MAX_BALANCE: Decimal = Decimal::from_parts(1_569_325_056, 23_283_064, 0, false, 2);

/// Maximum concept length in characters.
pub const MAX_CONCEPT_LEN: usize = 500;

/// Maximum notes length in characters.
pub const MAX_NOTES_LEN: usize = 1_000;

/// Validates a signed amount against a kind-independent rule set.
pub fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount.is_zero() {
        return Err(LedgerError::InvalidAmount("amount cannot be zero".into()));
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(LedgerError::InvalidAmount(format!(
            "amount {amount} has more than {MONEY_SCALE} decimal places"
        )));
    }
    if amount.abs() > MAX_AMOUNT {
        return Err(LedgerError::AmountExceedsLimit {
            amount: amount.abs(),
            limit: MAX_AMOUNT,
        });
    }
    Ok(())
}

/// Validates a caller-supplied balance. Zero and negative balances are allowed.
pub fn validate_balance(balance: Decimal) -> Result<(), LedgerError> {
    if balance.normalize().scale() > MONEY_SCALE {
        return Err(LedgerError::InvalidAmount(format!(
            "balance {balance} has more than {MONEY_SCALE} decimal places"
        )));
    }
    if balance.abs() > MAX_BALANCE {
        return Err(LedgerError::InvalidAmount(format!(
            "balance {balance} is outside ±{MAX_BALANCE}"
        )));
    }
    Ok(())
}

/// Validates a concept string.
pub fn validate_concept(concept: &str) -> Result<(), LedgerError> {
    let len = concept.trim().chars().count();
    if len == 0 || len > MAX_CONCEPT_LEN {
        return Err(LedgerError::InvalidConcept {
            max: MAX_CONCEPT_LEN,
        });
    }
    Ok(())
}

/// Validates a draft and resolves its currency against the vault's.
pub fn validate_draft(draft: &MovementDraft, vault_currency: Currency) -> Result<Currency, LedgerError> {
    validate_amount(draft.amount)?;
    if !draft.kind.accepts(draft.amount) {
        return Err(LedgerError::InvalidAmount(format!(
            "sign of {} does not match kind {}",
            draft.amount, draft.kind
        )));
    }
    validate_concept(&draft.concept)?;
    if let Some(notes) = &draft.notes
        && notes.chars().count() > MAX_NOTES_LEN
    {
        return Err(LedgerError::NotesTooLong { max: MAX_NOTES_LEN });
    }

    let currency = draft.currency.unwrap_or(vault_currency);
    if currency != vault_currency {
        return Err(LedgerError::CurrencyMismatch {
            expected: vault_currency,
            actual: currency,
        });
    }
    Ok(currency)
}

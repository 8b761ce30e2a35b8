//! Property-based tests for movement validation and vault balance rules.
//!
//! - Property 1: Kind direction decides the accepted sign
//! - Property 2: Balance equals the sum of accepted movements
//! - Property 3: No balance below the minimum without overdraft

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use boveda_shared::types::{ActorId, Currency, VaultKey};

use super::kind::{Direction, MovementKind};
use super::types::MovementDraft;
use super::validation::validate_draft;
use crate::error::LedgerError;
use crate::vault::Vault;

/// Strategy to generate positive amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a kind with a fixed direction.
fn fixed_kind() -> impl Strategy<Value = MovementKind> {
    proptest::sample::select(
        MovementKind::ALL
            .into_iter()
            .filter(|k| k.direction().is_some())
            .collect::<Vec<_>>(),
    )
}

/// Strategy to generate signed amounts in either direction.
fn signed_amount() -> impl Strategy<Value = Decimal> {
    (positive_amount(), any::<bool>()).prop_map(|(amount, credit)| {
        if credit {
            Direction::Credit.signed(amount)
        } else {
            Direction::Debit.signed(amount)
        }
    })
}

fn draft(kind: MovementKind, amount: Decimal) -> MovementDraft {
    MovementDraft {
        vault: VaultKey::new("azteca").unwrap(),
        kind,
        amount,
        currency: None,
        concept: "Movimiento".into(),
        category: None,
        reference: None,
        notes: None,
        occurred_on: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        actor: ActorId::new("prop").unwrap(),
        operation_id: None,
    }
}

fn vault(allow_overdraft: bool) -> Vault {
    let mut vault = Vault::new(VaultKey::new("azteca").unwrap(), "Azteca", Currency::Mxn);
    vault.allow_overdraft = allow_overdraft;
    vault
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// *For any* fixed-direction kind and magnitude, the draft signed by the
    /// kind validates and the opposite sign is rejected.
    #[test]
    fn prop_kind_decides_sign(kind in fixed_kind(), amount in positive_amount()) {
        let direction = kind.direction().unwrap();
        let good = draft(kind, direction.signed(amount));
        prop_assert!(validate_draft(&good, Currency::Mxn).is_ok());

        let bad = draft(kind, direction.opposite().signed(amount));
        let is_invalid_amount = matches!(
            validate_draft(&bad, Currency::Mxn),
            Err(LedgerError::InvalidAmount(_))
        );
        prop_assert!(is_invalid_amount);
    }

    /// *For any* sequence of movements on an overdraft vault, the balance is
    /// the sum of the applied amounts.
    #[test]
    fn prop_balance_is_sum(amounts in prop::collection::vec(signed_amount(), 1..40)) {
        let mut state = vault(true);
        for amount in &amounts {
            state = state.apply(*amount, Utc::now()).unwrap();
        }
        let sum: Decimal = amounts.iter().sum();
        prop_assert_eq!(state.balance(), sum);
        prop_assert_eq!(state.version(), amounts.len() as u64);
    }

    /// *For any* sequence on a vault without overdraft, rejected debits leave
    /// the state untouched and the balance never drops below zero.
    #[test]
    fn prop_no_negative_without_overdraft(amounts in prop::collection::vec(signed_amount(), 1..40)) {
        let mut state = vault(false);
        let mut accepted = Decimal::ZERO;
        for amount in amounts {
            match state.apply(amount, Utc::now()) {
                Ok(next) => {
                    accepted += amount;
                    state = next;
                }
                Err(LedgerError::InsufficientFunds { .. }) => {
                    prop_assert!(amount.is_sign_negative());
                }
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
            prop_assert!(state.balance() >= Decimal::ZERO);
        }
        prop_assert_eq!(state.balance(), accepted);
    }

    /// *For any* credit sequence, historical credits equal the balance and
    /// never decrease afterwards.
    #[test]
    fn prop_historical_credits_monotonic(
        credits in prop::collection::vec(positive_amount(), 1..20),
        debit in positive_amount(),
    ) {
        let mut state = vault(true);
        for amount in &credits {
            state = state.apply(*amount, Utc::now()).unwrap();
        }
        let before = state.historical_credits();
        prop_assert_eq!(before, state.balance());
        let state = state.apply(-debit, Utc::now()).unwrap();
        prop_assert_eq!(state.historical_credits(), before);
    }
}

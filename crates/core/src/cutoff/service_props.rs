//! Property-based tests for cut-off totals.
//!
//! - Property 1: Expected closing is independent of movement order
//! - Property 2: Expected closing equals opening plus the signed sum

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use boveda_shared::types::{ActorId, Currency, VaultKey};

use super::service::CutOffService;
use crate::movement::{Movement, MovementDraft, MovementKind, MovementService};
use crate::period::Period;

/// Strategy to generate positive amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate (kind, magnitude, day-of-month).
fn movement_spec() -> impl Strategy<Value = (MovementKind, Decimal, u32)> {
    (
        proptest::sample::select(MovementKind::ALL.to_vec()),
        positive_amount(),
        any::<bool>(),
        1u32..=28,
    )
        .prop_map(|(kind, amount, negative, day)| {
            let amount = if kind == MovementKind::Adjustment && negative {
                -amount
            } else {
                amount
            };
            (kind, amount, day)
        })
}

fn build(specs: &[(MovementKind, Decimal, u32)]) -> Vec<Movement> {
    specs
        .iter()
        .enumerate()
        .map(|(i, (kind, amount, day))| {
            let draft = MovementDraft::new(
                VaultKey::new("azteca").unwrap(),
                *kind,
                *amount,
                "prop",
                NaiveDate::from_ymd_opt(2026, 2, *day).unwrap(),
                ActorId::new("prop").unwrap(),
            );
            let pending = MovementService::build(draft, Currency::Mxn, i as u64 + 1, Utc::now()).unwrap();
            MovementService::complete(&pending, Decimal::ZERO, Utc::now()).unwrap()
        })
        .collect()
}

fn february() -> Period {
    Period::new(
        NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 2, 28).unwrap(),
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// *For any* set of movements, shuffling them does not change the totals.
    #[test]
    fn prop_totals_order_independent(
        specs in prop::collection::vec(movement_spec(), 0..30),
        seed in any::<u64>(),
    ) {
        let movements = build(&specs);
        let mut shuffled = movements.clone();
        // deterministic rotation + reverse keyed by seed
        if !shuffled.is_empty() {
            let k = usize::try_from(seed % shuffled.len() as u64).unwrap();
            shuffled.rotate_left(k);
            if seed % 2 == 0 {
                shuffled.reverse();
            }
        }
        let vault = VaultKey::new("azteca").unwrap();
        let a = CutOffService::compute_totals(&vault, &february(), &movements);
        let b = CutOffService::compute_totals(&vault, &february(), &shuffled);
        prop_assert_eq!(a, b);
    }

    /// *For any* set of movements, opening plus net equals opening plus the
    /// signed sum of the amounts.
    #[test]
    fn prop_expected_is_signed_sum(
        opening in positive_amount(),
        specs in prop::collection::vec(movement_spec(), 0..30),
    ) {
        let movements = build(&specs);
        let vault = VaultKey::new("azteca").unwrap();
        let totals = CutOffService::compute_totals(&vault, &february(), &movements);
        let sum: Decimal = movements.iter().map(|m| m.amount).sum();
        prop_assert_eq!(opening + totals.net(), opening + sum);
        prop_assert_eq!(totals.movement_count as usize, movements.len());
        let breakdown_sum: Decimal = totals.breakdown.iter().map(|k| k.total).sum();
        prop_assert_eq!(breakdown_sum, sum);
    }
}

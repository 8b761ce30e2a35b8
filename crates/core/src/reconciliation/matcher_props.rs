//! Property-based tests for statement matching.
//!
//! - Property 1: Matching is deterministic
//! - Property 2: Every item is matched at most once and lands on exactly one side
//! - Property 3: Pairs share the amount and respect the date window

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use boveda_shared::types::{ActorId, Currency, VaultKey};

use super::matcher::Matcher;
use super::types::{MatchPass, StatementLine};
use crate::movement::{Movement, MovementDraft, MovementKind, MovementService};

/// Strategy to generate a small set of signed amounts so collisions are common.
fn amount() -> impl Strategy<Value = Decimal> {
    (prop::sample::select(vec![-500i64, -120, -40, 40, 120, 350, 500]))
        .prop_map(|units| Decimal::new(units * 100, 2))
}

fn day() -> impl Strategy<Value = u32> {
    1u32..=28
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
}

fn movements(specs: &[(Decimal, u32)]) -> Vec<Movement> {
    specs
        .iter()
        .enumerate()
        .map(|(i, (amount, day))| {
            let kind = if amount.is_sign_negative() {
                MovementKind::Expense
            } else {
                MovementKind::Income
            };
            let draft = MovementDraft::new(
                VaultKey::new("azteca").unwrap(),
                kind,
                *amount,
                "prop",
                date(*day),
                ActorId::new("prop").unwrap(),
            );
            let pending = MovementService::build(draft, Currency::Mxn, i as u64 + 1, Utc::now()).unwrap();
            MovementService::complete(&pending, Decimal::ZERO, Utc::now()).unwrap()
        })
        .collect()
}

fn lines(specs: &[(Decimal, u32)]) -> Vec<StatementLine> {
    specs
        .iter()
        .map(|(amount, day)| StatementLine {
            date: date(*day),
            amount: *amount,
            reference: None,
            description: None,
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// *For any* inputs, matching twice yields the same outcome.
    #[test]
    fn prop_matching_deterministic(
        system in prop::collection::vec((amount(), day()), 0..20),
        bank in prop::collection::vec((amount(), day()), 0..20),
        window in 0u32..5,
    ) {
        let system = movements(&system);
        let bank = lines(&bank);
        let matcher = Matcher::new(window);
        prop_assert_eq!(matcher.match_items(&system, &bank), matcher.match_items(&system, &bank));
    }

    /// *For any* inputs, pairs and unmatched indices partition both sides.
    #[test]
    fn prop_items_used_once(
        system in prop::collection::vec((amount(), day()), 0..20),
        bank in prop::collection::vec((amount(), day()), 0..20),
        window in 0u32..5,
    ) {
        let system = movements(&system);
        let bank = lines(&bank);
        let outcome = Matcher::new(window).match_items(&system, &bank);

        let paired_ids: HashSet<_> = outcome.pairs.iter().map(|p| p.movement_id).collect();
        let paired_lines: HashSet<_> = outcome.pairs.iter().map(|p| p.statement_line).collect();
        prop_assert_eq!(paired_ids.len(), outcome.pairs.len());
        prop_assert_eq!(paired_lines.len(), outcome.pairs.len());
        prop_assert_eq!(outcome.pairs.len() + outcome.unmatched_system.len(), system.len());
        prop_assert_eq!(outcome.pairs.len() + outcome.unmatched_bank.len(), bank.len());
        for &s in &outcome.unmatched_system {
            prop_assert!(!paired_ids.contains(&system[s].id));
        }
        for &b in &outcome.unmatched_bank {
            prop_assert!(!paired_lines.contains(&b));
        }
    }

    /// *For any* pair, amounts agree and dates respect its pass.
    #[test]
    fn prop_pairs_respect_rules(
        system in prop::collection::vec((amount(), day()), 0..20),
        bank in prop::collection::vec((amount(), day()), 0..20),
        window in 0u32..5,
    ) {
        let system = movements(&system);
        let bank = lines(&bank);
        let outcome = Matcher::new(window).match_items(&system, &bank);
        for pair in &outcome.pairs {
            let line = &bank[pair.statement_line];
            prop_assert_eq!(pair.amount, line.amount);
            let distance = (pair.bank_date - pair.system_date).num_days().abs();
            match pair.pass {
                MatchPass::Exact => prop_assert_eq!(distance, 0),
                MatchPass::DateWindow => prop_assert!(distance <= i64::from(window)),
            }
        }
    }
}

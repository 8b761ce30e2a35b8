//! Deterministic two-pass matching of ledger movements against statement lines.
//!
//! Both sides are ordered by date, then amount, then insertion order. Pass one
//! pairs equal amounts on the same date. Pass two pairs equal amounts within
//! the date window, nearest date first. In both passes two items whose
//! references are both present and differ never pair. Each item is used at
//! most once.

use super::types::{MatchPass, MatchedPair, StatementLine};
use crate::movement::Movement;

/// Result of matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Matched pairs, in the order they were found.
    pub pairs: Vec<MatchedPair>,
    /// Indices into the system slice left unmatched, in match order.
    pub unmatched_system: Vec<usize>,
    /// Indices into the statement slice left unmatched, in match order.
    pub unmatched_bank: Vec<usize>,
}

/// Matching configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Matcher {
    /// Days either side of a statement date searched in pass two.
    pub date_window_days: u32,
}

impl Matcher {
    /// Creates a matcher.
    #[must_use]
    pub const fn new(date_window_days: u32) -> Self {
        Self { date_window_days }
    }

    /// Matches `system` movements against statement `lines`.
    #[must_use]
    pub fn match_items(&self, system: &[Movement], lines: &[StatementLine]) -> MatchOutcome {
        let mut system_order: Vec<usize> = (0..system.len()).collect();
        system_order.sort_by_key(|&i| (system[i].occurred_on, system[i].amount, system[i].sequence, i));
        let mut bank_order: Vec<usize> = (0..lines.len()).collect();
        bank_order.sort_by_key(|&i| (lines[i].date, lines[i].amount, i));

        let mut system_taken = vec![false; system.len()];
        let mut bank_taken = vec![false; lines.len()];
        let mut pairs = Vec::new();

        // pass one: exact
        for &s in &system_order {
            let movement = &system[s];
            let found = bank_order.iter().copied().find(|&b| {
                !bank_taken[b]
                    && lines[b].amount == movement.amount
                    && lines[b].date == movement.occurred_on
                    && references_compatible(movement.reference.as_deref(), lines[b].reference.as_deref())
            });
            if let Some(b) = found {
                system_taken[s] = true;
                bank_taken[b] = true;
                pairs.push(pair(movement, b, &lines[b], MatchPass::Exact));
            }
        }

        // pass two: date window, nearest first
        let window = i64::from(self.date_window_days);
        for &s in &system_order {
            if system_taken[s] {
                continue;
            }
            let movement = &system[s];
            let best = bank_order
                .iter()
                .enumerate()
                .filter(|&(_, &b)| {
                    !bank_taken[b]
                        && lines[b].amount == movement.amount
                        && references_compatible(movement.reference.as_deref(), lines[b].reference.as_deref())
                })
                .map(|(rank, &b)| ((lines[b].date - movement.occurred_on).num_days().abs(), rank, b))
                .filter(|&(distance, _, _)| distance <= window)
                .min();
            if let Some((_, _, b)) = best {
                system_taken[s] = true;
                bank_taken[b] = true;
                pairs.push(pair(movement, b, &lines[b], MatchPass::DateWindow));
            }
        }

        MatchOutcome {
            pairs,
            unmatched_system: system_order.into_iter().filter(|&s| !system_taken[s]).collect(),
            unmatched_bank: bank_order.into_iter().filter(|&b| !bank_taken[b]).collect(),
        }
    }
}

fn references_compatible(system: Option<&str>, bank: Option<&str>) -> bool {
    match (system.map(str::trim), bank.map(str::trim)) {
        (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => a.eq_ignore_ascii_case(b),
        _ => true,
    }
}

fn pair(movement: &Movement, index: usize, line: &StatementLine, pass: MatchPass) -> MatchedPair {
    MatchedPair {
        movement_id: movement.id,
        statement_line: index,
        amount: movement.amount,
        system_date: movement.occurred_on,
        bank_date: line.date,
        pass,
    }
}

//! Cut-off computation and state transitions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use boveda_shared::types::{ActorId, CutOffId, VaultKey};

use super::types::{CutOff, CutOffState, CutOffTotals, KindTotal};
use crate::error::LedgerError;
use crate::movement::validation::validate_balance;
use crate::movement::{Direction, Movement, MovementKind};
use crate::period::Period;

/// Stateless service for cut-off calculations and transitions.
pub struct CutOffService;

impl CutOffService {
    /// Computes totals from the completed movements of a vault in a period.
    ///
    /// Movements of other vaults, outside the period, or not completed are
    /// ignored. The result does not depend on the order of `movements`.
    #[must_use]
    pub fn compute_totals(vault: &VaultKey, period: &Period, movements: &[Movement]) -> CutOffTotals {
        let mut included: Vec<&Movement> = movements
            .iter()
            .filter(|m| &m.vault == vault && m.counts_toward_balance() && period.contains(m.occurred_on))
            .collect();
        included.sort_by_key(|m| m.ordering_key());

        let mut totals = CutOffTotals::default();
        let mut by_kind: BTreeMap<MovementKind, (u32, Decimal)> = BTreeMap::new();

        for movement in &included {
            let magnitude = movement.amount.abs();
            match (movement.kind, movement.direction()) {
                (MovementKind::TransferIn, _) => totals.transfers_in += magnitude,
                (MovementKind::TransferOut, _) => totals.transfers_out += magnitude,
                (_, Direction::Credit) => totals.credits += magnitude,
                (_, Direction::Debit) => totals.debits += magnitude,
            }
            let entry = by_kind.entry(movement.kind).or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += movement.amount;
            totals.movement_ids.push(movement.id);
        }

        totals.movement_count = u32::try_from(included.len()).unwrap_or(u32::MAX);
        totals.breakdown = by_kind
            .into_iter()
            .map(|(kind, (count, total))| KindTotal { kind, count, total })
            .collect();
        totals
    }

    /// Opens a cut-off, rejecting overlaps with open or closed cut-offs of the vault.
    pub fn open(
        vault: VaultKey,
        period: Period,
        opening_balance: Decimal,
        opened_by: ActorId,
        existing: &[CutOff],
        now: DateTime<Utc>,
    ) -> Result<CutOff, LedgerError> {
        validate_balance(opening_balance)?;
        if let Some(clash) = existing
            .iter()
            .find(|c| c.vault == vault && c.state.blocks_overlap() && c.period.overlaps(&period))
        {
            return Err(LedgerError::OverlappingPeriod {
                vault,
                existing: clash.id,
            });
        }

        Ok(CutOff {
            id: CutOffId::new(),
            vault,
            period,
            opening_balance,
            totals: CutOffTotals::default(),
            actual_closing: None,
            state: CutOffState::Open,
            notes: None,
            opened_by,
            opened_at: now,
            closed_by: None,
            closed_at: None,
            audited_by: None,
            audited_at: None,
            reconciled_by: None,
            reconciled_at: None,
        })
    }

    /// Replaces the totals of an open cut-off. Other states keep frozen totals.
    #[must_use]
    pub fn refresh(cut_off: &CutOff, movements: &[Movement]) -> CutOff {
        let mut next = cut_off.clone();
        if next.state == CutOffState::Open {
            next.totals = Self::compute_totals(&next.vault, &next.period, movements);
        }
        next
    }

    /// Closes an open cut-off with the reported balance.
    pub fn close(
        cut_off: &CutOff,
        movements: &[Movement],
        actual_closing: Decimal,
        closed_by: ActorId,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<CutOff, LedgerError> {
        if cut_off.state != CutOffState::Open {
            return Err(LedgerError::AlreadyClosed(cut_off.id));
        }
        validate_balance(actual_closing)?;
        let mut next = cut_off.clone();
        next.totals = Self::compute_totals(&next.vault, &next.period, movements);
        next.actual_closing = Some(actual_closing);
        next.state = CutOffState::Closed;
        next.closed_by = Some(closed_by);
        next.closed_at = Some(now);
        next.notes = Self::append_notes(next.notes, notes);
        Ok(next)
    }

    /// Audits a closed cut-off. The auditor must not be the closer.
    pub fn audit(
        cut_off: &CutOff,
        auditor: ActorId,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<CutOff, LedgerError> {
        if cut_off.state != CutOffState::Closed {
            return Err(LedgerError::NotClosed(cut_off.id));
        }
        if cut_off.closed_by.as_ref() == Some(&auditor) {
            return Err(LedgerError::SelfAudit {
                cut_off: cut_off.id,
                actor: auditor,
            });
        }
        let mut next = cut_off.clone();
        next.state = CutOffState::Audited;
        next.audited_by = Some(auditor);
        next.audited_at = Some(now);
        next.notes = Self::append_notes(next.notes, notes);
        Ok(next)
    }

    /// Marks an audited cut-off as reconciled.
    pub fn mark_reconciled(
        cut_off: &CutOff,
        reconciled_by: ActorId,
        now: DateTime<Utc>,
    ) -> Result<CutOff, LedgerError> {
        if cut_off.state != CutOffState::Audited {
            return Err(LedgerError::NotAudited(cut_off.id));
        }
        let mut next = cut_off.clone();
        next.state = CutOffState::Reconciled;
        next.reconciled_by = Some(reconciled_by);
        next.reconciled_at = Some(now);
        Ok(next)
    }

    fn append_notes(current: Option<String>, extra: Option<String>) -> Option<String> {
        let extra = extra.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        match (current, extra) {
            (Some(current), Some(extra)) => Some(format!("{current}\n{extra}")),
            (current, None) => current,
            (None, extra) => extra,
        }
    }
}

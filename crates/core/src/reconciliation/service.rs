//! Reconciliation run construction and difference resolution.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use boveda_shared::types::{ActorId, DifferenceId, ReconciliationRunId, VaultKey};

use super::fingerprint::{canonical_lines, statement_fingerprint, system_fingerprint};
use super::matcher::Matcher;
use super::types::{
    Difference, DifferenceSide, ReconciliationRun, Resolution, ResolutionAction, StatementLine,
};
use crate::error::LedgerError;
use crate::movement::Movement;
use crate::movement::validation::validate_amount;
use crate::period::Period;

/// Parameters of a reconciliation request.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Vault to reconcile.
    pub vault: VaultKey,
    /// Period covered.
    pub period: Period,
    /// Statement source, e.g. the bank name.
    pub source: String,
    /// Statement lines.
    pub lines: Vec<StatementLine>,
    /// Actor running it.
    pub actor: ActorId,
}

/// Stateless service for reconciliation runs.
pub struct ReconciliationService;

impl ReconciliationService {
    /// Selects the ledger movements a run considers.
    #[must_use]
    pub fn system_side(vault: &VaultKey, period: &Period, movements: &[Movement]) -> Vec<Movement> {
        let mut selected: Vec<Movement> = movements
            .iter()
            .filter(|m| &m.vault == vault && m.counts_toward_balance() && period.contains(m.occurred_on))
            .cloned()
            .collect();
        selected.sort_by_key(Movement::ordering_key);
        selected
    }

    /// Validates statement lines with the same amount rules as movements.
    pub fn validate_lines(lines: &[StatementLine]) -> Result<(), LedgerError> {
        for line in lines {
            validate_amount(line.amount).map_err(|e| match e {
                LedgerError::InvalidAmount(reason) => LedgerError::InvalidAmount(format!(
                    "statement line dated {}: {reason}",
                    line.date
                )),
                other => other,
            })?;
        }
        Ok(())
    }

    /// Matches the system side against the statement and records differences.
    ///
    /// # Arguments
    /// * `request` - Vault, period, source, lines and actor
    /// * `movements` - Ledger movements; filtered with [`Self::system_side`]
    /// * `matcher` - Matching configuration
    /// * `threshold_pct` - Percentage needed to count as reconciled
    /// * `now` - Run timestamp
    pub fn run(
        request: RunRequest,
        movements: &[Movement],
        matcher: Matcher,
        threshold_pct: Decimal,
        now: DateTime<Utc>,
    ) -> Result<ReconciliationRun, LedgerError> {
        Self::validate_lines(&request.lines)?;
        let lines = canonical_lines(&request.lines);
        let system = Self::system_side(&request.vault, &request.period, movements);
        let outcome = matcher.match_items(&system, &lines);

        let mut differences: Vec<Difference> = outcome
            .unmatched_system
            .iter()
            .map(|&i| {
                let movement = &system[i];
                Difference {
                    id: DifferenceId::new(),
                    side: DifferenceSide::SystemOnly,
                    amount: movement.amount,
                    date: movement.occurred_on,
                    reference: movement.reference.clone(),
                    movement_id: Some(movement.id),
                    statement_line: None,
                    resolution: None,
                }
            })
            .collect();
        differences.extend(outcome.unmatched_bank.iter().map(|&i| {
            let line = &lines[i];
            Difference {
                id: DifferenceId::new(),
                side: DifferenceSide::BankOnly,
                amount: line.amount,
                date: line.date,
                reference: line.reference.clone(),
                movement_id: None,
                statement_line: Some(i),
                resolution: None,
            }
        }));

        Ok(ReconciliationRun {
            id: ReconciliationRunId::new(),
            system_count: system.len(),
            system_total: system.iter().map(|m| m.amount).sum(),
            statement_count: lines.len(),
            statement_total: lines.iter().map(|l| l.amount).sum(),
            statement_fingerprint: statement_fingerprint(&lines),
            statement_lines: lines,
            matches: outcome.pairs,
            differences,
            threshold_pct,
            system_fingerprint: system_fingerprint(&system),
            vault: request.vault,
            period: request.period,
            source: request.source.trim().to_string(),
            created_by: request.actor,
            created_at: now,
            reviewed_by: None,
            reviewed_at: None,
            approved_by: None,
            approved_at: None,
        })
    }

    /// Records a resolution on one difference.
    pub fn resolve(
        run: &ReconciliationRun,
        difference: DifferenceId,
        note: &str,
        action: ResolutionAction,
        resolved_by: ActorId,
        now: DateTime<Utc>,
    ) -> Result<ReconciliationRun, LedgerError> {
        if note.trim().is_empty() {
            return Err(LedgerError::ResolutionNoteRequired);
        }
        let mut next = run.clone();
        let target = next
            .differences
            .iter_mut()
            .find(|d| d.id == difference)
            .ok_or(LedgerError::DifferenceNotFound(difference))?;
        if target.is_resolved() {
            return Err(LedgerError::AlreadyResolved(difference));
        }
        target.resolution = Some(Resolution {
            action,
            note: note.trim().to_string(),
            resolved_by,
            resolved_at: now,
        });
        Ok(next)
    }

    /// Records who reviewed the run. Reviewing again replaces the reviewer.
    pub fn review(
        run: &ReconciliationRun,
        reviewer: ActorId,
        now: DateTime<Utc>,
    ) -> Result<ReconciliationRun, LedgerError> {
        if run.approved_by.is_some() {
            return Err(LedgerError::AlreadyApproved(run.id));
        }
        let mut next = run.clone();
        next.reviewed_by = Some(reviewer);
        next.reviewed_at = Some(now);
        Ok(next)
    }

    /// Approves a reconciled run.
    pub fn approve(
        run: &ReconciliationRun,
        approver: ActorId,
        now: DateTime<Utc>,
    ) -> Result<ReconciliationRun, LedgerError> {
        if run.approved_by.is_some() {
            return Err(LedgerError::AlreadyApproved(run.id));
        }
        if !run.is_reconciled() {
            return Err(LedgerError::NotReconciled(run.id));
        }
        let mut next = run.clone();
        next.approved_by = Some(approver);
        next.approved_at = Some(now);
        Ok(next)
    }
}

//! Reconciliation domain types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use boveda_shared::types::{
    ActorId, DifferenceId, MovementId, ReconciliationRunId, VaultKey, round_money,
};

use crate::period::Period;

/// One line of an external bank statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementLine {
    /// Value date.
    pub date: NaiveDate,
    /// Signed amount, credits positive.
    pub amount: Decimal,
    /// Bank reference or folio.
    #[serde(default)]
    pub reference: Option<String>,
    /// Bank description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Which side a difference was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceSide {
    /// In the ledger but not on the statement.
    SystemOnly,
    /// On the statement but not in the ledger.
    BankOnly,
}

impl DifferenceSide {
    /// Returns the string representation of the side.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SystemOnly => "system_only",
            Self::BankOnly => "bank_only",
        }
    }
}

impl fmt::Display for DifferenceSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a difference was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionAction {
    /// A ledger adjustment was (or will be) booked.
    AdjustSystem,
    /// The bank will correct its side.
    AdjustBank,
    /// Accepted as is.
    Ignore,
    /// Under investigation; counts as resolved for the run.
    Investigate,
}

impl ResolutionAction {
    /// Parses an action from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "adjust_system" => Some(Self::AdjustSystem),
            "adjust_bank" => Some(Self::AdjustBank),
            "ignore" => Some(Self::Ignore),
            "investigate" => Some(Self::Investigate),
            _ => None,
        }
    }
}

/// Resolution recorded on a difference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Action taken.
    pub action: ResolutionAction,
    /// Explanation.
    pub note: String,
    /// Actor who resolved it.
    pub resolved_by: ActorId,
    /// When it was resolved.
    pub resolved_at: DateTime<Utc>,
}

/// An unmatched item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Difference {
    /// Unique identifier.
    pub id: DifferenceId,
    /// Side it was found on.
    pub side: DifferenceSide,
    /// Signed amount.
    pub amount: Decimal,
    /// Date on its side.
    pub date: NaiveDate,
    /// Reference on its side.
    pub reference: Option<String>,
    /// Ledger movement, for system-only differences.
    pub movement_id: Option<MovementId>,
    /// Index into [`ReconciliationRun::statement_lines`], for bank-only differences.
    pub statement_line: Option<usize>,
    /// Resolution, once resolved.
    pub resolution: Option<Resolution>,
}

impl Difference {
    /// Returns true once a resolution is recorded.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }
}

/// Which matching pass paired two items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPass {
    /// Same amount and same date.
    Exact,
    /// Same amount within the date window.
    DateWindow,
}

/// A ledger movement paired with a statement line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedPair {
    /// Ledger movement.
    pub movement_id: MovementId,
    /// Index into [`ReconciliationRun::statement_lines`].
    pub statement_line: usize,
    /// Shared amount.
    pub amount: Decimal,
    /// Ledger date.
    pub system_date: NaiveDate,
    /// Statement date.
    pub bank_date: NaiveDate,
    /// Pass that produced the pair.
    pub pass: MatchPass,
}

/// A reconciliation of one vault against one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationRun {
    /// Unique identifier.
    pub id: ReconciliationRunId,
    /// Vault reconciled.
    pub vault: VaultKey,
    /// Period covered.
    pub period: Period,
    /// Statement source, e.g. the bank name.
    pub source: String,
    /// Number of ledger movements considered.
    pub system_count: usize,
    /// Sum of ledger movements considered.
    pub system_total: Decimal,
    /// Number of statement lines.
    pub statement_count: usize,
    /// Sum of statement lines.
    pub statement_total: Decimal,
    /// Statement lines in canonical order, independent of how they were submitted.
    pub statement_lines: Vec<StatementLine>,
    /// Matched pairs.
    pub matches: Vec<MatchedPair>,
    /// Unmatched items.
    pub differences: Vec<Difference>,
    /// Threshold in force when the run was made.
    pub threshold_pct: Decimal,
    /// Fingerprint of the statement lines.
    pub statement_fingerprint: String,
    /// Fingerprint of the ledger movements considered.
    pub system_fingerprint: String,
    /// Actor who ran it.
    pub created_by: ActorId,
    /// When it ran.
    pub created_at: DateTime<Utc>,
    /// Actor who reviewed it.
    pub reviewed_by: Option<ActorId>,
    /// When it was reviewed.
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Actor who approved it.
    pub approved_by: Option<ActorId>,
    /// When it was approved.
    pub approved_at: Option<DateTime<Utc>>,
}

impl ReconciliationRun {
    /// Number of matched pairs.
    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.matches.len()
    }

    /// Matched share of the larger side, in percent with two decimals.
    ///
    /// Two empty sides reconcile trivially at 100.
    #[must_use]
    pub fn match_pct(&self) -> Decimal {
        let denominator = self.system_count.max(self.statement_count);
        if denominator == 0 {
            return Decimal::ONE_HUNDRED;
        }
        round_money(
            Decimal::from(self.matched_count()) * Decimal::ONE_HUNDRED / Decimal::from(denominator),
        )
    }

    /// Differences still waiting for a resolution.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.differences.iter().filter(|d| !d.is_resolved()).count()
    }

    /// Differences already resolved.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.differences.len() - self.pending_count()
    }

    /// Match percentage at or above threshold and nothing left unresolved.
    #[must_use]
    pub fn is_reconciled(&self) -> bool {
        self.match_pct() >= self.threshold_pct && self.pending_count() == 0
    }

    /// Read model with derived figures filled in.
    #[must_use]
    pub fn view(&self) -> ReconciliationView {
        ReconciliationView {
            matched_count: self.matched_count(),
            match_pct: self.match_pct(),
            resolved_count: self.resolved_count(),
            pending_count: self.pending_count(),
            reconciled: self.is_reconciled(),
            run: self.clone(),
        }
    }
}

/// A run with its derived figures, as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationView {
    /// Stored run.
    #[serde(flatten)]
    pub run: ReconciliationRun,
    /// Number of matched pairs.
    pub matched_count: usize,
    /// Match percentage.
    pub match_pct: Decimal,
    /// Resolved differences.
    pub resolved_count: usize,
    /// Unresolved differences.
    pub pending_count: usize,
    /// Whether the run counts as reconciled.
    pub reconciled: bool,
}

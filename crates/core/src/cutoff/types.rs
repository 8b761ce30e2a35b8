//! Cut-off domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use boveda_shared::types::{ActorId, CutOffId, MovementId, VaultKey, round_money};

use crate::movement::MovementKind;
use crate::period::Period;

/// State of a cut-off.
///
/// The valid transitions are:
/// - Open → Closed (close)
/// - Closed → Audited (audit)
/// - Audited → Reconciled (mark reconciled)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CutOffState {
    /// Collecting movements; totals are recomputed on read.
    Open,
    /// Actual balance reported; totals frozen.
    Closed,
    /// Reviewed by a second actor.
    Audited,
    /// Matched against the bank.
    Reconciled,
}

impl CutOffState {
    /// Returns the string representation of the state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Audited => "audited",
            Self::Reconciled => "reconciled",
        }
    }

    /// Parses a state from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            "audited" => Some(Self::Audited),
            "reconciled" => Some(Self::Reconciled),
            _ => None,
        }
    }

    /// Returns true if the cut-off blocks overlapping cut-offs on the vault.
    #[must_use]
    pub fn blocks_overlap(&self) -> bool {
        matches!(self, Self::Open | Self::Closed)
    }
}

impl fmt::Display for CutOffState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Count and sum of one movement kind within a cut-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindTotal {
    /// Movement kind.
    pub kind: MovementKind,
    /// Number of movements.
    pub count: u32,
    /// Sum of signed amounts.
    pub total: Decimal,
}

/// Totals computed from the movements of a cut-off period.
///
/// `credits` and `debits` exclude transfer legs, which are tracked separately.
/// All four figures are non-negative magnitudes at full precision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutOffTotals {
    /// Non-transfer credits.
    pub credits: Decimal,
    /// Non-transfer debits, as a magnitude.
    pub debits: Decimal,
    /// Incoming transfer legs.
    pub transfers_in: Decimal,
    /// Outgoing transfer legs, as a magnitude.
    pub transfers_out: Decimal,
    /// Number of movements included.
    pub movement_count: u32,
    /// Per-kind breakdown, in kind order.
    pub breakdown: Vec<KindTotal>,
    /// Movements included, in ledger order.
    pub movement_ids: Vec<MovementId>,
}

impl CutOffTotals {
    /// Net change over the period.
    #[must_use]
    pub fn net(&self) -> Decimal {
        self.credits + self.transfers_in - self.debits - self.transfers_out
    }
}

/// A periodic snapshot of a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutOff {
    /// Unique identifier.
    pub id: CutOffId,
    /// Vault covered.
    pub vault: VaultKey,
    /// Period covered.
    pub period: Period,
    /// Balance at the start of the period.
    pub opening_balance: Decimal,
    /// Totals computed from the ledger.
    pub totals: CutOffTotals,
    /// Closing balance reported by the closer.
    pub actual_closing: Option<Decimal>,
    /// Current state.
    pub state: CutOffState,
    /// Notes from closer and auditor.
    pub notes: Option<String>,
    /// Actor who opened it.
    pub opened_by: ActorId,
    /// When it was opened.
    pub opened_at: DateTime<Utc>,
    /// Actor who closed it.
    pub closed_by: Option<ActorId>,
    /// When it was closed.
    pub closed_at: Option<DateTime<Utc>>,
    /// Actor who audited it.
    pub audited_by: Option<ActorId>,
    /// When it was audited.
    pub audited_at: Option<DateTime<Utc>>,
    /// Actor who marked it reconciled.
    pub reconciled_by: Option<ActorId>,
    /// When it was marked reconciled.
    pub reconciled_at: Option<DateTime<Utc>>,
}

impl CutOff {
    /// Expected closing balance at full precision.
    #[must_use]
    pub fn expected_closing(&self) -> Decimal {
        self.opening_balance + self.totals.net()
    }

    /// Reported minus expected, rounded to cents. `None` until closed.
    #[must_use]
    pub fn difference(&self) -> Option<Decimal> {
        self.actual_closing
            .map(|actual| round_money(actual) - round_money(self.expected_closing()))
    }

    /// Returns true if the reported balance matches the expected one.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.difference().is_some_and(|d| d.is_zero())
    }

    /// Read model with derived figures filled in.
    #[must_use]
    pub fn view(&self) -> CutOffView {
        CutOffView {
            expected_closing: round_money(self.expected_closing()),
            difference: self.difference(),
            balanced: self.is_balanced(),
            cut_off: self.clone(),
        }
    }
}

/// A cut-off with its derived figures, as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutOffView {
    /// Stored cut-off.
    #[serde(flatten)]
    pub cut_off: CutOff,
    /// Expected closing balance, rounded.
    pub expected_closing: Decimal,
    /// Reported minus expected, once closed.
    pub difference: Option<Decimal>,
    /// Whether the difference is zero.
    pub balanced: bool,
}

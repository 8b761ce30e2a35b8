//! Movement domain types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use boveda_shared::types::{ActorId, Currency, MovementId, OperationId, TransferId, VaultKey};

use super::kind::{Direction, MovementKind};

/// Lifecycle status of a movement.
///
/// The valid transitions are:
/// - Pending → Completed (balance applied)
/// - Pending → Failed (balance update rejected)
/// - Pending → Cancelled (withdrawn before application)
/// - Completed → Reversed (transfer leg undone by saga compensation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementStatus {
    /// Recorded but not yet applied to the balance.
    Pending,
    /// Applied to the balance.
    Completed,
    /// Balance update was rejected.
    Failed,
    /// Withdrawn while pending.
    Cancelled,
    /// Applied, then undone by compensation.
    Reversed,
}

impl MovementStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Reversed => "reversed",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            "reversed" => Some(Self::Reversed),
            _ => None,
        }
    }

    /// Returns true if the movement counts toward the vault balance.
    #[must_use]
    pub fn counts_toward_balance(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Failed | Self::Cancelled | Self::Reversed)
    }
}

impl fmt::Display for MovementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A movement as requested by a caller, before ids and sequence are assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementDraft {
    /// Vault the movement belongs to.
    pub vault: VaultKey,
    /// Kind.
    pub kind: MovementKind,
    /// Signed amount; its sign must agree with the kind.
    pub amount: Decimal,
    /// Currency; defaults to the vault currency when absent.
    #[serde(default)]
    pub currency: Option<Currency>,
    /// Human readable description.
    pub concept: String,
    /// Free-form grouping (e.g. "nomina", "combustible").
    #[serde(default)]
    pub category: Option<String>,
    /// External reference such as a bank folio.
    #[serde(default)]
    pub reference: Option<String>,
    /// Longer notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Business date of the movement.
    pub occurred_on: NaiveDate,
    /// Actor issuing the command.
    pub actor: ActorId,
    /// Client idempotency key.
    #[serde(default)]
    pub operation_id: Option<OperationId>,
}

impl MovementDraft {
    /// Creates a draft with the amount signed by the kind's direction.
    ///
    /// Adjustments keep the sign of `amount` as given.
    #[must_use]
    pub fn new(
        vault: VaultKey,
        kind: MovementKind,
        amount: Decimal,
        concept: impl Into<String>,
        occurred_on: NaiveDate,
        actor: ActorId,
    ) -> Self {
        let amount = kind.direction().map_or(amount, |d| d.signed(amount));
        Self {
            vault,
            kind,
            amount,
            currency: None,
            concept: concept.into(),
            category: None,
            reference: None,
            notes: None,
            occurred_on,
            actor,
            operation_id: None,
        }
    }

    /// Sets the external reference.
    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the client idempotency key.
    #[must_use]
    pub fn with_operation_id(mut self, operation_id: OperationId) -> Self {
        self.operation_id = Some(operation_id);
        self
    }
}

/// A recorded movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    /// Unique identifier.
    pub id: MovementId,
    /// Per-vault insertion sequence, starting at 1.
    pub sequence: u64,
    /// Vault the movement belongs to.
    pub vault: VaultKey,
    /// Kind.
    pub kind: MovementKind,
    /// Signed amount.
    pub amount: Decimal,
    /// Currency of the amount.
    pub currency: Currency,
    /// Human readable description.
    pub concept: String,
    /// Free-form grouping.
    pub category: Option<String>,
    /// External reference such as a bank folio.
    pub reference: Option<String>,
    /// Longer notes.
    pub notes: Option<String>,
    /// Transfer this movement is a leg of.
    pub transfer_id: Option<TransferId>,
    /// The other leg of the transfer.
    pub linked_movement: Option<MovementId>,
    /// Movement this one reverses.
    pub reverses: Option<MovementId>,
    /// Movement that reverses this one.
    pub reversed_by: Option<MovementId>,
    /// Business date.
    pub occurred_on: NaiveDate,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Actor who created it.
    pub created_by: ActorId,
    /// Current status.
    pub status: MovementStatus,
    /// Vault balance right after application.
    pub balance_after: Option<Decimal>,
    /// Client idempotency key.
    pub operation_id: Option<OperationId>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
    /// Actor behind the last status change.
    pub updated_by: ActorId,
}

impl Movement {
    /// Direction of the signed amount.
    #[must_use]
    pub fn direction(&self) -> Direction {
        Direction::of(self.amount)
    }

    /// Returns true if the movement counts toward the vault balance.
    #[must_use]
    pub fn counts_toward_balance(&self) -> bool {
        self.status.counts_toward_balance()
    }

    /// Ordering key within a vault: business date, then insertion order.
    #[must_use]
    pub fn ordering_key(&self) -> (NaiveDate, u64) {
        (self.occurred_on, self.sequence)
    }
}

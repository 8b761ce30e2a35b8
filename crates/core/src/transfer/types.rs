//! Transfer domain types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use boveda_shared::types::{ActorId, MovementId, OperationId, TransferId, VaultKey};

/// Status of a transfer.
///
/// - Pending → Completed (both legs applied)
/// - Pending → Failed (nothing applied)
/// - Pending → Compensated (one leg applied, then undone)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    /// Legs written, balances not yet moved.
    Pending,
    /// Both legs applied.
    Completed,
    /// Rejected before any balance moved.
    Failed,
    /// A leg was applied and then undone.
    Compensated,
}

impl TransferStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Compensated => "compensated",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to move money between two vaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Vault debited.
    pub origin: VaultKey,
    /// Vault credited.
    pub destination: VaultKey,
    /// Positive amount.
    pub amount: Decimal,
    /// Description shared by both legs.
    pub concept: String,
    /// Business date; defaults to today.
    #[serde(default)]
    pub occurred_on: Option<NaiveDate>,
    /// Actor issuing the command.
    pub actor: ActorId,
    /// Client idempotency key.
    #[serde(default)]
    pub operation_id: Option<OperationId>,
}

/// A transfer between two vaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Unique identifier, shared by both legs.
    pub id: TransferId,
    /// Vault debited.
    pub origin: VaultKey,
    /// Vault credited.
    pub destination: VaultKey,
    /// Positive amount.
    pub amount: Decimal,
    /// Description.
    pub concept: String,
    /// Outgoing leg on the origin.
    pub out_leg: MovementId,
    /// Incoming leg on the destination.
    pub in_leg: MovementId,
    /// Current status.
    pub status: TransferStatus,
    /// Business date.
    pub occurred_on: NaiveDate,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Actor who requested it.
    pub created_by: ActorId,
    /// Reason recorded when the transfer failed or was compensated.
    pub failure_reason: Option<String>,
}

impl Transfer {
    /// Returns true if the transfer involves the given vault.
    #[must_use]
    pub fn touches(&self, vault: &VaultKey) -> bool {
        &self.origin == vault || &self.destination == vault
    }
}

//! Movement kinds and their balance direction.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which way a movement moves the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Increases the balance.
    Credit,
    /// Decreases the balance.
    Debit,
}

impl Direction {
    /// Direction implied by the sign of a non-zero amount.
    #[must_use]
    pub fn of(amount: Decimal) -> Self {
        if amount.is_sign_negative() {
            Self::Debit
        } else {
            Self::Credit
        }
    }

    /// The other direction.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Credit => Self::Debit,
            Self::Debit => Self::Credit,
        }
    }

    /// Applies this direction to a magnitude.
    #[must_use]
    pub fn signed(self, magnitude: Decimal) -> Decimal {
        match self {
            Self::Credit => magnitude.abs(),
            Self::Debit => -magnitude.abs(),
        }
    }
}

/// Type of a vault movement.
///
/// The direction is a property of the kind; only [`MovementKind::Adjustment`]
/// may go either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Sales or other income.
    Income,
    /// Operating expense.
    Expense,
    /// Incoming leg of a transfer.
    TransferIn,
    /// Outgoing leg of a transfer.
    TransferOut,
    /// Cash or bank deposit.
    Deposit,
    /// Cash withdrawal.
    Withdrawal,
    /// Manual correction, including reversals.
    Adjustment,
    /// Interest earned.
    Interest,
    /// Commission or service fee.
    Fee,
    /// Charge levied by the bank.
    BankCharge,
    /// Refund received.
    Refund,
}

impl MovementKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::Income,
        Self::Expense,
        Self::TransferIn,
        Self::TransferOut,
        Self::Deposit,
        Self::Withdrawal,
        Self::Adjustment,
        Self::Interest,
        Self::Fee,
        Self::BankCharge,
        Self::Refund,
    ];

    /// Fixed direction of the kind, `None` for adjustments.
    #[must_use]
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Self::Income | Self::TransferIn | Self::Deposit | Self::Interest | Self::Refund => {
                Some(Direction::Credit)
            }
            Self::Expense | Self::TransferOut | Self::Withdrawal | Self::Fee | Self::BankCharge => {
                Some(Direction::Debit)
            }
            Self::Adjustment => None,
        }
    }

    /// Returns true if a signed amount agrees with the kind's direction.
    #[must_use]
    pub fn accepts(&self, amount: Decimal) -> bool {
        match self.direction() {
            Some(direction) => Direction::of(amount) == direction,
            None => true,
        }
    }

    /// Returns true for the two transfer legs.
    #[must_use]
    pub fn is_transfer(&self) -> bool {
        matches!(self, Self::TransferIn | Self::TransferOut)
    }

    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::TransferIn => "transfer_in",
            Self::TransferOut => "transfer_out",
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Adjustment => "adjustment",
            Self::Interest => "interest",
            Self::Fee => "fee",
            Self::BankCharge => "bank_charge",
            Self::Refund => "refund",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.to_lowercase())
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

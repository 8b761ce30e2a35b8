//! Transfer planning and saga bookkeeping.
//!
//! A transfer is executed as a short saga: write the outgoing leg, write the
//! incoming leg, apply both balances, commit. [`SagaProgress`] records how far
//! the saga got so that a failure at any step maps to exactly one set of
//! compensating actions.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use boveda_shared::types::{MovementId, TransferId};

use super::types::{Transfer, TransferRequest, TransferStatus};
use crate::error::LedgerError;
use crate::movement::validation::{MAX_CONCEPT_LEN, validate_amount, validate_concept};
use crate::movement::{Movement, MovementKind, MovementStatus};
use crate::vault::Vault;

/// Named saga step, used for timeouts and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaStep {
    /// Persist the outgoing leg as pending.
    WriteOutLeg,
    /// Persist the incoming leg as pending.
    WriteInLeg,
    /// Debit the origin balance.
    ApplyOutLeg,
    /// Credit the destination balance.
    ApplyInLeg,
    /// Mark legs and transfer completed.
    Commit,
}

impl SagaStep {
    /// Returns the step name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WriteOutLeg => "write_out_leg",
            Self::WriteInLeg => "write_in_leg",
            Self::ApplyOutLeg => "apply_out_leg",
            Self::ApplyInLeg => "apply_in_leg",
            Self::Commit => "commit",
        }
    }
}

/// What the saga must do to undo a partial transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    /// Leg was written but never applied: cancel it.
    CancelLeg(MovementId),
    /// Leg was written and its application was attempted: mark it failed.
    FailLeg(MovementId),
    /// Leg was applied: undo its balance effect and mark it reversed.
    RevertLeg(MovementId),
}

/// Steps completed so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SagaProgress {
    /// Outgoing leg persisted.
    pub out_written: bool,
    /// Incoming leg persisted.
    pub in_written: bool,
    /// Origin balance debited.
    pub out_applied: bool,
    /// Destination balance credited.
    pub in_applied: bool,
}

impl SagaProgress {
    /// Compensations for a saga that failed at `failed_at`, and the resulting
    /// transfer status.
    #[must_use]
    pub fn compensations(
        &self,
        plan: &TransferPlan,
        failed_at: SagaStep,
    ) -> (Vec<Compensation>, TransferStatus) {
        let out = plan.out_leg.id;
        let inc = plan.in_leg.id;
        let mut actions = Vec::new();

        if !self.out_applied && !self.in_applied {
            if self.out_written {
                actions.push(if failed_at == SagaStep::ApplyOutLeg {
                    Compensation::FailLeg(out)
                } else {
                    Compensation::CancelLeg(out)
                });
            }
            if self.in_written {
                actions.push(Compensation::CancelLeg(inc));
            }
            return (actions, TransferStatus::Failed);
        }

        if self.out_applied {
            actions.push(Compensation::RevertLeg(out));
        } else if self.out_written {
            actions.push(Compensation::FailLeg(out));
        }
        if self.in_applied {
            actions.push(Compensation::RevertLeg(inc));
        } else if self.in_written {
            actions.push(Compensation::FailLeg(inc));
        }
        (actions, TransferStatus::Compensated)
    }
}

/// A validated transfer and its two pending legs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    /// The transfer record, pending.
    pub transfer: Transfer,
    /// Outgoing leg on the origin.
    pub out_leg: Movement,
    /// Incoming leg on the destination.
    pub in_leg: Movement,
}

/// Stateless service for planning transfers.
pub struct TransferService;

impl TransferService {
    /// Validates a transfer against both vaults and builds its pending legs.
    ///
    /// # Arguments
    /// * `request` - The transfer request
    /// * `origin` / `destination` - Current state of both vaults
    /// * `sequences` - Next sequence numbers for origin and destination
    /// * `today` - Date used when the request carries none
    /// * `now` - Creation timestamp
    pub fn plan(
        request: TransferRequest,
        origin: &Vault,
        destination: &Vault,
        sequences: (u64, u64),
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<TransferPlan, LedgerError> {
        Self::validate_request(&request)?;
        if origin.currency != destination.currency {
            return Err(LedgerError::CurrencyMismatch {
                expected: origin.currency,
                actual: destination.currency,
            });
        }
        origin.check_can_apply(-request.amount)?;
        destination.check_can_apply(request.amount)?;

        let transfer_id = TransferId::new();
        let occurred_on = request.occurred_on.unwrap_or(today);
        let concept = request.concept.trim().to_string();

        let mut out_leg = Self::leg(
            &request,
            origin,
            MovementKind::TransferOut,
            format!("Transferencia a {}: {concept}", destination.name),
            sequences.0,
            occurred_on,
            now,
        );
        let mut in_leg = Self::leg(
            &request,
            destination,
            MovementKind::TransferIn,
            format!("Transferencia desde {}: {concept}", origin.name),
            sequences.1,
            occurred_on,
            now,
        );
        out_leg.transfer_id = Some(transfer_id);
        in_leg.transfer_id = Some(transfer_id);
        out_leg.linked_movement = Some(in_leg.id);
        in_leg.linked_movement = Some(out_leg.id);

        let transfer = Transfer {
            id: transfer_id,
            origin: request.origin,
            destination: request.destination,
            amount: request.amount,
            concept,
            out_leg: out_leg.id,
            in_leg: in_leg.id,
            status: TransferStatus::Pending,
            occurred_on,
            created_at: now,
            created_by: request.actor,
            failure_reason: None,
        };

        Ok(TransferPlan {
            transfer,
            out_leg,
            in_leg,
        })
    }

    /// Checks the parts of a request that need no vault state.
    pub fn validate_request(request: &TransferRequest) -> Result<(), LedgerError> {
        if request.origin == request.destination {
            return Err(LedgerError::SameVaultTransfer(request.origin.clone()));
        }
        if request.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(
                "transfer amount must be positive".into(),
            ));
        }
        validate_amount(request.amount)?;
        validate_concept(&request.concept)
    }

    fn leg(
        request: &TransferRequest,
        vault: &Vault,
        kind: MovementKind,
        concept: String,
        sequence: u64,
        occurred_on: NaiveDate,
        now: DateTime<Utc>,
    ) -> Movement {
        let amount = kind
            .direction()
            .map_or(request.amount, |d| d.signed(request.amount));
        Movement {
            id: MovementId::new(),
            sequence,
            vault: vault.key.clone(),
            kind,
            amount,
            currency: vault.currency,
            concept: concept.chars().take(MAX_CONCEPT_LEN).collect(),
            category: Some("transferencia".into()),
            reference: None,
            notes: None,
            transfer_id: None,
            linked_movement: None,
            reverses: None,
            reversed_by: None,
            occurred_on,
            created_at: now,
            created_by: request.actor.clone(),
            status: MovementStatus::Pending,
            balance_after: None,
            operation_id: request.operation_id.clone(),
            updated_at: now,
            updated_by: request.actor.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boveda_shared::types::{ActorId, Currency, VaultKey};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn vault(key: &str, name: &str, balance: Decimal) -> Vault {
        let vault = Vault::new(VaultKey::new(key).unwrap(), name, Currency::Mxn);
        if balance.is_zero() {
            vault
        } else {
            vault.apply(balance, Utc::now()).unwrap()
        }
    }

    fn request(origin: &str, destination: &str, amount: Decimal) -> TransferRequest {
        TransferRequest {
            origin: VaultKey::new(origin).unwrap(),
            destination: VaultKey::new(destination).unwrap(),
            amount,
            concept: "Reparto".into(),
            occurred_on: None,
            actor: ActorId::new("ana").unwrap(),
            operation_id: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
    }

    fn plan(amount: Decimal) -> TransferPlan {
        TransferService::plan(
            request("azteca", "utilidades", amount),
            &vault("azteca", "Azteca", dec!(850.50)),
            &vault("utilidades", "Utilidades", Decimal::ZERO),
            (3, 1),
            today(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_plan_links_legs() {
        let plan = plan(dec!(500.00));
        assert_eq!(plan.out_leg.amount, dec!(-500.00));
        assert_eq!(plan.in_leg.amount, dec!(500.00));
        assert_eq!(plan.out_leg.kind, MovementKind::TransferOut);
        assert_eq!(plan.in_leg.kind, MovementKind::TransferIn);
        assert_eq!(plan.out_leg.transfer_id, Some(plan.transfer.id));
        assert_eq!(plan.in_leg.transfer_id, Some(plan.transfer.id));
        assert_eq!(plan.out_leg.linked_movement, Some(plan.in_leg.id));
        assert_eq!(plan.in_leg.linked_movement, Some(plan.out_leg.id));
        assert_eq!(plan.out_leg.sequence, 3);
        assert_eq!(plan.in_leg.sequence, 1);
        assert_eq!(plan.transfer.status, TransferStatus::Pending);
        assert_eq!(plan.transfer.occurred_on, today());
        assert_eq!(plan.out_leg.concept, "Transferencia a Utilidades: Reparto");
        assert_eq!(plan.in_leg.concept, "Transferencia desde Azteca: Reparto");
    }

    #[test]
    fn test_same_vault_rejected() {
        let azteca = vault("azteca", "Azteca", dec!(100));
        let err = TransferService::plan(
            request("azteca", "azteca", dec!(10)),
            &azteca,
            &azteca,
            (1, 1),
            today(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::SameVaultTransfer(_)));
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        assert!(matches!(
            TransferService::validate_request(&request("a", "b", Decimal::ZERO)),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            TransferService::validate_request(&request("a", "b", dec!(-1))),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_insufficient_funds_rejected() {
        let err = TransferService::plan(
            request("azteca", "utilidades", dec!(900.00)),
            &vault("azteca", "Azteca", dec!(850.50)),
            &vault("utilidades", "Utilidades", Decimal::ZERO),
            (1, 1),
            today(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    }

    #[test]
    fn test_currency_mismatch_rejected() {
        let usa = Vault::new(VaultKey::new("boveda-usa").unwrap(), "Bóveda USA", Currency::Usd);
        let err = TransferService::plan(
            request("azteca", "boveda-usa", dec!(10.00)),
            &vault("azteca", "Azteca", dec!(100)),
            &usa,
            (1, 1),
            today(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::CurrencyMismatch { .. }));
    }

    #[test]
    fn test_inactive_destination_rejected() {
        let closed = vault("utilidades", "Utilidades", Decimal::ZERO).with_active(false);
        let err = TransferService::plan(
            request("azteca", "utilidades", dec!(10.00)),
            &vault("azteca", "Azteca", dec!(100)),
            &closed,
            (1, 1),
            today(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::VaultInactive(_)));
    }

    #[test]
    fn test_compensation_second_write_fails() {
        let plan = plan(dec!(1.00));
        let progress = SagaProgress {
            out_written: true,
            ..SagaProgress::default()
        };
        let (actions, status) = progress.compensations(&plan, SagaStep::WriteInLeg);
        assert_eq!(actions, vec![Compensation::CancelLeg(plan.out_leg.id)]);
        assert_eq!(status, TransferStatus::Failed);
    }

    #[test]
    fn test_compensation_in_leg_apply_fails() {
        let plan = plan(dec!(1.00));
        let progress = SagaProgress {
            out_written: true,
            in_written: true,
            out_applied: true,
            in_applied: false,
        };
        let (actions, status) = progress.compensations(&plan, SagaStep::ApplyInLeg);
        assert_eq!(
            actions,
            vec![
                Compensation::RevertLeg(plan.out_leg.id),
                Compensation::FailLeg(plan.in_leg.id),
            ]
        );
        assert_eq!(status, TransferStatus::Compensated);
    }

    #[test]
    fn test_compensation_out_leg_apply_fails() {
        let plan = plan(dec!(1.00));
        let progress = SagaProgress {
            out_written: true,
            in_written: true,
            ..SagaProgress::default()
        };
        let (actions, status) = progress.compensations(&plan, SagaStep::ApplyOutLeg);
        assert_eq!(
            actions,
            vec![
                Compensation::FailLeg(plan.out_leg.id),
                Compensation::CancelLeg(plan.in_leg.id),
            ]
        );
        assert_eq!(status, TransferStatus::Failed);
    }

    #[test]
    fn test_compensation_commit_fails_reverts_both() {
        let plan = plan(dec!(1.00));
        let progress = SagaProgress {
            out_written: true,
            in_written: true,
            out_applied: true,
            in_applied: true,
        };
        let (actions, status) = progress.compensations(&plan, SagaStep::Commit);
        assert_eq!(
            actions,
            vec![
                Compensation::RevertLeg(plan.out_leg.id),
                Compensation::RevertLeg(plan.in_leg.id),
            ]
        );
        assert_eq!(status, TransferStatus::Compensated);
    }
}

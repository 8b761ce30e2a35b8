//! Movement lifecycle service.
//!
//! Builds movements from drafts and validates every status transition. Nothing
//! here touches storage or balances; callers persist the returned movement.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use boveda_shared::types::{ActorId, Currency, MovementId};

use super::kind::MovementKind;
use super::types::{Movement, MovementDraft, MovementStatus};
use super::validation::{MAX_CONCEPT_LEN, validate_concept, validate_draft};
use crate::error::LedgerError;

/// Stateless service for building movements and moving them between states.
pub struct MovementService;

impl MovementService {
    /// Validates a draft and builds a pending movement.
    ///
    /// # Arguments
    /// * `draft` - The caller's request
    /// * `vault_currency` - Currency of the target vault
    /// * `sequence` - Next per-vault sequence number
    /// * `now` - Creation timestamp
    pub fn build(
        draft: MovementDraft,
        vault_currency: Currency,
        sequence: u64,
        now: DateTime<Utc>,
    ) -> Result<Movement, LedgerError> {
        let currency = validate_draft(&draft, vault_currency)?;
        Ok(Movement {
            id: MovementId::new(),
            sequence,
            vault: draft.vault,
            kind: draft.kind,
            amount: draft.amount,
            currency,
            concept: draft.concept.trim().to_string(),
            category: draft.category,
            reference: draft.reference,
            notes: draft.notes,
            transfer_id: None,
            linked_movement: None,
            reverses: None,
            reversed_by: None,
            occurred_on: draft.occurred_on,
            created_at: now,
            created_by: draft.actor.clone(),
            status: MovementStatus::Pending,
            balance_after: None,
            operation_id: draft.operation_id,
            updated_at: now,
            updated_by: draft.actor,
        })
    }

    /// Marks a pending movement as applied.
    pub fn complete(
        movement: &Movement,
        balance_after: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Movement, LedgerError> {
        let mut next = Self::from_pending(movement, MovementStatus::Completed, now)?;
        next.balance_after = Some(balance_after);
        Ok(next)
    }

    /// Marks a pending movement as failed.
    pub fn fail(movement: &Movement, now: DateTime<Utc>) -> Result<Movement, LedgerError> {
        Self::from_pending(movement, MovementStatus::Failed, now)
    }

    /// Cancels a pending movement.
    pub fn cancel(
        movement: &Movement,
        cancelled_by: ActorId,
        now: DateTime<Utc>,
    ) -> Result<Movement, LedgerError> {
        let mut next = Self::from_pending(movement, MovementStatus::Cancelled, now)?;
        next.updated_by = cancelled_by;
        Ok(next)
    }

    /// Marks a completed transfer leg as undone by compensation.
    pub fn mark_compensated(movement: &Movement, now: DateTime<Utc>) -> Result<Movement, LedgerError> {
        if movement.status != MovementStatus::Completed {
            return Err(LedgerError::NotCompleted(movement.id));
        }
        let mut next = movement.clone();
        next.status = MovementStatus::Reversed;
        next.updated_at = now;
        Ok(next)
    }

    /// Builds the pending adjustment that offsets a completed movement.
    ///
    /// The reversal carries the opposite sign, points back at the original
    /// through `reverses`, and is dated `occurred_on` (normally today) so it
    /// lands in the period in which it was issued.
    pub fn reversal(
        original: &Movement,
        reason: &str,
        reversed_by: ActorId,
        sequence: u64,
        occurred_on: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Movement, LedgerError> {
        if original.status != MovementStatus::Completed {
            return Err(LedgerError::NotCompleted(original.id));
        }
        if original.reversed_by.is_some() {
            return Err(LedgerError::AlreadyReversed(original.id));
        }
        if let Some(transfer) = original.transfer_id {
            return Err(LedgerError::TransferLegReversal {
                movement: original.id,
                transfer,
            });
        }
        validate_concept(reason)?;

        let concept: String = format!("Reversión: {} ({})", original.concept, reason.trim())
            .chars()
            .take(MAX_CONCEPT_LEN)
            .collect();

        Ok(Movement {
            id: MovementId::new(),
            sequence,
            vault: original.vault.clone(),
            kind: MovementKind::Adjustment,
            amount: -original.amount,
            currency: original.currency,
            concept,
            category: original.category.clone(),
            reference: original.reference.clone(),
            notes: None,
            transfer_id: None,
            linked_movement: None,
            reverses: Some(original.id),
            reversed_by: None,
            occurred_on,
            created_at: now,
            created_by: reversed_by.clone(),
            status: MovementStatus::Pending,
            balance_after: None,
            operation_id: None,
            updated_at: now,
            updated_by: reversed_by,
        })
    }

    /// Records on the original which movement reversed it.
    pub fn link_reversal(
        original: &Movement,
        reversal: &Movement,
        now: DateTime<Utc>,
    ) -> Result<Movement, LedgerError> {
        if original.reversed_by.is_some() {
            return Err(LedgerError::AlreadyReversed(original.id));
        }
        let mut next = original.clone();
        next.reversed_by = Some(reversal.id);
        next.updated_at = now;
        next.updated_by = reversal.created_by.clone();
        Ok(next)
    }

    fn from_pending(
        movement: &Movement,
        to: MovementStatus,
        now: DateTime<Utc>,
    ) -> Result<Movement, LedgerError> {
        if movement.status != MovementStatus::Pending {
            return Err(LedgerError::NotPending(movement.id));
        }
        let mut next = movement.clone();
        next.status = to;
        next.updated_at = now;
        Ok(next)
    }
}

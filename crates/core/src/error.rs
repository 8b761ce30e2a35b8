//! Ledger error types.
//!
//! Every rejected command maps to one variant here. Variants are grouped by
//! [`ErrorKind`]: validation errors mean the command itself is malformed,
//! business-rule errors mean it is well formed but not allowed in the current
//! state, consistency errors come from concurrent writers or half-finished
//! sagas, and storage errors come from the persistence collaborator.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use boveda_shared::types::{
    ActorId, CutOffId, Currency, DifferenceId, MovementId, OperationId, ReconciliationRunId,
    TransferId, VaultKey,
};

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Broad category of a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed command.
    Validation,
    /// Command not allowed in the current state.
    BusinessRule,
    /// Referenced entity does not exist.
    NotFound,
    /// Concurrent modification or interrupted multi-step operation.
    Consistency,
    /// Persistence failure.
    Storage,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Amount is zero, has too many decimals, or its sign disagrees with the kind.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Amount is above the per-movement ceiling.
    #[error("Amount {amount} exceeds the limit of {limit}")]
    AmountExceedsLimit {
        /// Absolute amount requested.
        amount: Decimal,
        /// Ceiling.
        limit: Decimal,
    },

    /// Concept is blank or too long.
    #[error("Concept must be between 1 and {max} characters")]
    InvalidConcept {
        /// Maximum length in characters.
        max: usize,
    },

    /// Notes are too long.
    #[error("Notes cannot exceed {max} characters")]
    NotesTooLong {
        /// Maximum length in characters.
        max: usize,
    },

    /// Period ends before it starts.
    #[error("Invalid period: end {end} is before start {start}")]
    InvalidPeriod {
        /// Requested start.
        start: NaiveDate,
        /// Requested end.
        end: NaiveDate,
    },

    /// Movement currency differs from the vault currency.
    #[error("Currency mismatch: vault holds {expected}, got {actual}")]
    CurrencyMismatch {
        /// Currency the vault holds.
        expected: Currency,
        /// Currency supplied.
        actual: Currency,
    },

    /// Resolving a difference needs an explanatory note.
    #[error("A resolution note is required")]
    ResolutionNoteRequired,

    // ========== Business Rule Errors ==========
    /// Vault exists but does not accept movements.
    #[error("Vault {0} is inactive")]
    VaultInactive(VaultKey),

    /// Debit would take the vault below its minimum balance.
    #[error("Insufficient funds in vault {vault}: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Vault being debited.
        vault: VaultKey,
        /// Amount that can be debited without breaching the minimum.
        available: Decimal,
        /// Absolute amount requested.
        requested: Decimal,
    },

    /// Origin and destination of a transfer are the same vault.
    #[error("Cannot transfer from vault {0} to itself")]
    SameVaultTransfer(VaultKey),

    /// Movement already has a reversal.
    #[error("Movement {0} has already been reversed")]
    AlreadyReversed(MovementId),

    /// Transfer legs are only undone together, by saga compensation.
    #[error("Movement {movement} is a leg of transfer {transfer} and cannot be reversed on its own")]
    TransferLegReversal {
        /// The leg.
        movement: MovementId,
        /// Transfer it belongs to.
        transfer: TransferId,
    },

    /// Only completed movements can be reversed.
    #[error("Movement {0} is not completed")]
    NotCompleted(MovementId),

    /// Only pending movements can be confirmed or cancelled.
    #[error("Movement {0} is not pending")]
    NotPending(MovementId),

    /// An open or closed cut-off already covers part of the period.
    #[error("Period overlaps cut-off {existing} of vault {vault}")]
    OverlappingPeriod {
        /// Vault of both cut-offs.
        vault: VaultKey,
        /// The overlapping cut-off.
        existing: CutOffId,
    },

    /// Cut-off is no longer open.
    #[error("Cut-off {0} is already closed")]
    AlreadyClosed(CutOffId),

    /// Cut-off must be closed before audit.
    #[error("Cut-off {0} is not closed")]
    NotClosed(CutOffId),

    /// Cut-off must be audited before it is marked reconciled.
    #[error("Cut-off {0} is not audited")]
    NotAudited(CutOffId),

    /// Auditor closed the cut-off themselves.
    #[error("Cut-off {cut_off} must be audited by someone other than {actor}")]
    SelfAudit {
        /// Cut-off being audited.
        cut_off: CutOffId,
        /// Actor who both closed and tried to audit.
        actor: ActorId,
    },

    /// Difference already carries a resolution.
    #[error("Difference {0} is already resolved")]
    AlreadyResolved(DifferenceId),

    /// Run is below threshold or has open differences.
    #[error("Reconciliation run {0} is not reconciled")]
    NotReconciled(ReconciliationRunId),

    /// Run was already approved.
    #[error("Reconciliation run {0} is already approved")]
    AlreadyApproved(ReconciliationRunId),

    // ========== Not Found Errors ==========
    /// Vault not found.
    #[error("Vault not found: {0}")]
    VaultNotFound(VaultKey),

    /// Movement not found.
    #[error("Movement not found: {0}")]
    MovementNotFound(MovementId),

    /// Transfer not found.
    #[error("Transfer not found: {0}")]
    TransferNotFound(TransferId),

    /// Cut-off not found.
    #[error("Cut-off not found: {0}")]
    CutOffNotFound(CutOffId),

    /// Reconciliation run not found.
    #[error("Reconciliation run not found: {0}")]
    RunNotFound(ReconciliationRunId),

    /// Difference not found within the run.
    #[error("Difference not found: {0}")]
    DifferenceNotFound(DifferenceId),

    // ========== Consistency Errors ==========
    /// Vault version moved between read and write.
    #[error("Vault {vault} version mismatch: expected {expected}, found {actual}")]
    VersionMismatch {
        /// Vault written.
        vault: VaultKey,
        /// Version the writer read.
        expected: u64,
        /// Version found at write time.
        actual: u64,
    },

    /// A saga step did not finish in time.
    #[error("Step '{step}' timed out")]
    StepTimedOut {
        /// Step name.
        step: &'static str,
    },

    /// Retries were exhausted and the operation needs a human.
    #[error("Manual reconciliation required: {0}")]
    ManualReconciliationRequired(String),

    /// Operation key was already used for a different command.
    #[error("Operation key {0} was already used for a different command")]
    IdempotencyConflict(OperationId),

    // ========== Storage Errors ==========
    /// Persistence is temporarily unavailable.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Persistence failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns the error category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount(_)
            | Self::AmountExceedsLimit { .. }
            | Self::InvalidConcept { .. }
            | Self::NotesTooLong { .. }
            | Self::InvalidPeriod { .. }
            | Self::CurrencyMismatch { .. }
            | Self::ResolutionNoteRequired => ErrorKind::Validation,

            Self::VaultInactive(_)
            | Self::InsufficientFunds { .. }
            | Self::SameVaultTransfer(_)
            | Self::AlreadyReversed(_)
            | Self::TransferLegReversal { .. }
            | Self::NotCompleted(_)
            | Self::NotPending(_)
            | Self::OverlappingPeriod { .. }
            | Self::AlreadyClosed(_)
            | Self::NotClosed(_)
            | Self::NotAudited(_)
            | Self::SelfAudit { .. }
            | Self::AlreadyResolved(_)
            | Self::NotReconciled(_)
            | Self::AlreadyApproved(_) => ErrorKind::BusinessRule,

            Self::VaultNotFound(_)
            | Self::MovementNotFound(_)
            | Self::TransferNotFound(_)
            | Self::CutOffNotFound(_)
            | Self::RunNotFound(_)
            | Self::DifferenceNotFound(_) => ErrorKind::NotFound,

            Self::VersionMismatch { .. }
            | Self::StepTimedOut { .. }
            | Self::ManualReconciliationRequired(_)
            | Self::IdempotencyConflict(_) => ErrorKind::Consistency,

            Self::StorageUnavailable(_) | Self::Storage(_) | Self::Internal(_) => {
                ErrorKind::Storage
            }
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::AmountExceedsLimit { .. } => "AMOUNT_EXCEEDS_LIMIT",
            Self::InvalidConcept { .. } => "INVALID_CONCEPT",
            Self::NotesTooLong { .. } => "NOTES_TOO_LONG",
            Self::InvalidPeriod { .. } => "INVALID_PERIOD",
            Self::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            Self::ResolutionNoteRequired => "RESOLUTION_NOTE_REQUIRED",
            Self::VaultInactive(_) => "VAULT_INACTIVE",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::SameVaultTransfer(_) => "SAME_VAULT_TRANSFER",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::TransferLegReversal { .. } => "TRANSFER_LEG_REVERSAL",
            Self::NotCompleted(_) => "NOT_COMPLETED",
            Self::NotPending(_) => "NOT_PENDING",
            Self::OverlappingPeriod { .. } => "OVERLAPPING_PERIOD",
            Self::AlreadyClosed(_) => "ALREADY_CLOSED",
            Self::NotClosed(_) => "NOT_CLOSED",
            Self::NotAudited(_) => "NOT_AUDITED",
            Self::SelfAudit { .. } => "SELF_AUDIT",
            Self::AlreadyResolved(_) => "ALREADY_RESOLVED",
            Self::NotReconciled(_) => "NOT_RECONCILED",
            Self::AlreadyApproved(_) => "ALREADY_APPROVED",
            Self::VaultNotFound(_) => "VAULT_NOT_FOUND",
            Self::MovementNotFound(_) => "MOVEMENT_NOT_FOUND",
            Self::TransferNotFound(_) => "TRANSFER_NOT_FOUND",
            Self::CutOffNotFound(_) => "CUT_OFF_NOT_FOUND",
            Self::RunNotFound(_) => "RUN_NOT_FOUND",
            Self::DifferenceNotFound(_) => "DIFFERENCE_NOT_FOUND",
            Self::VersionMismatch { .. } => "VERSION_MISMATCH",
            Self::StepTimedOut { .. } => "STEP_TIMED_OUT",
            Self::ManualReconciliationRequired(_) => "MANUAL_RECONCILIATION_REQUIRED",
            Self::IdempotencyConflict(_) => "IDEMPOTENCY_CONFLICT",
            Self::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self.kind() {
            // 400 Bad Request - malformed commands
            ErrorKind::Validation => 400,
            // 422 Unprocessable - valid command, wrong state
            ErrorKind::BusinessRule => 422,
            ErrorKind::NotFound => 404,
            // 409 Conflict - concurrency and sagas
            ErrorKind::Consistency => 409,
            ErrorKind::Storage => match self {
                Self::StorageUnavailable(_) => 503,
                _ => 500,
            },
        }
    }

    /// Returns true if repeating the operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::VersionMismatch { .. } | Self::StepTimedOut { .. } | Self::StorageUnavailable(_)
        )
    }
}

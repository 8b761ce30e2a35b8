//! Typed vault movements.
//!
//! This module implements:
//! - Movement kinds with a static balance direction
//! - Movement drafts, records and statuses
//! - Draft validation (amount, sign, concept, currency)
//! - Status transitions and reversal construction

pub mod kind;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod validation_props;

pub use kind::{Direction, MovementKind};
pub use service::MovementService;
pub use types::{Movement, MovementDraft, MovementStatus};
pub use validation::{MAX_AMOUNT, MAX_BALANCE, MAX_CONCEPT_LEN, MAX_NOTES_LEN};

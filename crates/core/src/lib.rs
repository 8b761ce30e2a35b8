//! Core ledger and reconciliation logic for Bóveda.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, state machines and calculations live here;
//! `boveda-db` wires them to storage and concurrency control.
//!
//! # Modules
//!
//! - `vault` - Vault identity, balance rules and overdraft checks
//! - `movement` - Typed movements, their validation and reversals
//! - `transfer` - Transfer legs and saga bookkeeping
//! - `cutoff` - Periodic cut-offs and their state machine
//! - `reconciliation` - Statement matching and difference resolution
//! - `period` - Inclusive date ranges

pub mod cutoff;
pub mod error;
pub mod movement;
pub mod period;
pub mod reconciliation;
pub mod transfer;
pub mod vault;

pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use period::Period;

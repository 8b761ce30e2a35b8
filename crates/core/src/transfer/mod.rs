//! Transfers between vaults.
//!
//! A transfer is two linked movements (`transfer_out` on the origin,
//! `transfer_in` on the destination) that share a transfer id and are applied
//! together or not at all.

pub mod saga;
pub mod types;

pub use saga::{Compensation, SagaProgress, SagaStep, TransferPlan, TransferService};
pub use types::{Transfer, TransferRequest, TransferStatus};

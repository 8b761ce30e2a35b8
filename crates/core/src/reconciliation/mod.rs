//! Bank statement reconciliation.
//!
//! A run pairs the completed movements of a vault in a period with the lines
//! of an external statement, records every unpaired item as a difference, and
//! derives its match percentage and reconciled flag on read.

pub mod fingerprint;
pub mod matcher;
pub mod service;
pub mod types;

#[cfg(test)]
mod matcher_props;

pub use matcher::{MatchOutcome, Matcher};
pub use service::{ReconciliationService, RunRequest};
pub use types::{
    Difference, DifferenceSide, MatchPass, MatchedPair, ReconciliationRun, ReconciliationView,
    Resolution, ResolutionAction, StatementLine,
};

//! Periodic vault cut-offs.
//!
//! A cut-off compares the balance a vault should have at the end of a period
//! (opening balance plus the period's movements) with the balance reported by
//! the person closing it. Totals are summed at full precision; only the
//! reported figures are rounded.

pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use service::CutOffService;
pub use types::{CutOff, CutOffState, CutOffTotals, CutOffView, KindTotal};

//! Content fingerprints used to make reconciliation runs idempotent.

use sha2::{Digest, Sha256};

use super::types::StatementLine;
use crate::movement::Movement;

/// Hashes statement lines independent of their order and of trailing zeros.
#[must_use]
pub fn statement_fingerprint(lines: &[StatementLine]) -> String {
    let mut canonical: Vec<String> = lines.iter().map(line_key).collect();
    canonical.sort();
    digest(&canonical)
}

/// Sorts statement lines into the order the fingerprint hashes them in.
///
/// Two submissions with the same fingerprint sort to the same sequence, so
/// indices into the result are stable across replays.
#[must_use]
pub fn canonical_lines(lines: &[StatementLine]) -> Vec<StatementLine> {
    let mut keyed: Vec<(String, &StatementLine)> = lines.iter().map(|l| (line_key(l), l)).collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.description.cmp(&b.1.description)));
    keyed.into_iter().map(|(_, l)| l.clone()).collect()
}

fn line_key(line: &StatementLine) -> String {
    format!(
        "{}|{}|{}",
        line.date,
        line.amount.normalize(),
        line.reference.as_deref().map(str::trim).unwrap_or_default()
    )
}

/// Hashes the set of ledger movements a run considered.
#[must_use]
pub fn system_fingerprint(movements: &[Movement]) -> String {
    let mut canonical: Vec<String> = movements
        .iter()
        .map(|m| format!("{}|{}", m.id, m.amount.normalize()))
        .collect();
    canonical.sort();
    digest(&canonical)
}

fn digest(lines: &[String]) -> String {
    let mut hasher = Sha256::new();
    for line in lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

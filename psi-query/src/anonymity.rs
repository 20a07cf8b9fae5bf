//! k-anonymity suppression gate (C9, spec §4.9).
//!
//! Applied after Boolean composition by default; callers may additionally
//! gate each predicate's own result set before composing, via
//! `PsiConfig::k_anonymity_per_predicate` (spec §9, Open Question).

use std::collections::HashSet;

use psi_core::RecordRef;

/// Outcome of passing a result set through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatedResult {
    pub refs: HashSet<RecordRef>,
    pub suppressed_for_anonymity: bool,
}

/// Apply the gate: a genuine miss (`n == 0`) passes through untouched, a
/// non-empty set smaller than `k_min` is suppressed to empty and flagged,
/// and a set at or above `k_min` passes through untouched. `k_min == 1`
/// disables suppression entirely.
pub fn apply_k_anonymity(refs: HashSet<RecordRef>, k_min: usize) -> GatedResult {
    let n = refs.len();
    if n > 0 && n < k_min {
        GatedResult {
            refs: HashSet::new(),
            suppressed_for_anonymity: true,
        }
    } else {
        GatedResult {
            refs,
            suppressed_for_anonymity: false,
        }
    }
}

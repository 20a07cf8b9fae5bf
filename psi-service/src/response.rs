//! The response shape crossing the evaluator/caller boundary (spec §7,
//! "User-visible failure"): either this, or a single error kind plus a
//! one-line human message — never a stack trace.

use std::collections::HashSet;

use psi_core::RecordRef;
use psi_query::GatedResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResponse {
    pub refs: HashSet<RecordRef>,
    pub suppressed_for_anonymity: bool,
    pub truncated_to_max_results: bool,
}

/// Apply the configured result cap to an already-gated result set.
///
/// Truncation happens after the k-anonymity gate, never before: capping
/// first could turn a would-be-suppressed small set into one that looks
/// like it was deliberately truncated, losing the suppression signal.
pub fn finalize(gated: GatedResult, max_results: usize) -> QueryResponse {
    let truncated = gated.refs.len() > max_results;
    let refs = if truncated {
        gated.refs.into_iter().take(max_results).collect()
    } else {
        gated.refs
    };

    QueryResponse {
        refs,
        suppressed_for_anonymity: gated.suppressed_for_anonymity,
        truncated_to_max_results: truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(ids: &[&str]) -> HashSet<RecordRef> {
        ids.iter().map(|id| RecordRef::new(*id).unwrap()).collect()
    }

    #[test]
    fn under_the_cap_is_not_truncated() {
        let gated = GatedResult { refs: refs(&["1", "2"]), suppressed_for_anonymity: false };
        let response = finalize(gated, 10);
        assert!(!response.truncated_to_max_results);
        assert_eq!(response.refs.len(), 2);
    }

    #[test]
    fn over_the_cap_is_truncated_to_exactly_max_results() {
        let gated = GatedResult { refs: refs(&["1", "2", "3", "4"]), suppressed_for_anonymity: false };
        let response = finalize(gated, 2);
        assert!(response.truncated_to_max_results);
        assert_eq!(response.refs.len(), 2);
    }

    #[test]
    fn suppression_flag_survives_finalize() {
        let gated = GatedResult { refs: HashSet::new(), suppressed_for_anonymity: true };
        let response = finalize(gated, 10);
        assert!(response.suppressed_for_anonymity);
        assert!(!response.truncated_to_max_results);
    }
}

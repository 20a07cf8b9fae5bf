//! Boolean composer (C8, spec §4.8).
//!
//! Combines the result sets of several already-evaluated predicates into
//! one. Mixed trees of arbitrary depth are out of scope (spec
//! Non-goals) — a query is a flat list of predicates joined by exactly one
//! operator, AND or OR, applied once.

use std::collections::HashSet;

use psi_core::RecordRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

/// Compose predicate result sets under a single Boolean operator.
///
/// Associative by construction (`HashSet` intersection/union are both
/// associative and commutative), so the order predicates are listed in
/// does not affect the result — only performance (cheaper-first is worth
/// doing as a caller-side optimization, not here).
pub fn compose(op: BoolOp, sets: &[HashSet<RecordRef>]) -> HashSet<RecordRef> {
    match sets {
        [] => HashSet::new(),
        [only] => only.clone(),
        [first, rest @ ..] => {
            let mut acc = first.clone();
            match op {
                BoolOp::And => {
                    for set in rest {
                        if acc.is_empty() {
                            break;
                        }
                        acc.retain(|r| set.contains(r));
                    }
                }
                BoolOp::Or => {
                    for set in rest {
                        acc.extend(set.iter().cloned());
                    }
                }
            }
            acc
        }
    }
}

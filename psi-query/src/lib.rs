//! PSI Query — predicate evaluation (C7), Boolean composition (C8), and
//! k-anonymity gating (C9) for the substring index (spec §4.7-§4.9).

mod anonymity;
mod compose;
mod evaluator;
mod pipeline;

pub use anonymity::{apply_k_anonymity, GatedResult};
pub use compose::{compose, BoolOp};
pub use evaluator::{evaluate, Predicate};
pub use pipeline::run_query;

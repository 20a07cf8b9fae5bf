//! Predicate evaluator (C7, spec §4.7).

use std::collections::HashSet;
use std::str::FromStr;

use psi_core::{Field, QueryError, RecordRef, UnknownFieldError};
use psi_crypto::{derive_key, normalize, PrfSecret};
use psi_fragments::{query_fragments, QueryKind};
use psi_store::IndexStore;

/// One `(field, operator, query)` predicate, already typed (field and
/// operator are members of their closed enumerations — spec §4.7 steps 1-2
/// reject unknown fields/operators at the point an untyped request is
/// parsed into this type, via [`Predicate::parse`]).
#[derive(Debug, Clone)]
pub struct Predicate {
    pub field: Field,
    pub operator: QueryKind,
    pub query: String,
}

impl Predicate {
    /// Construct directly from already-typed components. Used by callers
    /// that already hold a `Field`/`QueryKind`, e.g. a typed client library.
    pub fn new(field: Field, operator: QueryKind, query: impl Into<String>) -> Self {
        Self { field, operator, query: query.into() }
    }

    /// Parse from an untyped request (e.g. CLI args, a JSON body), rejecting
    /// an unknown field or operator name (spec §4.7 steps 1-2).
    pub fn parse(
        field_name: &str,
        operator_name: &str,
        query: impl Into<String>,
    ) -> Result<Self, QueryError> {
        let field = Field::from_str(field_name)
            .map_err(|UnknownFieldError(name)| QueryError::UnknownField(name))?;
        let operator =
            parse_operator_name(operator_name).ok_or_else(|| QueryError::UnknownOperator(operator_name.to_string()))?;
        Ok(Self::new(field, operator, query))
    }
}

fn parse_operator_name(s: &str) -> Option<QueryKind> {
    match s {
        "eq" => Some(QueryKind::Eq),
        "startsWith" => Some(QueryKind::StartsWith),
        "endsWith" => Some(QueryKind::EndsWith),
        "contains" => Some(QueryKind::Contains),
        _ => None,
    }
}

/// Evaluate one predicate against the store (spec §4.7 steps 3-7).
///
/// Never raises on "no results" — the falsity model is a possibly-empty
/// set, not an error (spec §4.7, "Falsity model").
pub async fn evaluate(
    store: &dyn IndexStore,
    secret: &PrfSecret,
    predicate: &Predicate,
    gram_width: u8,
) -> Result<HashSet<RecordRef>, QueryError> {
    let q = normalize(&predicate.query);

    let fragments = query_fragments(predicate.operator, &q, gram_width).map_err(|e| {
        QueryError::QueryTooShort { min: e.min, got: e.got }
    })?;

    if fragments.is_empty() {
        return Ok(HashSet::new());
    }

    // A repeated K-gram (e.g. "banana" -> ban, ana, nan, ana) derives the
    // same key twice; dedup before intersecting so a backend that counts
    // per-key matches (the relational store) doesn't require one extra
    // match than the posting lists actually contain (P5, P6).
    let mut keys: Vec<_> = fragments
        .into_iter()
        .map(|(tag, fragment)| derive_key(secret, predicate.field, tag, &fragment))
        .collect();
    keys.sort_unstable();
    keys.dedup();

    if keys.len() == 1 {
        Ok(store.lookup(&keys[0]).await?)
    } else {
        Ok(store.intersect(&keys).await?)
    }
}

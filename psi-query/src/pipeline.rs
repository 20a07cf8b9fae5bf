//! Wires the predicate evaluator, Boolean composer, and k-anonymity gate
//! into the one query path a caller actually runs (spec §4.7-§4.9).

use psi_core::QueryError;
use psi_crypto::PrfSecret;
use psi_store::IndexStore;

use crate::anonymity::{apply_k_anonymity, GatedResult};
use crate::compose::{compose, BoolOp};
use crate::evaluator::{evaluate, Predicate};

/// Evaluate every predicate, compose their result sets under `op`, and
/// apply the k-anonymity gate to the composed result.
///
/// When `per_predicate` is set, each predicate's own result set is also
/// gated before composition — an individually rare predicate can't leak
/// its own membership through an OR with a common one (spec §9, Open
/// Question, resolved as an opt-in policy knob defaulting to off).
pub async fn run_query(
    store: &dyn IndexStore,
    secret: &PrfSecret,
    predicates: &[Predicate],
    op: BoolOp,
    gram_width: u8,
    k_min: usize,
    per_predicate: bool,
) -> Result<GatedResult, QueryError> {
    let mut sets = Vec::with_capacity(predicates.len());
    for predicate in predicates {
        let mut set = evaluate(store, secret, predicate, gram_width).await?;
        if per_predicate {
            set = apply_k_anonymity(set, k_min).refs;
        }
        sets.push(set);
    }

    let composed = compose(op, &sets);
    Ok(apply_k_anonymity(composed, k_min))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use psi_core::{Field, OperatorTag, RecordRef};
    use psi_crypto::derive_key;
    use psi_fragments::QueryKind;
    use psi_store::MemoryStore;

    fn secret() -> PrfSecret {
        PrfSecret::new(b"a shared secret key".to_vec()).unwrap()
    }

    fn later() -> psi_core::Timestamp {
        chrono::Utc::now() + Duration::seconds(60)
    }

    #[tokio::test]
    async fn and_of_two_predicates_narrows_to_the_shared_record() {
        let store = MemoryStore::new();
        let secret = secret();

        let alice = RecordRef::new("alice").unwrap();
        let bob = RecordRef::new("bob").unwrap();

        for record in [&alice, &bob] {
            let key = derive_key(&secret, Field::Country, OperatorTag::Eq, "us");
            store.add(&key, record, Field::Country, later()).await.unwrap();
        }
        let email_key = derive_key(&secret, Field::Email, OperatorTag::Eq, "alice@example.com");
        store.add(&email_key, &alice, Field::Email, later()).await.unwrap();

        let predicates = vec![
            Predicate::new(Field::Country, QueryKind::Eq, "US"),
            Predicate::new(Field::Email, QueryKind::Eq, "alice@example.com"),
        ];

        let gated = run_query(&store, &secret, &predicates, BoolOp::And, 3, 1, false)
            .await
            .unwrap();
        assert_eq!(gated.refs, [alice].into_iter().collect());
        assert!(!gated.suppressed_for_anonymity);
    }

    #[tokio::test]
    async fn small_composed_result_is_suppressed_by_default() {
        let store = MemoryStore::new();
        let secret = secret();
        let record = RecordRef::new("rec-1").unwrap();
        let key = derive_key(&secret, Field::Email, OperatorTag::Eq, "rare@example.com");
        store.add(&key, &record, Field::Email, later()).await.unwrap();

        let predicates = vec![Predicate::new(Field::Email, QueryKind::Eq, "rare@example.com")];

        let gated = run_query(&store, &secret, &predicates, BoolOp::Or, 3, 5, false)
            .await
            .unwrap();
        assert!(gated.refs.is_empty());
        assert!(gated.suppressed_for_anonymity);
    }

    #[tokio::test]
    async fn per_predicate_gating_suppresses_before_or_composition() {
        let store = MemoryStore::new();
        let secret = secret();

        // A rare email (1 match) OR'd with a common country (6 matches).
        // Without per-predicate gating the rare email's single record would
        // still surface via the OR; with it, that predicate is suppressed
        // to empty before composing.
        let rare = RecordRef::new("rare-person").unwrap();
        let email_key = derive_key(&secret, Field::Email, OperatorTag::Eq, "rare@example.com");
        store.add(&email_key, &rare, Field::Email, later()).await.unwrap();

        let country_key = derive_key(&secret, Field::Country, OperatorTag::Eq, "us");
        for i in 0..6 {
            let record = RecordRef::new(format!("common-{i}")).unwrap();
            store.add(&country_key, &record, Field::Country, later()).await.unwrap();
        }

        let predicates = vec![
            Predicate::new(Field::Email, QueryKind::Eq, "rare@example.com"),
            Predicate::new(Field::Country, QueryKind::Eq, "US"),
        ];

        let gated = run_query(&store, &secret, &predicates, BoolOp::Or, 3, 5, true)
            .await
            .unwrap();
        assert!(!gated.refs.contains(&rare));
        assert_eq!(gated.refs.len(), 6);
    }
}

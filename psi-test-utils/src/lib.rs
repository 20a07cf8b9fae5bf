//! PSI Test Utilities
//!
//! Centralized test infrastructure shared across the workspace's crates:
//! - Proptest generators for the domain's closed types (`Field`,
//!   `OperatorTag`, `QueryKind`, normalized/raw fragments, configs)
//! - Fixtures for common ingest/query scenarios
//! - Custom assertions for PSI-specific result shapes

pub use psi_core::{
    Field, IndexKey, OperatorTag, PsiConfig, PsiError, PsiResult, RecordRef, StoreBackend,
};
pub use psi_crypto::{derive_key, normalize, PrfSecret};
pub use psi_fragments::{query_fragments, QueryKind, QueryTooShort};
pub use psi_store::{IndexStore, MemoryStore, StoreStats};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for the domain's closed types.

    use super::*;
    use proptest::prelude::*;

    /// Generate every `Field` variant with equal weight.
    pub fn arb_field() -> impl Strategy<Value = Field> {
        prop::sample::select(Field::ALL.to_vec())
    }

    /// Generate an `OperatorTag`, with `Gram` fixed at the canonical K=3 —
    /// the only gram width the workspace's tests exercise end to end.
    pub fn arb_operator_tag() -> impl Strategy<Value = OperatorTag> {
        prop_oneof![
            Just(OperatorTag::Eq),
            Just(OperatorTag::Prefix),
            Just(OperatorTag::Suffix),
            Just(OperatorTag::Gram(3)),
        ]
    }

    /// Generate a `QueryKind`.
    pub fn arb_query_kind() -> impl Strategy<Value = QueryKind> {
        prop_oneof![
            Just(QueryKind::Eq),
            Just(QueryKind::StartsWith),
            Just(QueryKind::EndsWith),
            Just(QueryKind::Contains),
        ]
    }

    /// Generate a raw, pre-normalization string: mixed case, optional outer
    /// whitespace, ASCII letters and digits only (keeps generated corpora
    /// readable in proptest failure output; Unicode edge cases are covered
    /// by `psi-crypto`'s own `normalize` tests instead of re-derived here).
    pub fn arb_raw_fragment() -> impl Strategy<Value = String> {
        "[ A-Za-z0-9]{1,32}".prop_map(|s| s)
    }

    /// Generate an already-normalized fragment: lowercase ASCII
    /// alphanumerics, no leading/trailing whitespace.
    pub fn arb_normalized_fragment() -> impl Strategy<Value = String> {
        "[a-z0-9]{1,32}".prop_map(|s| s)
    }

    /// Generate a valid `RecordRef` (no commas, non-empty).
    pub fn arb_record_ref() -> impl Strategy<Value = RecordRef> {
        "[a-z][a-z0-9_-]{0,31}".prop_map(|s| RecordRef::new(s).expect("generated ref is valid"))
    }

    /// Generate a `Timestamp` within a reasonable range (2024-2030), used
    /// wherever an `expires_at` is needed but its exact value doesn't
    /// matter to the property under test.
    pub fn arb_timestamp() -> impl Strategy<Value = chrono::DateTime<chrono::Utc>> {
        (1_704_067_200i64..1_893_456_000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(chrono::Utc::now)
        })
    }

    /// Generate a gram width in the range the indexer and query evaluator
    /// both accept (spec's configuration surface: `gram_width >= 2`).
    pub fn arb_gram_width() -> impl Strategy<Value = u8> {
        2u8..=5
    }

    /// Generate a k-anonymity threshold, including the `1` edge case that
    /// disables suppression entirely.
    pub fn arb_k_min() -> impl Strategy<Value = usize> {
        1usize..=20
    }

    /// Generate a valid `PsiConfig` over a fixed secret, varying only the
    /// fields that affect query/indexing behavior.
    pub fn arb_psi_config() -> impl Strategy<Value = PsiConfig> {
        (arb_gram_width(), arb_k_min(), any::<bool>(), 1usize..=500).prop_map(
            |(gram_width, k_anonymity_threshold, k_anonymity_per_predicate, max_results)| {
                let mut config = PsiConfig::with_secret(fixtures::test_secret_base64());
                config.gram_width = gram_width;
                config.k_anonymity_threshold = k_anonymity_threshold;
                config.k_anonymity_per_predicate = k_anonymity_per_predicate;
                config.max_results = max_results;
                config
            },
        )
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common ingest/query scenarios.

    use std::sync::Arc;

    use super::*;

    /// A fixed, non-secret key used across the test suite. Real deployments
    /// never share a PRF key across environments; tests need determinism
    /// instead.
    pub fn test_secret_base64() -> String {
        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD.encode(b"test-only psi prf secret, do not reuse")
    }

    pub fn test_secret() -> PrfSecret {
        PrfSecret::from_base64(&test_secret_base64()).expect("fixture secret is valid base64")
    }

    /// A minimal valid config over the fixture secret, memory-backed.
    pub fn minimal_config() -> PsiConfig {
        PsiConfig::with_secret(test_secret_base64())
    }

    /// One plaintext value under one field, attributed to one record — the
    /// smallest unit a test builds a corpus out of.
    #[derive(Debug, Clone)]
    pub struct SampleEntry {
        pub field: Field,
        pub plaintext: &'static str,
        pub record: &'static str,
    }

    /// A small corpus with deliberate overlaps: some fragments are shared by
    /// several records (to exercise k-anonymity suppression) and some are
    /// unique to one record (to exercise the surviving-match path).
    pub fn sample_people() -> Vec<SampleEntry> {
        vec![
            SampleEntry { field: Field::FirstName, plaintext: "Arjun", record: "rec-1" },
            SampleEntry { field: Field::LastName, plaintext: "Sharma", record: "rec-1" },
            SampleEntry { field: Field::Email, plaintext: "arjun.sharma@example.com", record: "rec-1" },
            SampleEntry { field: Field::FirstName, plaintext: "Arjun", record: "rec-2" },
            SampleEntry { field: Field::LastName, plaintext: "Patel", record: "rec-2" },
            SampleEntry { field: Field::Email, plaintext: "arjun.patel@example.com", record: "rec-2" },
            SampleEntry { field: Field::FirstName, plaintext: "Priya", record: "rec-3" },
            SampleEntry { field: Field::LastName, plaintext: "Sharma", record: "rec-3" },
            SampleEntry { field: Field::Email, plaintext: "priya.sharma@example.com", record: "rec-3" },
            SampleEntry { field: Field::City, plaintext: "Pune", record: "rec-1" },
            SampleEntry { field: Field::City, plaintext: "Pune", record: "rec-2" },
            SampleEntry { field: Field::City, plaintext: "Pune", record: "rec-3" },
        ]
    }

    /// Index `sample_people()` (or any other entry list) directly into a
    /// fresh in-memory store via `derive_key`/`store.add`, bypassing the
    /// indexer's normalize/enumerate pipeline's field inference so callers
    /// get an exact, known fragment set to assert against.
    pub async fn populated_store(
        secret: &PrfSecret,
        gram_width: u8,
        entries: &[SampleEntry],
    ) -> Arc<dyn IndexStore> {
        let store: Arc<dyn IndexStore> = Arc::new(MemoryStore::new());
        let expires_at = chrono::Utc::now() + chrono::Duration::days(90);

        for entry in entries {
            let v = normalize(entry.plaintext);
            let record = RecordRef::new(entry.record).expect("fixture record ref is valid");
            for (tag, fragment) in psi_fragments::enumerate_fragments(&v, gram_width) {
                let key = derive_key(secret, entry.field, tag, &fragment);
                store
                    .add(&key, &record, entry.field, expires_at)
                    .await
                    .expect("fixture ingest never hits a real store failure");
            }
        }

        store
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion helpers for PSI-specific result shapes.

    use std::collections::HashSet;

    use super::*;

    /// Assert that `refs` contains a `RecordRef` built from `expected`.
    #[track_caller]
    pub fn assert_contains_ref(refs: &HashSet<RecordRef>, expected: &str) {
        let expected = RecordRef::new(expected).expect("expected ref is valid");
        assert!(
            refs.contains(&expected),
            "expected {expected} in result set, got {refs:?}"
        );
    }

    /// Assert that `refs` does not contain a `RecordRef` built from
    /// `unexpected`.
    #[track_caller]
    pub fn assert_excludes_ref(refs: &HashSet<RecordRef>, unexpected: &str) {
        let unexpected = RecordRef::new(unexpected).expect("unexpected ref is valid");
        assert!(
            !refs.contains(&unexpected),
            "did not expect {unexpected} in result set, got {refs:?}"
        );
    }

    /// Assert that a gated result was suppressed for k-anonymity, and that
    /// the suppressed set it carries is empty (spec §4.9: suppression means
    /// "nothing is returned", not "a small truncated set").
    #[track_caller]
    pub fn assert_suppressed(gated: &psi_query::GatedResult) {
        assert!(gated.suppressed_for_anonymity, "expected suppression, got {gated:?}");
        assert!(gated.refs.is_empty(), "suppressed result should carry no refs, got {:?}", gated.refs);
    }

    /// Assert that a gated result passed the k-anonymity gate unsuppressed.
    #[track_caller]
    pub fn assert_not_suppressed(gated: &psi_query::GatedResult) {
        assert!(!gated.suppressed_for_anonymity, "did not expect suppression, got {gated:?}");
    }

    /// Assert that an index key string has the documented wire shape
    /// (spec §4.3): `idx:<alias>:<tag>:<hash>`, four colon-delimited parts.
    #[track_caller]
    pub fn assert_index_key_shape(key: &IndexKey) {
        let parts: Vec<&str> = key.as_str().split(':').collect();
        assert_eq!(parts.len(), 4, "expected idx:<alias>:<tag>:<hash>, got {}", key.as_str());
        assert_eq!(parts[0], "idx", "index keys must start with the idx: namespace");
        assert!(key.as_str().is_ascii(), "index keys must be US-ASCII, got {}", key.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::assertions::*;
    use super::fixtures::*;
    use super::generators::*;
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn populated_store_indexes_every_sample_entry() {
        let secret = test_secret();
        let store = populated_store(&secret, 3, &sample_people()).await;
        let stats = store.stats().await.unwrap();
        assert!(stats.total_keys > 0);
    }

    #[tokio::test]
    async fn populated_store_answers_an_eq_lookup() {
        let secret = test_secret();
        let store = populated_store(&secret, 3, &sample_people()).await;
        let key = derive_key(&secret, Field::Email, OperatorTag::Eq, "arjun.sharma@example.com");
        let refs = store.lookup(&key).await.unwrap();
        assert_contains_ref(&refs, "rec-1");
        assert_excludes_ref(&refs, "rec-3");
    }

    proptest! {
        #[test]
        fn arb_record_ref_always_round_trips_through_display(r in arb_record_ref()) {
            let s = r.to_string();
            let parsed: RecordRef = s.parse().unwrap();
            prop_assert_eq!(parsed, r);
        }

        #[test]
        fn arb_psi_config_always_validates(config in arb_psi_config()) {
            prop_assert!(config.validate().is_ok());
        }

        #[test]
        fn derived_keys_always_have_the_documented_shape(
            field in arb_field(),
            tag in arb_operator_tag(),
            fragment in arb_normalized_fragment(),
        ) {
            let secret = test_secret();
            let key = derive_key(&secret, field, tag, &fragment);
            assert_index_key_shape(&key);
        }
    }
}

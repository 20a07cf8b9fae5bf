//! PSI Fragments — the fragment enumerator (C4), the heart of the design
//! (spec §4.4).
//!
//! All fragment and query-side logic operates on already-normalized strings
//! (`psi_crypto::normalize` output) and slices by Unicode scalar value, not
//! byte offset, so multi-byte characters are never split mid-codepoint.

use psi_core::OperatorTag;

/// Code-point reversal of a string (spec §4.4, `rev(v)`).
pub fn reverse(s: &str) -> String {
    s.chars().rev().collect()
}

/// One `(operator tag, fragment)` pair produced by indexing a value.
pub type IndexFragment = (OperatorTag, String);

/// Enumerate every fragment that must be indexed for a normalized value `v`
/// so that later queries of every supported operator land on a populated
/// index key (spec §4.4, I2 Coverage).
///
/// `gram_width` is the deploy-time n-gram width `K` (canonically 3). Returns
/// the empty vector for an empty `v` — callers must have already skipped
/// empty values per spec §4.6 step 1.
pub fn enumerate_fragments(v: &str, gram_width: u8) -> Vec<IndexFragment> {
    if v.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = v.chars().collect();
    let len = chars.len();
    let k = gram_width as usize;

    let mut fragments = Vec::with_capacity(1 + 2 * len + len.saturating_sub(k.saturating_sub(1)));

    // eq: the whole normalized value, one fragment.
    fragments.push((OperatorTag::Eq, v.to_string()));

    // pre: every non-empty prefix v[0..1], v[0..2], ..., v[0..len].
    for end in 1..=len {
        let prefix: String = chars[..end].iter().collect();
        fragments.push((OperatorTag::Prefix, prefix));
    }

    // suf: every non-empty prefix of rev(v), i.e. every non-empty suffix of v.
    let reversed: Vec<char> = chars.iter().rev().copied().collect();
    for end in 1..=len {
        let rev_prefix: String = reversed[..end].iter().collect();
        fragments.push((OperatorTag::Suffix, rev_prefix));
    }

    // gK: every K-wide sliding window, none if |v| < K.
    if k >= 1 && len >= k {
        for i in 0..=(len - k) {
            let window: String = chars[i..i + k].iter().collect();
            fragments.push((OperatorTag::Gram(gram_width), window));
        }
    }

    fragments
}

/// Total fragment count for a value of the given length, per the closed
/// formula in spec §4.4: `1 + 2|v| + max(0, |v| - K + 1)`.
///
/// Empty values are never indexed (`enumerate_fragments("")` returns no
/// fragments, skipped upstream at spec §4.6 step 1), so `value_len == 0` is
/// special-cased to `0` rather than the formula's literal `1`.
pub fn fragment_count(value_len: usize, gram_width: u8) -> usize {
    if value_len == 0 {
        return 0;
    }
    let k = gram_width as usize;
    let gram_count = value_len.saturating_sub(k.saturating_sub(1)).min(
        if value_len >= k { value_len - k + 1 } else { 0 },
    );
    1 + 2 * value_len + gram_count
}

/// The query-side mirror (spec §4.4 "Query side mirror"). One of these per
/// supported caller-facing operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Eq,
    StartsWith,
    EndsWith,
    Contains,
}

/// Error returned when a `contains` query is shorter than the gram width.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`contains` query must be at least {min} characters (got {got})")]
pub struct QueryTooShort {
    pub min: usize,
    pub got: usize,
}

/// Compute the `(tag, fragment)` pairs a query resolves to, mirroring the
/// indexing-side enumeration asymmetrically: the indexing side pays for
/// every prefix/suffix once per value; the query side always resolves to
/// a small, fixed number of fragments (spec §4.4).
///
/// Returns an empty vector for `eq`/`startsWith`/`endsWith` over an empty
/// normalized query (spec §4.7 step 3); returns `Err` for `contains` when
/// `|q| < gram_width`.
pub fn query_fragments(
    kind: QueryKind,
    q: &str,
    gram_width: u8,
) -> Result<Vec<(OperatorTag, String)>, QueryTooShort> {
    if q.is_empty() && kind != QueryKind::Eq {
        return Ok(Vec::new());
    }

    match kind {
        QueryKind::Eq => {
            if q.is_empty() {
                return Ok(Vec::new());
            }
            Ok(vec![(OperatorTag::Eq, q.to_string())])
        }
        QueryKind::StartsWith => Ok(vec![(OperatorTag::Prefix, q.to_string())]),
        QueryKind::EndsWith => Ok(vec![(OperatorTag::Suffix, reverse(q))]),
        QueryKind::Contains => {
            let len = q.chars().count();
            let k = gram_width as usize;
            if len < k {
                return Err(QueryTooShort { min: k, got: len });
            }
            let chars: Vec<char> = q.chars().collect();
            let mut out = Vec::with_capacity(len - k + 1);
            for i in 0..=(len - k) {
                let window: String = chars[i..i + k].iter().collect();
                out.push((OperatorTag::Gram(gram_width), window));
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags_of(fragments: &[IndexFragment], tag: OperatorTag) -> Vec<&str> {
        fragments
            .iter()
            .filter(|(t, _)| *t == tag)
            .map(|(_, f)| f.as_str())
            .collect()
    }

    #[test]
    fn enumerates_eq_fragment() {
        let fragments = enumerate_fragments("arjun", 3);
        assert_eq!(tags_of(&fragments, OperatorTag::Eq), vec!["arjun"]);
    }

    #[test]
    fn enumerates_all_prefixes() {
        let fragments = enumerate_fragments("arjun", 3);
        assert_eq!(
            tags_of(&fragments, OperatorTag::Prefix),
            vec!["a", "ar", "arj", "arju", "arjun"]
        );
    }

    #[test]
    fn enumerates_all_suffixes_via_reversed_prefixes() {
        let fragments = enumerate_fragments("kumar", 3);
        assert_eq!(
            tags_of(&fragments, OperatorTag::Suffix),
            vec!["r", "ar", "mar", "umar", "kumar"]
        );
    }

    #[test]
    fn enumerates_k_grams() {
        let fragments = enumerate_fragments("arjun", 3);
        assert_eq!(
            tags_of(&fragments, OperatorTag::Gram(3)),
            vec!["arj", "rju", "jun"]
        );
    }

    #[test]
    fn no_grams_when_value_shorter_than_k() {
        let fragments = enumerate_fragments("ab", 3);
        assert!(tags_of(&fragments, OperatorTag::Gram(3)).is_empty());
    }

    #[test]
    fn empty_value_yields_no_fragments() {
        assert!(enumerate_fragments("", 3).is_empty());
    }

    #[test]
    fn fragment_count_matches_closed_formula() {
        for len in 0..20usize {
            let v: String = "a".repeat(len);
            let expected = fragment_count(len, 3);
            assert_eq!(enumerate_fragments(&v, 3).len(), expected, "mismatch at len={len}");
        }
    }

    #[test]
    fn query_eq_is_single_fragment() {
        let frags = query_fragments(QueryKind::Eq, "arjun", 3).unwrap();
        assert_eq!(frags, vec![(OperatorTag::Eq, "arjun".to_string())]);
    }

    #[test]
    fn query_starts_with_is_single_fragment() {
        let frags = query_fragments(QueryKind::StartsWith, "ar", 3).unwrap();
        assert_eq!(frags, vec![(OperatorTag::Prefix, "ar".to_string())]);
    }

    #[test]
    fn query_ends_with_reverses_before_keying() {
        let frags = query_fragments(QueryKind::EndsWith, "mar", 3).unwrap();
        assert_eq!(frags, vec![(OperatorTag::Suffix, "ram".to_string())]);
    }

    #[test]
    fn query_contains_short_query_errors() {
        let err = query_fragments(QueryKind::Contains, "oo", 3).unwrap_err();
        assert_eq!(err, QueryTooShort { min: 3, got: 2 });
    }

    #[test]
    fn query_contains_emits_all_grams() {
        let frags = query_fragments(QueryKind::Contains, "gmail", 3).unwrap();
        let grams: Vec<&str> = frags.iter().map(|(_, f)| f.as_str()).collect();
        assert_eq!(grams, vec!["gma", "mai", "ail"]);
    }

    #[test]
    fn reverse_handles_multibyte_chars() {
        assert_eq!(reverse("café"), "éfac");
    }

    // P4: every non-empty prefix/suffix of a value is present among the
    // value's enumerated fragments, so a query on that prefix/suffix
    // resolves to a populated key.
    proptest::proptest! {
        #[test]
        fn prop_every_prefix_is_enumerated(v in "[a-z]{1,15}") {
            let fragments = enumerate_fragments(&v, 3);
            let prefixes: std::collections::HashSet<&str> = tags_of(&fragments, OperatorTag::Prefix).into_iter().collect();
            let chars: Vec<char> = v.chars().collect();
            for end in 1..=chars.len() {
                let p: String = chars[..end].iter().collect();
                proptest::prop_assert!(prefixes.contains(p.as_str()));
            }
        }

        #[test]
        fn prop_every_suffix_is_enumerated(v in "[a-z]{1,15}") {
            let fragments = enumerate_fragments(&v, 3);
            let chars: Vec<char> = v.chars().collect();
            for start in 0..chars.len() {
                let suffix: String = chars[start..].iter().collect();
                let query_frag = query_fragments(QueryKind::EndsWith, &suffix, 3).unwrap();
                let (_, keyed_fragment) = &query_frag[0];
                let suffix_fragments: std::collections::HashSet<&str> =
                    tags_of(&fragments, OperatorTag::Suffix).into_iter().collect();
                proptest::prop_assert!(suffix_fragments.contains(keyed_fragment.as_str()));
            }
        }

        #[test]
        fn prop_every_substring_of_length_k_is_enumerated(v in "[a-z]{3,20}") {
            let fragments = enumerate_fragments(&v, 3);
            let grams: std::collections::HashSet<&str> = tags_of(&fragments, OperatorTag::Gram(3)).into_iter().collect();
            let chars: Vec<char> = v.chars().collect();
            for i in 0..=(chars.len() - 3) {
                let window: String = chars[i..i + 3].iter().collect();
                proptest::prop_assert!(grams.contains(window.as_str()));
            }
        }
    }
}

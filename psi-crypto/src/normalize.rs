//! The deterministic canonicalization applied before any hashing (spec §4.1).

use unicode_normalization::UnicodeNormalization;

/// Canonicalize a raw string into the form used for all hashing.
///
/// Applies Unicode compatibility decomposition followed by canonical
/// composition (NFKC), case-folds to lowercase, and trims leading/trailing
/// whitespace. Internal whitespace is preserved. Never fails: an empty or
/// whitespace-only input yields an empty string, which callers treat as
/// "do not index / do not query" (spec §4.1).
pub fn normalize(s: &str) -> String {
    s.nfkc().collect::<String>().to_lowercase().trim().to_string()
}

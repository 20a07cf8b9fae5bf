//! Opaque record references and the index-key newtype.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// A stable, caller-supplied identifier for a record held outside this
/// system (spec §3, "Opaque reference (token)"). Equal strings denote equal
/// records; the index never interprets the bytes beyond that.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordRef(String);

impl RecordRef {
    /// Wrap a caller-supplied identifier. Rejects references containing a
    /// comma, since the relational backend's posting-list encoding (spec §6)
    /// forbids embedded commas by contract.
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidRecordRef> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(InvalidRecordRef::Empty);
        }
        if raw.contains(',') {
            return Err(InvalidRecordRef::EmbeddedComma(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RecordRef {
    type Err = InvalidRecordRef;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordRef::new(s)
    }
}

/// Why a candidate reference string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidRecordRef {
    #[error("record reference must not be empty")]
    Empty,
    #[error("record reference `{0}` contains a comma, which the relational posting-list encoding forbids")]
    EmbeddedComma(String),
}

/// The wire-stable index key: `idx:<alias>:<tag>:<hash>` (spec §6).
///
/// `IndexKey` stores the fully rendered string rather than its components,
/// since the store treats keys as opaque lookup handles and only the key
/// deriver (`psi-crypto`) needs to know how one is built.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexKey(String);

impl IndexKey {
    /// Construct an `IndexKey` from an already-rendered string. Callers
    /// outside `psi-crypto` should not need this; it exists so the store and
    /// test crates can round-trip keys without a dependency on the key
    /// deriver's hashing logic.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_ref_rejects_comma() {
        assert!(RecordRef::new("a,b").is_err());
    }

    #[test]
    fn record_ref_rejects_empty() {
        assert!(RecordRef::new("").is_err());
    }

    #[test]
    fn record_ref_accepts_plain_token() {
        let r = RecordRef::new("rec-12345").unwrap();
        assert_eq!(r.as_str(), "rec-12345");
        assert_eq!(r.to_string(), "rec-12345");
    }

    #[test]
    fn index_key_display_roundtrips() {
        let k = IndexKey::from_raw("idx:email:eq:abc123");
        assert_eq!(k.to_string(), "idx:email:eq:abc123");
    }
}

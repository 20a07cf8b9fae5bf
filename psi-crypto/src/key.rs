//! Key deriver (spec §4.3): maps `(alias, tag, fragment)` to an index key.

use psi_core::{Field, IndexKey, OperatorTag};

use crate::prf::{keyed_hash, PrfSecret};

/// Derive the wire-stable index key for one `(field, operator, fragment)`
/// triple. Pure given `secret`; no I/O.
///
/// The message hashed is always `<alias>|<fragment>` so that the same
/// fragment text across different fields lands on different keys (domain
/// separation, spec §4.2).
pub fn derive_key(secret: &PrfSecret, field: Field, tag: OperatorTag, fragment: &str) -> IndexKey {
    let message = format!("{}|{}", field.alias(), fragment);
    let hash = keyed_hash(secret, message.as_bytes());
    IndexKey::from_raw(format!("idx:{}:{}:{}", field.alias(), tag, hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> PrfSecret {
        PrfSecret::new(b"a shared secret key".to_vec()).unwrap()
    }

    #[test]
    fn key_format_matches_wire_contract() {
        let key = derive_key(&secret(), Field::Email, OperatorTag::Eq, "priya@example.com");
        let rendered = key.to_string();
        assert!(rendered.starts_with("idx:email:eq:"));
        assert_eq!(rendered.matches(':').count(), 3);
    }

    #[test]
    fn deterministic() {
        let a = derive_key(&secret(), Field::FirstName, OperatorTag::Prefix, "ar");
        let b = derive_key(&secret(), Field::FirstName, OperatorTag::Prefix, "ar");
        assert_eq!(a, b);
    }

    #[test]
    fn different_fragments_different_keys() {
        let a = derive_key(&secret(), Field::FirstName, OperatorTag::Prefix, "ar");
        let b = derive_key(&secret(), Field::FirstName, OperatorTag::Prefix, "arj");
        assert_ne!(a, b);
    }

    #[test]
    fn different_tags_same_fragment_different_keys() {
        let a = derive_key(&secret(), Field::LastName, OperatorTag::Prefix, "kum");
        let b = derive_key(&secret(), Field::LastName, OperatorTag::Suffix, "kum");
        assert_ne!(a, b);
    }

    #[test]
    fn different_fields_same_fragment_different_keys() {
        let a = derive_key(&secret(), Field::FirstName, OperatorTag::Eq, "arjun");
        let b = derive_key(&secret(), Field::LastName, OperatorTag::Eq, "arjun");
        assert_ne!(a, b, "domain separation across fields must hold at the key-deriver level");
    }

    proptest::proptest! {
        #[test]
        fn prop_deterministic(fragment in "[a-z]{1,30}") {
            let a = derive_key(&secret(), Field::Email, OperatorTag::Gram(3), &fragment);
            let b = derive_key(&secret(), Field::Email, OperatorTag::Gram(3), &fragment);
            proptest::prop_assert_eq!(a, b);
        }
    }
}

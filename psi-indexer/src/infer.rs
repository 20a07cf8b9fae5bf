//! Field-name inference (spec §4.6): a courtesy path for untagged
//! corpora. Tagged ingestion (the field is already known) MUST bypass this
//! entirely — it exists only for callers who genuinely don't know a value's
//! field.

use once_cell::sync::Lazy;
use psi_core::Field;
use regex::Regex;

static PHONE_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9][0-9\-\.\s()]{8,}[0-9]").unwrap());
static PASSPORT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][0-9]{7,8}$").unwrap());
static TAX_ID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2,3}-?\d{2}-?\d{4}$").unwrap());
static DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$|^\d{2}/\d{2}/\d{4}$").unwrap());

fn digit_count(s: &str) -> usize {
    s.chars().filter(|c| c.is_ascii_digit()).count()
}

/// Infer the closed field category a bare value most likely belongs to,
/// from surface pattern alone. Returns `None` when nothing matches — the
/// caller must then either supply a declared field or reject the value
/// (spec §4.6, `FieldInferenceFailed`).
///
/// Order matters: more specific patterns are checked before looser ones
/// (a passport-shaped value should not be misclassified as a phone number
/// merely because it also contains several digits).
pub fn infer_field(value: &str) -> Option<Field> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.contains('@') && trimmed.contains('.') {
        return Some(Field::Email);
    }
    if DATE_PATTERN.is_match(trimmed) {
        return Some(Field::DateOfBirth);
    }
    if PASSPORT_PATTERN.is_match(trimmed) {
        return Some(Field::PassportId);
    }
    if TAX_ID_PATTERN.is_match(trimmed) && digit_count(trimmed) == 9 {
        return Some(Field::TaxId);
    }
    if digit_count(trimmed) >= 10 && PHONE_DIGITS.is_match(trimmed) {
        return Some(Field::Phone);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_email_from_at_and_dot() {
        assert_eq!(infer_field("arjun.kumar@example.com"), Some(Field::Email));
    }

    #[test]
    fn infers_phone_from_ten_digit_sequence() {
        assert_eq!(infer_field("(415) 555-0182"), Some(Field::Phone));
    }

    #[test]
    fn infers_date_of_birth_from_iso_date() {
        assert_eq!(infer_field("1990-04-12"), Some(Field::DateOfBirth));
    }

    #[test]
    fn infers_passport_from_letter_plus_digits() {
        assert_eq!(infer_field("A1234567"), Some(Field::PassportId));
    }

    #[test]
    fn infers_tax_id_from_ssn_shape() {
        assert_eq!(infer_field("123-45-6789"), Some(Field::TaxId));
    }

    #[test]
    fn returns_none_for_a_bare_name() {
        assert_eq!(infer_field("Arjun"), None);
    }

    #[test]
    fn returns_none_for_empty_value() {
        assert_eq!(infer_field("   "), None);
    }
}

//! The closed field enumeration and its wire-stable aliases.
//!
//! The alias set is part of the on-disk index-key format (`idx:<alias>:<tag>:<hash>`)
//! and MUST NOT change silently: renaming a variant's alias invalidates every
//! index key derived from it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the fixed, enumerated PII field categories this index understands.
///
/// Each variant carries a short stable alias (`Field::alias`) used inside
/// index keys, and a full name (`Field::full_name`) used only for
/// human-facing audit reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    FirstName,
    LastName,
    MiddleName,
    FullName,
    Email,
    Phone,
    DateOfBirth,
    StreetAddress,
    City,
    Country,
    TaxId,
    PassportId,
}

impl Field {
    /// All field variants, in a fixed order. Used by conformance tests that
    /// assert the alias set never changes and by CLI `--field` help text.
    pub const ALL: &'static [Field] = &[
        Field::FirstName,
        Field::LastName,
        Field::MiddleName,
        Field::FullName,
        Field::Email,
        Field::Phone,
        Field::DateOfBirth,
        Field::StreetAddress,
        Field::City,
        Field::Country,
        Field::TaxId,
        Field::PassportId,
    ];

    /// The short, stable alias embedded in index keys.
    pub const fn alias(self) -> &'static str {
        match self {
            Field::FirstName => "fn",
            Field::LastName => "ln",
            Field::MiddleName => "mn",
            Field::FullName => "full",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::DateOfBirth => "dob",
            Field::StreetAddress => "addr",
            Field::City => "city",
            Field::Country => "country",
            Field::TaxId => "tax",
            Field::PassportId => "passport",
        }
    }

    /// The full field name, carried on index entries purely for audit
    /// reporting. Plays no role in query matching (spec §3, "Index entry").
    pub const fn full_name(self) -> &'static str {
        match self {
            Field::FirstName => "FIRST_NAME",
            Field::LastName => "LAST_NAME",
            Field::MiddleName => "MIDDLE_NAME",
            Field::FullName => "FULL_NAME",
            Field::Email => "EMAIL",
            Field::Phone => "PHONE",
            Field::DateOfBirth => "DATE_OF_BIRTH",
            Field::StreetAddress => "STREET_ADDRESS",
            Field::City => "CITY",
            Field::Country => "COUNTRY",
            Field::TaxId => "TAX_ID",
            Field::PassportId => "PASSPORT_ID",
        }
    }

    /// Look up a field by its alias (the form used inside index keys).
    pub fn from_alias(alias: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.alias() == alias)
    }

    /// Look up a field by its full name (the form a tagged ingester supplies).
    pub fn from_full_name(name: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.full_name() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

impl FromStr for Field {
    type Err = UnknownFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::from_full_name(s)
            .or_else(|| Field::from_alias(s))
            .ok_or_else(|| UnknownFieldError(s.to_string()))
    }
}

/// Returned when a caller names a field outside the closed enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFieldError(pub String);

impl fmt::Display for UnknownFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown field: {}", self.0)
    }
}

impl std::error::Error for UnknownFieldError {}

/// One of the four closed operator tags that appear literally in index keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorTag {
    /// Exact-match equality.
    Eq,
    /// Prefix match (`startsWith`).
    Prefix,
    /// Suffix match (`endsWith`).
    Suffix,
    /// K-gram membership, used to answer `contains`. `K` is a deploy-time
    /// constant (canonically 3).
    Gram(u8),
}

impl OperatorTag {
    /// The literal tag string embedded in an index key, e.g. `"eq"`, `"pre"`,
    /// `"suf"`, `"g3"`.
    pub fn as_key_str(self) -> String {
        match self {
            OperatorTag::Eq => "eq".to_string(),
            OperatorTag::Prefix => "pre".to_string(),
            OperatorTag::Suffix => "suf".to_string(),
            OperatorTag::Gram(k) => format!("g{k}"),
        }
    }

    /// Parse a tag string back into an `OperatorTag`. Used by the relational
    /// backend's audit queries and by tests that roundtrip key strings.
    pub fn parse(s: &str) -> Option<OperatorTag> {
        match s {
            "eq" => Some(OperatorTag::Eq),
            "pre" => Some(OperatorTag::Prefix),
            "suf" => Some(OperatorTag::Suffix),
            other => {
                let k = other.strip_prefix('g')?.parse::<u8>().ok()?;
                Some(OperatorTag::Gram(k))
            }
        }
    }
}

impl fmt::Display for OperatorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_key_str())
    }
}

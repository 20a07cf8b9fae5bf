//! Configuration surface (spec §6).
//!
//! All values are required — no silent defaults for anything that affects
//! index-key derivation or confidentiality. Cosmetic knobs (max-results,
//! store-backend choice) do get defaults, matching the teacher's distinction
//! between "always required" and "sane default" configuration fields.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, PsiResult};

/// Which `IndexStore` backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    Relational,
}

/// Master configuration struct for a PSI deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsiConfig {
    /// PRF key material, base64-encoded. Required; refused at startup if
    /// absent (spec §7, "Secret missing").
    pub secret_base64: String,

    /// N-gram width for `contains` queries. MUST be >= 2. Canonically 3.
    pub gram_width: u8,

    /// Minimum result-set size that is not suppressed by the k-anonymity
    /// gate. `1` disables suppression.
    pub k_anonymity_threshold: usize,

    /// Whether the k-anonymity gate is additionally applied to each
    /// predicate before Boolean composition, not just to the composed
    /// result (spec §9, Open Question — resolved as an opt-in policy knob).
    pub k_anonymity_per_predicate: bool,

    /// Time-to-live applied to newly indexed entries.
    pub retention: Duration,

    /// Hard cap on the result cardinality returned to callers.
    pub max_results: usize,

    /// Which backend `psi-store` should construct.
    pub store_backend: StoreBackend,
}

impl PsiConfig {
    /// Validate the configuration, matching the invariants named in spec §3
    /// and §6.
    pub fn validate(&self) -> PsiResult<()> {
        if self.secret_base64.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "secret_base64".to_string(),
            }
            .into());
        }
        if self.gram_width < 2 {
            return Err(ConfigError::InvalidValue {
                field: "gram_width".to_string(),
                value: self.gram_width.to_string(),
                reason: "gram_width must be >= 2".to_string(),
            }
            .into());
        }
        if self.k_anonymity_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "k_anonymity_threshold".to_string(),
                value: self.k_anonymity_threshold.to_string(),
                reason: "k_anonymity_threshold must be >= 1 (use 1 to disable suppression)"
                    .to_string(),
            }
            .into());
        }
        if self.retention.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "retention".to_string(),
                value: format!("{:?}", self.retention),
                reason: "retention must be positive".to_string(),
            }
            .into());
        }
        if self.max_results == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_results".to_string(),
                value: self.max_results.to_string(),
                reason: "max_results must be >= 1".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Canonical defaults for every knob except the secret, which has no
    /// safe default and must always be supplied explicitly.
    pub fn with_secret(secret_base64: impl Into<String>) -> Self {
        Self {
            secret_base64: secret_base64.into(),
            gram_width: 3,
            k_anonymity_threshold: 5,
            k_anonymity_per_predicate: false,
            retention: Duration::from_secs(90 * 24 * 3600),
            max_results: 10_000,
            store_backend: StoreBackend::Memory,
        }
    }

    /// Build from environment variables, following the `PSI_*` naming
    /// convention (spec §6 configuration surface).
    ///
    /// Environment variables:
    /// - `PSI_SECRET_BASE64`: PRF key material (required, no default)
    /// - `PSI_GRAM_WIDTH`: n-gram width (default 3)
    /// - `PSI_K_ANONYMITY_THRESHOLD`: minimum surfaced result size (default 5)
    /// - `PSI_K_ANONYMITY_PER_PREDICATE`: "true"/"false" (default false)
    /// - `PSI_RETENTION_SECS`: retention TTL in seconds (default 90 days)
    /// - `PSI_MAX_RESULTS`: result cardinality cap (default 10000)
    /// - `PSI_STORE_BACKEND`: "memory" or "relational" (default "memory")
    pub fn from_env() -> PsiResult<Self> {
        let secret_base64 =
            std::env::var("PSI_SECRET_BASE64").map_err(|_| ConfigError::MissingRequired {
                field: "PSI_SECRET_BASE64".to_string(),
            })?;

        let mut config = Self::with_secret(secret_base64);

        if let Ok(v) = std::env::var("PSI_GRAM_WIDTH") {
            config.gram_width = v.parse().map_err(|_| ConfigError::InvalidValue {
                field: "PSI_GRAM_WIDTH".to_string(),
                value: v,
                reason: "must be an integer".to_string(),
            })?;
        }
        if let Ok(v) = std::env::var("PSI_K_ANONYMITY_THRESHOLD") {
            config.k_anonymity_threshold = v.parse().map_err(|_| ConfigError::InvalidValue {
                field: "PSI_K_ANONYMITY_THRESHOLD".to_string(),
                value: v,
                reason: "must be an integer".to_string(),
            })?;
        }
        if let Ok(v) = std::env::var("PSI_K_ANONYMITY_PER_PREDICATE") {
            config.k_anonymity_per_predicate = v == "true";
        }
        if let Ok(v) = std::env::var("PSI_RETENTION_SECS") {
            let secs: u64 = v.parse().map_err(|_| ConfigError::InvalidValue {
                field: "PSI_RETENTION_SECS".to_string(),
                value: v,
                reason: "must be an integer".to_string(),
            })?;
            config.retention = Duration::from_secs(secs);
        }
        if let Ok(v) = std::env::var("PSI_MAX_RESULTS") {
            config.max_results = v.parse().map_err(|_| ConfigError::InvalidValue {
                field: "PSI_MAX_RESULTS".to_string(),
                value: v,
                reason: "must be an integer".to_string(),
            })?;
        }
        if let Ok(v) = std::env::var("PSI_STORE_BACKEND") {
            config.store_backend = match v.as_str() {
                "memory" => StoreBackend::Memory,
                "relational" => StoreBackend::Relational,
                other => {
                    return Err(ConfigError::InvalidValue {
                        field: "PSI_STORE_BACKEND".to_string(),
                        value: other.to_string(),
                        reason: "must be \"memory\" or \"relational\"".to_string(),
                    }
                    .into())
                }
            };
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = PsiConfig::with_secret("c2VjcmV0");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_short_gram_width() {
        let mut config = PsiConfig::with_secret("c2VjcmV0");
        config.gram_width = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_k_anonymity_threshold() {
        let mut config = PsiConfig::with_secret("c2VjcmV0");
        config.k_anonymity_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_secret() {
        let config = PsiConfig::with_secret("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_retention() {
        let mut config = PsiConfig::with_secret("c2VjcmV0");
        config.retention = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}

//! The keyed pseudorandom function (spec §4.2).
//!
//! Realized as HMAC-SHA-256, keyed by a process-wide secret loaded once at
//! startup. The secret is never a global: callers hold an `Arc<PrfSecret>`
//! and pass it explicitly, following the teacher's dependency-injection
//! house style (no singleton clients).

use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use psi_core::FingerprintError;

type HmacSha256 = Hmac<Sha256>;

/// PRF key material. Holds raw key bytes; never logged or `Debug`-printed
/// in full (the `Debug` impl below redacts the material).
#[derive(Clone)]
pub struct PrfSecret(Vec<u8>);

impl PrfSecret {
    /// Wrap raw key bytes. Any non-empty byte string is accepted; HMAC pads
    /// or hashes keys of any length internally.
    pub fn new(key_bytes: impl Into<Vec<u8>>) -> Result<Self, FingerprintError> {
        let key_bytes = key_bytes.into();
        if key_bytes.is_empty() {
            return Err(FingerprintError::SecretMissing);
        }
        Ok(Self(key_bytes))
    }

    /// Decode the secret from a base64 string, the form it is carried in
    /// configuration (spec §6, `secret`).
    pub fn from_base64(encoded: &str) -> Result<Self, FingerprintError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| FingerprintError::SecretMissing)?;
        Self::new(bytes)
    }
}

impl std::fmt::Debug for PrfSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrfSecret(<{} bytes redacted>)", self.0.len())
    }
}

/// Apply the keyed hash to a message, producing a URL-safe base64 string
/// (no padding) of a 32-byte HMAC-SHA-256 output (spec §4.2, §6).
///
/// The message always has the form `alias|fragment` (domain separation —
/// the same fragment text hashes differently across fields) and is built
/// by the key deriver, never by callers directly.
pub fn keyed_hash(secret: &PrfSecret, message: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(&secret.0).expect("HMAC accepts keys of any length");
    mac.update(message);
    let output = mac.finalize().into_bytes();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(output)
}

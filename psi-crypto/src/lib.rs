//! PSI Crypto — normalization (C1), the keyed pseudorandom function (C2),
//! and index-key derivation (C3).

mod key;
mod normalize;
mod prf;

pub use key::derive_key;
pub use normalize::normalize;
pub use prf::{keyed_hash, PrfSecret};

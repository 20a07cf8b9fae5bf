//! PSI Core — data types, configuration, and error taxonomy.
//!
//! Pure data structures and validation logic only; no I/O, no hashing, no
//! store access. Every other crate in the workspace depends on this one.

mod config;
mod error;
mod field;
mod health;
mod identity;

pub use config::*;
pub use error::*;
pub use field::*;
pub use health::*;
pub use identity::*;

//! Keyed primitives: HMAC over any `Hash`, KMAC over cSHAKE
#![forbid(unsafe_code)]

pub mod hmac;
#[cfg(feature = "sha3")]
pub mod kmac;

pub use hmac::Hmac;
#[cfg(feature = "sha3")]
pub use kmac::{Kmac128, Kmac256};

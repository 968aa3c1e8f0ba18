//! Deterministic random bit generators
//!
//! Every generator follows the fast-key-erasure pattern: the stored secret
//! is always the *next* key, derived and written back before any output
//! byte leaves the instance. `zero` wipes and returns to the unseeded
//! state.
//!
//! The shared input encoding is one byte `n * 85 + |alpha|` with the
//! personalization / additional input `alpha` clamped to 84 bytes;
//! `n` = 0 for the initial seed, 1 for a reseed, 2 for generate.
#![forbid(unsafe_code)]

use rand_core::RngCore;
use zeroize::Zeroizing;

use crate::error::Result;

#[cfg(feature = "chacha20")]
pub mod chacha20;
pub mod hash_drng;
#[cfg(feature = "sha3")]
pub mod kmac_drng;
#[cfg(feature = "sha3")]
pub mod xdrbg;

#[cfg(feature = "chacha20")]
pub use chacha20::ChaCha20Drng;
pub use hash_drng::HashDrng;
#[cfg(feature = "sha3")]
pub use kmac_drng::KmacDrng;
#[cfg(feature = "sha3")]
pub use xdrbg::{Xdrbg, XdrbgKind};

/// Longest personalization / additional-input string that enters the
/// encoding.
pub const ALPHA_MAX: usize = 84;

pub(crate) fn clamp_alpha(alpha: &[u8]) -> &[u8] {
    &alpha[..alpha.len().min(ALPHA_MAX)]
}

pub(crate) fn encode_byte(n: u8, alpha_len: usize) -> u8 {
    n * 85 + alpha_len as u8
}

/// DRBG capability.
pub trait Drng {
    /// Mix fresh seed material and an optional personalization string into
    /// the state. The first call instantiates; later calls reseed.
    fn seed(&mut self, seed: &[u8], persbuf: &[u8]) -> Result<()>;

    /// Fill `out`; infallible after a successful seed (failures produce no
    /// output and leave the state unchanged).
    fn generate(&mut self, addtl: &[u8], out: &mut [u8]) -> Result<()>;

    /// Wipe the state and drop back to the unseeded state.
    fn zero(&mut self);

    /// Seed from the operating system's entropy source.
    fn seed_from_os(&mut self, persbuf: &[u8]) -> Result<()>
    where
        Self: Sized,
    {
        let mut seed = Zeroizing::new([0u8; 48]);
        rand::rngs::OsRng.fill_bytes(seed.as_mut());
        self.seed(seed.as_ref(), persbuf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_clamped_to_84() {
        let long = [0u8; 200];
        assert_eq!(clamp_alpha(&long).len(), ALPHA_MAX);
        assert_eq!(clamp_alpha(&long[..10]).len(), 10);
    }

    #[test]
    fn encode_byte_layout() {
        assert_eq!(encode_byte(0, 0), 0);
        assert_eq!(encode_byte(0, 84), 84);
        assert_eq!(encode_byte(1, 0), 85);
        assert_eq!(encode_byte(2, 84), 254);
    }
}

//! Hash and XOF instances
//!
//! The `Hash` capability is the seam every message-digest family plugs
//! into: the sponge variants (SHA-3, SHAKE, cSHAKE, Ascon) and the SHA-2
//! wrappers all speak it, and HMAC / the hash-AEAD are generic over it.
//!
//! Fixed-digest variants reject `set_digest_size` and allow exactly one
//! `finalize`. XOF variants treat `finalize` as a streamed squeeze: it may
//! be called repeatedly and each call continues the output stream.
#![forbid(unsafe_code)]

use crate::error::Result;

#[cfg(feature = "ascon")]
pub mod ascon;
#[cfg(feature = "sha3")]
pub mod cshake;
#[cfg(any(feature = "sha2-256", feature = "sha2-512"))]
pub mod sha2;
#[cfg(feature = "sha3")]
pub mod sha3;

/// Message-digest capability.
pub trait Hash {
    /// Construct a fresh, self-test-gated instance.
    fn fresh() -> Result<Self>
    where
        Self: Sized;

    /// Reset to the initial state, keeping the variant parameterization.
    fn init(&mut self);

    /// Absorb message bytes. Rejected once squeezing started.
    fn update(&mut self, data: &[u8]) -> Result<()>;

    /// Produce output. Fixed-digest variants require
    /// `out.len() == digest_size()` and permit a single call; XOFs fill any
    /// length and continue the stream across calls.
    fn finalize(&mut self, out: &mut [u8]) -> Result<()>;

    /// Select the XOF target output length. Fixed-digest variants refuse;
    /// XOFs accept any point up to the first squeeze.
    fn set_digest_size(&mut self, size: usize) -> Result<()>;

    /// Current digest / XOF target size in bytes.
    fn digest_size(&self) -> usize;

    /// Input block size in bytes (the sponge rate for Keccak/Ascon
    /// variants); this is the HMAC block size.
    fn block_len(&self) -> usize;

    /// Wipe all message-dependent state.
    fn zero(&mut self);
}

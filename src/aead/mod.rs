//! AEAD runtime
//!
//! One state machine shared by the three families:
//! `fresh -> keyed -> aad_absorbing -> crypting -> finalized`. Re-keying is
//! allowed only from `fresh` or `finalized`; `*_init` calls concatenate
//! AAD; the first `*_update` fixes the direction and later calls must
//! preserve it; `zero` wipes back to `fresh` from anywhere.
#![forbid(unsafe_code)]

#[cfg(feature = "aes")]
pub mod gcm;
pub mod hash_aead;
#[cfg(feature = "sha3")]
pub mod kmac_aead;

#[cfg(feature = "aes")]
pub use gcm::AesGcm;
pub use hash_aead::HashAead;
#[cfg(feature = "sha3")]
pub use kmac_aead::KmacAead;

use crate::error::{Error, Result};

/// Shared AEAD lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AeadState {
    Fresh,
    Keyed,
    AadAbsorbing,
    Crypting,
    Finalized,
}

impl AeadState {
    pub(crate) fn may_set_key(self) -> bool {
        matches!(self, AeadState::Fresh | AeadState::Finalized)
    }

    pub(crate) fn may_absorb_aad(self) -> bool {
        matches!(self, AeadState::Keyed | AeadState::AadAbsorbing)
    }

    pub(crate) fn may_update(self) -> bool {
        matches!(
            self,
            AeadState::Keyed | AeadState::AadAbsorbing | AeadState::Crypting
        )
    }

    pub(crate) fn may_finalize(self) -> bool {
        self.may_update()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Encrypt,
    Decrypt,
}

/// Check that an instance already moving in `current` keeps going the same
/// way.
pub(crate) fn require_direction(current: &mut Option<Direction>, wanted: Direction) -> Result<()> {
    match current {
        None => {
            *current = Some(wanted);
            Ok(())
        }
        Some(d) if *d == wanted => Ok(()),
        Some(_) => Err(Error::InvalidState),
    }
}

/// Authenticated encryption capability.
///
/// The streamed and one-shot surfaces produce identical ciphertext and tag
/// for identical input; the one-shots are plain compositions of the
/// streamed calls.
pub trait Aead {
    /// Install key and IV. Only from `fresh` or `finalized`.
    fn set_key(&mut self, key: &[u8], iv: &[u8]) -> Result<()>;

    /// Absorb (more) associated data before any payload.
    fn enc_init(&mut self, aad: &[u8]) -> Result<()>;

    /// Encrypt a payload chunk; `ct` must equal `pt` in length.
    fn enc_update(&mut self, pt: &[u8], ct: &mut [u8]) -> Result<()>;

    /// Produce the tag (truncated to `tag.len()`) and finalize.
    fn enc_final(&mut self, tag: &mut [u8]) -> Result<()>;

    /// Absorb (more) associated data before any payload (decrypt side).
    fn dec_init(&mut self, aad: &[u8]) -> Result<()>;

    /// Decrypt a payload chunk; `pt` must equal `ct` in length.
    fn dec_update(&mut self, ct: &[u8], pt: &mut [u8]) -> Result<()>;

    /// Verify the expected tag in constant time; `TagMismatch` on failure.
    fn dec_final(&mut self, tag: &[u8]) -> Result<()>;

    /// Wipe to `fresh`.
    fn zero(&mut self);

    /// One-shot encryption on a keyed instance.
    fn encrypt(&mut self, aad: &[u8], pt: &[u8], ct: &mut [u8], tag: &mut [u8]) -> Result<()> {
        self.enc_init(aad)?;
        self.enc_update(pt, ct)?;
        self.enc_final(tag)
    }

    /// One-shot decryption on a keyed instance.
    fn decrypt(&mut self, aad: &[u8], ct: &[u8], pt: &mut [u8], tag: &[u8]) -> Result<()> {
        self.dec_init(aad)?;
        self.dec_update(ct, pt)?;
        self.dec_final(tag)
    }
}

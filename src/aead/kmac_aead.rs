//! KMAC AEAD
//!
//! Same Encrypt-then-MAC shape as the hash AEAD with the KMAC family in
//! both roles: keystream from the KMAC-DRNG, integrity from a KMAC-256
//! instance keyed by an independent DRBG pull. Tags stream out of KMAC's
//! XOF mode, so any length up to 64 bytes is available.
#![forbid(unsafe_code)]

use zeroize::{Zeroize, Zeroizing};

use crate::aead::{require_direction, Aead, AeadState, Direction};
use crate::ct;
use crate::drbg::{Drng, KmacDrng};
use crate::error::{Error, Result};
use crate::mac::kmac::Kmac256;
use crate::secmem::SecureBox;
use crate::status::{self, AlgId};

const KEYSTREAM_BLOCK: usize = 256;
const MAC_KEY_LEN: usize = 64;
/// Largest tag the XOF-mode finalization hands out here.
pub const TAG_MAX: usize = 64;

const AUTH_CUSTOM: &[u8] = b"KMAC-AEAD auth";

pub struct KmacAead {
    drng: KmacDrng,
    auth: Option<Kmac256>,
    keystream: Zeroizing<[u8; KEYSTREAM_BLOCK]>,
    ks_used: usize,
    state: AeadState,
    dir: Option<Direction>,
}

impl KmacAead {
    pub fn new() -> Result<Self> {
        status::ensure(AlgId::KmacAead, kat_kmac_aead)?;
        Ok(Self::new_unchecked())
    }

    pub(crate) fn new_unchecked() -> Self {
        KmacAead {
            drng: KmacDrng::new_unchecked(),
            auth: None,
            keystream: Zeroizing::new([0u8; KEYSTREAM_BLOCK]),
            ks_used: KEYSTREAM_BLOCK,
            state: AeadState::Fresh,
            dir: None,
        }
    }

    pub fn alloc() -> Result<SecureBox<Self>> {
        SecureBox::new_from(Self::new()?)
    }

    fn set_key_nocheck(&mut self, key: &[u8], iv: &[u8]) -> Result<()> {
        if !self.state.may_set_key() {
            return Err(Error::InvalidState);
        }
        if key.is_empty() {
            return Err(Error::InvalidArgument("empty key"));
        }
        ct::poison(key);
        self.drng.zero();
        self.drng.seed(key, iv)?;

        let mut mac_key = Zeroizing::new([0u8; MAC_KEY_LEN]);
        self.drng.generate(&[], mac_key.as_mut())?;
        self.auth = Some(Kmac256::new_unchecked(mac_key.as_ref(), AUTH_CUSTOM)?);

        self.keystream.zeroize();
        self.ks_used = KEYSTREAM_BLOCK;
        self.dir = None;
        self.state = AeadState::Keyed;
        Ok(())
    }

    fn absorb_aad(&mut self, aad: &[u8], dir: Direction) -> Result<()> {
        if !self.state.may_absorb_aad() {
            return Err(Error::InvalidState);
        }
        require_direction(&mut self.dir, dir)?;
        let auth = self.auth.as_mut().ok_or(Error::InvalidState)?;
        auth.update(aad)?;
        self.state = AeadState::AadAbsorbing;
        Ok(())
    }

    fn crypt(&mut self, input: &[u8], output: &mut [u8], dir: Direction) -> Result<()> {
        if input.len() != output.len() {
            return Err(Error::InvalidArgument("in/out length mismatch"));
        }
        if !self.state.may_update() {
            return Err(Error::InvalidState);
        }
        require_direction(&mut self.dir, dir)?;
        self.state = AeadState::Crypting;

        let mut i = 0;
        while i < input.len() {
            if self.ks_used == KEYSTREAM_BLOCK {
                let mut fresh = Zeroizing::new([0u8; KEYSTREAM_BLOCK]);
                self.drng.generate(&[], fresh.as_mut())?;
                self.keystream.copy_from_slice(fresh.as_ref());
                self.ks_used = 0;
            }
            let n = (KEYSTREAM_BLOCK - self.ks_used).min(input.len() - i);
            if dir == Direction::Decrypt {
                if let Some(a) = self.auth.as_mut() {
                    a.update(&input[i..i + n])?;
                }
            }
            for j in 0..n {
                output[i + j] = input[i + j] ^ self.keystream[self.ks_used + j];
            }
            if dir == Direction::Encrypt {
                if let Some(a) = self.auth.as_mut() {
                    a.update(&output[i..i + n])?;
                }
            }
            self.ks_used += n;
            i += n;
        }
        Ok(())
    }

    fn compute_tag(&mut self, len: usize) -> Result<Zeroizing<[u8; TAG_MAX]>> {
        let auth = self.auth.as_mut().ok_or(Error::InvalidState)?;
        let mut full = Zeroizing::new([0u8; TAG_MAX]);
        auth.finalize_xof(&mut full[..len])?;
        Ok(full)
    }
}

impl Default for KmacAead {
    fn default() -> Self {
        Self::new_unchecked()
    }
}

impl Aead for KmacAead {
    fn set_key(&mut self, key: &[u8], iv: &[u8]) -> Result<()> {
        self.set_key_nocheck(key, iv)
    }

    fn enc_init(&mut self, aad: &[u8]) -> Result<()> {
        self.absorb_aad(aad, Direction::Encrypt)
    }

    fn enc_update(&mut self, pt: &[u8], ct: &mut [u8]) -> Result<()> {
        self.crypt(pt, ct, Direction::Encrypt)?;
        ct::unpoison(ct);
        Ok(())
    }

    fn enc_final(&mut self, tag: &mut [u8]) -> Result<()> {
        if !self.state.may_finalize() {
            return Err(Error::InvalidState);
        }
        require_direction(&mut self.dir, Direction::Encrypt)?;
        if tag.is_empty() || tag.len() > TAG_MAX {
            return Err(Error::InvalidArgument("tag length"));
        }
        let full = self.compute_tag(tag.len())?;
        tag.copy_from_slice(&full[..tag.len()]);
        ct::unpoison(tag);
        self.state = AeadState::Finalized;
        Ok(())
    }

    fn dec_init(&mut self, aad: &[u8]) -> Result<()> {
        self.absorb_aad(aad, Direction::Decrypt)
    }

    fn dec_update(&mut self, ct: &[u8], pt: &mut [u8]) -> Result<()> {
        self.crypt(ct, pt, Direction::Decrypt)
    }

    fn dec_final(&mut self, tag: &[u8]) -> Result<()> {
        if !self.state.may_finalize() {
            return Err(Error::InvalidState);
        }
        require_direction(&mut self.dir, Direction::Decrypt)?;
        if tag.is_empty() || tag.len() > TAG_MAX {
            return Err(Error::InvalidArgument("tag length"));
        }
        let full = self.compute_tag(tag.len())?;
        let outcome = ct::consttime_compare(&full[..tag.len()], tag);
        self.state = AeadState::Finalized;
        if outcome != 0 {
            return Err(Error::TagMismatch);
        }
        Ok(())
    }

    fn zero(&mut self) {
        self.drng.zero();
        if let Some(a) = self.auth.as_mut() {
            a.zero();
        }
        self.auth = None;
        self.keystream.zeroize();
        self.ks_used = KEYSTREAM_BLOCK;
        self.dir = None;
        self.state = AeadState::Fresh;
    }
}

impl Zeroize for KmacAead {
    fn zeroize(&mut self) {
        Aead::zero(self);
    }
}

fn kat_kmac_aead() -> bool {
    let key = [0x21u8; 32];
    let iv = [0x43u8; 12];
    let aad = b"kmac aead post";
    let pt = b"kmac aead round trip payload";

    let mut ctx = KmacAead::new_unchecked();
    if ctx.set_key_nocheck(&key, &iv).is_err() {
        return false;
    }
    let mut ct_buf = [0u8; 28];
    let mut tag = [0u8; 32];
    if ctx.encrypt(aad, pt, &mut ct_buf, &mut tag).is_err() {
        return false;
    }
    if ct_buf == pt[..] {
        return false;
    }
    if ctx.set_key_nocheck(&key, &iv).is_err() {
        return false;
    }
    let mut back = [0u8; 28];
    if ctx.decrypt(aad, &ct_buf, &mut back, &tag).is_err() || back != pt[..] {
        return false;
    }
    if ctx.set_key_nocheck(&key, &iv).is_err() {
        return false;
    }
    let mut tampered_aad = *aad;
    tampered_aad[0] ^= 0x01;
    matches!(
        ctx.decrypt(&tampered_aad, &ct_buf, &mut back, &tag),
        Err(Error::TagMismatch)
    )
}

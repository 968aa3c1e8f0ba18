//! AES-GCM (SP 800-38D)
//!
//! Streaming state machine over the dispatched AES block cipher and the
//! GHASH accumulator. The 12-byte-IV fast path derives the counter block
//! directly; other IV lengths go through GHASH. Decrypt verifies the tag
//! in constant time.
#![forbid(unsafe_code)]

use zeroize::{Zeroize, Zeroizing};

use crate::aead::{require_direction, Aead, AeadState, Direction};
use crate::ct;
use crate::error::{Error, Result};
use crate::secmem::SecureBox;
use crate::status::{self, AlgId};
use crate::sym::ghash::Ghash;
use crate::sym::{AesCipher, Sym};

const BLOCK: usize = 16;

fn inc32(block: &mut [u8; 16]) {
    let mut c = u32::from_be_bytes([block[12], block[13], block[14], block[15]]);
    c = c.wrapping_add(1);
    block[12..16].copy_from_slice(&c.to_be_bytes());
}

pub struct AesGcm {
    cipher: AesCipher,
    ghash: Option<Ghash>,
    h: [u8; 16],
    j0: [u8; 16],
    ej0: [u8; 16],
    ctr: [u8; 16],
    keystream: [u8; 16],
    ks_used: usize,
    aad_len: u64,
    ct_len: u64,
    state: AeadState,
    dir: Option<Direction>,
}

impl AesGcm {
    pub fn new() -> Self {
        AesGcm {
            cipher: AesCipher::new(),
            ghash: None,
            h: [0u8; 16],
            j0: [0u8; 16],
            ej0: [0u8; 16],
            ctr: [0u8; 16],
            keystream: [0u8; 16],
            ks_used: BLOCK,
            aad_len: 0,
            ct_len: 0,
            state: AeadState::Fresh,
            dir: None,
        }
    }

    pub fn alloc() -> Result<SecureBox<Self>> {
        SecureBox::new_from(Self::new())
    }

    fn set_key_nocheck(&mut self, key: &[u8], iv: &[u8]) -> Result<()> {
        if !self.state.may_set_key() {
            return Err(Error::InvalidState);
        }
        if iv.is_empty() {
            return Err(Error::InvalidArgument("empty IV"));
        }
        ct::poison(key);
        self.cipher.set_key(key)?;

        // H = E_K(0^128)
        let mut h = [0u8; 16];
        self.cipher.encrypt_block(&mut h)?;
        self.h = h;

        // J0: length-12 fast path, GHASH-derived otherwise.
        let mut j0 = [0u8; 16];
        if iv.len() == 12 {
            j0[..12].copy_from_slice(iv);
            j0[15] = 1;
        } else {
            let mut g = Ghash::new(&h);
            g.update(iv);
            g.flush_zero_pad();
            g.lengths(0, (iv.len() as u64) * 8);
            j0 = g.tag();
            g.zeroize();
        }
        self.j0 = j0;
        let mut ej0 = j0;
        self.cipher.encrypt_block(&mut ej0)?;
        self.ej0 = ej0;

        self.ctr = j0;
        self.ghash = Some(Ghash::new(&h));
        self.keystream.zeroize();
        self.ks_used = BLOCK;
        self.aad_len = 0;
        self.ct_len = 0;
        self.dir = None;
        self.state = AeadState::Keyed;
        Ok(())
    }

    fn absorb_aad(&mut self, aad: &[u8], dir: Direction) -> Result<()> {
        if !self.state.may_absorb_aad() {
            return Err(Error::InvalidState);
        }
        require_direction(&mut self.dir, dir)?;
        let ghash = self.ghash.as_mut().ok_or(Error::InvalidState)?;
        ghash.update(aad);
        self.aad_len += aad.len() as u64;
        self.state = AeadState::AadAbsorbing;
        Ok(())
    }

    fn next_keystream(&mut self) -> Result<()> {
        inc32(&mut self.ctr);
        let mut blk = self.ctr;
        self.cipher.encrypt_block(&mut blk)?;
        self.keystream = blk;
        self.ks_used = 0;
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
        if self.state != AeadState::Crypting {
            // Close the AAD segment before the first payload byte.
            if let Some(g) = self.ghash.as_mut() {
                g.flush_zero_pad();
            }
            self.state = AeadState::Crypting;
        }

        let mut i = 0;
        while i < input.len() {
            if self.ks_used == BLOCK {
                self.next_keystream()?;
            }
            let n = (BLOCK - self.ks_used).min(input.len() - i);
            // Ciphertext feeds GHASH on both directions.
            if dir == Direction::Decrypt {
                if let Some(g) = self.ghash.as_mut() {
                    g.update(&input[i..i + n]);
                }
            }
            for j in 0..n {
                output[i + j] = input[i + j] ^ self.keystream[self.ks_used + j];
            }
            if dir == Direction::Encrypt {
                if let Some(g) = self.ghash.as_mut() {
                    g.update(&output[i..i + n]);
                }
            }
            self.ks_used += n;
            i += n;
        }
        self.ct_len += input.len() as u64;
        Ok(())
    }

    fn compute_tag(&mut self) -> Result<[u8; 16]> {
        let ghash = self.ghash.as_mut().ok_or(Error::InvalidState)?;
        ghash.flush_zero_pad();
        ghash.lengths(self.aad_len * 8, self.ct_len * 8);
        let mut tag = ghash.tag();
        for (t, e) in tag.iter_mut().zip(self.ej0.iter()) {
            *t ^= e;
        }
        Ok(tag)
    }
}

impl Default for AesGcm {
    fn default() -> Self {
        Self::new()
    }
}

impl Aead for AesGcm {
    fn set_key(&mut self, key: &[u8], iv: &[u8]) -> Result<()> {
        status::ensure(AlgId::AesGcm, kat_gcm)?;
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
        if tag.is_empty() || tag.len() > 16 {
            return Err(Error::InvalidArgument("tag length"));
        }
        if self.state != AeadState::Crypting {
            if let Some(g) = self.ghash.as_mut() {
                g.flush_zero_pad();
            }
        }
        let full = self.compute_tag()?;
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
        if tag.is_empty() || tag.len() > 16 {
            return Err(Error::InvalidArgument("tag length"));
        }
        if self.state != AeadState::Crypting {
            if let Some(g) = self.ghash.as_mut() {
                g.flush_zero_pad();
            }
        }
        let full = Zeroizing::new(self.compute_tag()?);
        let outcome = ct::consttime_compare(&full[..tag.len()], tag);
        self.state = AeadState::Finalized;
        if outcome != 0 {
            return Err(Error::TagMismatch);
        }
        Ok(())
    }

    fn zero(&mut self) {
        self.cipher.zero();
        if let Some(g) = self.ghash.as_mut() {
            g.zeroize();
        }
        self.ghash = None;
        self.h.zeroize();
        self.j0.zeroize();
        self.ej0.zeroize();
        self.ctr.zeroize();
        self.keystream.zeroize();
        self.ks_used = BLOCK;
        self.aad_len = 0;
        self.ct_len = 0;
        self.dir = None;
        self.state = AeadState::Fresh;
    }
}

impl Zeroize for AesGcm {
    fn zeroize(&mut self) {
        Aead::zero(self);
    }
}

// SP 800-38D example: zero key, zero 96-bit IV, one zero plaintext block.
fn kat_gcm() -> bool {
    let key = [0u8; 32];
    let key = &key[..16];
    let iv = [0u8; 12];
    let pt = [0u8; 16];
    let expected_ct = hex::decode("0388dace60b6a392f328c2b971b2fe78").unwrap_or_default();
    let expected_tag = hex::decode("ab6e47d42cec13bdf53a67b21257bddf").unwrap_or_default();

    let mut ctx = AesGcm::new();
    if ctx.set_key_nocheck(key, &iv).is_err() {
        return false;
    }
    let mut ct_out = [0u8; 16];
    let mut tag = [0u8; 16];
    if ctx.encrypt(b"", &pt, &mut ct_out, &mut tag).is_err() {
        return false;
    }

    #[cfg(feature = "fips")]
    {
        // The comparator must notice a corrupted result.
        let mut bad = tag;
        bad[0] ^= 0x01;
        if ct::consttime_compare(&bad, &expected_tag) == 0 {
            return false;
        }
    }

    if ct::consttime_compare(&ct_out, &expected_ct) != 0
        || ct::consttime_compare(&tag, &expected_tag) != 0
    {
        return false;
    }

    // Decrypt path and tamper rejection.
    if ctx.set_key_nocheck(key, &iv).is_err() {
        return false;
    }
    let mut pt_out = [0u8; 16];
    if ctx.decrypt(b"", &ct_out, &mut pt_out, &tag).is_err() || pt_out != pt {
        return false;
    }
    if ctx.set_key_nocheck(key, &iv).is_err() {
        return false;
    }
    let mut tampered = tag;
    tampered[0] ^= 0x01;
    matches!(
        ctx.decrypt(b"", &ct_out, &mut pt_out, &tampered),
        Err(Error::TagMismatch)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed(key: &[u8], iv: &[u8]) -> AesGcm {
        let mut ctx = AesGcm::new();
        ctx.set_key(key, iv).unwrap();
        ctx
    }

    #[test]
    fn sp800_38d_zero_vectors() {
        // Test case 1: empty plaintext, tag only.
        let mut ctx = keyed(&[0u8; 16], &[0u8; 12]);
        let mut tag = [0u8; 16];
        ctx.encrypt(b"", b"", &mut [], &mut tag).unwrap();
        assert_eq!(hex::encode(tag), "58e2fccefa7e3061367f1d57a4e7455a");

        // Test case 2: one zero block.
        let mut ctx = keyed(&[0u8; 16], &[0u8; 12]);
        let mut ct = [0u8; 16];
        let mut tag = [0u8; 16];
        ctx.encrypt(b"", &[0u8; 16], &mut ct, &mut tag).unwrap();
        assert_eq!(hex::encode(ct), "0388dace60b6a392f328c2b971b2fe78");
        assert_eq!(hex::encode(tag), "ab6e47d42cec13bdf53a67b21257bddf");
    }

    #[test]
    fn streamed_equals_oneshot() {
        let key = [0x24u8; 32];
        let iv = [0x9au8; 12];
        let aad = b"header bytes";
        let pt: Vec<u8> = (0..100u8).collect();

        let mut one = keyed(&key, &iv);
        let mut ct_a = vec![0u8; pt.len()];
        let mut tag_a = [0u8; 16];
        one.encrypt(aad, &pt, &mut ct_a, &mut tag_a).unwrap();

        let mut two = keyed(&key, &iv);
        two.enc_init(&aad[..4]).unwrap();
        two.enc_init(&aad[4..]).unwrap();
        let mut ct_b = vec![0u8; pt.len()];
        let mut off = 0;
        for chunk in pt.chunks(13) {
            two.enc_update(chunk, &mut ct_b[off..off + chunk.len()]).unwrap();
            off += chunk.len();
        }
        let mut tag_b = [0u8; 16];
        two.enc_final(&mut tag_b).unwrap();

        assert_eq!(ct_a, ct_b);
        assert_eq!(tag_a, tag_b);
    }

    #[test]
    fn roundtrip_with_long_iv() {
        // Non-12-byte IV exercises the GHASH J0 derivation.
        let key = [0x77u8; 32];
        let iv = [0xc3u8; 31];
        let pt = b"gcm with a long initialization vector";

        let mut enc = keyed(&key, &iv);
        let mut ct = vec![0u8; pt.len()];
        let mut tag = [0u8; 16];
        enc.encrypt(b"aad", pt, &mut ct, &mut tag).unwrap();

        let mut dec = keyed(&key, &iv);
        let mut back = vec![0u8; pt.len()];
        dec.decrypt(b"aad", &ct, &mut back, &tag).unwrap();
        assert_eq!(back, pt);
    }

    #[test]
    fn tamper_any_part_fails() {
        let key = [1u8; 16];
        let iv = [2u8; 12];
        let pt = b"payload";
        let aad = b"aad";

        let mut enc = keyed(&key, &iv);
        let mut ct = vec![0u8; pt.len()];
        let mut tag = [0u8; 16];
        enc.encrypt(aad, pt, &mut ct, &mut tag).unwrap();

        let mut back = vec![0u8; pt.len()];

        let mut bad_ct = ct.clone();
        bad_ct[0] ^= 0x01;
        let mut dec = keyed(&key, &iv);
        assert_eq!(
            dec.decrypt(aad, &bad_ct, &mut back, &tag).unwrap_err(),
            Error::TagMismatch
        );

        let mut bad_tag = tag;
        bad_tag[15] ^= 0x80;
        let mut dec = keyed(&key, &iv);
        assert_eq!(
            dec.decrypt(aad, &ct, &mut back, &bad_tag).unwrap_err(),
            Error::TagMismatch
        );

        let mut dec = keyed(&key, &iv);
        assert_eq!(
            dec.decrypt(b"axd", &ct, &mut back, &tag).unwrap_err(),
            Error::TagMismatch
        );
    }

    #[test]
    fn rekey_only_from_fresh_or_finalized() {
        let mut ctx = keyed(&[0u8; 16], &[0u8; 12]);
        ctx.enc_init(b"a").unwrap();
        assert_eq!(
            ctx.set_key(&[1u8; 16], &[0u8; 12]).unwrap_err(),
            Error::InvalidState
        );
        let mut tag = [0u8; 16];
        ctx.enc_final(&mut tag).unwrap();
        ctx.set_key(&[1u8; 16], &[0u8; 12]).unwrap();
    }

    #[test]
    fn direction_switch_rejected() {
        let mut ctx = keyed(&[0u8; 16], &[0u8; 12]);
        let mut ct = [0u8; 4];
        ctx.enc_update(b"abcd", &mut ct).unwrap();
        let mut pt = [0u8; 4];
        assert_eq!(ctx.dec_update(&ct, &mut pt).unwrap_err(), Error::InvalidState);
    }

    #[test]
    fn truncated_tag_roundtrip() {
        let key = [9u8; 32];
        let iv = [8u8; 12];
        let mut enc = keyed(&key, &iv);
        let mut ct = [0u8; 5];
        let mut tag = [0u8; 12];
        enc.encrypt(b"", b"hello", &mut ct, &mut tag).unwrap();

        let mut dec = keyed(&key, &iv);
        let mut back = [0u8; 5];
        dec.decrypt(b"", &ct, &mut back, &tag).unwrap();
        assert_eq!(&back, b"hello");
    }
}

//! Hash-based Encrypt-then-MAC AEAD
//!
//! Keystream from the hash-parameterized fast-key-erasure DRBG, integrity
//! from HMAC over the same hash. `set_key` pulls two independent DRBG
//! outputs: the first keys the MAC, the keystream then continues from the
//! generator, so the two keys never coincide. The MAC covers the AAD and
//! the ciphertext, never the plaintext.
#![forbid(unsafe_code)]

use zeroize::{Zeroize, Zeroizing};

use crate::aead::{require_direction, Aead, AeadState, Direction};
use crate::ct;
use crate::drbg::{Drng, HashDrng};
use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::mac::hmac::Hmac;
use crate::secmem::SecureBox;
use crate::status::{self, AlgId};

/// Keystream refill quantum.
const KEYSTREAM_BLOCK: usize = 256;
const MAX_DIGEST: usize = 64;

pub struct HashAead<H: Hash + Clone> {
    drng: HashDrng<H>,
    auth: Option<Hmac<H>>,
    keystream: Zeroizing<[u8; KEYSTREAM_BLOCK]>,
    ks_used: usize,
    state: AeadState,
    dir: Option<Direction>,
}

impl<H: Hash + Clone> HashAead<H> {
    pub fn new() -> Result<Self> {
        status::ensure(AlgId::HashAead, kat_hash_aead)?;
        Self::new_unchecked()
    }

    pub(crate) fn new_unchecked() -> Result<Self> {
        Ok(HashAead {
            drng: HashDrng::new()?,
            auth: None,
            keystream: Zeroizing::new([0u8; KEYSTREAM_BLOCK]),
            ks_used: KEYSTREAM_BLOCK,
            state: AeadState::Fresh,
            dir: None,
        })
    }

    pub fn alloc() -> Result<SecureBox<Self>>
    where
        H: Zeroize,
    {
        SecureBox::new_from(Self::new()?)
    }

    /// Truncated tags are allowed down to one byte; the natural tag is the
    /// hash digest size.
    pub fn tag_size(&self) -> usize {
        self.drng.key_len()
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

        // First pull keys the MAC; the keystream continues from the next
        // generator state.
        let digest = self.drng.key_len();
        let mut mac_key = Zeroizing::new([0u8; MAX_DIGEST]);
        self.drng.generate(&[], &mut mac_key[..digest])?;
        self.auth = Some(Hmac::new_unchecked(&mac_key[..digest])?);

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
            // The MAC sees ciphertext on both directions.
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

    fn compute_tag(&mut self) -> Result<Zeroizing<[u8; MAX_DIGEST]>> {
        let auth = self.auth.as_mut().ok_or(Error::InvalidState)?;
        let digest = auth.digest_size();
        let mut full = Zeroizing::new([0u8; MAX_DIGEST]);
        auth.finalize(&mut full[..digest])?;
        Ok(full)
    }
}

impl<H: Hash + Clone> Aead for HashAead<H> {
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
        let digest = self.drng.key_len();
        if tag.is_empty() || tag.len() > digest {
            return Err(Error::InvalidArgument("tag length"));
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
        let digest = self.drng.key_len();
        if tag.is_empty() || tag.len() > digest {
            return Err(Error::InvalidArgument("tag length"));
        }
        let full = self.compute_tag()?;
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

impl<H: Hash + Clone + Zeroize> Zeroize for HashAead<H> {
    fn zeroize(&mut self) {
        self.drng.zeroize();
        if let Some(a) = self.auth.as_mut() {
            a.zeroize();
        }
        self.auth = None;
        self.keystream.zeroize();
        self.ks_used = KEYSTREAM_BLOCK;
        self.dir = None;
        self.state = AeadState::Fresh;
    }
}

// Round-trip power-on check with a checked set-key return on every leg,
// plus tamper rejection.
fn kat_hash_aead() -> bool {
    #[cfg(feature = "sha2-512")]
    {
        kat_with::<crate::hash::sha2::Sha2_512>()
    }
    #[cfg(all(not(feature = "sha2-512"), feature = "sha3"))]
    {
        kat_with::<crate::hash::sha3::Sha3_512>()
    }
    #[cfg(all(not(feature = "sha2-512"), not(feature = "sha3")))]
    {
        true
    }
}

#[cfg(any(feature = "sha2-512", feature = "sha3"))]
fn kat_with<H: Hash + Clone>() -> bool {
    let key = [0x42u8; 32];
    let iv = [0x13u8; 16];
    let aad = b"hash aead post";
    let pt = b"power-on round trip payload";

    let mut ctx = match HashAead::<H>::new_unchecked() {
        Ok(c) => c,
        Err(_) => return false,
    };
    if ctx.set_key_nocheck(&key, &iv).is_err() {
        return false;
    }
    let mut ct_buf = [0u8; 27];
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
    let mut back = [0u8; 27];
    if ctx.decrypt(aad, &ct_buf, &mut back, &tag).is_err() || back != pt[..] {
        return false;
    }
    if ctx.set_key_nocheck(&key, &iv).is_err() {
        return false;
    }
    let mut tampered = tag;
    tampered[0] ^= 0x01;
    matches!(
        ctx.decrypt(aad, &ct_buf, &mut back, &tampered),
        Err(Error::TagMismatch)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "sha2-512")]
    type TestAead = HashAead<crate::hash::sha2::Sha2_512>;
    #[cfg(all(not(feature = "sha2-512"), feature = "sha3"))]
    type TestAead = HashAead<crate::hash::sha3::Sha3_512>;

    #[cfg(any(feature = "sha2-512", feature = "sha3"))]
    #[test]
    fn roundtrip_and_tamper() {
        let mut ctx = TestAead::new().unwrap();
        ctx.set_key(b"a 32 byte key for the hash aead!", b"iv").unwrap();
        let pt: Vec<u8> = (0..300u32).map(|i| (i % 256) as u8).collect();
        let mut ct = vec![0u8; pt.len()];
        let mut tag = [0u8; 64];
        ctx.encrypt(b"aad", &pt, &mut ct, &mut tag).unwrap();
        assert_ne!(ct, pt);

        ctx.set_key(b"a 32 byte key for the hash aead!", b"iv").unwrap();
        let mut back = vec![0u8; pt.len()];
        ctx.decrypt(b"aad", &ct, &mut back, &tag).unwrap();
        assert_eq!(back, pt);

        ctx.set_key(b"a 32 byte key for the hash aead!", b"iv").unwrap();
        let mut bad = ct.clone();
        bad[0] ^= 1;
        assert_eq!(
            ctx.decrypt(b"aad", &bad, &mut back, &tag).unwrap_err(),
            Error::TagMismatch
        );
    }

    #[cfg(any(feature = "sha2-512", feature = "sha3"))]
    #[test]
    fn streamed_equals_oneshot() {
        let key = b"another key of decent length....";
        let pt: Vec<u8> = (0..1000u32).map(|i| (i * 7 % 256) as u8).collect();

        let mut one = TestAead::new().unwrap();
        one.set_key(key, b"nonce").unwrap();
        let mut ct_a = vec![0u8; pt.len()];
        let mut tag_a = [0u8; 32];
        one.encrypt(b"hdr", &pt, &mut ct_a, &mut tag_a).unwrap();

        let mut two = TestAead::new().unwrap();
        two.set_key(key, b"nonce").unwrap();
        two.enc_init(b"h").unwrap();
        two.enc_init(b"dr").unwrap();
        let mut ct_b = vec![0u8; pt.len()];
        let mut off = 0;
        for chunk in pt.chunks(97) {
            two.enc_update(chunk, &mut ct_b[off..off + chunk.len()]).unwrap();
            off += chunk.len();
        }
        let mut tag_b = [0u8; 32];
        two.enc_final(&mut tag_b).unwrap();

        assert_eq!(ct_a, ct_b);
        assert_eq!(tag_a, tag_b);
    }

    #[cfg(any(feature = "sha2-512", feature = "sha3"))]
    #[test]
    fn aad_only_into_mac_not_keystream() {
        // Different AAD, same key/iv: ciphertext identical, tag differs.
        let key = b"keystream independence check key";
        let pt = b"payload";

        let mut a = TestAead::new().unwrap();
        a.set_key(key, b"iv").unwrap();
        let mut ct_a = [0u8; 7];
        let mut tag_a = [0u8; 32];
        a.encrypt(b"aad-one", pt, &mut ct_a, &mut tag_a).unwrap();

        let mut b = TestAead::new().unwrap();
        b.set_key(key, b"iv").unwrap();
        let mut ct_b = [0u8; 7];
        let mut tag_b = [0u8; 32];
        b.encrypt(b"aad-two", pt, &mut ct_b, &mut tag_b).unwrap();

        assert_eq!(ct_a, ct_b);
        assert_ne!(tag_a, tag_b);
    }

    #[cfg(any(feature = "sha2-512", feature = "sha3"))]
    #[test]
    fn empty_payload_produces_tag_only() {
        let mut ctx = TestAead::new().unwrap();
        ctx.set_key(b"empty payload key..............", b"iv").unwrap();
        let mut tag = [0u8; 16];
        ctx.encrypt(b"only aad", b"", &mut [], &mut tag).unwrap();
        assert_ne!(tag, [0u8; 16]);
    }

    #[cfg(any(feature = "sha2-512", feature = "sha3"))]
    #[test]
    fn zero_returns_to_fresh() {
        let mut ctx = TestAead::new().unwrap();
        ctx.set_key(b"some key material..............", b"iv").unwrap();
        ctx.enc_init(b"a").unwrap();
        Aead::zero(&mut ctx);
        // After a wipe the instance re-keys from fresh.
        ctx.set_key(b"some key material..............", b"iv").unwrap();
    }
}

//! Hash-parameterized fast-key-erasure DRBG
//!
//! The generator behind the hash AEAD's keystream. Fixed-digest hashes
//! cannot stream-squeeze, so each generate call ratchets the key once and
//! expands output blocks with a domain-separated counter PRF:
//!
//! ```text
//! K(N+1)  = H(0x00 || K(N) || alpha || encode(2, |alpha|))
//! out_i   = H(0x01 || K(N+1) || le32(i))
//! ```
//!
//! The replacement key is written back before any output byte is
//! produced.
#![forbid(unsafe_code)]

use zeroize::{Zeroize, Zeroizing};

use crate::ct;
use crate::drbg::{clamp_alpha, encode_byte, Drng};
use crate::error::{Error, Result};
use crate::hash::Hash;

const DOMAIN_RATCHET: u8 = 0x00;
const DOMAIN_OUTPUT: u8 = 0x01;
const MAX_KEY: usize = 64;

pub struct HashDrng<H: Hash + Clone> {
    key: Zeroizing<[u8; MAX_KEY]>,
    keylen: usize,
    seeded: bool,
    _hash: core::marker::PhantomData<H>,
}

impl<H: Hash + Clone> HashDrng<H> {
    pub fn new() -> Result<Self> {
        let probe = H::fresh()?;
        let keylen = probe.digest_size();
        if keylen == 0 || keylen > MAX_KEY {
            return Err(Error::Unsupported);
        }
        Ok(HashDrng {
            key: Zeroizing::new([0u8; MAX_KEY]),
            keylen,
            seeded: false,
            _hash: core::marker::PhantomData,
        })
    }

    pub fn key_len(&self) -> usize {
        self.keylen
    }

    fn ratchet(&mut self, domain_input: &[u8], alpha: &[u8], n: u8) -> Result<()> {
        let mut h = H::fresh()?;
        h.update(&[DOMAIN_RATCHET])?;
        if self.seeded {
            h.update(&self.key[..self.keylen])?;
        }
        h.update(domain_input)?;
        h.update(alpha)?;
        h.update(&[encode_byte(n, alpha.len())])?;
        let mut next = Zeroizing::new([0u8; MAX_KEY]);
        h.finalize(&mut next[..self.keylen])?;
        self.key[..self.keylen].copy_from_slice(&next[..self.keylen]);
        h.zero();
        Ok(())
    }
}

impl<H: Hash + Clone> Drng for HashDrng<H> {
    fn seed(&mut self, seed: &[u8], persbuf: &[u8]) -> Result<()> {
        ct::poison(seed);
        let alpha_owned = Zeroizing::new(clamp_alpha(persbuf).to_vec());
        let n = if self.seeded { 1 } else { 0 };
        self.ratchet(seed, &alpha_owned, n)?;
        self.seeded = true;
        Ok(())
    }

    fn generate(&mut self, addtl: &[u8], out: &mut [u8]) -> Result<()> {
        if !self.seeded {
            return Err(Error::InvalidState);
        }
        let alpha_owned = Zeroizing::new(clamp_alpha(addtl).to_vec());
        // New key first; the outgoing bytes are then derived from it under
        // a different domain byte.
        self.ratchet(&[], &alpha_owned, 2)?;

        let mut block = Zeroizing::new([0u8; MAX_KEY]);
        for (i, chunk) in out.chunks_mut(self.keylen).enumerate() {
            let mut h = H::fresh()?;
            h.update(&[DOMAIN_OUTPUT])?;
            h.update(&self.key[..self.keylen])?;
            h.update(&(i as u32).to_le_bytes())?;
            h.finalize(&mut block[..self.keylen])?;
            chunk.copy_from_slice(&block[..chunk.len()]);
            h.zero();
        }
        ct::unpoison(out);
        Ok(())
    }

    fn zero(&mut self) {
        self.key.zeroize();
        self.seeded = false;
    }
}

impl<H: Hash + Clone> Zeroize for HashDrng<H> {
    fn zeroize(&mut self) {
        self.key.zeroize();
        self.seeded = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "sha2-512")]
    type TestDrng = HashDrng<crate::hash::sha2::Sha2_512>;
    #[cfg(all(not(feature = "sha2-512"), feature = "sha3"))]
    type TestDrng = HashDrng<crate::hash::sha3::Sha3_512>;

    #[cfg(any(feature = "sha2-512", feature = "sha3"))]
    #[test]
    fn deterministic() {
        let mut a = TestDrng::new().unwrap();
        let mut b = TestDrng::new().unwrap();
        a.seed(b"seed", b"pers").unwrap();
        b.seed(b"seed", b"pers").unwrap();
        let mut x = [0u8; 300];
        let mut y = [0u8; 300];
        a.generate(&[], &mut x).unwrap();
        b.generate(&[], &mut y).unwrap();
        assert_eq!(x, y);
    }

    #[cfg(any(feature = "sha2-512", feature = "sha3"))]
    #[test]
    fn key_ratchets_on_generate() {
        let mut d = TestDrng::new().unwrap();
        d.seed(b"seed", b"").unwrap();
        let before = *d.key;
        let mut out = [0u8; 32];
        d.generate(&[], &mut out).unwrap();
        assert_ne!(before, *d.key);
    }

    #[cfg(any(feature = "sha2-512", feature = "sha3"))]
    #[test]
    fn sequential_outputs_differ() {
        let mut d = TestDrng::new().unwrap();
        d.seed(b"seed", b"").unwrap();
        let mut one = [0u8; 64];
        let mut two = [0u8; 64];
        d.generate(&[], &mut one).unwrap();
        d.generate(&[], &mut two).unwrap();
        assert_ne!(one, two);
    }

    #[cfg(any(feature = "sha2-512", feature = "sha3"))]
    #[test]
    fn unseeded_rejected() {
        let mut d = TestDrng::new().unwrap();
        let mut out = [0u8; 8];
        assert_eq!(d.generate(&[], &mut out).unwrap_err(), Error::InvalidState);
    }
}

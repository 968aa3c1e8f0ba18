//! HMAC (FIPS-198) over the Hash capability
//!
//! Works over any fixed-digest `Hash` with a known block size; keys longer
//! than the block are reduced by the hash first. The state is the pair of
//! keyed inner/outer contexts, so `update` never touches key material
//! again.
#![forbid(unsafe_code)]

use zeroize::{Zeroize, Zeroizing};

use crate::ct;
use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::secmem::SecureBox;
use crate::status::{self, AlgId};

const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5c;

/// Largest supported hash block (SHAKE-128 rate).
const MAX_BLOCK: usize = 168;
/// Largest supported digest (SHA-512 / SHA3-512).
const MAX_DIGEST: usize = 64;

#[derive(Debug)]
pub struct Hmac<H: Hash> {
    inner: H,
    outer: H,
    digest_size: usize,
}

impl<H: Hash + Clone> Hmac<H> {
    pub fn new(key: &[u8]) -> Result<Self> {
        status::ensure(AlgId::Hmac, kat_hmac)?;
        Self::new_unchecked(key)
    }

    pub(crate) fn new_unchecked(key: &[u8]) -> Result<Self> {
        if key.is_empty() {
            return Err(Error::InvalidArgument("empty HMAC key"));
        }
        ct::poison(key);
        let mut inner = H::fresh()?;
        let mut outer = inner.clone();
        let block = inner.block_len();
        let digest = inner.digest_size();
        if block > MAX_BLOCK || digest > MAX_DIGEST || digest == 0 {
            return Err(Error::Unsupported);
        }

        let mut k0 = Zeroizing::new([0u8; MAX_BLOCK]);
        if key.len() > block {
            let mut kh = H::fresh()?;
            kh.update(key)?;
            kh.finalize(&mut k0[..digest])?;
        } else {
            k0[..key.len()].copy_from_slice(key);
        }

        let mut pad = Zeroizing::new([0u8; MAX_BLOCK]);
        for i in 0..block {
            pad[i] = k0[i] ^ IPAD;
        }
        inner.update(&pad[..block])?;
        for i in 0..block {
            pad[i] = k0[i] ^ OPAD;
        }
        outer.update(&pad[..block])?;

        Ok(Hmac {
            inner,
            outer,
            digest_size: digest,
        })
    }

    pub fn alloc(key: &[u8]) -> Result<SecureBox<Self>>
    where
        H: Zeroize,
    {
        SecureBox::new_from(Self::new(key)?)
    }

    pub fn update(&mut self, msg: &[u8]) -> Result<()> {
        self.inner.update(msg)
    }

    /// Complete the inner hash, fold it into the outer context and write
    /// the tag. `out` must be exactly `digest_size` bytes.
    pub fn finalize(&mut self, out: &mut [u8]) -> Result<()> {
        if out.len() != self.digest_size {
            return Err(Error::InvalidArgument("tag buffer length"));
        }
        let mut d = Zeroizing::new([0u8; MAX_DIGEST]);
        self.inner.finalize(&mut d[..self.digest_size])?;
        self.outer.update(&d[..self.digest_size])?;
        self.outer.finalize(out)?;
        ct::unpoison(out);
        Ok(())
    }

    pub fn digest_size(&self) -> usize {
        self.digest_size
    }

    /// One-shot MAC.
    pub fn mac(key: &[u8], msg: &[u8], out: &mut [u8]) -> Result<()> {
        let mut ctx = Self::new(key)?;
        ctx.update(msg)?;
        ctx.finalize(out)
    }

    /// Wipe both keyed contexts. The instance needs a fresh construction
    /// (with the key) before reuse.
    pub fn zero(&mut self) {
        self.inner.zero();
        self.outer.zero();
    }
}

impl<H: Hash + Zeroize> Zeroize for Hmac<H> {
    fn zeroize(&mut self) {
        self.inner.zeroize();
        self.outer.zeroize();
    }
}

// RFC 4231 test case 1 over SHA-256.
#[cfg(feature = "sha2-256")]
fn kat_hmac() -> bool {
    let key = [0x0bu8; 20];
    let expected =
        hex::decode("b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7")
            .unwrap_or_default();
    status::kat_digest(b"Hi There", &expected, |inp, out| {
        if let Ok(mut ctx) = Hmac::<crate::hash::sha2::Sha2_256>::new_unchecked(&key) {
            if ctx.update(inp).is_ok() {
                let _ = ctx.finalize(out);
            }
        }
    })
}

// HMAC-SHA3-224 vector when SHA-256 is compiled out.
#[cfg(all(not(feature = "sha2-256"), feature = "sha3"))]
fn kat_hmac() -> bool {
    let key = hex::decode("bb0095c4a4a667d2e74330e5d6").unwrap_or_default();
    let msg = hex::decode("358e06ba032183fc182058bdb7bb1340").unwrap_or_default();
    let expected = hex::decode("16f7b27e25376c38cfaa6fcce285c51428db33a0fe7af0af5395dea2")
        .unwrap_or_default();
    status::kat_digest(&msg, &expected, |inp, out| {
        if let Ok(mut ctx) = Hmac::<crate::hash::sha3::Sha3_224>::new_unchecked(&key) {
            if ctx.update(inp).is_ok() {
                let _ = ctx.finalize(out);
            }
        }
    })
}

// No fixed-digest hash compiled in; the generic code has nothing to gate.
#[cfg(all(not(feature = "sha2-256"), not(feature = "sha3")))]
fn kat_hmac() -> bool {
    true
}

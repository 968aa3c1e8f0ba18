//! KMAC-DRNG
//!
//! Fast-key-erasure generator over KMAC-256 in XOF mode with a 512-bit
//! key. Seeding and generation run under the literal customization
//! strings `"KMAC-DRNG seed"` / `"KMAC-DRNG generate"`; every generate
//! chunk first squeezes the next key back into state, then the output
//! bytes, so the key that produced released bytes never survives them.
#![forbid(unsafe_code)]

use rand_core::{CryptoRng, Error as RandError, RngCore};
use zeroize::{Zeroize, Zeroizing};

use crate::ct;
use crate::drbg::{clamp_alpha, encode_byte, Drng};
use crate::error::{Error, Result};
use crate::mac::kmac::Kmac256;
use crate::secmem::SecureBox;
use crate::status::{self, AlgId};

/// 512-bit internal key.
pub const KMAC_DRNG_KEYSIZE: usize = 64;

const SEED_CUSTOM: &[u8] = b"KMAC-DRNG seed";
const GENERATE_CUSTOM: &[u8] = b"KMAC-DRNG generate";

/// One generate call squeezes at most 100 cSHAKE-256 rate blocks per key
/// ratchet.
const MAX_CHUNK: usize = 136 * 100;

pub struct KmacDrng {
    key: Zeroizing<[u8; KMAC_DRNG_KEYSIZE]>,
    seeded: bool,
}

impl KmacDrng {
    pub fn new() -> Result<Self> {
        status::ensure(AlgId::KmacDrng, kat_kmac_drng)?;
        Ok(Self::new_unchecked())
    }

    pub(crate) fn new_unchecked() -> Self {
        KmacDrng {
            key: Zeroizing::new([0u8; KMAC_DRNG_KEYSIZE]),
            seeded: false,
        }
    }

    pub fn alloc() -> Result<SecureBox<Self>> {
        SecureBox::new_from(Self::new()?)
    }

    fn seed_inner(&mut self, seed: &[u8], persbuf: &[u8]) -> Result<()> {
        ct::poison(seed);
        let alpha = clamp_alpha(persbuf);
        let n = if self.seeded { 1 } else { 0 };
        // First seed is keyed by the empty string.
        let old_key: &[u8] = if self.seeded { self.key.as_ref() } else { &[] };
        let mut kmac = Kmac256::new_unchecked(old_key, SEED_CUSTOM)?;
        kmac.update(seed)?;
        kmac.update(alpha)?;
        kmac.update(&[encode_byte(n, alpha.len())])?;
        let mut next = Zeroizing::new([0u8; KMAC_DRNG_KEYSIZE]);
        kmac.finalize_xof(next.as_mut())?;
        self.key.copy_from_slice(next.as_ref());
        kmac.zero();
        self.seeded = true;
        Ok(())
    }

    fn generate_inner(&mut self, addtl: &[u8], out: &mut [u8]) -> Result<()> {
        if !self.seeded {
            return Err(Error::InvalidState);
        }
        let alpha = clamp_alpha(addtl);
        for chunk in out.chunks_mut(MAX_CHUNK) {
            let mut kmac = Kmac256::new_unchecked(self.key.as_ref(), GENERATE_CUSTOM)?;
            kmac.update(alpha)?;
            kmac.update(&[encode_byte(2, alpha.len())])?;
            // K(N+1) is stored before a single output byte is released.
            let mut next = Zeroizing::new([0u8; KMAC_DRNG_KEYSIZE]);
            kmac.finalize_xof(next.as_mut())?;
            self.key.copy_from_slice(next.as_ref());
            kmac.finalize_xof(chunk)?;
            kmac.zero();
        }
        ct::unpoison(out);
        Ok(())
    }
}

impl Default for KmacDrng {
    fn default() -> Self {
        Self::new_unchecked()
    }
}

impl Drng for KmacDrng {
    fn seed(&mut self, seed: &[u8], persbuf: &[u8]) -> Result<()> {
        self.seed_inner(seed, persbuf)
    }

    fn generate(&mut self, addtl: &[u8], out: &mut [u8]) -> Result<()> {
        self.generate_inner(addtl, out)
    }

    fn zero(&mut self) {
        self.key.zeroize();
        self.seeded = false;
    }
}

impl RngCore for KmacDrng {
    fn next_u32(&mut self) -> u32 {
        let mut b = [0u8; 4];
        self.fill_bytes(&mut b);
        u32::from_le_bytes(b)
    }

    fn next_u64(&mut self) -> u64 {
        let mut b = [0u8; 8];
        self.fill_bytes(&mut b);
        u64::from_le_bytes(b)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        // Infallible after seeding; an unseeded instance yields zeros,
        // which try_fill_bytes surfaces as an error instead.
        let _ = self.generate_inner(&[], dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> core::result::Result<(), RandError> {
        self.generate_inner(&[], dest)
            .map_err(|_| RandError::new("KMAC-DRNG not seeded"))
    }
}

impl CryptoRng for KmacDrng {}

impl Zeroize for KmacDrng {
    fn zeroize(&mut self) {
        self.key.zeroize();
        self.seeded = false;
    }
}

// Known-answer power-on check (seed 000102030405060708, no
// personalization, 320-byte pull), plus key erasure across the generate.
fn kat_kmac_drng() -> bool {
    let seed: [u8; 9] = [0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
    let expected =
        hex::decode("bc70c5d6fec42823ab57925eb7d595ce2d983a47712f6d4f8229e85c11084832")
            .unwrap_or_default();

    #[cfg(feature = "fips")]
    {
        let mut d = KmacDrng::new_unchecked();
        let mut corrupted = seed;
        corrupted[0] ^= 0x01;
        if d.seed_inner(&corrupted, b"").is_err() {
            return false;
        }
        let mut out = [0u8; 32];
        if d.generate_inner(&[], &mut out).is_err() {
            return false;
        }
        if ct::consttime_compare(&out, &expected) == 0 {
            return false;
        }
    }

    let mut d = KmacDrng::new_unchecked();
    if d.seed_inner(&seed, b"").is_err() {
        return false;
    }
    let key_before = *d.key;
    let mut out = [0u8; 320];
    if d.generate_inner(&[], &mut out).is_err() {
        return false;
    }
    if ct::consttime_compare(&out[..32], &expected) != 0 {
        return false;
    }
    // The key that produced the output must be gone.
    ct::consttime_compare(&key_before, d.key.as_ref()) != 0
}

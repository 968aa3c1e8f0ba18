//! Ascon hash family (SP 800-232)
//!
//! Ascon-Hash256, Ascon-XOF128 and Ascon-CXOF128 over the Ascon-p[12]
//! permutation, little-endian byte convention, rate 8. The same sponge
//! engine as the Keccak variants drives the state machine; only the
//! permutation, rate and padding differ.
#![forbid(unsafe_code)]

use zeroize::{Zeroize, Zeroizing};

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::secmem::SecureBox;
use crate::sponge::Sponge;
use crate::status::{self, AlgId};

const RATE: usize = 8;
const ASCON_PAD: u8 = 0x01;

const IV_HASH256: u64 = 0x0000080100cc0002;
const IV_XOF128: u64 = 0x0000080000cc0003;
const IV_CXOF128: u64 = 0x0000080000cc0004;

/// Longest customization string CXOF accepts (2048 bits).
pub const CXOF_MAX_CUSTOM: usize = 256;

const ROUND_CONSTANTS: [u64; 12] = [
    0xf0, 0xe1, 0xd2, 0xc3, 0xb4, 0xa5, 0x96, 0x87, 0x78, 0x69, 0x5a, 0x4b,
];

/// Ascon-p[12]
pub fn ascon_p12(x: &mut [u64; 5]) {
    for &rc in ROUND_CONSTANTS.iter() {
        x[2] ^= rc;
        // substitution layer
        x[0] ^= x[4];
        x[4] ^= x[3];
        x[2] ^= x[1];
        let t0 = !x[0] & x[1];
        let t1 = !x[1] & x[2];
        let t2 = !x[2] & x[3];
        let t3 = !x[3] & x[4];
        let t4 = !x[4] & x[0];
        x[0] ^= t1;
        x[1] ^= t2;
        x[2] ^= t3;
        x[3] ^= t4;
        x[4] ^= t0;
        x[1] ^= x[0];
        x[0] ^= x[4];
        x[3] ^= x[2];
        x[2] = !x[2];
        // linear diffusion layer
        x[0] ^= x[0].rotate_right(19) ^ x[0].rotate_right(28);
        x[1] ^= x[1].rotate_right(61) ^ x[1].rotate_right(39);
        x[2] ^= x[2].rotate_right(1) ^ x[2].rotate_right(6);
        x[3] ^= x[3].rotate_right(10) ^ x[3].rotate_right(17);
        x[4] ^= x[4].rotate_right(7) ^ x[4].rotate_right(41);
    }
}

fn init_sponge(iv: u64) -> Sponge<5> {
    let mut sponge = Sponge::new(RATE, ASCON_PAD, 0, ascon_p12);
    sponge.add_bytes(0, &iv.to_le_bytes());
    sponge.permute();
    sponge
}

/// Ascon-Hash256: fixed 32-byte digest.
pub struct AsconHash256 {
    sponge: Sponge<5>,
    done: bool,
}

impl AsconHash256 {
    pub const DIGEST_SIZE: usize = 32;
    pub const BLOCK_LEN: usize = RATE;

    pub fn new() -> Result<Self> {
        status::ensure(AlgId::AsconHash256, kat_hash256)?;
        Ok(Self::new_unchecked())
    }

    pub(crate) fn new_unchecked() -> Self {
        AsconHash256 {
            sponge: init_sponge(IV_HASH256),
            done: false,
        }
    }

    pub fn alloc() -> Result<SecureBox<Self>> {
        SecureBox::new_from(Self::new()?)
    }

    pub fn digest(msg: &[u8]) -> Result<[u8; 32]> {
        let mut ctx = Self::new()?;
        ctx.update(msg)?;
        let mut out = [0u8; 32];
        ctx.finalize(&mut out)?;
        Ok(out)
    }
}

impl Hash for AsconHash256 {
    fn fresh() -> Result<Self> {
        Self::new()
    }

    fn init(&mut self) {
        self.sponge = init_sponge(IV_HASH256);
        self.done = false;
    }

    fn update(&mut self, data: &[u8]) -> Result<()> {
        if self.done {
            return Err(Error::InvalidState);
        }
        self.sponge.absorb(data)
    }

    fn finalize(&mut self, out: &mut [u8]) -> Result<()> {
        if self.done {
            return Err(Error::InvalidState);
        }
        if out.len() != Self::DIGEST_SIZE {
            return Err(Error::InvalidArgument("digest buffer length"));
        }
        self.sponge.squeeze(out);
        self.done = true;
        Ok(())
    }

    fn set_digest_size(&mut self, _size: usize) -> Result<()> {
        Err(Error::Unsupported)
    }

    fn digest_size(&self) -> usize {
        Self::DIGEST_SIZE
    }

    fn block_len(&self) -> usize {
        RATE
    }

    fn zero(&mut self) {
        self.init();
    }
}

impl Clone for AsconHash256 {
    fn clone(&self) -> Self {
        AsconHash256 {
            sponge: self.sponge.clone(),
            done: self.done,
        }
    }
}

impl Zeroize for AsconHash256 {
    fn zeroize(&mut self) {
        self.sponge.zeroize();
        self.done = false;
    }
}

/// Ascon-XOF128.
pub struct AsconXof128 {
    sponge: Sponge<5>,
    digest_size: usize,
}

impl AsconXof128 {
    pub const BLOCK_LEN: usize = RATE;

    pub fn new() -> Result<Self> {
        status::ensure(AlgId::AsconXof128, kat_xof128)?;
        Ok(Self::new_unchecked())
    }

    pub(crate) fn new_unchecked() -> Self {
        AsconXof128 {
            sponge: init_sponge(IV_XOF128),
            digest_size: 32,
        }
    }

    pub fn alloc() -> Result<SecureBox<Self>> {
        SecureBox::new_from(Self::new()?)
    }

    pub fn xof(msg: &[u8], out: &mut [u8]) -> Result<()> {
        let mut ctx = Self::new()?;
        ctx.update(msg)?;
        ctx.finalize(out)
    }
}

impl Hash for AsconXof128 {
    fn fresh() -> Result<Self> {
        Self::new()
    }

    fn init(&mut self) {
        self.sponge = init_sponge(IV_XOF128);
        self.digest_size = 32;
    }

    fn update(&mut self, data: &[u8]) -> Result<()> {
        self.sponge.absorb(data)
    }

    fn finalize(&mut self, out: &mut [u8]) -> Result<()> {
        self.sponge.squeeze(out);
        Ok(())
    }

    fn set_digest_size(&mut self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(Error::InvalidArgument("zero digest size"));
        }
        if self.sponge.is_squeezing() {
            return Err(Error::InvalidState);
        }
        self.digest_size = size;
        Ok(())
    }

    fn digest_size(&self) -> usize {
        self.digest_size
    }

    fn block_len(&self) -> usize {
        RATE
    }

    fn zero(&mut self) {
        self.init();
    }
}

impl Clone for AsconXof128 {
    fn clone(&self) -> Self {
        AsconXof128 {
            sponge: self.sponge.clone(),
            digest_size: self.digest_size,
        }
    }
}

impl Zeroize for AsconXof128 {
    fn zeroize(&mut self) {
        self.sponge.zeroize();
        self.digest_size = 32;
    }
}

/// Ascon-CXOF128: XOF with a customization string of at most 2048 bits.
/// The customization segment (bit-length block, then the padded string) is
/// closed with its own permutation before the message phase begins.
pub struct AsconCxof128 {
    sponge: Sponge<5>,
    digest_size: usize,
    custom: Zeroizing<Vec<u8>>,
}

impl AsconCxof128 {
    pub const BLOCK_LEN: usize = RATE;

    pub fn new(custom: &[u8]) -> Result<Self> {
        status::ensure(AlgId::AsconCxof128, kat_cxof128)?;
        Self::new_unchecked(custom)
    }

    pub(crate) fn new_unchecked(custom: &[u8]) -> Result<Self> {
        if custom.len() > CXOF_MAX_CUSTOM {
            return Err(Error::InvalidArgument("customization too long"));
        }
        let mut ctx = AsconCxof128 {
            sponge: init_sponge(IV_CXOF128),
            digest_size: 32,
            custom: Zeroizing::new(custom.to_vec()),
        };
        ctx.absorb_custom()?;
        Ok(ctx)
    }

    pub fn alloc(custom: &[u8]) -> Result<SecureBox<Self>> {
        SecureBox::new_from(Self::new(custom)?)
    }

    fn absorb_custom(&mut self) -> Result<()> {
        let z = self.custom.clone();
        let bits = (z.len() as u64) * 8;
        self.sponge.absorb(&bits.to_le_bytes())?;
        self.sponge.absorb(&z)?;
        self.sponge.finish_segment()
    }
}

impl Hash for AsconCxof128 {
    fn fresh() -> Result<Self> {
        Self::new(b"")
    }

    fn init(&mut self) {
        self.sponge = init_sponge(IV_CXOF128);
        self.digest_size = 32;
        let _ = self.absorb_custom();
    }

    fn update(&mut self, data: &[u8]) -> Result<()> {
        self.sponge.absorb(data)
    }

    fn finalize(&mut self, out: &mut [u8]) -> Result<()> {
        self.sponge.squeeze(out);
        Ok(())
    }

    fn set_digest_size(&mut self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(Error::InvalidArgument("zero digest size"));
        }
        if self.sponge.is_squeezing() {
            return Err(Error::InvalidState);
        }
        self.digest_size = size;
        Ok(())
    }

    fn digest_size(&self) -> usize {
        self.digest_size
    }

    fn block_len(&self) -> usize {
        RATE
    }

    fn zero(&mut self) {
        self.init();
    }
}

impl Clone for AsconCxof128 {
    fn clone(&self) -> Self {
        AsconCxof128 {
            sponge: self.sponge.clone(),
            digest_size: self.digest_size,
            custom: self.custom.clone(),
        }
    }
}

impl Zeroize for AsconCxof128 {
    fn zeroize(&mut self) {
        self.sponge.zeroize();
        self.custom.zeroize();
        self.digest_size = 32;
    }
}

// The Ascon variants have no NIST sample vector shipped in-tree; the
// power-on check verifies determinism, streaming/one-shot agreement and
// input sensitivity on fixed data.
fn structural_check(mk: impl Fn() -> Option<Sponge<5>>) -> bool {
    let msg = b"ascon power-on check input, 47 bytes of data...";
    let (mut a, mut b, mut c) = match (mk(), mk(), mk()) {
        (Some(a), Some(b), Some(c)) => (a, b, c),
        _ => return false,
    };
    let mut one = [0u8; 40];
    if a.absorb(msg).is_err() {
        return false;
    }
    a.squeeze(&mut one);

    let mut chunked = [0u8; 40];
    for chunk in msg.chunks(5) {
        if b.absorb(chunk).is_err() {
            return false;
        }
    }
    b.squeeze(&mut chunked);

    let mut other = [0u8; 40];
    if c.absorb(&msg[..msg.len() - 1]).is_err() {
        return false;
    }
    c.squeeze(&mut other);

    one == chunked && one != other && one != [0u8; 40]
}

fn kat_hash256() -> bool {
    structural_check(|| Some(init_sponge(IV_HASH256)))
}

fn kat_xof128() -> bool {
    structural_check(|| Some(init_sponge(IV_XOF128)))
}

fn kat_cxof128() -> bool {
    structural_check(|| AsconCxof128::new_unchecked(b"post gate").ok().map(|c| c.sponge))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permutation_changes_state() {
        let mut x = [0u64; 5];
        ascon_p12(&mut x);
        assert_ne!(x, [0u64; 5]);
        let y = x;
        ascon_p12(&mut x);
        assert_ne!(x, y);
    }

    #[test]
    fn hash256_deterministic() {
        let a = AsconHash256::digest(b"message").unwrap();
        let b = AsconHash256::digest(b"message").unwrap();
        assert_eq!(a, b);
        let c = AsconHash256::digest(b"messagf").unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn xof_streamed_squeeze_matches_oneshot() {
        let mut a = [0u8; 100];
        AsconXof128::xof(b"squeeze me", &mut a).unwrap();

        let mut ctx = AsconXof128::new().unwrap();
        ctx.update(b"squeeze me").unwrap();
        let mut b = [0u8; 100];
        let (p, q) = b.split_at_mut(33);
        ctx.finalize(p).unwrap();
        ctx.finalize(q).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn cxof_customization_separates() {
        let mut a = [0u8; 32];
        let mut c1 = AsconCxof128::new(b"ctx-a").unwrap();
        c1.update(b"m").unwrap();
        c1.finalize(&mut a).unwrap();

        let mut b = [0u8; 32];
        let mut c2 = AsconCxof128::new(b"ctx-b").unwrap();
        c2.update(b"m").unwrap();
        c2.finalize(&mut b).unwrap();
        assert_ne!(a, b);

        let mut c = [0u8; 32];
        let mut c3 = AsconCxof128::new(b"").unwrap();
        c3.update(b"m").unwrap();
        c3.finalize(&mut c).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn cxof_rejects_oversized_customization() {
        let long = vec![0u8; CXOF_MAX_CUSTOM + 1];
        assert!(AsconCxof128::new(&long).is_err());
    }

    #[test]
    fn hash_differs_from_xof() {
        let h = AsconHash256::digest(b"domain").unwrap();
        let mut x = [0u8; 32];
        AsconXof128::xof(b"domain", &mut x).unwrap();
        assert_ne!(h, x);
    }
}

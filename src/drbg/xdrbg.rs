//! XDRBG over SHAKE
//!
//! `V <- XOF(V || seed || alpha || encode(n, |alpha|))` with `n` = 0 on the
//! first seed, 1 on reseed, 2 on generate; the encoding byte is shared with
//! the KMAC-DRNG. Each generate squeezes the replacement state first, the
//! output second.
#![forbid(unsafe_code)]

use rand_core::{CryptoRng, Error as RandError, RngCore};
use zeroize::{Zeroize, Zeroizing};

use crate::ct;
use crate::drbg::{clamp_alpha, encode_byte, Drng};
use crate::error::{Error, Result};
use crate::hash::sha3::{Shake128, Shake256};
use crate::hash::Hash;
use crate::secmem::SecureBox;
use crate::status::{self, AlgId};

/// Variant set; the number is the classical security target in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XdrbgKind {
    X128,
    X256,
    X512,
}

impl XdrbgKind {
    /// State (V) size in bytes: twice the security parameter.
    pub fn state_len(self) -> usize {
        match self {
            XdrbgKind::X128 => 32,
            XdrbgKind::X256 => 64,
            XdrbgKind::X512 => 128,
        }
    }

    fn xof_rate(self) -> usize {
        match self {
            XdrbgKind::X128 => 168,
            _ => 136,
        }
    }
}

const V_MAX: usize = 128;

/// One generate call squeezes at most 100 rate blocks per state ratchet.
fn max_chunk(kind: XdrbgKind) -> usize {
    kind.xof_rate() * 100
}

pub struct Xdrbg {
    kind: XdrbgKind,
    v: Zeroizing<[u8; V_MAX]>,
    seeded: bool,
}

enum Xof {
    S128(Shake128),
    S256(Shake256),
}

impl Xof {
    fn fresh(kind: XdrbgKind) -> Result<Self> {
        match kind {
            XdrbgKind::X128 => Ok(Xof::S128(Shake128::new_unchecked()?)),
            _ => Ok(Xof::S256(Shake256::new_unchecked()?)),
        }
    }

    fn update(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Xof::S128(x) => x.update(data),
            Xof::S256(x) => x.update(data),
        }
    }

    fn squeeze(&mut self, out: &mut [u8]) -> Result<()> {
        match self {
            Xof::S128(x) => x.finalize(out),
            Xof::S256(x) => x.finalize(out),
        }
    }

    fn zero(&mut self) {
        match self {
            Xof::S128(x) => x.zero(),
            Xof::S256(x) => x.zero(),
        }
    }
}

impl Xdrbg {
    pub fn new(kind: XdrbgKind) -> Result<Self> {
        status::ensure(AlgId::Xdrbg, kat_xdrbg)?;
        Ok(Self::new_unchecked(kind))
    }

    pub(crate) fn new_unchecked(kind: XdrbgKind) -> Self {
        Xdrbg {
            kind,
            v: Zeroizing::new([0u8; V_MAX]),
            seeded: false,
        }
    }

    pub fn alloc(kind: XdrbgKind) -> Result<SecureBox<Self>> {
        SecureBox::new_from(Self::new(kind)?)
    }

    pub fn kind(&self) -> XdrbgKind {
        self.kind
    }

    fn seed_inner(&mut self, seed: &[u8], persbuf: &[u8]) -> Result<()> {
        ct::poison(seed);
        let vlen = self.kind.state_len();
        let alpha = clamp_alpha(persbuf);
        let n = if self.seeded { 1 } else { 0 };
        let mut xof = Xof::fresh(self.kind)?;
        if self.seeded {
            xof.update(&self.v[..vlen])?;
        }
        xof.update(seed)?;
        xof.update(alpha)?;
        xof.update(&[encode_byte(n, alpha.len())])?;
        let mut next = Zeroizing::new([0u8; V_MAX]);
        xof.squeeze(&mut next[..vlen])?;
        self.v[..vlen].copy_from_slice(&next[..vlen]);
        xof.zero();
        self.seeded = true;
        Ok(())
    }

    fn generate_inner(&mut self, addtl: &[u8], out: &mut [u8]) -> Result<()> {
        if !self.seeded {
            return Err(Error::InvalidState);
        }
        let vlen = self.kind.state_len();
        let alpha = clamp_alpha(addtl);
        for chunk in out.chunks_mut(max_chunk(self.kind)) {
            let mut xof = Xof::fresh(self.kind)?;
            xof.update(&self.v[..vlen])?;
            xof.update(alpha)?;
            xof.update(&[encode_byte(2, alpha.len())])?;
            // V(N+1) replaces the state before the payload is squeezed.
            let mut next = Zeroizing::new([0u8; V_MAX]);
            xof.squeeze(&mut next[..vlen])?;
            self.v[..vlen].copy_from_slice(&next[..vlen]);
            xof.squeeze(chunk)?;
            xof.zero();
        }
        ct::unpoison(out);
        Ok(())
    }
}

impl Drng for Xdrbg {
    fn seed(&mut self, seed: &[u8], persbuf: &[u8]) -> Result<()> {
        self.seed_inner(seed, persbuf)
    }

    fn generate(&mut self, addtl: &[u8], out: &mut [u8]) -> Result<()> {
        self.generate_inner(addtl, out)
    }

    fn zero(&mut self) {
        self.v.zeroize();
        self.seeded = false;
    }
}

impl RngCore for Xdrbg {
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
        let _ = self.generate_inner(&[], dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> core::result::Result<(), RandError> {
        self.generate_inner(&[], dest)
            .map_err(|_| RandError::new("XDRBG not seeded"))
    }
}

impl CryptoRng for Xdrbg {}

impl Zeroize for Xdrbg {
    fn zeroize(&mut self) {
        self.v.zeroize();
        self.seeded = false;
    }
}

fn kat_xdrbg() -> bool {
    for kind in [XdrbgKind::X128, XdrbgKind::X256, XdrbgKind::X512] {
        let mut a = Xdrbg::new_unchecked(kind);
        let mut b = Xdrbg::new_unchecked(kind);
        if a.seed_inner(b"xdrbg post seed", b"").is_err()
            || b.seed_inner(b"xdrbg post seed", b"").is_err()
        {
            return false;
        }
        let v_before = *a.v;
        let mut out_a = [0u8; 64];
        let mut out_b = [0u8; 64];
        if a.generate_inner(&[], &mut out_a).is_err() || b.generate_inner(&[], &mut out_b).is_err()
        {
            return false;
        }
        if out_a != out_b || out_a == [0u8; 64] {
            return false;
        }
        if ct::consttime_compare(&v_before, a.v.as_ref()) == 0 {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_produce_distinct_streams() {
        let seed = b"same seed everywhere";
        let mut outs = Vec::new();
        for kind in [XdrbgKind::X128, XdrbgKind::X256, XdrbgKind::X512] {
            let mut d = Xdrbg::new(kind).unwrap();
            d.seed(seed, b"").unwrap();
            let mut out = [0u8; 48];
            d.generate(&[], &mut out).unwrap();
            outs.push(out);
        }
        assert_ne!(outs[0], outs[1]);
        assert_ne!(outs[1], outs[2]);
        assert_ne!(outs[0], outs[2]);
    }

    #[test]
    fn deterministic_per_variant() {
        let mut a = Xdrbg::new(XdrbgKind::X256).unwrap();
        let mut b = Xdrbg::new(XdrbgKind::X256).unwrap();
        a.seed(b"s", b"p").unwrap();
        b.seed(b"s", b"p").unwrap();
        let mut x = [0u8; 200];
        let mut y = [0u8; 200];
        a.generate(b"addtl", &mut x).unwrap();
        b.generate(b"addtl", &mut y).unwrap();
        assert_eq!(x, y);
    }

    #[test]
    fn reseed_folds_old_state() {
        // Two generators with identical reseed material but different
        // initial seeds must stay apart: the reseed chains V.
        let mut a = Xdrbg::new(XdrbgKind::X256).unwrap();
        let mut b = Xdrbg::new(XdrbgKind::X256).unwrap();
        a.seed(b"first-a", b"").unwrap();
        b.seed(b"first-b", b"").unwrap();
        a.seed(b"common reseed", b"").unwrap();
        b.seed(b"common reseed", b"").unwrap();
        let mut x = [0u8; 32];
        let mut y = [0u8; 32];
        a.generate(&[], &mut x).unwrap();
        b.generate(&[], &mut y).unwrap();
        assert_ne!(x, y);
    }

    #[test]
    fn unseeded_generate_rejected() {
        let mut d = Xdrbg::new(XdrbgKind::X128).unwrap();
        let mut out = [0u8; 8];
        assert_eq!(d.generate(&[], &mut out).unwrap_err(), Error::InvalidState);
    }

    #[test]
    fn zero_resets_to_unseeded() {
        let mut d = Xdrbg::new(XdrbgKind::X512).unwrap();
        d.seed(b"s", b"").unwrap();
        Drng::zero(&mut d);
        let mut out = [0u8; 8];
        assert_eq!(d.generate(&[], &mut out).unwrap_err(), Error::InvalidState);
    }
}

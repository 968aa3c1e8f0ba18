//! cSHAKE-128/256 (SP 800-185) and the string-encoding helpers shared with
//! KMAC
//!
//! The function-name/customization prefix `bytepad(encode_string(N) ||
//! encode_string(S), rate)` is written straight into the sponge before any
//! message byte. With `N = S = ""` the construction reduces exactly to
//! SHAKE, padding byte included.
#![forbid(unsafe_code)]

use zeroize::{Zeroize, Zeroizing};

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::keccak;
use crate::secmem::SecureBox;
use crate::sponge::Sponge;
use crate::status::{self, AlgId};

const CSHAKE_PAD: u8 = 0x04;
const SHAKE_PAD: u8 = 0x1f;
const FINAL_BIT: u8 = 0x80;

/// SP 800-185 left_encode: minimal big-endian byte string of `v`, prefixed
/// by its byte count.
pub(crate) fn left_encode(buf: &mut [u8; 9], v: u64) -> &[u8] {
    let n = (((64 - v.leading_zeros()) + 7) / 8).max(1) as usize;
    buf[0] = n as u8;
    for i in 0..n {
        buf[1 + i] = (v >> (8 * (n - 1 - i))) as u8;
    }
    &buf[..n + 1]
}

/// SP 800-185 right_encode: minimal big-endian byte string of `v`, suffixed
/// by its byte count.
pub(crate) fn right_encode(buf: &mut [u8; 9], v: u64) -> &[u8] {
    let n = (((64 - v.leading_zeros()) + 7) / 8).max(1) as usize;
    for i in 0..n {
        buf[i] = (v >> (8 * (n - 1 - i))) as u8;
    }
    buf[n] = n as u8;
    &buf[..n + 1]
}

/// Absorb `bytepad(encode_string(s0) || encode_string(s1) || ..., rate)`.
/// The encoded run always ends on a rate boundary, so the message phase
/// starts on a fresh block.
pub(crate) fn bytepad_encoded_strings(
    sponge: &mut Sponge<25>,
    rate: usize,
    strings: &[&[u8]],
) -> Result<()> {
    let mut b9 = [0u8; 9];
    sponge.absorb(left_encode(&mut b9, rate as u64))?;
    for s in strings {
        sponge.absorb(left_encode(&mut b9, (s.len() as u64) * 8))?;
        sponge.absorb(s)?;
    }
    let fill = (rate - (sponge.msg_len() as usize % rate)) % rate;
    const ZEROS: [u8; 200] = [0u8; 200];
    sponge.absorb(&ZEROS[..fill])
}

macro_rules! cshake_variant {
    ($(#[$doc:meta])* $name:ident, $rate:expr, $default:expr, $id:expr, $kat:ident) => {
        $(#[$doc])*
        pub struct $name {
            sponge: Sponge<25>,
            digest_size: usize,
            n: Zeroizing<Vec<u8>>,
            s: Zeroizing<Vec<u8>>,
        }

        impl $name {
            pub const BLOCK_LEN: usize = $rate;

            /// `n` is the standard function-name string, `s` the caller's
            /// customization. Both empty reduces to plain SHAKE.
            pub fn new(n: &[u8], s: &[u8]) -> Result<Self> {
                status::ensure($id, $kat)?;
                Self::new_unchecked(n, s)
            }

            pub(crate) fn new_unchecked(n: &[u8], s: &[u8]) -> Result<Self> {
                let imp = keccak::selected()?;
                let padding = if n.is_empty() && s.is_empty() {
                    SHAKE_PAD
                } else {
                    CSHAKE_PAD
                };
                let mut ctx = $name {
                    sponge: Sponge::new($rate, padding, FINAL_BIT, imp.table),
                    digest_size: $default,
                    n: Zeroizing::new(n.to_vec()),
                    s: Zeroizing::new(s.to_vec()),
                };
                ctx.absorb_prefix()?;
                Ok(ctx)
            }

            pub fn alloc(n: &[u8], s: &[u8]) -> Result<SecureBox<Self>> {
                SecureBox::new_from(Self::new(n, s)?)
            }

            fn absorb_prefix(&mut self) -> Result<()> {
                if self.n.is_empty() && self.s.is_empty() {
                    return Ok(());
                }
                let (n, s) = (self.n.clone(), self.s.clone());
                bytepad_encoded_strings(&mut self.sponge, $rate, &[&n[..], &s[..]])
            }

            /// Direct state access for the keyed constructions built on top.
            pub(crate) fn sponge_mut(&mut self) -> &mut Sponge<25> {
                &mut self.sponge
            }
        }

        impl Hash for $name {
            fn fresh() -> Result<Self> {
                Self::new(b"", b"")
            }

            fn init(&mut self) {
                self.sponge.reinit();
                self.digest_size = $default;
                // Prefix re-absorption cannot fail once construction
                // succeeded; the strings are unchanged.
                let _ = self.absorb_prefix();
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
                $rate
            }

            fn zero(&mut self) {
                self.sponge.zero();
                self.digest_size = $default;
                let _ = self.absorb_prefix();
            }
        }

        impl Clone for $name {
            fn clone(&self) -> Self {
                $name {
                    sponge: self.sponge.clone(),
                    digest_size: self.digest_size,
                    n: self.n.clone(),
                    s: self.s.clone(),
                }
            }
        }

        impl Zeroize for $name {
            fn zeroize(&mut self) {
                self.sponge.zeroize();
                self.n.zeroize();
                self.s.zeroize();
                self.digest_size = $default;
            }
        }
    };
}

cshake_variant!(
    /// cSHAKE-128
    CShake128,
    168,
    32,
    AlgId::CShake128,
    kat_cshake128
);

cshake_variant!(
    /// cSHAKE-256
    CShake256,
    136,
    64,
    AlgId::CShake256,
    kat_cshake256
);

// SP 800-185 cSHAKE sample: X = 00010203, N = "", S = "Email Signature"
fn kat_cshake128() -> bool {
    let expected =
        hex::decode("c1c36925b6409a04f1b504fcbca9d82b4017277cb5ed2b2065fc1d3814d5aaf5")
            .unwrap_or_default();
    status::kat_digest(&[0x00, 0x01, 0x02, 0x03], &expected, |inp, out| {
        if let Ok(mut ctx) = CShake128::new_unchecked(b"", b"Email Signature") {
            if ctx.update(inp).is_ok() {
                let _ = ctx.finalize(out);
            }
        }
    })
}

// With N = S = "" the construction must degrade to SHAKE-256 exactly.
fn kat_cshake256() -> bool {
    let expected =
        hex::decode("46b9dd2b0ba88d13233b3feb743eeb243fcd52ea62b81b82b50c27646ed5762f")
            .unwrap_or_default();
    status::kat_digest(b"", &expected, |inp, out| {
        if let Ok(mut ctx) = CShake256::new_unchecked(b"", b"") {
            if ctx.update(inp).is_ok() {
                let _ = ctx.finalize(out);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_encode_zero_and_small() {
        let mut b = [0u8; 9];
        assert_eq!(left_encode(&mut b, 0), &[1, 0]);
        let mut b = [0u8; 9];
        assert_eq!(left_encode(&mut b, 168), &[1, 168]);
        let mut b = [0u8; 9];
        assert_eq!(left_encode(&mut b, 4096), &[2, 0x10, 0x00]);
    }

    #[test]
    fn right_encode_zero_and_small() {
        let mut b = [0u8; 9];
        assert_eq!(right_encode(&mut b, 0), &[0, 1]);
        let mut b = [0u8; 9];
        assert_eq!(right_encode(&mut b, 256), &[0x01, 0x00, 2]);
    }

    #[test]
    fn empty_strings_reduce_to_shake() {
        use crate::hash::sha3::Shake256;
        let msg = b"reduction check";
        let mut a = [0u8; 48];
        let mut c = CShake256::new(b"", b"").unwrap();
        c.update(msg).unwrap();
        c.finalize(&mut a).unwrap();

        let mut b = [0u8; 48];
        Shake256::xof(msg, &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn customization_separates_domains() {
        let mut a = [0u8; 32];
        let mut c1 = CShake256::new(b"", b"app-a").unwrap();
        c1.update(b"msg").unwrap();
        c1.finalize(&mut a).unwrap();

        let mut b = [0u8; 32];
        let mut c2 = CShake256::new(b"", b"app-b").unwrap();
        c2.update(b"msg").unwrap();
        c2.finalize(&mut b).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn sample_vector_cshake128() {
        let mut out = [0u8; 32];
        let mut c = CShake128::new(b"", b"Email Signature").unwrap();
        c.update(&[0x00, 0x01, 0x02, 0x03]).unwrap();
        c.finalize(&mut out).unwrap();
        assert_eq!(
            hex::encode(out),
            "c1c36925b6409a04f1b504fcbca9d82b4017277cb5ed2b2065fc1d3814d5aaf5"
        );
    }
}

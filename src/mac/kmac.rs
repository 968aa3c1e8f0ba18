//! KMAC-128/256 (SP 800-185)
//!
//! cSHAKE with `N = "KMAC"` and the key absorbed as
//! `bytepad(encode_string(K), rate)` before the message. `finalize` is MAC
//! mode (`right_encode(L)`); `finalize_xof` is XOF mode (`right_encode(0)`)
//! with a streamable squeeze, the mode the DRBG and the KMAC AEAD use.
#![forbid(unsafe_code)]

use zeroize::Zeroize;

use crate::ct;
use crate::error::{Error, Result};
use crate::hash::cshake::{bytepad_encoded_strings, right_encode, CShake128, CShake256};
use crate::hash::Hash;
use crate::secmem::SecureBox;
use crate::status::{self, AlgId};

macro_rules! kmac_variant {
    ($(#[$doc:meta])* $name:ident, $cshake:ident, $rate:expr, $id:expr, $kat:ident) => {
        $(#[$doc])*
        pub struct $name {
            cshake: $cshake,
            xof_started: bool,
        }

        impl $name {
            pub const BLOCK_LEN: usize = $rate;

            /// An empty key is permitted (the DRBG's first seed is keyed by
            /// the empty string); `custom` is the caller's domain label.
            pub fn new(key: &[u8], custom: &[u8]) -> Result<Self> {
                status::ensure($id, $kat)?;
                Self::new_unchecked(key, custom)
            }

            pub(crate) fn new_unchecked(key: &[u8], custom: &[u8]) -> Result<Self> {
                ct::poison(key);
                let mut cshake = $cshake::new_unchecked(b"KMAC", custom)?;
                bytepad_encoded_strings(cshake.sponge_mut(), $rate, &[key])?;
                Ok($name {
                    cshake,
                    xof_started: false,
                })
            }

            pub fn alloc(key: &[u8], custom: &[u8]) -> Result<SecureBox<Self>> {
                SecureBox::new_from(Self::new(key, custom)?)
            }

            pub fn update(&mut self, msg: &[u8]) -> Result<()> {
                if self.xof_started {
                    return Err(Error::InvalidState);
                }
                self.cshake.update(msg)
            }

            /// MAC mode: binds the output length into the input encoding
            /// and squeezes exactly `out.len()` bytes. Single call.
            pub fn finalize(&mut self, out: &mut [u8]) -> Result<()> {
                if self.xof_started {
                    return Err(Error::InvalidState);
                }
                if out.is_empty() {
                    return Err(Error::InvalidArgument("zero-length tag"));
                }
                let mut b9 = [0u8; 9];
                self.cshake
                    .update(right_encode(&mut b9, (out.len() as u64) * 8))?;
                self.cshake.finalize(out)?;
                self.xof_started = true;
                ct::unpoison(out);
                Ok(())
            }

            /// XOF mode: the first call closes the input with
            /// `right_encode(0)`; this and every later call continue the
            /// output stream.
            pub fn finalize_xof(&mut self, out: &mut [u8]) -> Result<()> {
                if !self.xof_started {
                    let mut b9 = [0u8; 9];
                    self.cshake.update(right_encode(&mut b9, 0))?;
                    self.xof_started = true;
                }
                self.cshake.finalize(out)
            }

            /// One-shot MAC.
            pub fn mac(key: &[u8], custom: &[u8], msg: &[u8], out: &mut [u8]) -> Result<()> {
                let mut ctx = Self::new(key, custom)?;
                ctx.update(msg)?;
                ctx.finalize(out)
            }

            /// One-shot XOF output.
            pub fn xof(key: &[u8], custom: &[u8], msg: &[u8], out: &mut [u8]) -> Result<()> {
                let mut ctx = Self::new(key, custom)?;
                ctx.update(msg)?;
                ctx.finalize_xof(out)
            }

            /// Wipe the keyed state; the instance needs reconstruction
            /// before reuse.
            pub fn zero(&mut self) {
                self.cshake.zeroize();
                self.xof_started = false;
            }
        }

        impl Zeroize for $name {
            fn zeroize(&mut self) {
                self.cshake.zeroize();
                self.xof_started = false;
            }
        }
    };
}

kmac_variant!(
    /// KMAC-128
    Kmac128,
    CShake128,
    168,
    AlgId::Kmac128,
    kat_kmac128
);

kmac_variant!(
    /// KMAC-256
    Kmac256,
    CShake256,
    136,
    AlgId::Kmac256,
    kat_kmac256
);

// SP 800-185 KMAC sample: key = 0x40..0x5f, X = 00010203, L = 256, S = ""
fn kat_kmac128() -> bool {
    let mut key = [0u8; 32];
    for (i, k) in key.iter_mut().enumerate() {
        *k = 0x40 + i as u8;
    }
    let expected =
        hex::decode("e5780b0d3ea6f7d3a429c5706aa43a00fadbd7d49628839e3187243f456ee14e")
            .unwrap_or_default();
    status::kat_digest(&[0x00, 0x01, 0x02, 0x03], &expected, |inp, out| {
        if let Ok(mut ctx) = Kmac128::new_unchecked(&key, b"") {
            if ctx.update(inp).is_ok() {
                let _ = ctx.finalize(out);
            }
        }
    })
}

// No sample vector kept in-tree for the 256 variant; check determinism,
// key/customization separation and MAC/XOF mode divergence.
fn kat_kmac256() -> bool {
    let run = |key: &[u8], custom: &[u8], xof: bool| -> Option<[u8; 32]> {
        let mut ctx = Kmac256::new_unchecked(key, custom).ok()?;
        ctx.update(b"power-on").ok()?;
        let mut out = [0u8; 32];
        if xof {
            ctx.finalize_xof(&mut out).ok()?;
        } else {
            ctx.finalize(&mut out).ok()?;
        }
        Some(out)
    };
    let (a, b, c, d, e) = match (
        run(b"key-1", b"ctx", false),
        run(b"key-1", b"ctx", false),
        run(b"key-2", b"ctx", false),
        run(b"key-1", b"other", false),
        run(b"key-1", b"ctx", true),
    ) {
        (Some(a), Some(b), Some(c), Some(d), Some(e)) => (a, b, c, d, e),
        _ => return false,
    };
    a == b && a != c && a != d && a != e && a != [0u8; 32]
}

//! SHA-3 and SHAKE (FIPS-202)
//!
//! All variants ride the shared sponge engine; each `init` pins the rate,
//! padding byte and digest policy. Output is byte-exact per FIPS-202.
#![forbid(unsafe_code)]

use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::keccak;
use crate::secmem::SecureBox;
use crate::sponge::Sponge;
use crate::status::{self, AlgId};

const SHA3_PAD: u8 = 0x06;
const SHAKE_PAD: u8 = 0x1f;
const FINAL_BIT: u8 = 0x80;

fn vec_of(hex_str: &str) -> Vec<u8> {
    hex::decode(hex_str).unwrap_or_default()
}

macro_rules! sha3_fixed {
    ($(#[$doc:meta])* $name:ident, $rate:expr, $digest:expr, $id:expr, $kat:ident, $vector:expr) => {
        $(#[$doc])*
        pub struct $name {
            sponge: Sponge<25>,
            done: bool,
        }

        impl $name {
            pub const DIGEST_SIZE: usize = $digest;
            pub const BLOCK_LEN: usize = $rate;

            pub fn new() -> Result<Self> {
                status::ensure($id, $kat)?;
                Self::new_unchecked()
            }

            pub(crate) fn new_unchecked() -> Result<Self> {
                let imp = keccak::selected()?;
                Ok($name {
                    sponge: Sponge::new($rate, SHA3_PAD, FINAL_BIT, imp.table),
                    done: false,
                })
            }

            /// Heap construction on provider-backed, wipe-on-drop storage.
            pub fn alloc() -> Result<SecureBox<Self>> {
                SecureBox::new_from(Self::new()?)
            }

            /// One-shot digest.
            pub fn digest(msg: &[u8]) -> Result<[u8; $digest]> {
                let mut ctx = Self::new()?;
                ctx.update(msg)?;
                let mut out = [0u8; $digest];
                ctx.finalize(&mut out)?;
                Ok(out)
            }
        }

        impl Hash for $name {
            fn fresh() -> Result<Self> {
                Self::new()
            }

            fn init(&mut self) {
                self.sponge.reinit();
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
                if out.len() != $digest {
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
                $digest
            }

            fn block_len(&self) -> usize {
                $rate
            }

            fn zero(&mut self) {
                self.sponge.zero();
                self.done = false;
            }
        }

        impl Clone for $name {
            fn clone(&self) -> Self {
                $name {
                    sponge: self.sponge.clone(),
                    done: self.done,
                }
            }
        }

        impl Zeroize for $name {
            fn zeroize(&mut self) {
                self.sponge.zeroize();
                self.done = false;
            }
        }

        fn $kat() -> bool {
            let expected = vec_of($vector);
            status::kat_digest(b"abc", &expected, |inp, out| {
                if let Ok(mut ctx) = $name::new_unchecked() {
                    if ctx.update(inp).is_ok() {
                        let _ = ctx.finalize(out);
                    }
                }
            })
        }
    };
}

sha3_fixed!(
    /// SHA3-224
    Sha3_224,
    144,
    28,
    AlgId::Sha3_224,
    kat_sha3_224,
    "e642824c3f8cf24ad09234ee7d3c766fc9a3a5168d0c94ad73b46fdf"
);

sha3_fixed!(
    /// SHA3-256
    Sha3_256,
    136,
    32,
    AlgId::Sha3_256,
    kat_sha3_256,
    "3a985da74fe225b2045c172d6bd390bd855f086e3e9d525b46bfe24511431532"
);

sha3_fixed!(
    /// SHA3-384
    Sha3_384,
    104,
    48,
    AlgId::Sha3_384,
    kat_sha3_384,
    "ec01498288516fc926459f58e2c6ad8df9b473cb0fc08c2596da7cf0e49be4b298d88cea927ac7f539f1edf228376d25"
);

sha3_fixed!(
    /// SHA3-512
    Sha3_512,
    72,
    64,
    AlgId::Sha3_512,
    kat_sha3_512,
    "b751850b1a57168a5693cd924b6b096e08f621827444f70d884f5d0240d2712e10e116e9192af3c91a7ec57647e3934057340b4cf408d5a56592f8274eec53f0"
);

macro_rules! shake_xof {
    ($(#[$doc:meta])* $name:ident, $rate:expr, $default:expr, $id:expr, $kat:ident, $vector:expr) => {
        $(#[$doc])*
        pub struct $name {
            sponge: Sponge<25>,
            digest_size: usize,
        }

        impl $name {
            pub const BLOCK_LEN: usize = $rate;

            pub fn new() -> Result<Self> {
                status::ensure($id, $kat)?;
                Self::new_unchecked()
            }

            pub(crate) fn new_unchecked() -> Result<Self> {
                let imp = keccak::selected()?;
                Ok($name {
                    sponge: Sponge::new($rate, SHAKE_PAD, FINAL_BIT, imp.table),
                    digest_size: $default,
                })
            }

            /// Bind an explicit permutation implementation; back-end
            /// equivalence tests run every table entry through here.
            pub fn with_impl(imp: &'static keccak::KeccakImpl) -> Self {
                $name {
                    sponge: Sponge::new($rate, SHAKE_PAD, FINAL_BIT, imp.table),
                    digest_size: $default,
                }
            }

            pub fn alloc() -> Result<SecureBox<Self>> {
                SecureBox::new_from(Self::new()?)
            }

            /// One-shot squeeze of `out.len()` bytes.
            pub fn xof(msg: &[u8], out: &mut [u8]) -> Result<()> {
                let mut ctx = Self::new()?;
                ctx.update(msg)?;
                ctx.finalize(out)
            }
        }

        impl Hash for $name {
            fn fresh() -> Result<Self> {
                Self::new()
            }

            fn init(&mut self) {
                self.sponge.reinit();
                self.digest_size = $default;
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
            }
        }

        impl Clone for $name {
            fn clone(&self) -> Self {
                $name {
                    sponge: self.sponge.clone(),
                    digest_size: self.digest_size,
                }
            }
        }

        impl Zeroize for $name {
            fn zeroize(&mut self) {
                self.sponge.zeroize();
                self.digest_size = $default;
            }
        }

        fn $kat() -> bool {
            let expected = vec_of($vector);
            status::kat_digest(b"", &expected, |inp, out| {
                if let Ok(mut ctx) = $name::new_unchecked() {
                    if ctx.update(inp).is_ok() {
                        let _ = ctx.finalize(out);
                    }
                }
            })
        }
    };
}

shake_xof!(
    /// SHAKE-128
    Shake128,
    168,
    32,
    AlgId::Shake128,
    kat_shake128,
    "7f9c2ba4e88f827d616045507605853ed73b8093f6efbc88eb1a6eacfa66ef26"
);

shake_xof!(
    /// SHAKE-256
    Shake256,
    136,
    64,
    AlgId::Shake256,
    kat_shake256,
    "46b9dd2b0ba88d13233b3feb743eeb243fcd52ea62b81b82b50c27646ed5762f"
);

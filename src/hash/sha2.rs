//! SHA-2 behind the Hash capability
//!
//! The compression function comes from the `sha2` crate; these wrappers
//! give it the same capability surface as the sponge variants so HMAC and
//! the hash-AEAD can run over either family.
#![forbid(unsafe_code)]

use sha2::Digest;
use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::secmem::SecureBox;
use crate::status::{self, AlgId};

macro_rules! sha2_variant {
    ($(#[$doc:meta])* $name:ident, $inner:ty, $digest:expr, $block:expr, $id:expr, $kat:ident, $vector:expr, $feature:literal) => {
        #[cfg(feature = $feature)]
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name {
            inner: $inner,
            done: bool,
        }

        #[cfg(feature = $feature)]
        impl $name {
            pub const DIGEST_SIZE: usize = $digest;
            pub const BLOCK_LEN: usize = $block;

            pub fn new() -> Result<Self> {
                status::ensure($id, $kat)?;
                Ok(Self::new_unchecked())
            }

            pub(crate) fn new_unchecked() -> Self {
                $name {
                    inner: <$inner>::new(),
                    done: false,
                }
            }

            pub fn alloc() -> Result<SecureBox<Self>> {
                SecureBox::new_from(Self::new()?)
            }

            pub fn digest(msg: &[u8]) -> Result<[u8; $digest]> {
                let mut ctx = Self::new()?;
                ctx.update(msg)?;
                let mut out = [0u8; $digest];
                ctx.finalize(&mut out)?;
                Ok(out)
            }
        }

        #[cfg(feature = $feature)]
        impl Hash for $name {
            fn fresh() -> Result<Self> {
                Self::new()
            }

            fn init(&mut self) {
                self.inner = <$inner>::new();
                self.done = false;
            }

            fn update(&mut self, data: &[u8]) -> Result<()> {
                if self.done {
                    return Err(Error::InvalidState);
                }
                Digest::update(&mut self.inner, data);
                Ok(())
            }

            fn finalize(&mut self, out: &mut [u8]) -> Result<()> {
                if self.done {
                    return Err(Error::InvalidState);
                }
                if out.len() != $digest {
                    return Err(Error::InvalidArgument("digest buffer length"));
                }
                let d = self.inner.finalize_reset();
                out.copy_from_slice(&d);
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
                $block
            }

            fn zero(&mut self) {
                // The upstream context offers no in-place wipe; replacing it
                // drops the old compression state.
                self.inner = <$inner>::new();
                self.done = false;
            }
        }

        #[cfg(feature = $feature)]
        impl Clone for $name {
            fn clone(&self) -> Self {
                $name {
                    inner: self.inner.clone(),
                    done: self.done,
                }
            }
        }

        #[cfg(feature = $feature)]
        impl Zeroize for $name {
            fn zeroize(&mut self) {
                self.inner = <$inner>::new();
                self.done = false;
            }
        }

        #[cfg(feature = $feature)]
        fn $kat() -> bool {
            let expected = hex::decode($vector).unwrap_or_default();
            status::kat_digest(b"abc", &expected, |inp, out| {
                let mut ctx = $name::new_unchecked();
                if ctx.update(inp).is_ok() {
                    let _ = ctx.finalize(out);
                }
            })
        }
    };
}

sha2_variant!(
    /// SHA-256 (FIPS-180)
    Sha2_256,
    sha2::Sha256,
    32,
    64,
    AlgId::Sha2_256,
    kat_sha2_256,
    "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
    "sha2-256"
);

sha2_variant!(
    /// SHA-512 (FIPS-180)
    Sha2_512,
    sha2::Sha512,
    64,
    128,
    AlgId::Sha2_512,
    kat_sha2_512,
    "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f",
    "sha2-512"
);

#[cfg(test)]
mod tests {
    #[cfg(feature = "sha2-256")]
    #[test]
    fn sha2_256_abc_vector() {
        let d = super::Sha2_256::digest(b"abc").unwrap();
        assert_eq!(
            hex::encode(d),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[cfg(feature = "sha2-512")]
    #[test]
    fn sha2_512_streaming_equals_oneshot() {
        use crate::hash::Hash;
        let msg = vec![0x5au8; 777];
        let one = super::Sha2_512::digest(&msg).unwrap();
        let mut ctx = super::Sha2_512::new().unwrap();
        for chunk in msg.chunks(13) {
            ctx.update(chunk).unwrap();
        }
        let mut two = [0u8; 64];
        ctx.finalize(&mut two).unwrap();
        assert_eq!(one, two);
    }
}

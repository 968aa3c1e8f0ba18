//! leancrypto - self-contained classical and post-quantum crypto core
//!
//! The crate is organized around a small set of capability traits and the
//! runtime that binds concrete primitives to them:
//!
//! - [`hash::Hash`]: sponge-based digests and XOFs (SHA-3, SHAKE, cSHAKE,
//!   Ascon) plus SHA-2, all over one absorb/squeeze engine
//! - [`mac`]: HMAC over any hash, KMAC over cSHAKE
//! - `sym::Sym` + [`aead::Aead`]: AES block core and the three AEAD
//!   state machines (GCM, hash Encrypt-then-MAC, KMAC)
//! - [`drbg::Drng`]: fast-key-erasure generators (KMAC-DRNG, XDRBG,
//!   ChaCha20-DRNG)
//! - [`curve25519`] and (optionally) `kem`: narrow curve and ML-KEM
//!   interfaces
//!
//! Every primitive runs a power-on self-test on first use and latches the
//! result process-wide ([`status`]); back-ends are chosen once per process
//! from static implementation tables driven by the CPU-feature cache
//! ([`cpu`], [`dispatch`]). Secrets are wiped on drop ([`ct`], [`secmem`]).
//!
//! Instances are plain owned values: construct on the stack via `new()`,
//! or on locked, wipe-on-drop heap storage via `alloc()`.
#![deny(unsafe_code)]

pub mod aead;
pub mod cpu;
pub mod ct;
pub mod curve25519;
pub mod dispatch;
pub mod drbg;
pub mod error;
pub mod hash;
pub mod keccak;
#[cfg(feature = "kyber")]
pub mod kem;
pub mod mac;
pub mod secmem;
pub mod sponge;
pub mod status;
#[cfg(feature = "aes")]
pub mod sym;

pub use error::{Error, Result};
pub use status::{status_of, AlgId, SelftestStatus};

pub use aead::Aead;
pub use drbg::Drng;
pub use hash::Hash;
#[cfg(feature = "aes")]
pub use sym::Sym;

#[cfg(feature = "aes")]
pub use aead::AesGcm;
pub use aead::HashAead;
#[cfg(feature = "sha3")]
pub use aead::KmacAead;
#[cfg(feature = "chacha20")]
pub use drbg::ChaCha20Drng;
#[cfg(feature = "sha3")]
pub use drbg::{KmacDrng, Xdrbg, XdrbgKind};
#[cfg(feature = "ascon")]
pub use hash::ascon::{AsconCxof128, AsconHash256, AsconXof128};
#[cfg(feature = "sha3")]
pub use hash::cshake::{CShake128, CShake256};
#[cfg(feature = "sha2-256")]
pub use hash::sha2::Sha2_256;
#[cfg(feature = "sha2-512")]
pub use hash::sha2::Sha2_512;
#[cfg(feature = "sha3")]
pub use hash::sha3::{Sha3_224, Sha3_256, Sha3_384, Sha3_512, Shake128, Shake256};
pub use mac::Hmac;
#[cfg(feature = "sha3")]
pub use mac::{Kmac128, Kmac256};
pub use secmem::{MemClass, SecureBox, SecureBuf};

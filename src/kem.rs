//! ML-KEM-768 (Kyber) behind a narrow interface
//!
//! The lattice internals live in `pqcrypto-kyber`; this module only shapes
//! them into the crate's conventions: self-test gate, error taxonomy, and
//! wiped secrets.
#![forbid(unsafe_code)]

use pqcrypto_kyber::kyber768;
use pqcrypto_traits::kem::{Ciphertext as _, PublicKey as _, SecretKey as _, SharedSecret as _};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{Error, Result};
use crate::status::{self, AlgId};

pub const MLKEM768_PUBLIC_KEY_LEN: usize = 1184;
pub const MLKEM768_SECRET_KEY_LEN: usize = 2400;
pub const MLKEM768_CIPHERTEXT_LEN: usize = 1088;
pub const MLKEM768_SHARED_SECRET_LEN: usize = 32;

pub struct MlKem768SecretKey {
    inner: kyber768::SecretKey,
}

impl MlKem768SecretKey {
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        status::ensure(AlgId::MlKem768, kat_mlkem)?;
        kyber768::SecretKey::from_bytes(bytes)
            .map(|inner| MlKem768SecretKey { inner })
            .map_err(|_| Error::InvalidArgument("ML-KEM secret key encoding"))
    }
}

impl Zeroize for MlKem768SecretKey {
    fn zeroize(&mut self) {
        // The upstream type owns its buffer; replace it with a throwaway
        // key pair's secret half.
        let (_, sk) = kyber768::keypair();
        self.inner = sk;
    }
}

/// Generate an ML-KEM-768 key pair.
pub fn mlkem768_keypair() -> Result<(Vec<u8>, MlKem768SecretKey)> {
    status::ensure(AlgId::MlKem768, kat_mlkem)?;
    let (pk, sk) = kyber768::keypair();
    Ok((pk.as_bytes().to_vec(), MlKem768SecretKey { inner: sk }))
}

/// Encapsulate against a peer public key; returns (ciphertext, shared
/// secret).
pub fn mlkem768_encapsulate(peer_pk: &[u8]) -> Result<(Vec<u8>, Zeroizing<[u8; 32]>)> {
    status::ensure(AlgId::MlKem768, kat_mlkem)?;
    let pk = kyber768::PublicKey::from_bytes(peer_pk)
        .map_err(|_| Error::InvalidArgument("ML-KEM public key encoding"))?;
    let (ss, ct) = kyber768::encapsulate(&pk);
    let mut shared = Zeroizing::new([0u8; 32]);
    shared.copy_from_slice(ss.as_bytes());
    Ok((ct.as_bytes().to_vec(), shared))
}

/// Decapsulate a ciphertext with the local secret key.
pub fn mlkem768_decapsulate(
    ct: &[u8],
    sk: &MlKem768SecretKey,
) -> Result<Zeroizing<[u8; 32]>> {
    status::ensure(AlgId::MlKem768, kat_mlkem)?;
    let ct = kyber768::Ciphertext::from_bytes(ct)
        .map_err(|_| Error::InvalidArgument("ML-KEM ciphertext encoding"))?;
    let ss = kyber768::decapsulate(&ct, &sk.inner);
    let mut shared = Zeroizing::new([0u8; 32]);
    shared.copy_from_slice(ss.as_bytes());
    Ok(shared)
}

// Encapsulate/decapsulate agreement round trip.
fn kat_mlkem() -> bool {
    let (pk, sk) = kyber768::keypair();
    let (ss1, ct) = kyber768::encapsulate(&pk);
    let ss2 = kyber768::decapsulate(&ct, &sk);
    ss1.as_bytes() == ss2.as_bytes() && !ss1.as_bytes().iter().all(|&b| b == 0)
}

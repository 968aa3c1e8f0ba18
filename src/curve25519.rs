//! X25519 key agreement and Ed25519 signatures
//!
//! Narrow wrappers over the dalek field arithmetic; the rest of the crate
//! treats both as opaque primitives behind the usual self-test gate. Key
//! generation accepts any of the crate's DRBGs through `rand_core`.
#![forbid(unsafe_code)]

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::CryptoRngCore;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, Zeroizing};

use crate::ct;
use crate::error::{Error, Result};
use crate::status::{self, AlgId};

pub const X25519_KEY_LEN: usize = 32;
pub const ED25519_SIG_LEN: usize = 64;

/// Scalar multiplication by the base point: secret scalar to public key.
pub fn x25519_public_key(sk: &[u8; 32]) -> Result<[u8; 32]> {
    status::ensure(AlgId::X25519, kat_x25519)?;
    ct::poison(sk);
    let secret = StaticSecret::from(*sk);
    let public = PublicKey::from(&secret);
    let out = *public.as_bytes();
    ct::unpoison(&out);
    Ok(out)
}

/// Diffie-Hellman agreement. Rejects the all-zero shared secret produced
/// by small-order peer points.
pub fn x25519_agree(sk: &[u8; 32], peer_pk: &[u8; 32]) -> Result<Zeroizing<[u8; 32]>> {
    status::ensure(AlgId::X25519, kat_x25519)?;
    ct::poison(sk);
    let secret = StaticSecret::from(*sk);
    let shared = secret.diffie_hellman(&PublicKey::from(*peer_pk));
    if !shared.was_contributory() {
        return Err(Error::InvalidArgument("small-order peer point"));
    }
    Ok(Zeroizing::new(*shared.as_bytes()))
}

/// Fresh X25519 keypair from any CSPRNG (the crate's DRBGs qualify).
pub fn x25519_keypair(rng: &mut impl CryptoRngCore) -> Result<(Zeroizing<[u8; 32]>, [u8; 32])> {
    status::ensure(AlgId::X25519, kat_x25519)?;
    let mut sk = Zeroizing::new([0u8; 32]);
    rng.fill_bytes(sk.as_mut());
    let pk = {
        let secret = StaticSecret::from(*sk);
        *PublicKey::from(&secret).as_bytes()
    };
    Ok((sk, pk))
}

/// Ed25519 signing key wrapper with wipe-on-drop seed handling.
pub struct Ed25519SigningKey {
    inner: SigningKey,
}

impl Ed25519SigningKey {
    pub fn generate(rng: &mut impl CryptoRngCore) -> Result<Self> {
        status::ensure(AlgId::Ed25519, kat_ed25519)?;
        Ok(Ed25519SigningKey {
            inner: SigningKey::generate(rng),
        })
    }

    pub fn from_seed(seed: &[u8; 32]) -> Result<Self> {
        status::ensure(AlgId::Ed25519, kat_ed25519)?;
        ct::poison(seed);
        Ok(Ed25519SigningKey {
            inner: SigningKey::from_bytes(seed),
        })
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.inner.verifying_key().to_bytes()
    }

    pub fn sign(&self, msg: &[u8]) -> [u8; ED25519_SIG_LEN] {
        let sig = self.inner.sign(msg);
        let out = sig.to_bytes();
        ct::unpoison(&out);
        out
    }
}

impl Zeroize for Ed25519SigningKey {
    fn zeroize(&mut self) {
        // Replace with a throwaway key; the dalek type keeps its seed
        // private.
        self.inner = SigningKey::from_bytes(&[0u8; 32]);
    }
}

/// Signature verification; `InvalidArgument` for a malformed key,
/// `TagMismatch` for a bad signature.
pub fn ed25519_verify(pk: &[u8; 32], msg: &[u8], sig: &[u8; ED25519_SIG_LEN]) -> Result<()> {
    status::ensure(AlgId::Ed25519, kat_ed25519)?;
    let key = VerifyingKey::from_bytes(pk).map_err(|_| Error::InvalidArgument("ed25519 key"))?;
    let sig = Signature::from_bytes(sig);
    key.verify(msg, &sig).map_err(|_| Error::TagMismatch)
}

// RFC 7748 section 6.1 key-agreement vectors.
fn kat_x25519() -> bool {
    let a_sk: [u8; 32] =
        match hex::decode("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a") {
            Ok(v) => match v.try_into() {
                Ok(a) => a,
                Err(_) => return false,
            },
            Err(_) => return false,
        };
    let expected_pk =
        hex::decode("8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a")
            .unwrap_or_default();

    let secret = StaticSecret::from(a_sk);
    let pk = *PublicKey::from(&secret).as_bytes();
    if ct::consttime_compare(&pk, &expected_pk) != 0 {
        return false;
    }

    // Agreement against the RFC peer key must land on the shared secret.
    let b_pk: [u8; 32] =
        match hex::decode("de9edb7d7b7dc1b4d35b61c2ece435373f8343c85b78674dadfc7e146f882b4f") {
            Ok(v) => match v.try_into() {
                Ok(a) => a,
                Err(_) => return false,
            },
            Err(_) => return false,
        };
    let expected_shared =
        hex::decode("4a5d9d5ba4ce2de1728e3bf480350f25e07e21c947d19e3376f09b3c1e161742")
            .unwrap_or_default();
    let shared = secret.diffie_hellman(&PublicKey::from(b_pk));
    ct::consttime_compare(shared.as_bytes(), &expected_shared) == 0
}

// RFC 8032 TEST 1 public key derivation plus a sign/verify round trip.
fn kat_ed25519() -> bool {
    let seed: [u8; 32] =
        match hex::decode("9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60") {
            Ok(v) => match v.try_into() {
                Ok(a) => a,
                Err(_) => return false,
            },
            Err(_) => return false,
        };
    let expected_pk =
        hex::decode("d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a")
            .unwrap_or_default();
    let sk = SigningKey::from_bytes(&seed);
    let pk = sk.verifying_key();
    if ct::consttime_compare(&pk.to_bytes(), &expected_pk) != 0 {
        return false;
    }
    let msg = b"ed25519 power-on round trip";
    let sig = sk.sign(msg);
    if pk.verify(msg, &sig).is_err() {
        return false;
    }
    let mut bad = sig.to_bytes();
    bad[0] ^= 0x01;
    pk.verify(msg, &Signature::from_bytes(&bad)).is_err()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc7748_base_point_vector() {
        let sk: [u8; 32] =
            hex::decode("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a")
                .unwrap()
                .try_into()
                .unwrap();
        let pk = x25519_public_key(&sk).unwrap();
        assert_eq!(
            hex::encode(pk),
            "8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a"
        );
    }

    #[test]
    fn agreement_is_symmetric() {
        let a = [0x11u8; 32];
        let b = [0x92u8; 32];
        let a_pk = x25519_public_key(&a).unwrap();
        let b_pk = x25519_public_key(&b).unwrap();
        let s1 = x25519_agree(&a, &b_pk).unwrap();
        let s2 = x25519_agree(&b, &a_pk).unwrap();
        assert_eq!(*s1, *s2);
    }

    #[test]
    fn small_order_peer_rejected() {
        let sk = [0x33u8; 32];
        // The identity point forces a zero shared secret.
        let identity = [0u8; 32];
        assert!(x25519_agree(&sk, &identity).is_err());
    }

    #[cfg(feature = "sha3")]
    #[test]
    fn keypair_from_crate_drng() {
        use crate::drbg::{Drng, KmacDrng};
        let mut rng = KmacDrng::new().unwrap();
        rng.seed(b"keygen entropy", b"").unwrap();
        let (sk, pk) = x25519_keypair(&mut rng).unwrap();
        assert_eq!(x25519_public_key(&sk).unwrap(), pk);
    }

    #[test]
    fn ed25519_sign_verify_and_reject() {
        let sk = Ed25519SigningKey::from_seed(&[7u8; 32]).unwrap();
        let pk = sk.public_key();
        let sig = sk.sign(b"message");
        ed25519_verify(&pk, b"message", &sig).unwrap();
        assert_eq!(
            ed25519_verify(&pk, b"other message", &sig).unwrap_err(),
            Error::TagMismatch
        );
    }

    #[test]
    fn rfc8032_public_key_derivation() {
        let seed: [u8; 32] =
            hex::decode("9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60")
                .unwrap()
                .try_into()
                .unwrap();
        let sk = Ed25519SigningKey::from_seed(&seed).unwrap();
        assert_eq!(
            hex::encode(sk.public_key()),
            "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a"
        );
    }
}

//! End-to-end scenarios across the public API: literal known answers,
//! streamed/one-shot agreement, authenticity failures, state-machine
//! rules, and the process-wide self-test latch.

use leancrypto::{status_of, AlgId, Error, SelftestStatus};

/* ===== AES-GCM-256 single block ===== */

#[cfg(feature = "aes")]
mod gcm_256 {
    use super::*;
    use leancrypto::{Aead, AesGcm};

    fn vectors() -> (Vec<u8>, Vec<u8>, Vec<u8>, Vec<u8>, Vec<u8>, Vec<u8>) {
        (
            hex::decode("7f7168a406e7c1ef0fd47ac922c5ec5f659765fb6aaa048f7056f6c6b5d8513d")
                .unwrap(),
            hex::decode("b8b5e407adc0e293e3e7e991").unwrap(),
            hex::decode("ff7628f6427fbcef1f3b82b37404e116").unwrap(),
            hex::decode("b706194bb0b10c474e1b2d7b2278224c").unwrap(),
            hex::decode("8fada0b8e777a829ca9680d3bf4f3574").unwrap(),
            hex::decode("daca354277f6335fc8bec90886da70").unwrap(),
        )
    }

    #[test]
    fn encrypt_matches_expected_ct_and_tag() {
        let (key, iv, aad, pt, expected_ct, expected_tag) = vectors();
        let mut ctx = AesGcm::new();
        ctx.set_key(&key, &iv).unwrap();
        let mut ct = vec![0u8; pt.len()];
        let mut tag = vec![0u8; expected_tag.len()];
        ctx.encrypt(&aad, &pt, &mut ct, &mut tag).unwrap();
        assert_eq!(ct, expected_ct);
        assert_eq!(tag, expected_tag);
    }

    #[test]
    fn decrypt_accepts_then_rejects_flipped_tag() {
        let (key, iv, aad, pt, expected_ct, expected_tag) = vectors();
        let mut ctx = AesGcm::new();
        ctx.set_key(&key, &iv).unwrap();
        let mut back = vec![0u8; pt.len()];
        ctx.decrypt(&aad, &expected_ct, &mut back, &expected_tag)
            .unwrap();
        assert_eq!(back, pt);

        let mut flipped = expected_tag.clone();
        flipped[expected_tag.len() - 1] ^= 0x01;
        let mut ctx = AesGcm::new();
        ctx.set_key(&key, &iv).unwrap();
        assert_eq!(
            ctx.decrypt(&aad, &expected_ct, &mut back, &flipped)
                .unwrap_err(),
            Error::TagMismatch
        );
    }

    #[test]
    fn empty_aad_empty_pt_full_tag() {
        let (key, iv, ..) = vectors();
        let mut ctx = AesGcm::new();
        ctx.set_key(&key, &iv).unwrap();
        let mut tag = [0u8; 16];
        ctx.encrypt(b"", b"", &mut [], &mut tag).unwrap();

        let mut ctx = AesGcm::new();
        ctx.set_key(&key, &iv).unwrap();
        ctx.decrypt(b"", b"", &mut [], &tag).unwrap();
    }
}

/* ===== HMAC-SHA3-224 ===== */

#[cfg(feature = "sha3")]
mod hmac_vectors {
    use leancrypto::{Hmac, Sha3_224};

    #[test]
    fn hmac_sha3_224_vector() {
        let key = hex::decode("bb0095c4a4a667d2e74330e5d6").unwrap();
        let msg = hex::decode("358e06ba032183fc182058bdb7bb1340").unwrap();
        let mut mac = [0u8; 28];
        Hmac::<Sha3_224>::mac(&key, &msg, &mut mac).unwrap();
        assert_eq!(
            hex::encode(mac),
            "16f7b27e25376c38cfaa6fcce285c51428db33a0fe7af0af5395dea2"
        );
    }

    #[cfg(feature = "sha2-256")]
    #[test]
    fn key_longer_than_block_exercises_compression() {
        use leancrypto::Sha2_256;
        // 200 > 64-byte SHA-256 block.
        let key = vec![0x31u8; 200];
        let mut one = [0u8; 32];
        Hmac::<Sha2_256>::mac(&key, b"m", &mut one).unwrap();

        let reduced = Sha2_256::digest(&key).unwrap();
        let mut two = [0u8; 32];
        Hmac::<Sha2_256>::mac(&reduced, b"m", &mut two).unwrap();
        assert_eq!(one, two);
    }
}

/* ===== ChaCha20-DRNG ===== */

#[cfg(feature = "chacha20")]
mod chacha_drng {
    use leancrypto::{ChaCha20Drng, Drng};

    #[test]
    fn zero_state_first_block() {
        let mut d = ChaCha20Drng::new().unwrap();
        d.seed(&[], &[]).unwrap();
        let mut out = [0u8; 32];
        d.generate(&[], &mut out).unwrap();
        assert_eq!(
            hex::encode(out),
            "76b8e0ada0f13d90405d6ae55386bd28bdd219b8a08ded1aa836efcc8b770dc7"
        );
    }
}

/* ===== KMAC-DRNG 320-byte pull ===== */

#[cfg(feature = "sha3")]
mod kmac_drng_stream {
    use leancrypto::{Drng, KmacDrng};

    #[test]
    fn seed_and_pull_320_bytes() {
        let seed = hex::decode("000102030405060708").unwrap();
        let mut a = KmacDrng::new().unwrap();
        a.seed(&seed, b"").unwrap();
        let mut out_a = vec![0u8; 320];
        a.generate(&[], &mut out_a).unwrap();
        assert_eq!(
            hex::encode(&out_a[..32]),
            "bc70c5d6fec42823ab57925eb7d595ce2d983a47712f6d4f8229e85c11084832"
        );

        let mut b = KmacDrng::new().unwrap();
        b.seed(&seed, b"").unwrap();
        let mut out_b = vec![0u8; 320];
        b.generate(&[], &mut out_b).unwrap();
        assert_eq!(out_a, out_b);

        // A second pull must not repeat the released prefix.
        let mut next = vec![0u8; 64];
        a.generate(&[], &mut next).unwrap();
        assert_ne!(&next[..], &out_a[..64]);
    }
}

/* ===== X25519 ===== */

mod x25519 {
    use leancrypto::curve25519::{x25519_agree, x25519_public_key};

    #[test]
    fn rfc7748_agreement() {
        let a_sk: [u8; 32] =
            hex::decode("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a")
                .unwrap()
                .try_into()
                .unwrap();
        let b_sk: [u8; 32] =
            hex::decode("5dab087e624a8a4b79e17f8b83800ee66f3bb1292618b6fd1c2f8b27ff88e0eb")
                .unwrap()
                .try_into()
                .unwrap();
        let a_pk = x25519_public_key(&a_sk).unwrap();
        let b_pk = x25519_public_key(&b_sk).unwrap();
        assert_eq!(
            hex::encode(a_pk),
            "8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a"
        );
        assert_eq!(
            hex::encode(b_pk),
            "de9edb7d7b7dc1b4d35b61c2ece435373f8343c85b78674dadfc7e146f882b4f"
        );
        let s1 = x25519_agree(&a_sk, &b_pk).unwrap();
        let s2 = x25519_agree(&b_sk, &a_pk).unwrap();
        assert_eq!(*s1, *s2);
        assert_eq!(
            hex::encode(*s1),
            "4a5d9d5ba4ce2de1728e3bf480350f25e07e21c947d19e3376f09b3c1e161742"
        );
    }
}

/* ===== XOF boundary behavior ===== */

#[cfg(feature = "sha3")]
mod xof_boundaries {
    use leancrypto::{Hash, Shake256};

    #[test]
    fn zero_length_squeeze_is_noop() {
        let mut a = Shake256::new().unwrap();
        a.update(b"boundary").unwrap();
        let mut head = [0u8; 16];
        a.finalize(&mut head).unwrap();
        a.finalize(&mut []).unwrap();
        let mut tail_after_noop = [0u8; 16];
        a.finalize(&mut tail_after_noop).unwrap();

        let mut b = Shake256::new().unwrap();
        b.update(b"boundary").unwrap();
        let mut expect = [0u8; 32];
        b.finalize(&mut expect).unwrap();
        assert_eq!(head, expect[..16]);
        assert_eq!(tail_after_noop, expect[16..]);
    }
}

/* ===== AEAD round trips across families ===== */

mod aead_roundtrips {
    use super::*;
    use leancrypto::Aead;

    fn roundtrip(ctx: &mut impl Aead, key: &[u8], iv: &[u8]) {
        let aad = b"associated data";
        let pt: Vec<u8> = (0..257u32).map(|i| (i * 31 % 256) as u8).collect();

        ctx.set_key(key, iv).unwrap();
        let mut ct = vec![0u8; pt.len()];
        let mut tag = [0u8; 16];
        ctx.encrypt(aad, &pt, &mut ct, &mut tag).unwrap();

        ctx.set_key(key, iv).unwrap();
        let mut back = vec![0u8; pt.len()];
        ctx.decrypt(aad, &ct, &mut back, &tag).unwrap();
        assert_eq!(back, pt);

        // Single-bit AAD damage must fail.
        let mut bad_aad = aad.to_vec();
        bad_aad[0] ^= 0x01;
        ctx.set_key(key, iv).unwrap();
        assert_eq!(
            ctx.decrypt(&bad_aad, &ct, &mut back, &tag).unwrap_err(),
            Error::TagMismatch
        );
    }

    #[cfg(feature = "aes")]
    #[test]
    fn gcm_family() {
        let mut ctx = leancrypto::AesGcm::new();
        roundtrip(&mut ctx, &[0x51u8; 32], &[0x22u8; 12]);
    }

    #[cfg(feature = "sha2-512")]
    #[test]
    fn hash_family() {
        let mut ctx = leancrypto::HashAead::<leancrypto::Sha2_512>::new().unwrap();
        roundtrip(&mut ctx, &[0x52u8; 32], b"hash-aead-iv");
    }

    #[cfg(feature = "sha3")]
    #[test]
    fn kmac_family() {
        let mut ctx = leancrypto::KmacAead::new().unwrap();
        roundtrip(&mut ctx, &[0x53u8; 32], b"kmac-aead-iv");
    }
}

/* ===== Self-test latch is observable ===== */

#[cfg(feature = "sha3")]
#[test]
fn selftest_latches_passed_after_first_use() {
    use leancrypto::Sha3_256;
    let _ = Sha3_256::digest(b"first").unwrap();
    assert_eq!(status_of(AlgId::Sha3_256), SelftestStatus::Passed);
    let _ = Sha3_256::digest(b"second").unwrap();
    assert_eq!(status_of(AlgId::Sha3_256), SelftestStatus::Passed);
}

/* ===== Heap construction through the memory provider ===== */

#[cfg(feature = "sha3")]
#[test]
fn alloc_constructs_usable_instances() {
    use leancrypto::{Hash, Sha3_512};
    let mut boxed = Sha3_512::alloc().unwrap();
    boxed.update(b"heap instance").unwrap();
    let mut out = [0u8; 64];
    boxed.finalize(&mut out).unwrap();
    assert_eq!(out, Sha3_512::digest(b"heap instance").unwrap());
}

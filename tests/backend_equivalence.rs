//! Every implementation bound into a back-end table must be bit-exact
//! against every other, for all inputs the engine can see.

#![cfg(feature = "sha3")]

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use leancrypto::hash::sha3::Shake256;
use leancrypto::hash::Hash;
use leancrypto::keccak;

#[test]
fn shake256_identical_across_permutation_backends() {
    assert!(keccak::IMPLEMENTATIONS.len() >= 2);
    let mut rng = StdRng::seed_from_u64(0x5eed_cafe);

    for _ in 0..100 {
        let len = rng.gen_range(0..=4096);
        let mut msg = vec![0u8; len];
        rng.fill_bytes(&mut msg);

        let mut reference: Option<[u8; 200]> = None;
        for imp in keccak::IMPLEMENTATIONS {
            let mut ctx = Shake256::with_impl(imp);
            ctx.update(&msg).unwrap();
            let mut out = [0u8; 200];
            ctx.finalize(&mut out).unwrap();
            match &reference {
                None => reference = Some(out),
                Some(r) => assert_eq!(
                    r[..],
                    out[..],
                    "{} diverged on a {}-byte message",
                    imp.name,
                    len
                ),
            }
        }
    }
}

#[test]
fn streamed_absorb_matches_across_backends() {
    let mut rng = StdRng::seed_from_u64(0x0dd_ba11);
    let mut msg = vec![0u8; 1000];
    rng.fill_bytes(&mut msg);

    let mut outputs = Vec::new();
    for imp in keccak::IMPLEMENTATIONS {
        let mut ctx = Shake256::with_impl(imp);
        for chunk in msg.chunks(23) {
            ctx.update(chunk).unwrap();
        }
        let mut out = vec![0u8; 512];
        // Uneven squeeze split exercises the block-boundary paths.
        let (a, b) = out.split_at_mut(135);
        ctx.finalize(a).unwrap();
        ctx.finalize(b).unwrap();
        outputs.push(out);
    }
    for pair in outputs.windows(2) {
        assert_eq!(pair[0], pair[1]);
    }
}

#[cfg(feature = "aes")]
mod aes_backends {
    use super::*;
    use leancrypto::sym::aes::AesCipher;
    use leancrypto::sym::Sym;

    #[test]
    fn portable_matches_dispatched_backend() {
        let mut rng = StdRng::seed_from_u64(0xae5_ae5);
        for keylen in [16usize, 24, 32] {
            let mut key = vec![0u8; keylen];
            rng.fill_bytes(&mut key);
            let portable = AesCipher::with_key_portable(&key).unwrap();
            let dispatched = AesCipher::with_key(&key).unwrap();
            for _ in 0..50 {
                let mut block = [0u8; 16];
                rng.fill_bytes(&mut block);
                let mut a = block;
                portable.encrypt_block(&mut a).unwrap();
                let mut b = block;
                dispatched.encrypt_block(&mut b).unwrap();
                assert_eq!(a, b);

                portable.decrypt_block(&mut a).unwrap();
                dispatched.decrypt_block(&mut b).unwrap();
                assert_eq!(a, block);
                assert_eq!(b, block);
            }
        }
    }
}

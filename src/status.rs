//! Algorithm-status registry and power-on self-test gate
//!
//! Process-wide registry of per-algorithm test state. Every entry point that
//! produces output consults its algorithm id here first: the first caller
//! runs the known-answer test and latches the result; later callers observe
//! `Passed` or `Failed` without re-running anything. A `Failed` latch is
//! permanent for the process.
//!
//! Self-tests call the `*_nocheck` constructors of their own primitive so
//! the gate never recurses into itself.
#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{Error, Result};

/// Identity of every algorithm the registry tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum AlgId {
    KeccakF1600,
    Sha3_224,
    Sha3_256,
    Sha3_384,
    Sha3_512,
    Shake128,
    Shake256,
    CShake128,
    CShake256,
    Sha2_256,
    Sha2_512,
    AsconHash256,
    AsconXof128,
    AsconCxof128,
    Hmac,
    Kmac128,
    Kmac256,
    AesBlock,
    AesGcm,
    HashAead,
    KmacAead,
    KmacDrng,
    Xdrbg,
    ChaCha20Drng,
    X25519,
    Ed25519,
    MlKem768,
}

const ALG_COUNT: usize = AlgId::MlKem768 as usize + 1;

/// Registry entry values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelftestStatus {
    Unset,
    Running,
    Passed,
    Failed,
}

const UNSET: u8 = 0;
const RUNNING: u8 = 1;
const PASSED: u8 = 2;
const FAILED: u8 = 3;

static STATUS: [AtomicU8; ALG_COUNT] = [const { AtomicU8::new(UNSET) }; ALG_COUNT];

/// Current latch value for an algorithm id.
pub fn status_of(id: AlgId) -> SelftestStatus {
    match STATUS[id as usize].load(Ordering::Acquire) {
        RUNNING => SelftestStatus::Running,
        PASSED => SelftestStatus::Passed,
        FAILED => SelftestStatus::Failed,
        _ => SelftestStatus::Unset,
    }
}

/// Run-once gate. The winning thread executes `kat`; losing threads spin
/// until the winner latches (the test is deterministic and short). Returns
/// `SelftestFailed` forever once the vector check failed.
pub(crate) fn ensure(id: AlgId, kat: fn() -> bool) -> Result<()> {
    let cell = &STATUS[id as usize];
    loop {
        match cell.compare_exchange(UNSET, RUNNING, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => {
                let ok = kat();
                cell.store(if ok { PASSED } else { FAILED }, Ordering::Release);
                if ok {
                    return Ok(());
                }
                tracing::warn!(alg = ?id, "power-on self-test failed; algorithm disabled");
                return Err(Error::SelftestFailed(id));
            }
            Err(PASSED) => return Ok(()),
            Err(FAILED) => return Err(Error::SelftestFailed(id)),
            _ => core::hint::spin_loop(),
        }
    }
}

/// Latch a result computed outside `ensure` (the back-end selector runs its
/// own per-implementation vectors). First writer wins; later calls are
/// idempotent.
pub(crate) fn record(id: AlgId, ok: bool) {
    let _ = STATUS[id as usize].compare_exchange(
        UNSET,
        if ok { PASSED } else { FAILED },
        Ordering::AcqRel,
        Ordering::Acquire,
    );
}

/// Known-answer comparison helper for simple input -> digest tests.
///
/// With the `fips` feature the input is first corrupted by one byte and the
/// comparator must detect the mismatch; a comparator that fails to flag the
/// corrupted run fails the whole test.
pub(crate) fn kat_digest(input: &[u8], expected: &[u8], compute: impl Fn(&[u8], &mut [u8])) -> bool {
    let mut out = [0u8; 64];
    let out = &mut out[..expected.len()];

    #[cfg(feature = "fips")]
    {
        let mut corrupted = [0u8; 256];
        let n = input.len().min(corrupted.len());
        corrupted[..n].copy_from_slice(&input[..n]);
        if n > 0 {
            corrupted[0] ^= 0x01;
        } else {
            // Empty input: corrupt the expectation instead.
        }
        compute(&corrupted[..n], out);
        let detect = if n > 0 {
            crate::ct::consttime_compare(out, expected) != 0
        } else {
            true
        };
        if !detect {
            return false;
        }
    }

    compute(input, out);
    crate::ct::consttime_compare(out, expected) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    static RUNS: AtomicUsize = AtomicUsize::new(0);

    fn counting_kat() -> bool {
        RUNS.fetch_add(1, Ordering::SeqCst);
        true
    }

    #[test]
    fn latch_runs_vectors_at_most_once() {
        // The id may already be latched by another test in this process;
        // the property under test is that the second ensure never re-runs
        // the vectors.
        let _ = ensure(AlgId::MlKem768, counting_kat);
        let after_first = RUNS.load(Ordering::SeqCst);
        assert!(after_first <= 1);
        let _ = ensure(AlgId::MlKem768, counting_kat);
        assert_eq!(RUNS.load(Ordering::SeqCst), after_first);
        assert_ne!(status_of(AlgId::MlKem768), SelftestStatus::Unset);
    }

    fn xor_sum(inp: &[u8], out: &mut [u8]) {
        let s = inp.iter().fold(0u8, |a, b| a ^ b);
        out.fill(s);
    }

    #[test]
    fn kat_digest_flags_mismatch() {
        let ok = kat_digest(b"abc", &[0u8; 4], |_inp, out| out.copy_from_slice(&[1, 2, 3, 4]));
        assert!(!ok);
        // 'a' ^ 'b' ^ 'c' == 0x60
        assert!(kat_digest(b"abc", &[0x60; 4], xor_sum));
        assert!(!kat_digest(b"abc", &[0x61; 4], xor_sum));
    }
}

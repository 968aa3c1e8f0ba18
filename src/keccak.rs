//! Keccak-f[1600] permutation back-ends
//!
//! A static table enumerates the available permutation implementations with
//! their required CPU-feature masks. On first use the dispatcher consults
//! the feature cache, runs the candidate's known-answer check, and latches
//! the winner; a candidate failing its check is demoted to the next entry.
//! All accepted implementations are bit-exact for all inputs.
#![forbid(unsafe_code)]

use std::sync::OnceLock;

use crate::ct;
use crate::dispatch::{self, Implementation};
use crate::error::{Error, Result};
use crate::status::{self, AlgId};

/// One permutation implementation and the conditions for selecting it.
pub type KeccakImpl = Implementation<fn(&mut [u64; 25])>;

/// All implementations bound at build time. Tests run their vectors against
/// every entry; production selection picks the highest satisfied priority.
pub static IMPLEMENTATIONS: &[KeccakImpl] = &[
    KeccakImpl {
        name: "keccak-f1600-vetted",
        required: 0,
        priority: 10,
        table: permute_vetted,
    },
    KeccakImpl {
        name: "keccak-f1600-portable",
        required: 0,
        priority: 0,
        table: permute_portable,
    },
];

fn permute_vetted(lanes: &mut [u64; 25]) {
    tiny_keccak::keccakf(lanes);
}

const RC: [u64; 24] = [
    0x0000000000000001,
    0x0000000000008082,
    0x800000000000808a,
    0x8000000080008000,
    0x000000000000808b,
    0x0000000080000001,
    0x8000000080008081,
    0x8000000000008009,
    0x000000000000008a,
    0x0000000000000088,
    0x0000000080008009,
    0x000000008000000a,
    0x000000008000808b,
    0x800000000000008b,
    0x8000000000008089,
    0x8000000000008003,
    0x8000000000008002,
    0x8000000000000080,
    0x000000000000800a,
    0x800000008000000a,
    0x8000000080008081,
    0x8000000000008080,
    0x0000000080000001,
    0x8000000080008008,
];

const RHO: [u32; 24] = [
    1, 3, 6, 10, 15, 21, 28, 36, 45, 55, 2, 14, 27, 41, 56, 8, 25, 43, 62, 18, 39, 61, 20, 44,
];

const PI: [usize; 24] = [
    10, 7, 11, 17, 18, 3, 5, 16, 8, 21, 24, 4, 15, 23, 19, 13, 12, 2, 20, 14, 22, 9, 6, 1,
];

/// Reference Keccak-f[1600], lane (x, y) at index `x + 5y`.
pub fn permute_portable(a: &mut [u64; 25]) {
    for &rc in RC.iter() {
        // theta
        let mut c = [0u64; 5];
        for x in 0..5 {
            c[x] = a[x] ^ a[x + 5] ^ a[x + 10] ^ a[x + 15] ^ a[x + 20];
        }
        for x in 0..5 {
            let d = c[(x + 4) % 5] ^ c[(x + 1) % 5].rotate_left(1);
            for y in 0..5 {
                a[x + 5 * y] ^= d;
            }
        }
        // rho + pi
        let mut last = a[1];
        for i in 0..24 {
            let j = PI[i];
            let tmp = a[j];
            a[j] = last.rotate_left(RHO[i]);
            last = tmp;
        }
        // chi
        for y in 0..5 {
            let row = [a[5 * y], a[5 * y + 1], a[5 * y + 2], a[5 * y + 3], a[5 * y + 4]];
            for x in 0..5 {
                a[5 * y + x] = row[x] ^ (!row[(x + 1) % 5] & row[(x + 2) % 5]);
            }
        }
        // iota
        a[0] ^= rc;
    }
}

// SHA3-256("abc"), FIPS-202
const KAT_SHA3_256_ABC: [u8; 32] = [
    0x3a, 0x98, 0x5d, 0xa7, 0x4f, 0xe2, 0x25, 0xb2, 0x04, 0x5c, 0x17, 0x2d, 0x6b, 0xd3, 0x90,
    0xbd, 0x85, 0x5f, 0x08, 0x6e, 0x3e, 0x9d, 0x52, 0x5b, 0x46, 0xbf, 0xe2, 0x45, 0x11, 0x43,
    0x15, 0x32,
];

/// Single-block SHA3-256 over `msg` (at most rate - 1 bytes), computed
/// directly on the candidate permutation. This is the no-check path the
/// selection gate uses; it never routes back through the public hash API.
fn sha3_256_one_block(permute: fn(&mut [u64; 25]), msg: &[u8], out: &mut [u8; 32]) {
    let mut lanes = [0u64; 25];
    for (i, b) in msg.iter().enumerate() {
        lanes[i / 8] ^= (*b as u64) << (8 * (i % 8));
    }
    let off = msg.len();
    lanes[off / 8] ^= 0x06u64 << (8 * (off % 8));
    lanes[16] ^= 0x80u64 << 56; // final bit at byte 135
    permute(&mut lanes);
    for i in 0..4 {
        out[i * 8..][..8].copy_from_slice(&lanes[i].to_le_bytes());
    }
}

fn kat_with(imp: &KeccakImpl) -> bool {
    let mut out = [0u8; 32];

    #[cfg(feature = "fips")]
    {
        sha3_256_one_block(imp.table, b"abd", &mut out);
        if ct::consttime_compare(&out, &KAT_SHA3_256_ABC) == 0 {
            return false;
        }
    }

    sha3_256_one_block(imp.table, b"abc", &mut out);
    ct::consttime_compare(&out, &KAT_SHA3_256_ABC) == 0
}

static SELECTED: OnceLock<Option<&'static KeccakImpl>> = OnceLock::new();

fn select_and_latch() -> Option<&'static KeccakImpl> {
    let sel = dispatch::select(IMPLEMENTATIONS, kat_with);
    status::record(AlgId::KeccakF1600, sel.is_some());
    if let Some(imp) = sel {
        tracing::debug!(backend = imp.name, "keccak permutation selected");
    }
    sel
}

/// The latched permutation for this process.
pub(crate) fn selected() -> Result<&'static KeccakImpl> {
    SELECTED
        .get_or_init(select_and_latch)
        .ok_or(Error::SelftestFailed(AlgId::KeccakF1600))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portable_matches_vetted_on_random_states() {
        let mut lanes_a = [0u64; 25];
        // xorshift-style deterministic fill
        let mut x = 0x123456789abcdef0u64;
        for _ in 0..50 {
            for l in lanes_a.iter_mut() {
                x ^= x << 13;
                x ^= x >> 7;
                x ^= x << 17;
                *l = x;
            }
            let mut lanes_b = lanes_a;
            permute_portable(&mut lanes_a);
            permute_vetted(&mut lanes_b);
            assert_eq!(lanes_a, lanes_b);
        }
    }

    #[test]
    fn every_bound_implementation_passes_its_vector() {
        for imp in IMPLEMENTATIONS {
            assert!(kat_with(imp), "{} failed", imp.name);
        }
    }

    #[test]
    fn selection_returns_an_implementation() {
        let imp = selected().unwrap();
        assert!(IMPLEMENTATIONS.iter().any(|i| core::ptr::eq(i, imp)));
    }
}

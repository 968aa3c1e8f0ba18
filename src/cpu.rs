//! CPU-feature detection
//!
//! Lazy, latched detection of the vector and crypto ISA extensions the
//! back-end selector cares about. The first call populates a process-wide
//! value; `force_features` can pin a specific set before that (used by the
//! cross-back-end equivalence tests to exercise the portable paths).
#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

/// Feature bits; a back-end's required mask is a union of these.
pub const AVX2: u32 = 1 << 0;
pub const AVX512: u32 = 1 << 1;
pub const AESNI: u32 = 1 << 2;
pub const PCLMUL: u32 = 1 << 3;
pub const ARM_NEON: u32 = 1 << 4;
pub const ARM_AES: u32 = 1 << 5;
pub const ARM_SHA2: u32 = 1 << 6;
pub const ARM_SHA3: u32 = 1 << 7;
pub const ARM_PMULL: u32 = 1 << 8;
pub const RISCV_V: u32 = 1 << 9;

static FORCED: AtomicU32 = AtomicU32::new(0);
static FORCED_SET: AtomicU32 = AtomicU32::new(0);
static DETECTED: OnceLock<u32> = OnceLock::new();

/// Latched feature word for this process.
pub fn features() -> u32 {
    if FORCED_SET.load(Ordering::Acquire) != 0 {
        return FORCED.load(Ordering::Acquire);
    }
    *DETECTED.get_or_init(detect)
}

/// Pin the feature word, overriding detection. Test support; takes effect
/// for all subsequent `features()` calls, including ones after detection
/// already latched.
pub fn force_features(mask: u32) {
    FORCED.store(mask, Ordering::Release);
    FORCED_SET.store(1, Ordering::Release);
}

/// Drop a previous `force_features` override.
pub fn clear_forced_features() {
    FORCED_SET.store(0, Ordering::Release);
}

#[cfg(target_arch = "x86_64")]
fn detect() -> u32 {
    let mut f = 0;
    if std::arch::is_x86_feature_detected!("avx2") {
        f |= AVX2;
    }
    if std::arch::is_x86_feature_detected!("avx512f") {
        f |= AVX512;
    }
    if std::arch::is_x86_feature_detected!("aes") {
        f |= AESNI;
    }
    if std::arch::is_x86_feature_detected!("pclmulqdq") {
        f |= PCLMUL;
    }
    f
}

#[cfg(target_arch = "aarch64")]
fn detect() -> u32 {
    let mut f = ARM_NEON;
    if std::arch::is_aarch64_feature_detected!("aes") {
        f |= ARM_AES | ARM_PMULL;
    }
    if std::arch::is_aarch64_feature_detected!("sha2") {
        f |= ARM_SHA2;
    }
    if std::arch::is_aarch64_feature_detected!("sha3") {
        f |= ARM_SHA3;
    }
    f
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn detect() -> u32 {
    // Platforms without a stable feature probe run the portable paths.
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_and_clear_roundtrip() {
        force_features(AESNI | AVX2);
        assert_eq!(features() & (AESNI | AVX2), AESNI | AVX2);
        clear_forced_features();
        // Back to detected value; just verify the call latches something.
        let _ = features();
    }
}

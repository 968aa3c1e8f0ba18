//! AES (FIPS-197)
//!
//! Portable key schedule and block transforms as the reference
//! implementation, with the RustCrypto `aes` cipher as the accelerated
//! back-end behind the same capability when the CPU reports AES-NI or
//! ARMv8-AES. The back-end table follows the same select/KAT/demote flow
//! as the Keccak permutation.
#![forbid(unsafe_code)]

use std::sync::OnceLock;

use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use zeroize::Zeroize;

use crate::cpu;
use crate::ct;
use crate::dispatch::{self, Implementation};
use crate::error::{Error, Result};
use crate::status::{self, AlgId};
use crate::sym::Sym;

const SBOX: [u8; 256] = [
    0x63, 0x7c, 0x77, 0x7b, 0xf2, 0x6b, 0x6f, 0xc5, 0x30, 0x01, 0x67, 0x2b, 0xfe, 0xd7, 0xab,
    0x76, 0xca, 0x82, 0xc9, 0x7d, 0xfa, 0x59, 0x47, 0xf0, 0xad, 0xd4, 0xa2, 0xaf, 0x9c, 0xa4,
    0x72, 0xc0, 0xb7, 0xfd, 0x93, 0x26, 0x36, 0x3f, 0xf7, 0xcc, 0x34, 0xa5, 0xe5, 0xf1, 0x71,
    0xd8, 0x31, 0x15, 0x04, 0xc7, 0x23, 0xc3, 0x18, 0x96, 0x05, 0x9a, 0x07, 0x12, 0x80, 0xe2,
    0xeb, 0x27, 0xb2, 0x75, 0x09, 0x83, 0x2c, 0x1a, 0x1b, 0x6e, 0x5a, 0xa0, 0x52, 0x3b, 0xd6,
    0xb3, 0x29, 0xe3, 0x2f, 0x84, 0x53, 0xd1, 0x00, 0xed, 0x20, 0xfc, 0xb1, 0x5b, 0x6a, 0xcb,
    0xbe, 0x39, 0x4a, 0x4c, 0x58, 0xcf, 0xd0, 0xef, 0xaa, 0xfb, 0x43, 0x4d, 0x33, 0x85, 0x45,
    0xf9, 0x02, 0x7f, 0x50, 0x3c, 0x9f, 0xa8, 0x51, 0xa3, 0x40, 0x8f, 0x92, 0x9d, 0x38, 0xf5,
    0xbc, 0xb6, 0xda, 0x21, 0x10, 0xff, 0xf3, 0xd2, 0xcd, 0x0c, 0x13, 0xec, 0x5f, 0x97, 0x44,
    0x17, 0xc4, 0xa7, 0x7e, 0x3d, 0x64, 0x5d, 0x19, 0x73, 0x60, 0x81, 0x4f, 0xdc, 0x22, 0x2a,
    0x90, 0x88, 0x46, 0xee, 0xb8, 0x14, 0xde, 0x5e, 0x0b, 0xdb, 0xe0, 0x32, 0x3a, 0x0a, 0x49,
    0x06, 0x24, 0x5c, 0xc2, 0xd3, 0xac, 0x62, 0x91, 0x95, 0xe4, 0x79, 0xe7, 0xc8, 0x37, 0x6d,
    0x8d, 0xd5, 0x4e, 0xa9, 0x6c, 0x56, 0xf4, 0xea, 0x65, 0x7a, 0xae, 0x08, 0xba, 0x78, 0x25,
    0x2e, 0x1c, 0xa6, 0xb4, 0xc6, 0xe8, 0xdd, 0x74, 0x1f, 0x4b, 0xbd, 0x8b, 0x8a, 0x70, 0x3e,
    0xb5, 0x66, 0x48, 0x03, 0xf6, 0x0e, 0x61, 0x35, 0x57, 0xb9, 0x86, 0xc1, 0x1d, 0x9e, 0xe1,
    0xf8, 0x98, 0x11, 0x69, 0xd9, 0x8e, 0x94, 0x9b, 0x1e, 0x87, 0xe9, 0xce, 0x55, 0x28, 0xdf,
    0x8c, 0xa1, 0x89, 0x0d, 0xbf, 0xe6, 0x42, 0x68, 0x41, 0x99, 0x2d, 0x0f, 0xb0, 0x54, 0xbb,
    0x16,
];

const INV_SBOX: [u8; 256] = [
    0x52, 0x09, 0x6a, 0xd5, 0x30, 0x36, 0xa5, 0x38, 0xbf, 0x40, 0xa3, 0x9e, 0x81, 0xf3, 0xd7,
    0xfb, 0x7c, 0xe3, 0x39, 0x82, 0x9b, 0x2f, 0xff, 0x87, 0x34, 0x8e, 0x43, 0x44, 0xc4, 0xde,
    0xe9, 0xcb, 0x54, 0x7b, 0x94, 0x32, 0xa6, 0xc2, 0x23, 0x3d, 0xee, 0x4c, 0x95, 0x0b, 0x42,
    0xfa, 0xc3, 0x4e, 0x08, 0x2e, 0xa1, 0x66, 0x28, 0xd9, 0x24, 0xb2, 0x76, 0x5b, 0xa2, 0x49,
    0x6d, 0x8b, 0xd1, 0x25, 0x72, 0xf8, 0xf6, 0x64, 0x86, 0x68, 0x98, 0x16, 0xd4, 0xa4, 0x5c,
    0xcc, 0x5d, 0x65, 0xb6, 0x92, 0x6c, 0x70, 0x48, 0x50, 0xfd, 0xed, 0xb9, 0xda, 0x5e, 0x15,
    0x46, 0x57, 0xa7, 0x8d, 0x9d, 0x84, 0x90, 0xd8, 0xab, 0x00, 0x8c, 0xbc, 0xd3, 0x0a, 0xf7,
    0xe4, 0x58, 0x05, 0xb8, 0xb3, 0x45, 0x06, 0xd0, 0x2c, 0x1e, 0x8f, 0xca, 0x3f, 0x0f, 0x02,
    0xc1, 0xaf, 0xbd, 0x03, 0x01, 0x13, 0x8a, 0x6b, 0x3a, 0x91, 0x11, 0x41, 0x4f, 0x67, 0xdc,
    0xea, 0x97, 0xf2, 0xcf, 0xce, 0xf0, 0xb4, 0xe6, 0x73, 0x96, 0xac, 0x74, 0x22, 0xe7, 0xad,
    0x35, 0x85, 0xe2, 0xf9, 0x37, 0xe8, 0x1c, 0x75, 0xdf, 0x6e, 0x47, 0xf1, 0x1a, 0x71, 0x1d,
    0x29, 0xc5, 0x89, 0x6f, 0xb7, 0x62, 0x0e, 0xaa, 0x18, 0xbe, 0x1b, 0xfc, 0x56, 0x3e, 0x4b,
    0xc6, 0xd2, 0x79, 0x20, 0x9a, 0xdb, 0xc0, 0xfe, 0x78, 0xcd, 0x5a, 0xf4, 0x1f, 0xdd, 0xa8,
    0x33, 0x88, 0x07, 0xc7, 0x31, 0xb1, 0x12, 0x10, 0x59, 0x27, 0x80, 0xec, 0x5f, 0x60, 0x51,
    0x7f, 0xa9, 0x19, 0xb5, 0x4a, 0x0d, 0x2d, 0xe5, 0x7a, 0x9f, 0x93, 0xc9, 0x9c, 0xef, 0xa0,
    0xe0, 0x3b, 0x4d, 0xae, 0x2a, 0xf5, 0xb0, 0xc8, 0xeb, 0xbb, 0x3c, 0x83, 0x53, 0x99, 0x61,
    0x17, 0x2b, 0x04, 0x7e, 0xba, 0x77, 0xd6, 0x26, 0xe1, 0x69, 0x14, 0x63, 0x55, 0x21, 0x0c,
    0x7d,
];

const RCON: [u32; 10] = [
    0x0100_0000,
    0x0200_0000,
    0x0400_0000,
    0x0800_0000,
    0x1000_0000,
    0x2000_0000,
    0x4000_0000,
    0x8000_0000,
    0x1b00_0000,
    0x3600_0000,
];

#[inline]
fn xtime(b: u8) -> u8 {
    (b << 1) ^ (((b >> 7) & 1) * 0x1b)
}

// GF(2^8) multiply, used only by the inverse MixColumns.
fn gf_mul(mut a: u8, mut b: u8) -> u8 {
    let mut r = 0u8;
    for _ in 0..8 {
        r ^= a * (b & 1);
        b >>= 1;
        a = xtime(a);
    }
    r
}

fn sub_word(w: u32) -> u32 {
    let b = w.to_be_bytes();
    u32::from_be_bytes([
        SBOX[b[0] as usize],
        SBOX[b[1] as usize],
        SBOX[b[2] as usize],
        SBOX[b[3] as usize],
    ])
}

/// Expanded key schedule: `4 * (nr + 1)` words.
struct KeySchedule {
    w: [u32; 60],
    nr: usize,
}

impl KeySchedule {
    fn expand(key: &[u8]) -> Result<Self> {
        let nk = match key.len() {
            16 => 4,
            24 => 6,
            32 => 8,
            _ => return Err(Error::InvalidArgument("AES key length")),
        };
        let nr = nk + 6;
        let mut w = [0u32; 60];
        for i in 0..nk {
            w[i] = u32::from_be_bytes([key[4 * i], key[4 * i + 1], key[4 * i + 2], key[4 * i + 3]]);
        }
        for i in nk..4 * (nr + 1) {
            let mut t = w[i - 1];
            if i % nk == 0 {
                t = sub_word(t.rotate_left(8)) ^ RCON[i / nk - 1];
            } else if nk > 6 && i % nk == 4 {
                t = sub_word(t);
            }
            w[i] = w[i - nk] ^ t;
        }
        Ok(KeySchedule { w, nr })
    }

    fn round_key(&self, r: usize) -> [u8; 16] {
        let mut out = [0u8; 16];
        for c in 0..4 {
            out[4 * c..4 * c + 4].copy_from_slice(&self.w[4 * r + c].to_be_bytes());
        }
        out
    }
}

impl Zeroize for KeySchedule {
    fn zeroize(&mut self) {
        self.w.zeroize();
        self.nr = 0;
    }
}

fn add_round_key(s: &mut [u8; 16], rk: &[u8; 16]) {
    for (b, k) in s.iter_mut().zip(rk.iter()) {
        *b ^= k;
    }
}

fn sub_bytes(s: &mut [u8; 16]) {
    for b in s.iter_mut() {
        *b = SBOX[*b as usize];
    }
}

fn inv_sub_bytes(s: &mut [u8; 16]) {
    for b in s.iter_mut() {
        *b = INV_SBOX[*b as usize];
    }
}

// Row r of the state lives at indices r, r+4, r+8, r+12; rotate left by r.
fn shift_rows(s: &mut [u8; 16]) {
    let t = *s;
    for r in 1..4 {
        for c in 0..4 {
            s[r + 4 * c] = t[r + 4 * ((c + r) % 4)];
        }
    }
}

fn inv_shift_rows(s: &mut [u8; 16]) {
    let t = *s;
    for r in 1..4 {
        for c in 0..4 {
            s[r + 4 * ((c + r) % 4)] = t[r + 4 * c];
        }
    }
}

fn mix_columns(s: &mut [u8; 16]) {
    for c in 0..4 {
        let a = [s[4 * c], s[4 * c + 1], s[4 * c + 2], s[4 * c + 3]];
        s[4 * c] = xtime(a[0]) ^ (xtime(a[1]) ^ a[1]) ^ a[2] ^ a[3];
        s[4 * c + 1] = a[0] ^ xtime(a[1]) ^ (xtime(a[2]) ^ a[2]) ^ a[3];
        s[4 * c + 2] = a[0] ^ a[1] ^ xtime(a[2]) ^ (xtime(a[3]) ^ a[3]);
        s[4 * c + 3] = (xtime(a[0]) ^ a[0]) ^ a[1] ^ a[2] ^ xtime(a[3]);
    }
}

fn inv_mix_columns(s: &mut [u8; 16]) {
    for c in 0..4 {
        let a = [s[4 * c], s[4 * c + 1], s[4 * c + 2], s[4 * c + 3]];
        s[4 * c] = gf_mul(a[0], 0x0e) ^ gf_mul(a[1], 0x0b) ^ gf_mul(a[2], 0x0d) ^ gf_mul(a[3], 0x09);
        s[4 * c + 1] =
            gf_mul(a[0], 0x09) ^ gf_mul(a[1], 0x0e) ^ gf_mul(a[2], 0x0b) ^ gf_mul(a[3], 0x0d);
        s[4 * c + 2] =
            gf_mul(a[0], 0x0d) ^ gf_mul(a[1], 0x09) ^ gf_mul(a[2], 0x0e) ^ gf_mul(a[3], 0x0b);
        s[4 * c + 3] =
            gf_mul(a[0], 0x0b) ^ gf_mul(a[1], 0x0d) ^ gf_mul(a[2], 0x09) ^ gf_mul(a[3], 0x0e);
    }
}

struct PortableAes {
    ks: KeySchedule,
}

impl PortableAes {
    fn new(key: &[u8]) -> Result<Self> {
        Ok(PortableAes {
            ks: KeySchedule::expand(key)?,
        })
    }

    fn encrypt(&self, block: &mut [u8; 16]) {
        add_round_key(block, &self.ks.round_key(0));
        // After the first key mix the state no longer reveals the key under
        // a timing model.
        ct::unpoison(block);
        for r in 1..self.ks.nr {
            sub_bytes(block);
            shift_rows(block);
            mix_columns(block);
            add_round_key(block, &self.ks.round_key(r));
        }
        sub_bytes(block);
        shift_rows(block);
        add_round_key(block, &self.ks.round_key(self.ks.nr));
    }

    fn decrypt(&self, block: &mut [u8; 16]) {
        add_round_key(block, &self.ks.round_key(self.ks.nr));
        for r in (1..self.ks.nr).rev() {
            inv_shift_rows(block);
            inv_sub_bytes(block);
            add_round_key(block, &self.ks.round_key(r));
            inv_mix_columns(block);
        }
        inv_shift_rows(block);
        inv_sub_bytes(block);
        add_round_key(block, &self.ks.round_key(0));
    }
}

enum HwAes {
    A128(aes::Aes128),
    A192(aes::Aes192),
    A256(aes::Aes256),
}

impl HwAes {
    fn new(key: &[u8]) -> Result<Self> {
        match key.len() {
            16 => Ok(HwAes::A128(
                aes::Aes128::new_from_slice(key).map_err(|_| Error::InvalidArgument("AES key"))?,
            )),
            24 => Ok(HwAes::A192(
                aes::Aes192::new_from_slice(key).map_err(|_| Error::InvalidArgument("AES key"))?,
            )),
            32 => Ok(HwAes::A256(
                aes::Aes256::new_from_slice(key).map_err(|_| Error::InvalidArgument("AES key"))?,
            )),
            _ => Err(Error::InvalidArgument("AES key length")),
        }
    }

    fn encrypt(&self, block: &mut [u8; 16]) {
        let ga = aes::cipher::generic_array::GenericArray::from_mut_slice(block);
        match self {
            HwAes::A128(c) => c.encrypt_block(ga),
            HwAes::A192(c) => c.encrypt_block(ga),
            HwAes::A256(c) => c.encrypt_block(ga),
        }
    }

    fn decrypt(&self, block: &mut [u8; 16]) {
        let ga = aes::cipher::generic_array::GenericArray::from_mut_slice(block);
        match self {
            HwAes::A128(c) => c.decrypt_block(ga),
            HwAes::A192(c) => c.decrypt_block(ga),
            HwAes::A256(c) => c.decrypt_block(ga),
        }
    }
}

enum Inner {
    Portable(PortableAes),
    Hw(HwAes),
}

/// One block-cipher back-end and its selection conditions.
type AesBackend = Implementation<fn(&[u8]) -> Result<Inner>>;

#[cfg(target_arch = "x86_64")]
const HW_REQUIRED: u32 = cpu::AESNI;
#[cfg(target_arch = "aarch64")]
const HW_REQUIRED: u32 = cpu::ARM_AES;
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
const HW_REQUIRED: u32 = u32::MAX;

/// All block-cipher back-ends bound at build time.
static BACKENDS: &[AesBackend] = &[
    AesBackend {
        name: "aes-hw",
        required: HW_REQUIRED,
        priority: 10,
        table: |key| HwAes::new(key).map(Inner::Hw),
    },
    AesBackend {
        name: "aes-portable",
        required: 0,
        priority: 0,
        table: |key| PortableAes::new(key).map(Inner::Portable),
    },
];

// FIPS-197 appendix C known answers, key 000102...  plaintext
// 00112233445566778899aabbccddeeff.
const KAT_PT: [u8; 16] = [
    0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee,
    0xff,
];

fn kat_backend(backend: &AesBackend) -> bool {
    let mut key = [0u8; 32];
    for (i, k) in key.iter_mut().enumerate() {
        *k = i as u8;
    }
    let cases: [(&[u8], &str); 3] = [
        (&key[..16], "69c4e0d86a7b0430d8cdb78070b4c55a"),
        (&key[..24], "dda97ca4864cdfe06eaf70a0ec0d7191"),
        (&key[..32], "8ea2b7ca516745bfeafc49904b496089"),
    ];
    for (k, expected_hex) in cases {
        let expected = hex::decode(expected_hex).unwrap_or_default();
        let cipher = match (backend.table)(k) {
            Ok(c) => c,
            Err(_) => return false,
        };
        let mut block = KAT_PT;

        #[cfg(feature = "fips")]
        {
            let mut corrupt = KAT_PT;
            corrupt[0] ^= 0x01;
            match &cipher {
                Inner::Portable(c) => c.encrypt(&mut corrupt),
                Inner::Hw(c) => c.encrypt(&mut corrupt),
            }
            if ct::consttime_compare(&corrupt, &expected) == 0 {
                return false;
            }
        }

        match &cipher {
            Inner::Portable(c) => c.encrypt(&mut block),
            Inner::Hw(c) => c.encrypt(&mut block),
        }
        if ct::consttime_compare(&block, &expected) != 0 {
            return false;
        }
        // Round-trip through the decrypt path.
        match &cipher {
            Inner::Portable(c) => c.decrypt(&mut block),
            Inner::Hw(c) => c.decrypt(&mut block),
        }
        if ct::consttime_compare(&block, &KAT_PT) != 0 {
            return false;
        }
    }
    true
}

static SELECTED: OnceLock<Option<&'static AesBackend>> = OnceLock::new();

fn select_and_latch() -> Option<&'static AesBackend> {
    let sel = dispatch::select(BACKENDS, kat_backend);
    status::record(AlgId::AesBlock, sel.is_some());
    if let Some(backend) = sel {
        tracing::debug!(backend = backend.name, "AES back-end selected");
    }
    sel
}

fn selected() -> Result<&'static AesBackend> {
    SELECTED
        .get_or_init(select_and_latch)
        .ok_or(Error::SelftestFailed(AlgId::AesBlock))
}

/// AES behind the Sym capability, back-end chosen by the dispatcher.
pub struct AesCipher {
    inner: Option<Inner>,
}

impl AesCipher {
    pub fn new() -> Self {
        AesCipher { inner: None }
    }

    /// Key and construct in one step.
    pub fn with_key(key: &[u8]) -> Result<Self> {
        let mut c = Self::new();
        c.set_key(key)?;
        Ok(c)
    }

    /// Portable-only constructor; the cross-back-end tests key both paths
    /// explicitly.
    pub fn with_key_portable(key: &[u8]) -> Result<Self> {
        Ok(AesCipher {
            inner: Some(Inner::Portable(PortableAes::new(key)?)),
        })
    }
}

impl Default for AesCipher {
    fn default() -> Self {
        Self::new()
    }
}

impl Sym for AesCipher {
    const BLOCK_LEN: usize = 16;

    fn set_key(&mut self, key: &[u8]) -> Result<()> {
        ct::poison(key);
        let backend = selected()?;
        self.inner = Some((backend.table)(key)?);
        Ok(())
    }

    fn encrypt_block(&self, block: &mut [u8; 16]) -> Result<()> {
        match &self.inner {
            Some(Inner::Portable(c)) => {
                c.encrypt(block);
                Ok(())
            }
            Some(Inner::Hw(c)) => {
                c.encrypt(block);
                Ok(())
            }
            None => Err(Error::InvalidState),
        }
    }

    fn decrypt_block(&self, block: &mut [u8; 16]) -> Result<()> {
        match &self.inner {
            Some(Inner::Portable(c)) => {
                c.decrypt(block);
                Ok(())
            }
            Some(Inner::Hw(c)) => {
                c.decrypt(block);
                Ok(())
            }
            None => Err(Error::InvalidState),
        }
    }

    fn zero(&mut self) {
        if let Some(Inner::Portable(c)) = &mut self.inner {
            c.ks.zeroize();
        }
        // The hardware cipher's schedule lives inside the upstream type and
        // is dropped without an explicit wipe.
        self.inner = None;
    }
}

impl Zeroize for AesCipher {
    fn zeroize(&mut self) {
        self.zero();
    }
}

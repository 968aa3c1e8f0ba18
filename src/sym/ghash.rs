//! GHASH (SP 800-38D)
//!
//! Streaming GF(2^128) universal hash with internal partial-block
//! buffering. The multiply is branch-free: both the accumulate and the
//! reduction step are mask-selected.
#![forbid(unsafe_code)]

use zeroize::Zeroize;

// Reduction polynomial, GCM bit order.
const R: u128 = 0xe1u128 << 120;

fn gf128_mul(x: u128, y: u128) -> u128 {
    let mut z = 0u128;
    let mut v = x;
    for i in 0..128 {
        let bit = (y >> (127 - i)) & 1;
        z ^= v & bit.wrapping_neg();
        let lsb = v & 1;
        v >>= 1;
        v ^= R & lsb.wrapping_neg();
    }
    z
}

pub(crate) struct Ghash {
    h: u128,
    acc: u128,
    buf: [u8; 16],
    buf_len: usize,
}

impl Ghash {
    pub fn new(h: &[u8; 16]) -> Self {
        Ghash {
            h: u128::from_be_bytes(*h),
            acc: 0,
            buf: [0u8; 16],
            buf_len: 0,
        }
    }

    fn absorb_block(&mut self, block: &[u8; 16]) {
        self.acc = gf128_mul(self.acc ^ u128::from_be_bytes(*block), self.h);
    }

    pub fn update(&mut self, mut data: &[u8]) {
        if self.buf_len > 0 {
            let take = data.len().min(16 - self.buf_len);
            self.buf[self.buf_len..self.buf_len + take].copy_from_slice(&data[..take]);
            self.buf_len += take;
            data = &data[take..];
            if self.buf_len == 16 {
                let block = self.buf;
                self.absorb_block(&block);
                self.buf_len = 0;
            }
        }
        while data.len() >= 16 {
            let mut block = [0u8; 16];
            block.copy_from_slice(&data[..16]);
            self.absorb_block(&block);
            data = &data[16..];
        }
        if !data.is_empty() {
            self.buf[..data.len()].copy_from_slice(data);
            self.buf_len = data.len();
        }
    }

    /// Close the current segment: a partial block is padded with zeros
    /// (virtually, per the GCM definition) and absorbed.
    pub fn flush_zero_pad(&mut self) {
        if self.buf_len > 0 {
            let mut block = [0u8; 16];
            block[..self.buf_len].copy_from_slice(&self.buf[..self.buf_len]);
            self.absorb_block(&block);
            self.buf_len = 0;
        }
    }

    /// Absorb the final `len64(a_bits) || len64(c_bits)` block.
    pub fn lengths(&mut self, a_bits: u64, c_bits: u64) {
        let mut block = [0u8; 16];
        block[..8].copy_from_slice(&a_bits.to_be_bytes());
        block[8..].copy_from_slice(&c_bits.to_be_bytes());
        self.absorb_block(&block);
    }

    pub fn tag(&self) -> [u8; 16] {
        self.acc.to_be_bytes()
    }
}

impl Zeroize for Ghash {
    fn zeroize(&mut self) {
        self.h = 0;
        self.acc = 0;
        self.buf.zeroize();
        self.buf_len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_identity() {
        // The field identity element is x^0 = leftmost bit set.
        let one = 1u128 << 127;
        let x = 0x0123_4567_89ab_cdef_fedc_ba98_7654_3210u128;
        assert_eq!(gf128_mul(x, one), x);
        assert_eq!(gf128_mul(one, x), x);
    }

    #[test]
    fn mul_commutes() {
        let a = 0xdead_beef_0bad_cafe_1234_5678_9abc_def0u128;
        let b = 0x0f0e_0d0c_0b0a_0908_0706_0504_0302_0100u128;
        assert_eq!(gf128_mul(a, b), gf128_mul(b, a));
    }

    #[test]
    fn chunked_update_equals_block_update() {
        let h = [0x42u8; 16];
        let data: Vec<u8> = (0..80u8).collect();

        let mut a = Ghash::new(&h);
        a.update(&data);
        a.flush_zero_pad();
        a.lengths(0, (data.len() as u64) * 8);

        let mut b = Ghash::new(&h);
        for chunk in data.chunks(7) {
            b.update(chunk);
        }
        b.flush_zero_pad();
        b.lengths(0, (data.len() as u64) * 8);

        assert_eq!(a.tag(), b.tag());
    }
}

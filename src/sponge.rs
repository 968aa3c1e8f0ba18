//! Sponge engine
//!
//! The absorb/squeeze state machine shared by every Keccak-derived variant
//! and by the Ascon family. The permutation, rate, padding byte and
//! final-block bit are injected at init, so the engine itself carries no
//! knowledge of any particular scheme.
//!
//! State machine: `absorbing` (initial) -> `squeezing`, one-way per
//! generation. `update` after the transition is rejected; a fresh `init`
//! starts a new generation.
//!
//! Byte-level access (`add_bytes`, `extract_bytes`) is exposed so the
//! higher constructions (cSHAKE prefix, KMAC key block) can write into
//! state without re-entering the public hash API.
#![forbid(unsafe_code)]

use zeroize::Zeroize;

use crate::ct;
use crate::error::{Error, Result};

/// Generic sponge over `W` 64-bit lanes. Keccak uses `W = 25`, Ascon
/// `W = 5`. Lane bytes are little-endian; byte `i` of the state lives in
/// lane `i / 8` at bit offset `8 * (i % 8)`.
pub struct Sponge<const W: usize> {
    lanes: [u64; W],
    rate: usize,
    padding: u8,
    /// XORed into byte `rate - 1` when finalizing; 0 when the scheme has no
    /// final-block bit (Ascon).
    final_bit: u8,
    msg_len: u64,
    squeeze_more: bool,
    offset: usize,
    permute: fn(&mut [u64; W]),
}

impl<const W: usize> Sponge<W> {
    pub fn new(rate: usize, padding: u8, final_bit: u8, permute: fn(&mut [u64; W])) -> Self {
        debug_assert!(rate <= W * 8);
        Sponge {
            lanes: [0u64; W],
            rate,
            padding,
            final_bit,
            msg_len: 0,
            squeeze_more: false,
            offset: 0,
            permute,
        }
    }

    /// Reset to the all-zero absorbing state, keeping the parameterization.
    pub fn reinit(&mut self) {
        ct::wipe_lanes(&mut self.lanes);
        self.msg_len = 0;
        self.squeeze_more = false;
        self.offset = 0;
    }

    pub fn rate(&self) -> usize {
        self.rate
    }

    /// Absorbed byte count of the current generation.
    pub fn msg_len(&self) -> u64 {
        self.msg_len
    }

    pub fn is_squeezing(&self) -> bool {
        self.squeeze_more
    }

    /// XOR one byte into the state at byte position `pos`.
    #[inline]
    pub fn add_byte(&mut self, pos: usize, b: u8) {
        self.lanes[pos / 8] ^= (b as u64) << (8 * (pos % 8));
    }

    /// XOR `data` into state starting at byte position `pos`; the caller
    /// keeps `pos + data.len() <= rate`.
    pub fn add_bytes(&mut self, pos: usize, data: &[u8]) {
        let mut i = pos;
        let mut rest = data;
        // head to the next lane boundary
        while i % 8 != 0 && !rest.is_empty() {
            self.lanes[i / 8] ^= (rest[0] as u64) << (8 * (i % 8));
            i += 1;
            rest = &rest[1..];
        }
        // whole lanes
        while rest.len() >= 8 {
            let mut lane = [0u8; 8];
            lane.copy_from_slice(&rest[..8]);
            self.lanes[i / 8] ^= u64::from_le_bytes(lane);
            i += 8;
            rest = &rest[8..];
        }
        // tail
        for b in rest {
            self.lanes[i / 8] ^= (*b as u64) << (8 * (i % 8));
            i += 1;
        }
    }

    /// Copy state bytes out, starting at byte position `pos`.
    pub fn extract_bytes(&self, pos: usize, out: &mut [u8]) {
        let mut i = pos;
        for b in out.iter_mut() {
            *b = (self.lanes[i / 8] >> (8 * (i % 8))) as u8;
            i += 1;
        }
    }

    pub fn permute(&mut self) {
        (self.permute)(&mut self.lanes);
    }

    /// Absorb `data`, buffering the partial block through the state itself
    /// (offset `msg_len mod rate`).
    pub fn absorb(&mut self, data: &[u8]) -> Result<()> {
        if self.squeeze_more {
            return Err(Error::InvalidState);
        }
        let mut rest = data;
        let mut off = (self.msg_len % self.rate as u64) as usize;

        // complete the partial block
        if off != 0 {
            let take = rest.len().min(self.rate - off);
            self.add_bytes(off, &rest[..take]);
            rest = &rest[take..];
            off += take;
            if off == self.rate {
                self.permute();
                off = 0;
            }
        }
        // bulk whole blocks
        while rest.len() >= self.rate {
            self.add_bytes(0, &rest[..self.rate]);
            self.permute();
            rest = &rest[self.rate..];
        }
        // residual
        if !rest.is_empty() {
            debug_assert_eq!(off, 0);
            self.add_bytes(0, rest);
        }
        self.msg_len += data.len() as u64;
        Ok(())
    }

    /// First call injects padding and transitions to squeezing; every call
    /// (including later ones) extracts `out.len()` bytes, permuting at rate
    /// boundaries. A zero-length squeeze is a no-op that leaves `offset`
    /// unchanged.
    pub fn squeeze(&mut self, out: &mut [u8]) {
        if !self.squeeze_more {
            let off = (self.msg_len % self.rate as u64) as usize;
            self.add_byte(off, self.padding);
            if self.final_bit != 0 {
                self.add_byte(self.rate - 1, self.final_bit);
            }
            self.permute();
            self.squeeze_more = true;
            self.offset = 0;
        }
        let mut written = 0;
        while written < out.len() {
            if self.offset == self.rate {
                self.permute();
                self.offset = 0;
            }
            let take = (self.rate - self.offset).min(out.len() - written);
            self.extract_bytes(self.offset, &mut out[written..written + take]);
            self.offset += take;
            written += take;
        }
    }

    /// Pad the current partial block, permute, and restart absorption on a
    /// block boundary. Closes an absorbed segment (a customization string)
    /// ahead of the message phase.
    pub fn finish_segment(&mut self) -> Result<()> {
        if self.squeeze_more {
            return Err(Error::InvalidState);
        }
        let off = (self.msg_len % self.rate as u64) as usize;
        self.add_byte(off, self.padding);
        if self.final_bit != 0 {
            self.add_byte(self.rate - 1, self.final_bit);
        }
        self.permute();
        self.msg_len = 0;
        Ok(())
    }

    /// Wipe the state and return to the parameterized initial state.
    pub fn zero(&mut self) {
        self.reinit();
    }
}

impl<const W: usize> Clone for Sponge<W> {
    fn clone(&self) -> Self {
        Sponge {
            lanes: self.lanes,
            rate: self.rate,
            padding: self.padding,
            final_bit: self.final_bit,
            msg_len: self.msg_len,
            squeeze_more: self.squeeze_more,
            offset: self.offset,
            permute: self.permute,
        }
    }
}

impl<const W: usize> Zeroize for Sponge<W> {
    fn zeroize(&mut self) {
        self.lanes.zeroize();
        self.msg_len = 0;
        self.squeeze_more = false;
        self.offset = 0;
    }
}

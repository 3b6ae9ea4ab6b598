// Copyright 2024 The fss-core Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The 128-bit value type that flows through every level of a GGM tree walk.
//!
//! `Block` stores its bytes in little-endian lane order so that `lane_u32`/`lane_u16`
//! line up with how a fixed-key AES block cipher and the packed leaf formats in
//! [`crate::dpf`] address memory. Arithmetic on a `Block` is always either bytewise
//! (XOR/AND) or per-lane (wrapping 16-/32-bit add/sub); there is no 128-bit integer
//! arithmetic, because none of the algorithms built on top of `Block` need it.

use core::fmt;
use core::ops::{BitAnd, BitXor};

use zeroize::Zeroize;

/// A 128-bit value, addressable as 16 bytes, eight 16-bit lanes, or four 32-bit lanes.
///
/// The least-significant bit of byte 0 is reserved by the DPF/DCF tree walk as the
/// "control bit" channel (see [`Block::lsb`] / [`Block::with_lsb_zero`]); callers
/// outside this crate can otherwise treat a `Block` as an opaque 128-bit blob.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Block(pub(crate) [u8; 16]);

impl Block {
    /// The all-zero block.
    pub const ZERO: Block = Block([0u8; 16]);

    /// The all-one-bits block.
    pub const ALL_ONES: Block = Block([0xff; 16]);

    /// Two-element table indexed by a control bit, implementing "multiply by bit"
    /// without branching: `cw.and(&SELECT[bit as usize])`.
    pub const SELECT: [Block; 2] = [Block::ZERO, Block::ALL_ONES];

    /// Builds a block from two 64-bit halves (`lo` occupies bytes 0..8, `hi` bytes 8..16).
    pub fn from_u64_pair(hi: u64, lo: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&lo.to_le_bytes());
        bytes[8..].copy_from_slice(&hi.to_le_bytes());
        Block(bytes)
    }

    /// Builds a block whose lane 0 (low 64 bits) holds `value` and whose remaining bits
    /// are zero. Used to store a scalar ring element in a block, e.g. the naive DPF key
    /// `output` field.
    pub fn from_lane0(value: u64) -> Self {
        Block::from_u64_pair(0, value)
    }

    /// Raw byte view, little-endian lane 0 first.
    pub fn to_bytes(self) -> [u8; 16] {
        self.0
    }

    /// Builds a block directly from its raw bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Block(bytes)
    }

    /// Bytewise XOR.
    pub fn xor(self, other: Block) -> Block {
        let mut out = [0u8; 16];
        for i in 0..16 {
            out[i] = self.0[i] ^ other.0[i];
        }
        Block(out)
    }

    /// Bytewise AND.
    pub fn and(self, other: Block) -> Block {
        let mut out = [0u8; 16];
        for i in 0..16 {
            out[i] = self.0[i] & other.0[i];
        }
        Block(out)
    }

    /// The control bit: the least-significant bit of byte 0.
    pub fn lsb(self) -> bool {
        self.0[0] & 1 == 1
    }

    /// Returns a copy of this block with the control bit (byte-0 LSB) forced to zero.
    ///
    /// Every PRG expansion output must be passed through this before being XOR-ed with a
    /// seed correction word, or the control bit leaks into the seed's high-order
    /// randomness (see the design note on this in `SPEC_FULL.md`).
    pub fn with_lsb_zero(self) -> Block {
        let mut bytes = self.0;
        bytes[0] &= !1;
        Block(bytes)
    }

    /// Reads bit `pos` (0 = LSB of byte 0, 127 = MSB of byte 15).
    pub fn bit_at(self, pos: u32) -> bool {
        let byte = (pos / 8) as usize;
        let bit = pos % 8;
        (self.0[byte] >> bit) & 1 == 1
    }

    /// Returns a copy of this block with bit `pos` set or cleared.
    pub fn with_bit(mut self, pos: u32, value: bool) -> Block {
        let byte = (pos / 8) as usize;
        let bit = pos % 8;
        if value {
            self.0[byte] |= 1 << bit;
        } else {
            self.0[byte] &= !(1 << bit);
        }
        self
    }

    /// Reads byte `idx` (0..16).
    pub fn byte_at(self, idx: usize) -> u8 {
        self.0[idx]
    }

    /// Low 64 bits (lane 0 under the 32-/16-bit lane numbering), little-endian.
    pub fn low_u64(self) -> u64 {
        u64::from_le_bytes(self.0[0..8].try_into().unwrap())
    }

    /// High 64 bits, little-endian.
    pub fn high_u64(self) -> u64 {
        u64::from_le_bytes(self.0[8..16].try_into().unwrap())
    }

    /// Reads 32-bit lane `lane` (0..4), little-endian.
    pub fn lane_u32(self, lane: usize) -> u32 {
        let start = lane * 4;
        u32::from_le_bytes(self.0[start..start + 4].try_into().unwrap())
    }

    /// Returns a copy of this block with 32-bit lane `lane` replaced by `value`.
    pub fn with_lane_u32(mut self, lane: usize, value: u32) -> Block {
        let start = lane * 4;
        self.0[start..start + 4].copy_from_slice(&value.to_le_bytes());
        self
    }

    /// Reads 16-bit lane `lane` (0..8), little-endian.
    pub fn lane_u16(self, lane: usize) -> u16 {
        let start = lane * 2;
        u16::from_le_bytes(self.0[start..start + 2].try_into().unwrap())
    }

    /// Returns a copy of this block with 16-bit lane `lane` replaced by `value`.
    pub fn with_lane_u16(mut self, lane: usize, value: u16) -> Block {
        let start = lane * 2;
        self.0[start..start + 2].copy_from_slice(&value.to_le_bytes());
        self
    }

    /// Lane-wise wrapping add across the four 32-bit lanes.
    pub fn lane32_add(self, other: Block) -> Block {
        let mut out = Block::ZERO;
        for lane in 0..4 {
            out = out.with_lane_u32(lane, self.lane_u32(lane).wrapping_add(other.lane_u32(lane)));
        }
        out
    }

    /// Lane-wise wrapping subtract across the four 32-bit lanes (`self - other`).
    pub fn lane32_sub(self, other: Block) -> Block {
        let mut out = Block::ZERO;
        for lane in 0..4 {
            out = out.with_lane_u32(lane, self.lane_u32(lane).wrapping_sub(other.lane_u32(lane)));
        }
        out
    }

    /// Lane-wise wrapping add across the eight 16-bit lanes.
    pub fn lane16_add(self, other: Block) -> Block {
        let mut out = Block::ZERO;
        for lane in 0..8 {
            out = out.with_lane_u16(lane, self.lane_u16(lane).wrapping_add(other.lane_u16(lane)));
        }
        out
    }

    /// Lane-wise wrapping subtract across the eight 16-bit lanes (`self - other`).
    pub fn lane16_sub(self, other: Block) -> Block {
        let mut out = Block::ZERO;
        for lane in 0..8 {
            out = out.with_lane_u16(lane, self.lane_u16(lane).wrapping_sub(other.lane_u16(lane)));
        }
        out
    }
}

impl BitXor for Block {
    type Output = Block;
    fn bitxor(self, rhs: Block) -> Block {
        self.xor(rhs)
    }
}

impl BitAnd for Block {
    type Output = Block;
    fn bitand(self, rhs: Block) -> Block {
        self.and(rhs)
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Block(")?;
        for byte in self.0.iter() {
            write!(f, "{:02x}", byte)?;
        }
        f.write_str(")")
    }
}

impl Zeroize for Block {
    fn zeroize(&mut self) {
        self.0 = [0u8; 16];
    }
}

/// Extracts the low `bits` bits of `value.low_u64()` as an integer in `0..2^bits`.
///
/// This is the `convert(·, e)` helper referenced throughout the generation and
/// evaluation algorithms: it is how a `Block` seed is turned into a ring element of
/// `e` bits.
pub fn convert(value: Block, bits: u32) -> u64 {
    mask_to_bits(value.low_u64(), bits)
}

/// Reduces `value` to its low `bits` bits. `bits >= 64` is the identity.
pub fn mask_to_bits(value: u64, bits: u32) -> u64 {
    if bits >= 64 {
        value
    } else {
        value & ((1u64 << bits) - 1)
    }
}

/// Applies `sign(negative)` to `value` under wrapping `u64` arithmetic: `-value` when
/// `negative`, `value` otherwise. Combined with [`mask_to_bits`] at the point of use,
/// this realizes the ring-Z/2^e arithmetic the generation and evaluation algorithms
/// describe as `sign(bit) * (...)  mod 2^e`, without ever using a signed integer type
/// (see the "`convert()` sign semantics" design note).
pub fn apply_sign(value: u64, negative: bool) -> u64 {
    if negative {
        value.wrapping_neg()
    } else {
        value
    }
}

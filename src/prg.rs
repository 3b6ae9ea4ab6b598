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

//! A correlation-robust, length-doubling pseudo-random generator built from fixed-key
//! AES-128 via the Davies-Meyer construction `G(s) = AES_k(s) XOR s`.
//!
//! [`Prg`] holds four independent, immutable AES-128 key schedules: a left/right pair
//! used to grow the GGM tree's seed chain, and a second left/right pair used only by
//! DCF to grow the per-level value-correction term. A `Prg` is built once and passed
//! by reference into generators and evaluators; see the "Global PRG singleton" design
//! note for why this crate threads a handle instead of reaching for a hidden global.

use core::array;
use std::sync::OnceLock;

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, BlockSizeUser, KeyInit};
use aes::Aes128;

use crate::block::Block;

type AesBlock = GenericArray<u8, <Aes128 as BlockSizeUser>::BlockSize>;

/// Which of the two AES keys (per PRG family) to use when expanding a seed.
///
/// `Left` and `Right` also double as the bit values `0` and `1`: the tree-walk code
/// indexes `[Block; 2]` arrays and `Block::SELECT` directly with a control bit, and
/// converts a bit to a `Side` via [`Side::from_bit`] wherever it needs the named form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Bit value `0`.
    Left,
    /// Bit value `1`.
    Right,
}

impl Side {
    /// Maps a tree-walk bit (`false` = keep/descend-left, `true` = descend-right) to a
    /// `Side`.
    pub fn from_bit(bit: bool) -> Side {
        if bit {
            Side::Right
        } else {
            Side::Left
        }
    }
}

// Fixed, compile-time AES-128 keys. These are not secrets: the security of the PRG
// relies on AES being a good pseudorandom permutation under a *known* key, not on the
// key being hidden (this is exactly the fixed-key hash trick the Davies-Meyer
// construction depends on). The seed-chain keys below are the first 16 bytes of
// SHA-256 digests of fixed ASCII labels, chosen once and frozen; the value-chain keys
// follow the same recipe with different labels so all four schedules are independent.
const SEED_KEY_LEFT: [u8; 16] = [
    0xf2, 0x41, 0x6b, 0xf5, 0x4f, 0x02, 0xe4, 0x46, 0xcc, 0x2c, 0xe9, 0x3f, 0xdb, 0xcc, 0xcc, 0x28,
];
const SEED_KEY_RIGHT: [u8; 16] = [
    0x65, 0x77, 0x6b, 0x09, 0x91, 0xb8, 0xd2, 0x25, 0xda, 0xc1, 0x85, 0x83, 0xc2, 0x12, 0x33, 0x49,
];
const VALUE_KEY_LEFT: [u8; 16] = [
    0x3a, 0x8e, 0x02, 0x11, 0x7c, 0x94, 0x5d, 0xab, 0x6f, 0x10, 0x2d, 0x88, 0x4e, 0x77, 0xb1, 0x0c,
];
const VALUE_KEY_RIGHT: [u8; 16] = [
    0x91, 0x4f, 0xd6, 0x33, 0xa0, 0x58, 0x7e, 0x2b, 0x1d, 0xc4, 0x96, 0x3f, 0x22, 0x85, 0x6a, 0xe7,
];

/// A handle to the four fixed-key AES-128 schedules the DPF/DCF tree walk needs.
///
/// Construction (`Aes128::new`) runs AES's key schedule once; everything after that is
/// read-only, so `&Prg` is `Send + Sync` and may be shared across threads without
/// locking.
pub struct Prg {
    seed_left: Aes128,
    seed_right: Aes128,
    value_left: Aes128,
    value_right: Aes128,
}

impl Prg {
    /// Builds a new handle, running the AES-128 key schedule for all four keys.
    pub fn new() -> Self {
        Prg {
            seed_left: Aes128::new(GenericArray::from_slice(&SEED_KEY_LEFT)),
            seed_right: Aes128::new(GenericArray::from_slice(&SEED_KEY_RIGHT)),
            value_left: Aes128::new(GenericArray::from_slice(&VALUE_KEY_LEFT)),
            value_right: Aes128::new(GenericArray::from_slice(&VALUE_KEY_RIGHT)),
        }
    }

    /// A lazily-initialized, process-wide `Prg` for callers who do not want to own one.
    pub fn shared() -> &'static Prg {
        static INSTANCE: OnceLock<Prg> = OnceLock::new();
        INSTANCE.get_or_init(Prg::new)
    }

    fn seed_cipher(&self, side: Side) -> &Aes128 {
        match side {
            Side::Left => &self.seed_left,
            Side::Right => &self.seed_right,
        }
    }

    fn value_cipher(&self, side: Side) -> &Aes128 {
        match side {
            Side::Left => &self.value_left,
            Side::Right => &self.value_right,
        }
    }

    /// `AES_seed[side](input) XOR input`: one half of a GGM tree expansion.
    pub fn expand(&self, input: Block, side: Side) -> Block {
        davies_meyer(self.seed_cipher(side), input)
    }

    /// Both halves of a GGM tree expansion: `(expand(input, Left), expand(input, Right))`.
    pub fn double_expand(&self, input: Block) -> (Block, Block) {
        (self.expand(input, Side::Left), self.expand(input, Side::Right))
    }

    /// The value-keyed analogue of [`Prg::expand`], used only by DCF.
    pub fn expand_value(&self, input: Block, side: Side) -> Block {
        davies_meyer(self.value_cipher(side), input)
    }

    /// The value-keyed analogue of [`Prg::double_expand`], used only by DCF.
    pub fn double_expand_value(&self, input: Block) -> (Block, Block) {
        (
            self.expand_value(input, Side::Left),
            self.expand_value(input, Side::Right),
        )
    }

    /// Expands `N` independent blocks with one batched AES call keyed by `side`.
    ///
    /// For `N = 8` this is the batched AES path the `HybridBatched` full-domain
    /// strategy relies on for its speedup: `encrypt_blocks` pipelines the eight
    /// independent block encryptions instead of issuing eight separate calls.
    pub fn expand_batch<const N: usize>(&self, inputs: [Block; N], side: Side) -> [Block; N] {
        let cipher = self.seed_cipher(side);
        let mut blocks: [AesBlock; N] =
            array::from_fn(|i| GenericArray::clone_from_slice(&inputs[i].to_bytes()));
        cipher.encrypt_blocks(&mut blocks);
        array::from_fn(|i| Block::from_bytes(blocks[i].into()).xor(inputs[i]))
    }
}

impl Default for Prg {
    fn default() -> Self {
        Prg::new()
    }
}

impl core::fmt::Debug for Prg {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Prg").finish_non_exhaustive()
    }
}

fn davies_meyer(cipher: &Aes128, input: Block) -> Block {
    let mut block: AesBlock = GenericArray::clone_from_slice(&input.to_bytes());
    cipher.encrypt_block(&mut block);
    Block::from_bytes(block.into()).xor(input)
}

/// The secure-randomness collaborator this crate's generators require.
///
/// Blanket-implemented for any `rand` CSPRNG (`RngCore + CryptoRng`), so a caller can
/// pass `ChaCha20Rng`, `OsRng`, or `rand::thread_rng()` directly.
pub trait SecureRng {
    /// Draws a uniformly random 64-bit value.
    fn rand_u64(&mut self) -> u64;
    /// Draws a uniformly random 128-bit block.
    fn rand_block(&mut self) -> Block;
    /// Draws a uniformly random bit.
    fn rand_bit(&mut self) -> bool;
}

impl<R: rand::RngCore + rand::CryptoRng> SecureRng for R {
    fn rand_u64(&mut self) -> u64 {
        self.next_u64()
    }

    fn rand_block(&mut self) -> Block {
        let mut bytes = [0u8; 16];
        self.fill_bytes(&mut bytes);
        Block::from_bytes(bytes)
    }

    fn rand_bit(&mut self) -> bool {
        self.next_u32() & 1 == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_is_deterministic_and_side_dependent() {
        let prg = Prg::new();
        let input = Block::from_u64_pair(0x0123_4567_89ab_cdef, 0xfedc_ba98_7654_3210);
        let left_again = prg.expand(input, Side::Left);
        assert_eq!(prg.expand(input, Side::Left), left_again);
        assert_ne!(prg.expand(input, Side::Left), prg.expand(input, Side::Right));
    }

    #[test]
    fn expand_batch_matches_scalar_expand() {
        let prg = Prg::new();
        let inputs: [Block; 8] = array::from_fn(|i| Block::from_u64_pair(0, i as u64));
        let batched = prg.expand_batch(inputs, Side::Left);
        for i in 0..8 {
            assert_eq!(batched[i], prg.expand(inputs[i], Side::Left));
        }
    }

    #[test]
    fn seed_and_value_keys_are_independent() {
        let prg = Prg::new();
        let input = Block::from_u64_pair(1, 2);
        assert_ne!(
            prg.expand(input, Side::Left),
            prg.expand_value(input, Side::Left)
        );
    }
}

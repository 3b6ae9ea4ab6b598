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

//! The per-level GGM tree correction step shared by DPF and DCF generation and
//! evaluation (§4.4-§4.6). Kept separate from `dpf`/`dcf` because both key types
//! correct their seed/control-bit chain identically; DCF layers a value chain on top.

use crate::block::Block;
use crate::prg::{Prg, Side};

/// One party's (seed, control-bit) tree-walk state. Ephemeral: never stored in a key,
/// only threaded through generation/evaluation as local state.
#[derive(Clone, Copy)]
pub(crate) struct PartyState {
    pub seed: Block,
    pub control_bit: bool,
}

/// The correction words a generator emits for one level, identical between both key
/// halves.
pub(crate) struct LevelCorrection {
    pub cw_seed: Block,
    pub cw_control_left: bool,
    pub cw_control_right: bool,
}

/// Generation-side step: given both parties' current state and the current bit of
/// alpha, double-expands both parties' seeds, derives this level's correction words,
/// and advances both parties' state along the "keep" branch (§4.4 steps 2-4).
pub(crate) fn correct_level(
    prg: &Prg,
    alpha_bit: bool,
    party0: &mut PartyState,
    party1: &mut PartyState,
) -> LevelCorrection {
    let (l0, r0) = prg.double_expand(party0.seed);
    let (l1, r1) = prg.double_expand(party1.seed);

    let lsb_l0 = l0.lsb();
    let lsb_r0 = r0.lsb();
    let lsb_l1 = l1.lsb();
    let lsb_r1 = r1.lsb();

    let l0 = l0.with_lsb_zero();
    let r0 = r0.with_lsb_zero();
    let l1 = l1.with_lsb_zero();
    let r1 = r1.with_lsb_zero();

    // lose = 1 - alpha_bit: if alpha_bit is the "1" bit, the lose side is Left (bit 0).
    let lose_is_left = alpha_bit;
    let cw_seed = if lose_is_left { l0.xor(l1) } else { r0.xor(r1) };
    let cw_control_left = lsb_l0 ^ lsb_l1 ^ alpha_bit ^ true;
    let cw_control_right = lsb_r0 ^ lsb_r1 ^ alpha_bit;

    advance(party0, alpha_bit, l0, r0, lsb_l0, lsb_r0, cw_seed, cw_control_left, cw_control_right);
    advance(party1, alpha_bit, l1, r1, lsb_l1, lsb_r1, cw_seed, cw_control_left, cw_control_right);

    LevelCorrection {
        cw_seed,
        cw_control_left,
        cw_control_right,
    }
}

#[allow(clippy::too_many_arguments)]
fn advance(
    party: &mut PartyState,
    keep_bit: bool,
    left_clean: Block,
    right_clean: Block,
    left_lsb: bool,
    right_lsb: bool,
    cw_seed: Block,
    cw_control_left: bool,
    cw_control_right: bool,
) {
    let (keep, keep_lsb, keep_cw) = if keep_bit {
        (right_clean, right_lsb, cw_control_right)
    } else {
        (left_clean, left_lsb, cw_control_left)
    };
    let select = Block::SELECT[party.control_bit as usize];
    party.seed = keep.xor(cw_seed.and(select));
    party.control_bit = keep_lsb ^ (keep_cw && party.control_bit);
}

/// Evaluation-side step: given a running (seed, control-bit) and the level's published
/// correction words, advances along `current_bit` (§4.5 "Point evaluation").
pub(crate) fn evaluate_level(
    prg: &Prg,
    current_bit: bool,
    state: &mut PartyState,
    cw_seed: Block,
    cw_control_left: bool,
    cw_control_right: bool,
) {
    let expansion = prg.expand(state.seed, Side::from_bit(current_bit));
    let lsb = expansion.lsb();
    let clean = expansion.with_lsb_zero();
    let cw_bit = if current_bit {
        cw_control_right
    } else {
        cw_control_left
    };
    let select = Block::SELECT[state.control_bit as usize];
    state.seed = clean.xor(cw_seed.and(select));
    state.control_bit = lsb ^ (cw_bit && state.control_bit);
}

/// Like [`evaluate_level`], but expands both branches at once and returns both resulting
/// states without committing to either. Used by the full-domain strategies that need to
/// walk every path of the tree (`Recursion`'s top-down traversal, and the BFS phase of
/// `HybridBatched`) rather than the single path a `current_bit` picks out.
pub(crate) fn evaluate_level_both(
    prg: &Prg,
    state: &PartyState,
    cw_seed: Block,
    cw_control_left: bool,
    cw_control_right: bool,
) -> (PartyState, PartyState) {
    let (left_raw, right_raw) = prg.double_expand(state.seed);
    let left_lsb = left_raw.lsb();
    let right_lsb = right_raw.lsb();
    let left_clean = left_raw.with_lsb_zero();
    let right_clean = right_raw.with_lsb_zero();
    let select = Block::SELECT[state.control_bit as usize];
    let left = PartyState {
        seed: left_clean.xor(cw_seed.and(select)),
        control_bit: left_lsb ^ (cw_control_left && state.control_bit),
    };
    let right = PartyState {
        seed: right_clean.xor(cw_seed.and(select)),
        control_bit: right_lsb ^ (cw_control_right && state.control_bit),
    };
    (left, right)
}

/// The `i`-th bit of `value` counted from the MSB of an `n`-bit value (bit 0 = MSB).
pub(crate) fn msb_bit(value: u64, n: u32, i: u32) -> bool {
    (value >> (n - 1 - i)) & 1 == 1
}

/// Gray-code walk step used by the iterative full-domain strategies: given the index
/// about to be visited (`current_idx + 1`), returns how many tree levels to pop before
/// descending into the next leaf (`SPEC_FULL.md` §4.5, "Gray-code walk").
pub(crate) fn level_delta(next_idx: u64) -> u32 {
    debug_assert!(next_idx != 0);
    next_idx.trailing_zeros() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_delta_matches_ctz_plus_one() {
        assert_eq!(level_delta(1), 1);
        assert_eq!(level_delta(2), 2);
        assert_eq!(level_delta(4), 3);
        assert_eq!(level_delta(3), 1);
    }
}

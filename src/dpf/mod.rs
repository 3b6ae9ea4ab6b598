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

//! Distributed Point Function key generation and evaluation (C4, C5).
//!
//! A DPF key pair for `(alpha, beta)` lets each of two parties locally evaluate a
//! function `f_b` such that `f_0(x) + f_1(x) = beta` if `x == alpha` and `0` otherwise
//! (wrapping addition mod `2^e`, or XOR for [`OutputMode::SingleBitMask`]). Generation
//! walks a GGM tree from the root down, publishing one correction word per level so
//! that both parties' seed chains agree everywhere except along the path to `alpha`.
//! Evaluation re-walks the same chain using the correction words from a key.
//!
//! When early termination is enabled, the bottom `r = n - nu` levels are never walked
//! individually: instead, the tree is cut at depth `nu` and the corresponding `2^r`
//! leaves are derived from a single extra PRG call, packed into one [`Block`]. See
//! `SPEC_FULL.md` §4.5 for the packing layout by `r`.

mod key;

pub use key::DpfKey;

use core::array;

use secrecy::ExposeSecret;

use crate::block::{apply_sign, convert, mask_to_bits, Block};
use crate::error::Error;
use crate::params::{DpfParameters, EvalType, OutputMode};
use crate::prg::{Prg, SecureRng, Side};
use crate::tree::{correct_level, evaluate_level, evaluate_level_both, level_delta, msb_bit, PartyState};

fn checked_bound(value: u64, bits: u32, field: &'static str) -> Result<(), Error> {
    if bits < 64 && value >= (1u64 << bits) {
        return Err(Error::InvalidInput {
            field,
            value,
            bound: 1u64 << bits,
        });
    }
    Ok(())
}

/// Generates DPF key pairs for a fixed, resolved set of parameters.
#[derive(Debug)]
pub struct DpfKeyGenerator<'a> {
    prg: &'a Prg,
    params: DpfParameters,
}

impl<'a> DpfKeyGenerator<'a> {
    /// Builds a generator bound to `prg` and `params`.
    pub fn new(prg: &'a Prg, params: DpfParameters) -> Self {
        DpfKeyGenerator { prg, params }
    }

    /// The parameters this generator was built with.
    pub fn params(&self) -> &DpfParameters {
        &self.params
    }

    /// Generates a fresh key pair encoding the point function `alpha -> beta`.
    ///
    /// `rng` must be a cryptographically secure source: it seeds both parties' root
    /// seeds, which is the only randomness in the whole construction.
    pub fn generate_keys(
        &self,
        alpha: u64,
        beta: u64,
        rng: &mut impl SecureRng,
    ) -> Result<(DpfKey, DpfKey), Error> {
        checked_bound(alpha, self.params.n(), "alpha")?;
        checked_bound(beta, self.params.e(), "beta")?;

        let mut party0 = PartyState {
            seed: rng.rand_block(),
            control_bit: false,
        };
        let mut party1 = PartyState {
            seed: rng.rand_block(),
            control_bit: true,
        };
        let init_seed0 = party0.seed;
        let init_seed1 = party1.seed;

        let levels = self.params.cw_length();
        let mut cw_seed = Vec::with_capacity(levels as usize);
        let mut cw_control_left = Vec::with_capacity(levels as usize);
        let mut cw_control_right = Vec::with_capacity(levels as usize);

        for i in 0..levels {
            let bit = msb_bit(alpha, self.params.n(), i);
            let correction = correct_level(self.prg, bit, &mut party0, &mut party1);
            cw_seed.push(correction.cw_seed);
            cw_control_left.push(correction.cw_control_left);
            cw_control_right.push(correction.cw_control_right);
        }

        let output = if !self.params.enable_et() {
            self.naive_output(beta, &party0, &party1)
        } else {
            match self.params.output_mode() {
                OutputMode::ShiftedAdditive => self.additive_output(alpha, beta, &party0, &party1),
                OutputMode::SingleBitMask => self.single_bit_output(alpha, &party0, &party1),
            }
        };

        Ok((
            DpfKey::new(
                0,
                init_seed0,
                cw_seed.clone(),
                cw_control_left.clone(),
                cw_control_right.clone(),
                output,
            ),
            DpfKey::new(1, init_seed1, cw_seed, cw_control_left, cw_control_right, output),
        ))
    }

    fn naive_output(&self, beta: u64, party0: &PartyState, party1: &PartyState) -> Block {
        let e = self.params.e();
        let final0 = self.prg.expand(party0.seed, Side::Left);
        let final1 = self.prg.expand(party1.seed, Side::Left);
        let combined = beta.wrapping_sub(convert(final0, e)).wrapping_add(convert(final1, e));
        let signed = apply_sign(combined, party1.control_bit);
        Block::from_lane0(mask_to_bits(signed, e))
    }

    /// `OutputMode::ShiftedAdditive` leaf combine. `r == 7` is reachable here too (a
    /// `e == 1` request that did not ask for `SingleBitMask`): the original value is
    /// placed at bit `alpha_hat` and the whole leaf is XOR-shared, with no sign term,
    /// since there is no notion of "negative" for a single shared bit.
    fn additive_output(&self, alpha: u64, beta: u64, party0: &PartyState, party1: &PartyState) -> Block {
        let r = self.params.r();
        let alpha_hat = mask_to_bits(alpha, r);
        let final0 = self.prg.expand(party0.seed, Side::Left);
        let final1 = self.prg.expand(party1.seed, Side::Left);

        match r {
            2 => {
                let beta_block = Block::ZERO.with_lane_u32(alpha_hat as usize, beta as u32);
                let combined = beta_block.lane32_sub(final0).lane32_add(final1);
                if party1.control_bit {
                    Block::ZERO.lane32_sub(combined)
                } else {
                    combined
                }
            }
            3 => {
                let beta_block = Block::ZERO.with_lane_u16(alpha_hat as usize, beta as u16);
                let combined = beta_block.lane16_sub(final0).lane16_add(final1);
                if party1.control_bit {
                    Block::ZERO.lane16_sub(combined)
                } else {
                    combined
                }
            }
            7 => {
                let beta_block = Block::ZERO.with_bit(alpha_hat as u32, beta & 1 == 1);
                beta_block.xor(final0).xor(final1)
            }
            _ => unreachable!("parameter resolution guarantees r in {{2, 3, 7}} under early termination"),
        }
    }

    /// `OutputMode::SingleBitMask` leaf combine (always `r == 7`). Unlike
    /// `additive_output`, `beta` plays no role: this mode only ever encodes the
    /// indicator function (the bit at `alpha` flips, nothing else does), matching the
    /// generator this crate was grounded on.
    fn single_bit_output(&self, alpha: u64, party0: &PartyState, party1: &PartyState) -> Block {
        let r = self.params.r();
        let alpha_hat = mask_to_bits(alpha, r);
        let final0 = self.prg.expand(party0.seed, Side::Left);
        let final1 = self.prg.expand(party1.seed, Side::Left);
        let flip = Block::ZERO.with_bit(alpha_hat as u32, true);
        final0.xor(final1).xor(flip)
    }
}

/// Evaluates DPF keys for a fixed, resolved set of parameters.
#[derive(Debug)]
pub struct DpfEvaluator<'a> {
    prg: &'a Prg,
    params: DpfParameters,
}

impl<'a> DpfEvaluator<'a> {
    /// Builds an evaluator bound to `prg` and `params`.
    pub fn new(prg: &'a Prg, params: DpfParameters) -> Self {
        DpfEvaluator { prg, params }
    }

    /// The parameters this evaluator was built with.
    pub fn params(&self) -> &DpfParameters {
        &self.params
    }

    /// Evaluates `key` at a single point `x`, returning this party's share of `f(x)`.
    pub fn evaluate_at(&self, key: &DpfKey, x: u64) -> Result<u64, Error> {
        checked_bound(x, self.params.n(), "x")?;

        let mut state = PartyState {
            seed: *key.init_seed().expose_secret(),
            control_bit: key.party_id() == 1,
        };
        let levels = self.params.cw_length();
        for i in 0..levels {
            let bit = msb_bit(x, self.params.n(), i);
            evaluate_level(
                self.prg,
                bit,
                &mut state,
                key.cw_seed()[i as usize],
                key.cw_control_left()[i as usize],
                key.cw_control_right()[i as usize],
            );
        }

        let e = self.params.e();
        if !self.params.enable_et() {
            let expanded = self.prg.expand(state.seed, Side::Left);
            let term = convert(expanded, e).wrapping_add(if state.control_bit {
                convert(key.output(), e)
            } else {
                0
            });
            Ok(mask_to_bits(apply_sign(term, key.party_id() == 1), e))
        } else {
            let r = self.params.r();
            let alpha_hat = mask_to_bits(x, r);
            let leaf = self.compute_leaf_block(&state, key);
            Ok(mask_to_bits(get_split_block_value(leaf, r, alpha_hat), e))
        }
    }

    /// The final single-sided PRG hop plus per-`r` leaf combine, shared by point
    /// evaluation and every full-domain strategy that produces packed leaf blocks.
    fn compute_leaf_block(&self, state: &PartyState, key: &DpfKey) -> Block {
        let r = self.params.r();
        let expanded = self.prg.expand(state.seed, Side::Left);
        let masked_output = key.output().and(Block::SELECT[state.control_bit as usize]);
        match r {
            2 => {
                let combined = expanded.lane32_add(masked_output);
                if key.party_id() == 1 {
                    Block::ZERO.lane32_sub(combined)
                } else {
                    combined
                }
            }
            3 => {
                let combined = expanded.lane16_add(masked_output);
                if key.party_id() == 1 {
                    Block::ZERO.lane16_sub(combined)
                } else {
                    combined
                }
            }
            7 => expanded.xor(masked_output),
            _ => unreachable!("parameter resolution guarantees r in {{2, 3, 7}} under early termination"),
        }
    }

    /// Evaluates `key` over its entire domain, writing one packed leaf [`Block`] per
    /// early-termination subtree (`outputs.len()` must equal `2^nu`).
    ///
    /// Only [`EvalType::Recursion`] and [`EvalType::HybridBatched`] can produce packed
    /// blocks; `Naive` and `DepthFirst` never enable early termination and so have no
    /// packed leaf to hand back (use [`DpfEvaluator::evaluate_full_domain`] instead).
    pub fn evaluate_full_domain_blocks(&self, key: &DpfKey, outputs: &mut [Block]) -> Result<(), Error> {
        if !self.params.enable_et() {
            return Err(Error::UnsupportedEvalType {
                eval_type: self.params.eval_type(),
                context: "packed leaf-block full-domain output",
            });
        }
        let expected = 1usize << self.params.cw_length();
        if outputs.len() != expected {
            return Err(Error::InvalidInput {
                field: "outputs.len()",
                value: outputs.len() as u64,
                bound: expected as u64 + 1,
            });
        }
        match self.params.eval_type() {
            EvalType::Recursion => self.full_domain_recursion(key, outputs),
            EvalType::HybridBatched => self.full_domain_hybrid_batched(key, outputs),
            other => {
                return Err(Error::UnsupportedEvalType {
                    eval_type: other,
                    context: "packed leaf-block full-domain output",
                })
            }
        }
        Ok(())
    }

    /// Evaluates `key` over its entire domain, writing one ring element per point
    /// (`outputs.len()` must equal `2^n`). Dispatches across all four [`EvalType`]
    /// strategies, splitting packed leaf blocks back into scalars for `Recursion` and
    /// `HybridBatched`.
    pub fn evaluate_full_domain(&self, key: &DpfKey, outputs: &mut [u64]) -> Result<(), Error> {
        let n = self.params.n();
        let expected = 1usize << n;
        if outputs.len() != expected {
            return Err(Error::InvalidInput {
                field: "outputs.len()",
                value: outputs.len() as u64,
                bound: expected as u64 + 1,
            });
        }

        match self.params.eval_type() {
            EvalType::Naive => {
                for x in 0..expected as u64 {
                    outputs[x as usize] = self.evaluate_at(key, x)?;
                }
            }
            EvalType::DepthFirst => self.full_domain_depth_first(key, outputs),
            EvalType::Recursion | EvalType::HybridBatched => {
                let r = self.params.r();
                let e = self.params.e();
                let leaf_count = 1usize << self.params.cw_length();
                let mut blocks = vec![Block::ZERO; leaf_count];
                self.evaluate_full_domain_blocks(key, &mut blocks)?;
                let fanout = 1usize << r;
                for (leaf_idx, block) in blocks.iter().enumerate() {
                    for (j, value) in split_block_to_field_vector(*block, r).into_iter().enumerate() {
                        outputs[leaf_idx * fanout + j] = mask_to_bits(value, e);
                    }
                }
            }
        }
        Ok(())
    }

    fn full_domain_recursion(&self, key: &DpfKey, outputs: &mut [Block]) {
        let root = PartyState {
            seed: *key.init_seed().expose_secret(),
            control_bit: key.party_id() == 1,
        };
        self.traverse(key, self.params.cw_length(), 0, root, outputs);
    }

    fn traverse(&self, key: &DpfKey, levels_left: u32, base_idx: usize, state: PartyState, outputs: &mut [Block]) {
        if levels_left == 0 {
            outputs[base_idx] = self.compute_leaf_block(&state, key);
            return;
        }
        let level = self.params.cw_length() - levels_left;
        let (left, right) = evaluate_level_both(
            self.prg,
            &state,
            key.cw_seed()[level as usize],
            key.cw_control_left()[level as usize],
            key.cw_control_right()[level as usize],
        );
        self.traverse(key, levels_left - 1, base_idx * 2, left, outputs);
        self.traverse(key, levels_left - 1, base_idx * 2 + 1, right, outputs);
    }

    /// BFS of the top 3 levels into an 8-wide frontier, then an iterative Gray-code
    /// depth-first walk over the remaining `nu - 3` levels using 8-wide batched AES.
    /// Parameter resolution guarantees `nu >= 3` whenever `HybridBatched` survives
    /// resolution, so the initial BFS always produces exactly 8 states.
    fn full_domain_hybrid_batched(&self, key: &DpfKey, outputs: &mut [Block]) {
        let nu = self.params.cw_length();

        let mut frontier: Vec<PartyState> = vec![PartyState {
            seed: *key.init_seed().expose_secret(),
            control_bit: key.party_id() == 1,
        }];
        for level in 0..3u32 {
            let mut next = Vec::with_capacity(frontier.len() * 2);
            for state in &frontier {
                let (left, right) = evaluate_level_both(
                    self.prg,
                    state,
                    key.cw_seed()[level as usize],
                    key.cw_control_left()[level as usize],
                    key.cw_control_right()[level as usize],
                );
                next.push(left);
                next.push(right);
            }
            frontier = next;
        }
        let frontier: [PartyState; 8] = frontier
            .try_into()
            .unwrap_or_else(|_| unreachable!("BFS of 3 levels always yields 8 states"));

        let last_depth = nu - 3;
        let last_count = 1u64 << last_depth;

        let mut levels: Vec<[PartyState; 8]> = Vec::with_capacity(last_depth as usize + 1);
        levels.push(frontier);
        for _ in 0..last_depth {
            levels.push([PartyState {
                seed: Block::ZERO,
                control_bit: false,
            }; 8]);
        }

        let mut current_level: u32 = 0;
        let mut current_idx: u64 = 0;
        while current_idx < last_count {
            while current_level < last_depth {
                let bit = ((current_idx >> (last_depth - 1 - current_level)) & 1) == 1;
                let side = Side::from_bit(bit);
                let cw_index = (current_level + 3) as usize;
                let cw_seed = key.cw_seed()[cw_index];
                let cw_bit = if bit {
                    key.cw_control_right()[cw_index]
                } else {
                    key.cw_control_left()[cw_index]
                };

                let seeds: [Block; 8] = array::from_fn(|i| levels[current_level as usize][i].seed);
                let expanded = self.prg.expand_batch(seeds, side);
                let mut next = [PartyState {
                    seed: Block::ZERO,
                    control_bit: false,
                }; 8];
                for i in 0..8 {
                    let prior = levels[current_level as usize][i];
                    let lsb = expanded[i].lsb();
                    let clean = expanded[i].with_lsb_zero();
                    let select = Block::SELECT[prior.control_bit as usize];
                    next[i] = PartyState {
                        seed: clean.xor(cw_seed.and(select)),
                        control_bit: lsb ^ (cw_bit && prior.control_bit),
                    };
                }
                current_level += 1;
                levels[current_level as usize] = next;
            }

            for (lane, state) in levels[current_level as usize].iter().enumerate() {
                let leaf = self.compute_leaf_block(state, key);
                outputs[lane * last_count as usize + current_idx as usize] = leaf;
            }

            current_idx += 1;
            if current_idx < last_count {
                current_level -= level_delta(current_idx);
            }
        }
    }

    /// Used only when early termination is disabled (`EvalType::DepthFirst`): the same
    /// Gray-code walk as `HybridBatched`, but unbatched over all `n` levels and
    /// producing a ring element directly at each leaf instead of a packed block.
    fn full_domain_depth_first(&self, key: &DpfKey, outputs: &mut [u64]) {
        let n = self.params.n();
        let e = self.params.e();
        let last_count = 1u64 << n;

        let root = PartyState {
            seed: *key.init_seed().expose_secret(),
            control_bit: key.party_id() == 1,
        };
        let mut levels: Vec<PartyState> = vec![root; n as usize + 1];

        let mut current_level: u32 = 0;
        let mut current_idx: u64 = 0;
        while current_idx < last_count {
            while current_level < n {
                let bit = ((current_idx >> (n - 1 - current_level)) & 1) == 1;
                let mut state = levels[current_level as usize];
                evaluate_level(
                    self.prg,
                    bit,
                    &mut state,
                    key.cw_seed()[current_level as usize],
                    key.cw_control_left()[current_level as usize],
                    key.cw_control_right()[current_level as usize],
                );
                current_level += 1;
                levels[current_level as usize] = state;
            }

            let state = &levels[current_level as usize];
            let expanded = self.prg.expand(state.seed, Side::Left);
            let term = convert(expanded, e).wrapping_add(if state.control_bit {
                convert(key.output(), e)
            } else {
                0
            });
            outputs[current_idx as usize] = mask_to_bits(apply_sign(term, key.party_id() == 1), e);

            current_idx += 1;
            if current_idx < last_count {
                current_level -= level_delta(current_idx);
            }
        }
    }
}

/// Splits a packed leaf block into its `2^r` ring elements, by 32-bit lane (`r == 2`),
/// by 16-bit lane (`r == 3`), or by individual bit under the byte-major convention
/// (`r == 7`; see the "r = 7 bit addressing" design note).
pub(crate) fn split_block_to_field_vector(block: Block, r: u32) -> Vec<u64> {
    (0..(1u64 << r)).map(|j| get_split_block_value(block, r, j)).collect()
}

/// The random-access counterpart of [`split_block_to_field_vector`]: reads a single
/// element out of a packed leaf block without materializing the whole vector.
pub(crate) fn get_split_block_value(block: Block, r: u32, idx: u64) -> u64 {
    match r {
        2 => block.lane_u32(idx as usize) as u64,
        3 => block.lane_u16(idx as usize) as u64,
        7 => block.bit_at(idx as u32) as u64,
        _ => unreachable!("r is always in {{2, 3, 7}} wherever this is called"),
    }
}

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

//! Distributed Comparison Function key generation and evaluation (C4, C6).
//!
//! A DCF key pair for `(alpha, beta)` lets each party locally evaluate a function `f_b`
//! such that `f_0(x) + f_1(x) = beta` if `x < alpha` and `0` otherwise (wrapping
//! addition mod `2^e`). The tree walk is structurally the same seed/control-bit chain
//! DPF uses, but each level additionally publishes a value correction word, and both
//! generation and evaluation carry a running ring-element accumulator alongside the
//! seed chain. Early termination is not implemented for DCF: every level is walked
//! individually (see the "DCF early termination" design note), so `cw_length` is always
//! `n`.

mod key;

pub use key::DcfKey;

use secrecy::ExposeSecret;

use crate::block::{apply_sign, convert, mask_to_bits};
use crate::error::Error;
use crate::params::DcfParameters;
use crate::prg::{Prg, SecureRng, Side};
use crate::tree::{correct_level, evaluate_level, msb_bit, PartyState};

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

/// Generates DCF key pairs for a fixed, resolved set of parameters.
#[derive(Debug)]
pub struct DcfKeyGenerator<'a> {
    prg: &'a Prg,
    params: DcfParameters,
}

impl<'a> DcfKeyGenerator<'a> {
    /// Builds a generator bound to `prg` and `params`.
    pub fn new(prg: &'a Prg, params: DcfParameters) -> Self {
        DcfKeyGenerator { prg, params }
    }

    /// The parameters this generator was built with.
    pub fn params(&self) -> &DcfParameters {
        &self.params
    }

    /// Generates a fresh key pair encoding the comparison function `x < alpha -> beta`.
    pub fn generate_keys(
        &self,
        alpha: u64,
        beta: u64,
        rng: &mut impl SecureRng,
    ) -> Result<(DcfKey, DcfKey), Error> {
        let n = self.params.n();
        let e = self.params.e();
        checked_bound(alpha, n, "alpha")?;
        checked_bound(beta, e, "beta")?;

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

        let mut cw_seed = Vec::with_capacity(n as usize);
        let mut cw_control_left = Vec::with_capacity(n as usize);
        let mut cw_control_right = Vec::with_capacity(n as usize);
        let mut cw_value = Vec::with_capacity(n as usize);
        let mut value: u64 = 0;

        for i in 0..n {
            let alpha_bit = msb_bit(alpha, n, i);
            let old_seed0 = party0.seed;
            let old_seed1 = party1.seed;
            let (value_left_0, value_right_0) = self.prg.double_expand_value(old_seed0);
            let (value_left_1, value_right_1) = self.prg.double_expand_value(old_seed1);

            let control_bit_1 = party1.control_bit;
            let correction = correct_level(self.prg, alpha_bit, &mut party0, &mut party1);
            cw_seed.push(correction.cw_seed);
            cw_control_left.push(correction.cw_control_left);
            cw_control_right.push(correction.cw_control_right);

            let lose_is_left = alpha_bit;
            let (value_lose_0, value_lose_1) = if lose_is_left {
                (value_left_0, value_left_1)
            } else {
                (value_right_0, value_right_1)
            };
            let (value_keep_0, value_keep_1) = if lose_is_left {
                (value_right_0, value_right_1)
            } else {
                (value_left_0, value_left_1)
            };

            let term = convert(value_lose_1, e)
                .wrapping_sub(convert(value_lose_0, e))
                .wrapping_sub(value);
            let mut level_value_cw = apply_sign(term, control_bit_1);
            if lose_is_left {
                level_value_cw = level_value_cw.wrapping_add(apply_sign(beta, control_bit_1));
            }
            let level_value_cw = mask_to_bits(level_value_cw, e);
            cw_value.push(level_value_cw);

            value = mask_to_bits(
                value
                    .wrapping_sub(convert(value_keep_1, e))
                    .wrapping_add(convert(value_keep_0, e))
                    .wrapping_add(apply_sign(level_value_cw, control_bit_1)),
                e,
            );
        }

        let final_control_bit_1 = party1.control_bit;
        let final0 = self.prg.expand(party0.seed, Side::Left);
        let final1 = self.prg.expand(party1.seed, Side::Left);
        let output = mask_to_bits(
            apply_sign(
                convert(final1, e).wrapping_sub(convert(final0, e)).wrapping_sub(value),
                final_control_bit_1,
            ),
            e,
        );

        Ok((
            DcfKey::new(
                0,
                init_seed0,
                cw_seed.clone(),
                cw_control_left.clone(),
                cw_control_right.clone(),
                cw_value.clone(),
                output,
            ),
            DcfKey::new(1, init_seed1, cw_seed, cw_control_left, cw_control_right, cw_value, output),
        ))
    }
}

/// Evaluates DCF keys for a fixed, resolved set of parameters.
#[derive(Debug)]
pub struct DcfEvaluator<'a> {
    prg: &'a Prg,
    params: DcfParameters,
}

impl<'a> DcfEvaluator<'a> {
    /// Builds an evaluator bound to `prg` and `params`.
    pub fn new(prg: &'a Prg, params: DcfParameters) -> Self {
        DcfEvaluator { prg, params }
    }

    /// The parameters this evaluator was built with.
    pub fn params(&self) -> &DcfParameters {
        &self.params
    }

    /// Evaluates `key` at a single point `x`, returning this party's share of `f(x)`.
    pub fn evaluate_at(&self, key: &DcfKey, x: u64) -> Result<u64, Error> {
        let n = self.params.n();
        let e = self.params.e();
        checked_bound(x, n, "x")?;

        let party_sign = key.party_id() == 1;
        let mut state = PartyState {
            seed: *key.init_seed().expose_secret(),
            control_bit: party_sign,
        };
        let mut value: u64 = 0;

        for i in 0..n {
            let bit = msb_bit(x, n, i);
            let control_bit_before = state.control_bit;
            let expanded_value = self.prg.expand_value(state.seed, Side::from_bit(bit));
            let term = convert(expanded_value, e).wrapping_add(if control_bit_before {
                key.cw_value()[i as usize]
            } else {
                0
            });
            value = mask_to_bits(value.wrapping_add(apply_sign(term, party_sign)), e);

            evaluate_level(
                self.prg,
                bit,
                &mut state,
                key.cw_seed()[i as usize],
                key.cw_control_left()[i as usize],
                key.cw_control_right()[i as usize],
            );
        }

        let final_expanded = self.prg.expand(state.seed, Side::Left);
        let term = convert(final_expanded, e).wrapping_add(if state.control_bit { key.output() } else { 0 });
        let result = mask_to_bits(apply_sign(term, party_sign).wrapping_add(value), e);
        Ok(result)
    }

    /// Evaluates `key` over its entire domain (`outputs.len()` must equal `2^n`).
    /// There is no packed-block or batched strategy for DCF; this simply re-walks the
    /// tree from the root for every point.
    pub fn evaluate_full_domain(&self, key: &DcfKey, outputs: &mut [u64]) -> Result<(), Error> {
        let expected = 1usize << self.params.n();
        if outputs.len() != expected {
            return Err(Error::InvalidInput {
                field: "outputs.len()",
                value: outputs.len() as u64,
                bound: expected as u64 + 1,
            });
        }
        for x in 0..expected as u64 {
            outputs[x as usize] = self.evaluate_at(key, x)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn reconstruct(e: u32, share0: u64, share1: u64) -> u64 {
        mask_to_bits(share0.wrapping_add(share1), e)
    }

    #[test]
    fn comparison_function_reconstructs_beta_below_threshold() {
        let prg = Prg::new();
        let params = DcfParameters::resolve(6, 8).unwrap();
        let generator = DcfKeyGenerator::new(&prg, params);
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(0x0f0f_0f0f_0f0f_0f0f);
        let (key0, key1) = generator.generate_keys(20, 17, &mut rng).unwrap();

        let evaluator = DcfEvaluator::new(&prg, params);
        for x in 0..(1u64 << params.n()) {
            let share0 = evaluator.evaluate_at(&key0, x).unwrap();
            let share1 = evaluator.evaluate_at(&key1, x).unwrap();
            let expected = if x < 20 { 17 } else { 0 };
            assert_eq!(reconstruct(params.e(), share0, share1), expected, "x = {x}");
        }
    }

    #[test]
    fn full_domain_matches_point_eval() {
        let prg = Prg::new();
        let params = DcfParameters::resolve(8, 16).unwrap();
        let generator = DcfKeyGenerator::new(&prg, params);
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(0x2222_3333_4444_5555);
        let (key0, _key1) = generator.generate_keys(100, 9, &mut rng).unwrap();

        let evaluator = DcfEvaluator::new(&prg, params);
        let mut full = vec![0u64; 1usize << params.n()];
        evaluator.evaluate_full_domain(&key0, &mut full).unwrap();
        for x in (0..(1u64 << params.n())).step_by(13) {
            assert_eq!(full[x as usize], evaluator.evaluate_at(&key0, x).unwrap());
        }
    }

    #[test]
    fn out_of_range_x_is_rejected() {
        let prg = Prg::new();
        let params = DcfParameters::resolve(4, 4).unwrap();
        let generator = DcfKeyGenerator::new(&prg, params);
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(1);
        let (key0, _key1) = generator.generate_keys(1, 1, &mut rng).unwrap();
        let evaluator = DcfEvaluator::new(&prg, params);
        assert!(matches!(
            evaluator.evaluate_at(&key0, 16),
            Err(Error::InvalidInput { field: "x", .. })
        ));
    }
}

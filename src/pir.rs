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

//! Full-domain DPF dot product against a public database (C7).
//!
//! A party that has full-domain-evaluated its DPF share into a vector of `2^n` ring
//! elements (or, equivalently, `2^nu` packed leaf blocks) can fold that vector against
//! a public database `db: &[u64]` of the same length with a single pass: the result is
//! this party's additive share of `db[alpha]` (for `r in {2, 3}`) or `db[alpha] mod 2`
//! (for `r == 7`, via XOR). Two index conventions are supported: a caller-supplied
//! public mask `pr` shifts every lookup by `pr` modulo `2^n` ("masked index"), and a
//! jointly-reconstructed mask does the same after combining both parties' local shares
//! of the mask ("shared index").

use crate::block::Block;
use crate::dpf::get_split_block_value;
use crate::error::Error;

/// Folds `outputs` (one packed leaf block per early-termination subtree) against `db`,
/// returning this party's share of `db[alpha]`.
///
/// `r` must be the same `{2, 3, 7}` value the DPF key was generated with, and `n` the
/// key's domain bit-width (`db.len()` must equal `2^n`). This is [`dot_product_masked`]
/// with `pr = 0`.
pub fn dot_product(outputs: &[Block], db: &[u64], r: u32, n: u32) -> Result<u64, Error> {
    dot_product_masked(outputs, db, r, n, 0)
}

/// Like [`dot_product`], but every database lookup is shifted by the public mask `pr`
/// modulo `2^n` before being folded in. Used when the caller's logical index into `db`
/// is `alpha` but the two parties only agree on `alpha` up to a public, previously
/// announced offset.
pub fn dot_product_masked(outputs: &[Block], db: &[u64], r: u32, n: u32, pr: u64) -> Result<u64, Error> {
    if !matches!(r, 2 | 3 | 7) {
        return Err(Error::InvalidParameter {
            field: "r",
            reason: "full-domain dot product supports r in {2, 3, 7}",
        });
    }
    let modulus = 1u64 << n;
    if db.len() as u64 != modulus {
        return Err(Error::InvalidInput {
            field: "db.len()",
            value: db.len() as u64,
            bound: modulus + 1,
        });
    }

    if r == 7 {
        // Branch-free: every one of the 128 bits in a leaf block contributes a
        // mask of all-ones or all-zeros, so the fold never takes a data-dependent
        // branch on the database contents.
        let mut acc = 0u64;
        for (leaf_idx, block) in outputs.iter().enumerate() {
            let base = (leaf_idx as u64) * 128;
            let low = block.low_u64();
            let high = block.high_u64();
            for bit in 0..64u64 {
                let mask = 0u64.wrapping_sub((low >> bit) & 1);
                let idx = ((base + bit + pr) % modulus) as usize;
                acc ^= db[idx] & mask;
            }
            for bit in 0..64u64 {
                let mask = 0u64.wrapping_sub((high >> bit) & 1);
                let idx = ((base + 64 + bit + pr) % modulus) as usize;
                acc ^= db[idx] & mask;
            }
        }
        Ok(acc)
    } else {
        let fanout = 1u64 << r;
        let mut acc = 0u64;
        for (leaf_idx, block) in outputs.iter().enumerate() {
            let base = (leaf_idx as u64) * fanout;
            for lane in 0..fanout {
                let share = get_split_block_value(*block, r, lane);
                let idx = ((base + lane + pr) % modulus) as usize;
                acc = acc.wrapping_add(share.wrapping_mul(db[idx]));
            }
        }
        Ok(acc)
    }
}

/// Jointly reconstructs a two-party-shared index mask.
///
/// Implementors receive this party's local share of the mask and return the
/// reconstructed public value (e.g. by exchanging shares over a channel and adding
/// them). Kept abstract so this crate stays transport-agnostic: it has no opinion on
/// how the two parties actually talk to each other.
pub trait Reconstruct {
    /// Reconstructs the shared value from this party's `local_share`.
    fn reconstruct(&self, local_share: u64) -> u64;
}

/// Like [`dot_product_masked`], but the mask is only known as a local share;
/// `reconstructor` is used to combine it into the public `pr` before folding.
pub fn dot_product_shared_index<R: Reconstruct>(
    outputs: &[Block],
    db: &[u64],
    r: u32,
    n: u32,
    local_mask_share: u64,
    reconstructor: &R,
) -> Result<u64, Error> {
    let pr = reconstructor.reconstruct(local_mask_share) % (1u64 << n);
    dot_product_masked(outputs, db, r, n, pr)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::dpf::{DpfEvaluator, DpfKeyGenerator};
    use crate::params::{DpfParameters, EvalType, OutputMode};
    use crate::prg::Prg;

    struct SumReconstruct {
        peer_share: u64,
    }

    impl Reconstruct for SumReconstruct {
        fn reconstruct(&self, local_share: u64) -> u64 {
            local_share.wrapping_add(self.peer_share)
        }
    }

    #[test]
    fn dot_product_recovers_database_entry_at_alpha() {
        let prg = Prg::new();
        let (params, _) =
            DpfParameters::resolve(10, 1, EvalType::HybridBatched, OutputMode::SingleBitMask).unwrap();
        let generator = DpfKeyGenerator::new(&prg, params);
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(0x1357_2468_1357_2468);
        let alpha = 321u64;
        let (key0, key1) = generator.generate_keys(alpha, 1, &mut rng).unwrap();

        let evaluator = DpfEvaluator::new(&prg, params);
        let leaf_count = 1usize << params.cw_length();
        let mut blocks0 = vec![Block::ZERO; leaf_count];
        let mut blocks1 = vec![Block::ZERO; leaf_count];
        evaluator.evaluate_full_domain_blocks(&key0, &mut blocks0).unwrap();
        evaluator.evaluate_full_domain_blocks(&key1, &mut blocks1).unwrap();

        let n = params.n();
        let db: Vec<u64> = (0..(1u64 << n)).map(|i| i % 2).collect();

        let share0 = dot_product(&blocks0, &db, params.r(), n).unwrap();
        let share1 = dot_product(&blocks1, &db, params.r(), n).unwrap();
        assert_eq!(share0 ^ share1, db[alpha as usize]);
    }

    #[test]
    fn masked_index_wraps_around_the_domain() {
        let prg = Prg::new();
        let (params, _) =
            DpfParameters::resolve(10, 20, EvalType::Recursion, OutputMode::ShiftedAdditive).unwrap();
        let generator = DpfKeyGenerator::new(&prg, params);
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(0x0bad_c0de_1337_babe);
        let alpha = 900u64;
        let shift = 200u64;
        let (key0, key1) = generator.generate_keys(alpha, 1, &mut rng).unwrap();

        let evaluator = DpfEvaluator::new(&prg, params);
        let leaf_count = 1usize << params.cw_length();
        let mut blocks0 = vec![Block::ZERO; leaf_count];
        let mut blocks1 = vec![Block::ZERO; leaf_count];
        evaluator.evaluate_full_domain_blocks(&key0, &mut blocks0).unwrap();
        evaluator.evaluate_full_domain_blocks(&key1, &mut blocks1).unwrap();

        let n = params.n();
        let db: Vec<u64> = (0..(1u64 << n)).collect();
        // The two parties agree that the logical index `alpha` corresponds to
        // physical slot `(alpha + shift) mod 2^n` in `db`.
        let share0 = dot_product_masked(&blocks0, &db, params.r(), n, shift).unwrap();
        let share1 = dot_product_masked(&blocks1, &db, params.r(), n, shift).unwrap();
        let reconstructed = share0.wrapping_add(share1) & ((1u64 << params.e()) - 1);
        assert_eq!(reconstructed, db[((alpha + shift) % (1u64 << n)) as usize] & ((1u64 << params.e()) - 1));
    }

    #[test]
    fn shared_index_reconstructs_through_the_trait() {
        let reconstructor = SumReconstruct { peer_share: 30 };
        assert_eq!(reconstructor.reconstruct(12), 42);
    }

    #[test]
    fn rejects_mismatched_database_length() {
        let blocks = vec![Block::ZERO; 4];
        let db = vec![0u64; 10];
        assert!(matches!(
            dot_product(&blocks, &db, 2, 5),
            Err(Error::InvalidInput { field: "db.len()", .. })
        ));
    }
}

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

//! Distributed point and comparison function primitives for function secret sharing.
//!
//! # How it works
//!
//! A *function secret sharing* (FSS) scheme splits a function `f` drawn from some
//! family into two succinct keys `k0`, `k1` such that each key alone reveals nothing
//! about `f`, but `f_0(x) + f_1(x) = f(x)` for every point `x` in `f`'s domain. This
//! crate implements two families:
//!
//! - [`dpf`]: Distributed Point Functions, `f` is `beta` at one secret point `alpha`
//!   and `0` everywhere else.
//! - [`dcf`]: Distributed Comparison Functions, `f` is `beta` for every point below a
//!   secret threshold `alpha` and `0` at or above it.
//!
//! Both are built the same way: a GGM tree grown from a pseudo-random seed, with one
//! correction word published per level so that the two parties' seed chains agree
//! everywhere except along the path to `alpha`. [`pir`] builds on the DPF full-domain
//! evaluation to answer a private-information-retrieval-style dot product against a
//! public database in one pass.
//!
//! # Parameter resolution
//!
//! Constructing a [`params::DpfParameters`] or [`params::DcfParameters`] always goes
//! through `resolve`, never a bare struct literal: resolution is what keeps `n`, `e`,
//! the early-termination depth `nu`, and the chosen [`params::EvalType`] /
//! [`params::OutputMode`] mutually consistent, downgrading an unsatisfiable request
//! (e.g. `SingleBitMask` on a domain too small for early termination) rather than
//! failing outright. See `SPEC_FULL.md` §4.3 for the exact downgrade table.
//!
//! # Security model
//!
//! The PRG ([`prg::Prg`]) is built from fixed-key AES-128 via the Davies-Meyer
//! construction; its keys are public constants, not secrets: security comes from
//! treating AES as a good pseudorandom permutation under a known key, the same
//! assumption correlation-robust-hash-based FSS constructions rely on elsewhere. The
//! only secret a caller must supply is the randomness behind key generation
//! ([`prg::SecureRng`]); everything downstream is deterministic.
//!
//! A [`dpf::DpfKey`] / [`dcf::DcfKey`] is move-only by design: neither implements
//! `Clone` or `Copy`, so an accidental duplication of a party's key share is a compile
//! error rather than a silent security bug. Call `duplicate()` when a deliberate copy
//! is really what's needed.

#![deny(missing_docs, missing_debug_implementations)]

mod block;
mod error;
mod io;
mod params;
mod prg;
mod tree;

pub mod dcf;
pub mod dpf;
pub mod pir;

pub use block::Block;
pub use dcf::{DcfEvaluator, DcfKey, DcfKeyGenerator};
pub use dpf::{DpfEvaluator, DpfKey, DpfKeyGenerator};
pub use error::{Downgrade, Error};
pub use params::{DcfParameters, DpfParameters, EvalType, OutputMode};
pub use pir::Reconstruct;
pub use prg::{Prg, SecureRng, Side};

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use secrecy::ExposeSecret;

    use super::*;

    /// S1 (`SPEC_FULL.md` §8): a DPF key pair generated for `(n=8, e=8, alpha=42,
    /// beta=7)` reconstructs to `7` at `x=42` and `0` everywhere else, and the two
    /// parties' key shares are not bitwise equal.
    #[test]
    fn s1_dpf_point_function_end_to_end() {
        let prg = Prg::new();
        let (params, downgrades) =
            DpfParameters::resolve(8, 8, EvalType::Naive, OutputMode::ShiftedAdditive).unwrap();
        assert!(downgrades.is_empty());

        let generator = DpfKeyGenerator::new(&prg, params);
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(0x4242_4242_4242_4242);
        let (key0, key1) = generator.generate_keys(42, 7, &mut rng).unwrap();
        assert!(!key0.equals(&key1));
        assert_ne!(key0.init_seed().expose_secret(), key1.init_seed().expose_secret());

        let evaluator = DpfEvaluator::new(&prg, params);
        for x in 0..256u64 {
            let share0 = evaluator.evaluate_at(&key0, x).unwrap();
            let share1 = evaluator.evaluate_at(&key1, x).unwrap();
            let expected = if x == 42 { 7 } else { 0 };
            assert_eq!(share0.wrapping_add(share1) & 0xff, expected, "x = {x}");
        }
    }

    /// A DCF key pair generated for a threshold reconstructs `beta` below the
    /// threshold and `0` at or above it.
    #[test]
    fn dcf_comparison_function_end_to_end() {
        let prg = Prg::new();
        let params = DcfParameters::resolve(8, 8).unwrap();
        let generator = DcfKeyGenerator::new(&prg, params);
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(0x1010_1010_1010_1010);
        let (key0, key1) = generator.generate_keys(100, 9, &mut rng).unwrap();

        let evaluator = DcfEvaluator::new(&prg, params);
        for x in 0..256u64 {
            let share0 = evaluator.evaluate_at(&key0, x).unwrap();
            let share1 = evaluator.evaluate_at(&key1, x).unwrap();
            let expected = if x < 100 { 9 } else { 0 };
            assert_eq!(share0.wrapping_add(share1) & 0xff, expected, "x = {x}");
        }
    }

    /// A key pair's predicted serialized size matches what it actually serializes to,
    /// and a round trip through `serialize`/`deserialize` reproduces the same shares.
    #[test]
    fn dpf_key_round_trips_through_serialization() {
        let prg = Prg::new();
        let (params, _) =
            DpfParameters::resolve(10, 16, EvalType::Recursion, OutputMode::ShiftedAdditive).unwrap();
        let generator = DpfKeyGenerator::new(&prg, params);
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(0x9999_8888_7777_6666);
        let (key0, _key1) = generator.generate_keys(500, 11, &mut rng).unwrap();

        let bytes = key0.serialize();
        assert_eq!(bytes.len(), DpfKey::serialized_size(&params));

        let restored = DpfKey::deserialize(&bytes).unwrap();
        assert!(key0.equals(&restored));
    }

    /// A truncated buffer is reported as `Error::IoShort`, never a panic.
    #[test]
    fn deserialize_reports_truncated_input() {
        let prg = Prg::new();
        let (params, _) =
            DpfParameters::resolve(6, 6, EvalType::Naive, OutputMode::ShiftedAdditive).unwrap();
        let generator = DpfKeyGenerator::new(&prg, params);
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(1);
        let (key0, _key1) = generator.generate_keys(3, 2, &mut rng).unwrap();

        let mut bytes = key0.serialize();
        bytes.truncate(bytes.len() - 1);
        assert!(matches!(DpfKey::deserialize(&bytes), Err(Error::IoShort { .. })));
    }
}

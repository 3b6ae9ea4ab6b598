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

//! Parameter resolution: turning a caller's requested `(n, e, eval_type, output_mode)`
//! into the concrete, internally-consistent record the generators and evaluators act
//! on, plus a list of any downgrades that were necessary to get there.
//!
//! Construction always goes through [`DpfParameters::resolve`] / [`DcfParameters::resolve`];
//! there is no public way to build a `DpfParameters`/`DcfParameters` whose `nu` and
//! `enable_et` are inconsistent with `n`/`e`.

use crate::error::{Downgrade, Error};

/// Full-domain / point-evaluation walk strategy for a DPF key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalType {
    /// Re-walk the tree from the root for every point, or evaluate every point in a
    /// full-domain call. `O(n * 2^n)`. The only strategy compatible with
    /// `enable_et = false`... other than `DepthFirst`.
    Naive,
    /// Top-down recursive depth-first full-domain traversal. `O(2^(nu+1))` PRG calls.
    Recursion,
    /// BFS of the top 3 levels, then an iterative Gray-code depth-first walk using
    /// 8-wide batched AES. The fastest full-domain strategy; requires `enable_et`.
    HybridBatched,
    /// The same Gray-code walk as `HybridBatched` but unbatched and producing ring
    /// elements directly rather than packed leaf blocks. Used when early termination
    /// is disabled.
    DepthFirst,
}

/// Output encoding for a DPF key's leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// The standard additive-sharing leaf: a ring element of `e` bits, reconstructed by
    /// wrapping addition of both parties' shares.
    ShiftedAdditive,
    /// A single XOR-shared bit per leaf, packed 128 to a block. Requires `e == 1` and
    /// early termination with `nu = n - 7`.
    SingleBitMask,
}

/// Resolved, internally-consistent parameters for a DPF key pair.
///
/// Every field here is derived deterministically from `n`, `e`, and the caller's
/// requested `eval_type`/`output_mode` by [`DpfParameters::resolve`]; there is no other
/// constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DpfParameters {
    n: u32,
    e: u32,
    eval_type: EvalType,
    output_mode: OutputMode,
    enable_et: bool,
    nu: u32,
}

impl DpfParameters {
    /// Input bit-width; the domain is `0..2^n`.
    pub fn n(&self) -> u32 {
        self.n
    }

    /// Output element bit-width; the output ring is `Z/2^e`.
    pub fn e(&self) -> u32 {
        self.e
    }

    /// The resolved walk strategy.
    pub fn eval_type(&self) -> EvalType {
        self.eval_type
    }

    /// The resolved leaf encoding.
    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    /// Whether the bottom `n - nu` levels are collapsed into a single packed leaf block.
    pub fn enable_et(&self) -> bool {
        self.enable_et
    }

    /// Early-termination depth: the top `nu` levels are walked one at a time.
    pub fn nu(&self) -> u32 {
        self.nu
    }

    /// Number of levels a key's correction-word arrays hold (`nu` when early
    /// termination is enabled, `n` otherwise; the two coincide when ET is off).
    pub fn cw_length(&self) -> u32 {
        self.nu
    }

    /// `r = n - nu`, the number of bits folded into one packed leaf (`0` when early
    /// termination is disabled, otherwise one of `{2, 3, 7}`).
    pub fn r(&self) -> u32 {
        self.n - self.nu
    }

    /// Resolves a requested configuration, applying the downgrade policy described in
    /// `SPEC_FULL.md` §4.3, and returns the resolved parameters together with any
    /// downgrade notes (empty if the request was already fully satisfiable).
    ///
    /// Only a genuinely malformed `(n, e)` is rejected outright: `n == 0`, `n > 32`,
    /// `e == 0`, or `e > 64`.
    pub fn resolve(
        n: u32,
        e: u32,
        requested_eval_type: EvalType,
        requested_output_mode: OutputMode,
    ) -> Result<(Self, Vec<Downgrade>), Error> {
        if n == 0 || n > 32 {
            return Err(Error::InvalidParameter {
                field: "n",
                reason: "must satisfy 1 <= n <= 32",
            });
        }
        if e == 0 || e > 64 {
            return Err(Error::InvalidParameter {
                field: "e",
                reason: "must satisfy 1 <= e <= 64",
            });
        }

        let mut downgrades = Vec::new();

        let small_domain = if e > 1 { n <= 8 } else { n < 10 };
        let eval_type = if small_domain && !matches!(requested_eval_type, EvalType::Naive) {
            downgrades.push(Downgrade {
                field: "eval_type",
                requested: format!("{requested_eval_type:?}"),
                resolved: format!("{:?}", EvalType::Naive),
                reason: "n is below the small-domain threshold for early termination",
            });
            EvalType::Naive
        } else {
            requested_eval_type
        };

        let enable_et = !matches!(eval_type, EvalType::Naive | EvalType::DepthFirst);

        let output_mode = if matches!(requested_output_mode, OutputMode::SingleBitMask)
            && (e != 1 || !enable_et)
        {
            downgrades.push(Downgrade {
                field: "output_mode",
                requested: format!("{requested_output_mode:?}"),
                resolved: format!("{:?}", OutputMode::ShiftedAdditive),
                reason: "SingleBitMask requires e == 1 and early termination enabled",
            });
            OutputMode::ShiftedAdditive
        } else {
            requested_output_mode
        };

        let nu = if !enable_et {
            n
        } else if e == 1 {
            n - 7
        } else if n < 17 {
            n - 3
        } else {
            n - 2
        };

        let params = DpfParameters {
            n,
            e,
            eval_type,
            output_mode,
            enable_et,
            nu,
        };
        params.validate()?;
        Ok((params, downgrades))
    }

    fn validate(&self) -> Result<(), Error> {
        if matches!(self.eval_type, EvalType::Naive) && self.enable_et {
            return Err(Error::InvalidParameter {
                field: "eval_type",
                reason: "Naive is incompatible with early termination",
            });
        }
        if self.nu > self.n {
            return Err(Error::InvalidParameter {
                field: "nu",
                reason: "early-termination depth cannot exceed n",
            });
        }
        if matches!(self.output_mode, OutputMode::SingleBitMask) && self.e != 1 {
            return Err(Error::InvalidParameter {
                field: "output_mode",
                reason: "SingleBitMask requires e == 1",
            });
        }
        if self.enable_et {
            let r = self.r();
            if !matches!(r, 2 | 3 | 7) {
                return Err(Error::InvalidParameter {
                    field: "nu",
                    reason: "early termination must leave r in {2, 3, 7} remaining bits",
                });
            }
        }
        Ok(())
    }
}

/// Resolved parameters for a DCF key pair.
///
/// DCF implements only the naive, full-depth walk (see the "DCF early termination"
/// design note); there is no `eval_type` or `enable_et` field because none of the
/// variation DPF has applies here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DcfParameters {
    n: u32,
    e: u32,
}

impl DcfParameters {
    /// Input bit-width; the domain is `0..2^n`.
    pub fn n(&self) -> u32 {
        self.n
    }

    /// Output element bit-width; the output ring is `Z/2^e`.
    pub fn e(&self) -> u32 {
        self.e
    }

    /// Number of levels a key's correction-word arrays hold: always `n`.
    pub fn cw_length(&self) -> u32 {
        self.n
    }

    /// Validates and wraps `(n, e)` into a `DcfParameters`.
    pub fn resolve(n: u32, e: u32) -> Result<Self, Error> {
        if n == 0 || n > 32 {
            return Err(Error::InvalidParameter {
                field: "n",
                reason: "must satisfy 1 <= n <= 32",
            });
        }
        if e == 0 || e > 64 {
            return Err(Error::InvalidParameter {
                field: "e",
                reason: "must satisfy 1 <= e <= 64",
            });
        }
        Ok(DcfParameters { n, e })
    }
}

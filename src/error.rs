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

//! Error and diagnostic types shared by the parameter resolver, the generators, the
//! evaluators and the serialization routines.

use core::fmt;

use crate::params::EvalType;

/// Everything that can go wrong calling into this crate from caller-supplied data.
///
/// All variants are caller-recoverable: nothing here poisons the state of a `Prg`,
/// a key, or a parameter record. Violated *internal* invariants (two key halves with
/// mismatched `cw_length`, a serialized-size self-check failure) are signaled by
/// panics instead, per this crate's error-handling policy, and are not part of this
/// enum.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A parameter combination is not representable, independent of any particular
    /// `(alpha, beta, x)` call (e.g. `n == 0`, `n > 32`, `SingleBitMask` with `e != 1`).
    InvalidParameter {
        /// Name of the offending field.
        field: &'static str,
        /// Human-readable explanation.
        reason: &'static str,
    },
    /// A runtime value (`alpha`, `beta`, or an evaluation point `x`) falls outside the
    /// range implied by the resolved parameters.
    InvalidInput {
        /// Name of the offending value.
        field: &'static str,
        /// The value that was supplied.
        value: u64,
        /// The exclusive upper bound it was required to respect.
        bound: u64,
    },
    /// The byte length a key actually serialized to does not match the length
    /// predicted from its parameters at construction time. This is the "impossible"
    /// internal invariant from this crate's error-handling policy (SPEC_FULL.md §7):
    /// in practice it is caught by an `assert_eq!` in `serialize_into` and surfaces as
    /// a panic, not through this variant. The variant still exists as the named
    /// sentinel for that self-check, matching SPEC_FULL.md §4.9's description of it.
    SerializationSizeMismatch {
        /// Size predicted from parameters.
        expected: usize,
        /// Size actually produced.
        actual: usize,
    },
    /// A buffer passed to `deserialize` is shorter than its declared `cw_length`
    /// implies.
    IoShort {
        /// Bytes required to deserialize the declared structure.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },
    /// A full-domain evaluation was requested with an output representation the
    /// selected `EvalType` cannot produce (e.g. packed-block output from `Naive`, which
    /// never runs with early termination enabled).
    UnsupportedEvalType {
        /// The strategy that was selected.
        eval_type: EvalType,
        /// What was being attempted.
        context: &'static str,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidParameter { field, reason } => {
                write!(f, "invalid parameter `{field}`: {reason}")
            }
            Error::InvalidInput {
                field,
                value,
                bound,
            } => write!(
                f,
                "`{field}` = {value} is out of range, expected < {bound}"
            ),
            Error::SerializationSizeMismatch { expected, actual } => write!(
                f,
                "serialized size mismatch: expected {expected} bytes, produced {actual}"
            ),
            Error::IoShort { expected, actual } => write!(
                f,
                "deserialization buffer too short: need {expected} bytes, got {actual}"
            ),
            Error::UnsupportedEvalType { eval_type, context } => write!(
                f,
                "eval type {eval_type:?} does not support {context}"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// A non-fatal note that the parameter resolver downgraded a requested setting.
///
/// Downgrades happen silently with respect to control flow (the resolver never
/// returns an `Error` for a merely suboptimal request) but never silently with respect
/// to the caller: every downgrade produces one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downgrade {
    /// Name of the field that was downgraded (`"eval_type"` or `"output_mode"`).
    pub field: &'static str,
    /// Debug-formatted value that was requested.
    pub requested: String,
    /// Debug-formatted value that was resolved instead.
    pub resolved: String,
    /// Why the downgrade was necessary.
    pub reason: &'static str,
}

impl fmt::Display for Downgrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} downgraded from {} to {}: {}",
            self.field, self.requested, self.resolved, self.reason
        )
    }
}

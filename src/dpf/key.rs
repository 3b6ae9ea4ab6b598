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

//! One party's share of a DPF key (C4): the root seed plus the per-level correction
//! words that steer its tree walk.

use core::fmt;

use secrecy::{ExposeSecret, Secret};

use crate::block::Block;
use crate::error::Error;
use crate::io::{write_block, write_bool, write_u64, Reader};
use crate::params::DpfParameters;

/// A single party's half of a generated DPF key pair.
///
/// `cw_seed`, `cw_control_left`, `cw_control_right` and `output` are public: they are
/// bitwise identical between `key0` and `key1` by construction (see
/// [`crate::dpf::DpfKeyGenerator::generate_keys`]). Only `party_id` and `init_seed`
/// differ between the two halves, which is why `init_seed` alone is wrapped to be
/// zeroed on drop: it is the one field whose exposure actually tells an adversary
/// something the other party doesn't already know.
///
/// `DpfKey` is intentionally neither `Copy` nor `Clone`: accidentally duplicating a
/// party's key share is a correctness and security bug, not a convenience. Call
/// [`DpfKey::duplicate`] when an explicit, deliberate copy is really what's needed.
pub struct DpfKey {
    party_id: u8,
    init_seed: Secret<Block>,
    cw_seed: Vec<Block>,
    cw_control_left: Vec<bool>,
    cw_control_right: Vec<bool>,
    output: Block,
}

impl DpfKey {
    pub(crate) fn new(
        party_id: u8,
        init_seed: Block,
        cw_seed: Vec<Block>,
        cw_control_left: Vec<bool>,
        cw_control_right: Vec<bool>,
        output: Block,
    ) -> Self {
        DpfKey {
            party_id,
            init_seed: Secret::new(init_seed),
            cw_seed,
            cw_control_left,
            cw_control_right,
            output,
        }
    }

    /// `0` or `1`.
    pub fn party_id(&self) -> u8 {
        self.party_id
    }

    /// This party's root seed. Wrapped so that callers must opt in via
    /// [`ExposeSecret::expose_secret`] to read it, and so that it is zeroed on drop.
    pub fn init_seed(&self) -> &Secret<Block> {
        &self.init_seed
    }

    pub(crate) fn cw_seed(&self) -> &[Block] {
        &self.cw_seed
    }

    pub(crate) fn cw_control_left(&self) -> &[bool] {
        &self.cw_control_left
    }

    pub(crate) fn cw_control_right(&self) -> &[bool] {
        &self.cw_control_right
    }

    pub(crate) fn output(&self) -> Block {
        self.output
    }

    /// Number of tree levels this key's correction-word arrays cover (`nu`).
    pub fn cw_length(&self) -> usize {
        self.cw_seed.len()
    }

    /// Produces an explicit, deliberate copy of this key share.
    ///
    /// Named `duplicate` rather than `clone` so that a call site stands out as an
    /// intentional exception to the "move-only key" rule, e.g. when a caller needs to
    /// persist a copy of a key before consuming the original.
    pub fn duplicate(&self) -> Self {
        DpfKey {
            party_id: self.party_id,
            init_seed: Secret::new(*self.init_seed.expose_secret()),
            cw_seed: self.cw_seed.clone(),
            cw_control_left: self.cw_control_left.clone(),
            cw_control_right: self.cw_control_right.clone(),
            output: self.output,
        }
    }

    /// Checks elementwise equality, including the secret `init_seed`.
    ///
    /// Deliberately not a `PartialEq` impl: comparing two keys is a test-and-debugging
    /// operation, not something that should be reachable via a silent `==`.
    pub fn equals(&self, other: &DpfKey) -> bool {
        self.party_id == other.party_id
            && self.init_seed.expose_secret() == other.init_seed.expose_secret()
            && self.cw_seed == other.cw_seed
            && self.cw_control_left == other.cw_control_left
            && self.cw_control_right == other.cw_control_right
            && self.output == other.output
    }

    /// Predicted serialized size, in bytes, from `params` alone (C8).
    pub fn serialized_size(params: &DpfParameters) -> usize {
        let cw_length = params.cw_length() as usize;
        8 + 16 + 8 + 16 * cw_length + cw_length + cw_length + 16
    }

    /// Encodes this key into `buf` using the layout from `SPEC_FULL.md` §4.8.
    ///
    /// Panics if the produced length does not match [`DpfKey::serialized_size`] computed
    /// from this key's own `cw_length`: per this crate's error-handling policy, that
    /// mismatch is an implementation bug, not caller-recoverable input.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        let start = buf.len();
        write_u64(buf, self.party_id as u64);
        write_block(buf, *self.init_seed.expose_secret());
        write_u64(buf, self.cw_seed.len() as u64);
        for cw in &self.cw_seed {
            write_block(buf, *cw);
        }
        for &bit in &self.cw_control_left {
            write_bool(buf, bit);
        }
        for &bit in &self.cw_control_right {
            write_bool(buf, bit);
        }
        write_block(buf, self.output);

        let produced = buf.len() - start;
        let cw_length = self.cw_seed.len();
        let expected = 8 + 16 + 8 + 16 * cw_length + cw_length + cw_length + 16;
        assert_eq!(
            produced, expected,
            "DpfKey::serialize_into produced {produced} bytes, predicted {expected}"
        );
    }

    /// Serializes this key into a freshly allocated buffer.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(DpfKey::serialized_size_hint(self.cw_seed.len()));
        self.serialize_into(&mut buf);
        buf
    }

    fn serialized_size_hint(cw_length: usize) -> usize {
        8 + 16 + 8 + 16 * cw_length + cw_length + cw_length + 16
    }

    /// Decodes a key previously produced by [`DpfKey::serialize`] / [`DpfKey::serialize_into`].
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let mut reader = Reader::new(bytes);
        let party_id = reader.read_u64()? as u8;
        let init_seed = reader.read_block()?;
        let cw_length = reader.read_u64()? as usize;

        let mut cw_seed = Vec::with_capacity(cw_length);
        for _ in 0..cw_length {
            cw_seed.push(reader.read_block()?);
        }
        let mut cw_control_left = Vec::with_capacity(cw_length);
        for _ in 0..cw_length {
            cw_control_left.push(reader.read_bool()?);
        }
        let mut cw_control_right = Vec::with_capacity(cw_length);
        for _ in 0..cw_length {
            cw_control_right.push(reader.read_bool()?);
        }
        let output = reader.read_block()?;

        Ok(DpfKey::new(
            party_id,
            init_seed,
            cw_seed,
            cw_control_left,
            cw_control_right,
            output,
        ))
    }
}

impl fmt::Debug for DpfKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DpfKey")
            .field("party_id", &self.party_id)
            .field("init_seed", &"_")
            .field("cw_length", &self.cw_seed.len())
            .finish()
    }
}

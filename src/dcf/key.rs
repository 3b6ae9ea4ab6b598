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

//! One party's share of a DCF key (C4): like [`crate::dpf::DpfKey`], but with an
//! additional per-level value-correction array and a scalar (not block) final output.

use core::fmt;

use secrecy::{ExposeSecret, Secret};

use crate::block::Block;
use crate::error::Error;
use crate::io::{write_block, write_bool, write_u64, Reader};
use crate::params::DcfParameters;

/// A single party's half of a generated DCF key pair. See [`crate::dpf::DpfKey`] for
/// the rationale behind the secrecy wrapping and the move-only discipline, which apply
/// identically here.
pub struct DcfKey {
    party_id: u8,
    init_seed: Secret<Block>,
    cw_seed: Vec<Block>,
    cw_control_left: Vec<bool>,
    cw_control_right: Vec<bool>,
    cw_value: Vec<u64>,
    output: u64,
}

impl DcfKey {
    pub(crate) fn new(
        party_id: u8,
        init_seed: Block,
        cw_seed: Vec<Block>,
        cw_control_left: Vec<bool>,
        cw_control_right: Vec<bool>,
        cw_value: Vec<u64>,
        output: u64,
    ) -> Self {
        DcfKey {
            party_id,
            init_seed: Secret::new(init_seed),
            cw_seed,
            cw_control_left,
            cw_control_right,
            cw_value,
            output,
        }
    }

    /// `0` or `1`.
    pub fn party_id(&self) -> u8 {
        self.party_id
    }

    /// This party's root seed.
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

    pub(crate) fn cw_value(&self) -> &[u64] {
        &self.cw_value
    }

    pub(crate) fn output(&self) -> u64 {
        self.output
    }

    /// Number of tree levels this key's correction-word arrays cover: always `n`.
    pub fn cw_length(&self) -> usize {
        self.cw_seed.len()
    }

    /// Produces an explicit, deliberate copy of this key share (see
    /// [`crate::dpf::DpfKey::duplicate`]).
    pub fn duplicate(&self) -> Self {
        DcfKey {
            party_id: self.party_id,
            init_seed: Secret::new(*self.init_seed.expose_secret()),
            cw_seed: self.cw_seed.clone(),
            cw_control_left: self.cw_control_left.clone(),
            cw_control_right: self.cw_control_right.clone(),
            cw_value: self.cw_value.clone(),
            output: self.output,
        }
    }

    /// Checks elementwise equality, including the secret `init_seed`.
    pub fn equals(&self, other: &DcfKey) -> bool {
        self.party_id == other.party_id
            && self.init_seed.expose_secret() == other.init_seed.expose_secret()
            && self.cw_seed == other.cw_seed
            && self.cw_control_left == other.cw_control_left
            && self.cw_control_right == other.cw_control_right
            && self.cw_value == other.cw_value
            && self.output == other.output
    }

    /// Predicted serialized size, in bytes, from `params` alone (C8).
    pub fn serialized_size(params: &DcfParameters) -> usize {
        let cw_length = params.cw_length() as usize;
        8 + 16 + 8 + 16 * cw_length + cw_length + cw_length + 8 * cw_length + 8
    }

    /// Encodes this key into `buf` using the layout from `SPEC_FULL.md` §4.8.
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
        for &value in &self.cw_value {
            write_u64(buf, value);
        }
        write_u64(buf, self.output);

        let produced = buf.len() - start;
        let cw_length = self.cw_seed.len();
        let expected = 8 + 16 + 8 + 16 * cw_length + cw_length + cw_length + 8 * cw_length + 8;
        assert_eq!(
            produced, expected,
            "DcfKey::serialize_into produced {produced} bytes, predicted {expected}"
        );
    }

    /// Serializes this key into a freshly allocated buffer.
    pub fn serialize(&self) -> Vec<u8> {
        let cw_length = self.cw_seed.len();
        let mut buf =
            Vec::with_capacity(8 + 16 + 8 + 16 * cw_length + cw_length + cw_length + 8 * cw_length + 8);
        self.serialize_into(&mut buf);
        buf
    }

    /// Decodes a key previously produced by [`DcfKey::serialize`] / [`DcfKey::serialize_into`].
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
        let mut cw_value = Vec::with_capacity(cw_length);
        for _ in 0..cw_length {
            cw_value.push(reader.read_u64()?);
        }
        let output = reader.read_u64()?;

        Ok(DcfKey::new(
            party_id,
            init_seed,
            cw_seed,
            cw_control_left,
            cw_control_right,
            cw_value,
            output,
        ))
    }
}

impl fmt::Debug for DcfKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DcfKey")
            .field("party_id", &self.party_id)
            .field("init_seed", &"_")
            .field("cw_length", &self.cw_seed.len())
            .finish()
    }
}

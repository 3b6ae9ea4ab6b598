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

//! Little-endian byte-buffer helpers shared by the DPF and DCF key serializers (C8).

use crate::block::Block;
use crate::error::Error;

pub fn write_u64(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_le_bytes());
}

pub fn write_block(buf: &mut Vec<u8>, value: Block) {
    buf.extend_from_slice(&value.to_bytes());
}

pub fn write_bool(buf: &mut Vec<u8>, value: bool) {
    buf.push(if value { 1 } else { 0 });
}

/// A cursor over a byte slice that reports `Error::IoShort` instead of panicking when a
/// read would run past the end of the buffer.
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if self.pos + len > self.bytes.len() {
            return Err(Error::IoShort {
                expected: self.pos + len,
                actual: self.bytes.len(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u64(&mut self) -> Result<u64, Error> {
        let slice = self.take(8)?;
        Ok(u64::from_le_bytes(slice.try_into().unwrap()))
    }

    pub fn read_block(&mut self) -> Result<Block, Error> {
        let slice = self.take(16)?;
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(slice);
        Ok(Block::from_bytes(bytes))
    }

    pub fn read_bool(&mut self) -> Result<bool, Error> {
        let slice = self.take(1)?;
        Ok(slice[0] != 0)
    }

    /// Bytes left unread; a successful parse should drain this to zero.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}

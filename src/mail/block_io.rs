//-
// Copyright (c) 2026, the Mudmail authors
//
// This file is part of Mudmail.
//
// Mudmail is free software: you can redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Mudmail is distributed in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Mudmail. If not, see <http://www.gnu.org/licenses/>.

//! Raw block reads and writes against the mail file.
//!
//! The file is opened and closed around every call; nothing is cached except
//! the length of the file as of the last write.

use std::fs;
use std::io::{self, BufReader, Seek, Write};
use std::path::{Path, PathBuf};

use super::block::{BlockId, Geometry};
use crate::support::error::Error;
use crate::support::file_ops::ReadUninterruptibly;

#[derive(Debug)]
pub struct BlockFile {
    path: PathBuf,
    geom: Geometry,
    end_pos: u64,
}

impl BlockFile {
    pub fn new(path: PathBuf, geom: Geometry) -> Self {
        BlockFile {
            path,
            geom,
            end_pos: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The length of the file as of the last write or scan.
    pub fn end_pos(&self) -> u64 {
        self.end_pos
    }

    /// The block an append would land in.
    pub fn end_block(&self) -> Result<BlockId, Error> {
        BlockId::from_offset(self.end_pos, self.geom)
    }

    /// The number of whole blocks as of the last write or scan.
    pub fn block_count(&self) -> u64 {
        self.end_pos / self.geom.block_size() as u64
    }

    /// Create the file, empty, if it does not exist.
    ///
    /// Returns whether the file was created.
    pub fn create_if_missing(&mut self) -> Result<bool, Error> {
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(_) => {
                self.end_pos = 0;
                Ok(true)
            }
            Err(e) if io::ErrorKind::AlreadyExists == e.kind() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Write `data` at the start of block `at`, then refresh the cached end
    /// position.
    ///
    /// `data` may be shorter than a block but not longer.
    pub fn write_block(
        &mut self,
        at: BlockId,
        data: &[u8],
    ) -> Result<(), Error> {
        debug_assert!(data.len() <= self.geom.block_size());

        let mut file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)?;
        file.seek(io::SeekFrom::Start(at.offset(self.geom)))?;
        file.write_all(data)?;
        self.end_pos = file.seek(io::SeekFrom::End(0))?;
        Ok(())
    }

    /// Read the whole block at `at`.
    ///
    /// A block extending past the end of the file is a `BrokenChain`.
    pub fn read_block(&self, at: BlockId) -> Result<Vec<u8>, Error> {
        let mut file = fs::File::open(&self.path)?;
        file.seek(io::SeekFrom::Start(at.offset(self.geom)))?;

        let mut buf = vec![0u8; self.geom.block_size()];
        if file.read_uninteruptibly(&mut buf)? != buf.len() {
            return Err(Error::BrokenChain(at.offset(self.geom)));
        }

        Ok(buf)
    }

    /// Read every whole block in the file in order, passing each to `f`.
    ///
    /// Returns the total length of the file, which includes any trailing
    /// partial block, and caches it as the end position.
    pub fn for_each_block(
        &mut self,
        mut f: impl FnMut(BlockId, &[u8]) -> Result<(), Error>,
    ) -> Result<u64, Error> {
        let file = fs::File::open(&self.path)?;
        let mut reader = BufReader::new(file);
        let mut buf = vec![0u8; self.geom.block_size()];
        let mut total = 0u64;
        let mut number = 0u64;

        loop {
            let nread = reader.read_uninteruptibly(&mut buf)?;
            total += nread as u64;
            if nread < buf.len() {
                break;
            }

            f(BlockId::from_number(number), &buf)?;
            number += 1;
        }

        self.end_pos = total;
        Ok(total)
    }
}

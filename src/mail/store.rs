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

use std::path::{Path, PathBuf};

use log::error;

use super::block::{Block, BlockId, Geometry};
use super::block_io::BlockFile;
use super::free_list::FreeList;
use super::recipient_index::RecipientIndex;
use crate::support::error::Error;

/// The mail store: the backing file plus the state rebuilt from it at boot.
///
/// A fresh store knows nothing about the file; call `scan()` once before
/// anything else. Until then, and again after `teardown()`, operations on
/// mail fail with `NotBooted` rather than allocating from an empty free list
/// over live blocks.
#[derive(Debug)]
pub struct MailStore {
    pub(super) geom: Geometry,
    pub(super) file: BlockFile,
    pub(super) free_list: FreeList,
    pub(super) index: RecipientIndex,
    pub(super) booted: bool,
    disabled: bool,
}

/// Point-in-time counters describing a `MailStore`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub messages: usize,
    pub recipients: usize,
    pub free_blocks: usize,
    pub file_len: u64,
    pub disabled: bool,
}

impl MailStore {
    /// Set up a store backed by the file at `path` with blocks of
    /// `block_size` bytes.
    ///
    /// If `block_size` cannot hold a header block, the store is created
    /// already disabled.
    pub fn new(path: PathBuf, block_size: usize) -> Self {
        let (geom, disabled) = match Geometry::new(block_size) {
            Ok(geom) => (geom, false),
            Err(e) => {
                error!("Mail system -- {}; mail disabled!", e);
                (Geometry::default(), true)
            }
        };

        MailStore {
            geom,
            file: BlockFile::new(path, geom),
            free_list: FreeList::new(),
            index: RecipientIndex::new(),
            booted: false,
            disabled,
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn block_size(&self) -> usize {
        self.geom.block_size()
    }

    /// Whether a fault has permanently disabled this store.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Whether `recipient` has any mail waiting.
    ///
    /// Always false once the store is disabled.
    pub fn has_mail(&self, recipient: i64) -> bool {
        !self.disabled && self.booted && self.index.has_mail(recipient)
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            messages: self.index.messages(),
            recipients: self.index.recipients(),
            free_blocks: self.free_list.len(),
            file_len: self.file.end_pos(),
            disabled: self.disabled,
        }
    }

    /// Release the recipient index and free list.
    ///
    /// The file is untouched; a later `scan()` rebuilds both.
    pub fn teardown(&mut self) {
        self.index.clear();
        self.free_list.clear();
        self.booted = false;
    }

    pub(super) fn ensure_enabled(&self) -> Result<(), Error> {
        if self.disabled {
            Err(Error::MailDisabled)
        } else {
            Ok(())
        }
    }

    /// Like `ensure_enabled()`, but also require a completed `scan()`.
    pub(super) fn ensure_booted(&self) -> Result<(), Error> {
        self.ensure_enabled()?;
        if self.booted {
            Ok(())
        } else {
            Err(Error::NotBooted)
        }
    }

    /// Pass `result` through, disabling the store if it is a fault.
    pub(super) fn guard<T>(
        &mut self,
        result: Result<T, Error>,
    ) -> Result<T, Error> {
        if let Err(ref e) = result {
            if e.is_fault() {
                error!(
                    "Mail system -- fatal error on {}: {}",
                    self.file.path().display(),
                    e
                );
                error!("Mail system disabled!");
                self.disabled = true;
            }
        }

        result
    }

    /// Overwrite `at` with a deleted block and make it available for reuse.
    pub(super) fn release(&mut self, at: BlockId) -> Result<(), Error> {
        self.file.write_block(at, &Block::Deleted.encode(self.geom))?;
        self.free_list.push(at);
        Ok(())
    }
}

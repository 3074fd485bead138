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

//! Rebuilding the in-memory state from the mail file, and checking that the
//! two agree.

use std::collections::HashSet;

use log::{error, info, warn};

use super::block::{peek_tag, Block, BlockId, Link, DELETED_BLOCK, HEADER_BLOCK};
use super::store::MailStore;
use crate::support::error::Error;

/// What `scan()` found in the mail file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub messages: usize,
    pub free_blocks: usize,
    pub file_len: u64,
}

/// The result of `verify()`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub messages: usize,
    /// Data blocks reachable from an indexed header.
    pub data_blocks: usize,
    pub free_blocks: usize,
    /// Data blocks no indexed chain reaches, such as those left by a store
    /// that was interrupted part way through.
    pub orphan_blocks: usize,
    pub problems: Vec<String>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

impl MailStore {
    /// Read the whole mail file and rebuild the recipient index and free
    /// list from it, replacing whatever they held before.
    ///
    /// A missing file is created empty. A file whose length is not a whole
    /// number of blocks disables the store. Headers with a negative recipient
    /// can never be delivered; they are rewritten as deleted blocks and
    /// freed.
    ///
    /// Each recipient's mail is queued by the time it was stored, so delivery
    /// stays oldest-first even where the free list placed newer mail earlier
    /// in the file. Timestamps only have one-second resolution, and messages
    /// stored within the same second are queued in file order, which need
    /// not be the order they were stored in.
    pub fn scan(&mut self) -> Result<ScanReport, Error> {
        self.ensure_enabled()?;
        self.teardown();

        let result = self.scan_file();
        match result {
            Ok(_) => self.booted = true,
            Err(_) => self.teardown(),
        }
        self.guard(result)
    }

    fn scan_file(&mut self) -> Result<ScanReport, Error> {
        if self.file.create_if_missing()? {
            info!(
                "Mail file {} non-existent... creating new file.",
                self.file.path().display()
            );
            return Ok(ScanReport::default());
        }

        let geom = self.geom;
        let mut headers = Vec::<(i64, i64, BlockId)>::new();
        let mut deleted = Vec::<BlockId>::new();
        let mut unaddressed = Vec::<BlockId>::new();
        let file_len = self.file.for_each_block(|at, data| {
            match peek_tag(data) {
                Some(HEADER_BLOCK) => {
                    if let Block::Header(h) = Block::decode(data, at, geom)? {
                        if h.to < 0 {
                            warn!(
                                "Mail system -- header at {} has invalid \
                                 recipient {}; freeing",
                                at.offset(geom),
                                h.to
                            );
                            unaddressed.push(at);
                        } else {
                            headers.push((h.timestamp, h.to, at));
                        }
                    }
                }
                Some(DELETED_BLOCK) => deleted.push(at),
                // Continuation block, only reachable through its chain
                _ => (),
            }
            Ok(())
        })?;

        info!("   {} bytes read.", file_len);
        if 0 != file_len % geom.block_size() as u64 {
            error!("Error booting mail system -- Mail file corrupt!");
            return Err(Error::CorruptLength(file_len));
        }

        // Stable, so equal timestamps keep file order
        headers.sort_by_key(|&(timestamp, _, _)| timestamp);
        for &(_, to, at) in &headers {
            self.index.record(to, at);
        }
        for &at in &deleted {
            self.free_list.push(at);
        }
        for &at in &unaddressed {
            self.release(at)?;
        }

        info!("   Mail file read -- {} messages.", headers.len());
        Ok(ScanReport {
            messages: headers.len(),
            free_blocks: deleted.len() + unaddressed.len(),
            file_len,
        })
    }

    /// Check the mail file against the in-memory state without changing
    /// either.
    ///
    /// Every indexed message must start with a header addressed to its
    /// recipient and continue through data blocks only until a `LAST_BLOCK`;
    /// no block may belong to two chains or be both in a chain and free;
    /// every free block must be marked deleted and every deleted block must
    /// be free.
    pub fn verify(&self) -> Result<VerifyReport, Error> {
        self.ensure_booted()?;

        let geom = self.geom;
        let mut report = VerifyReport::default();
        let mut seen = HashSet::<BlockId>::new();

        for (recipient, queue) in self.index.iter() {
            for &start in queue {
                report.messages += 1;
                self.verify_chain(recipient, start, &mut seen, &mut report);
            }
        }

        for at in self.free_list.iter() {
            report.free_blocks += 1;
            if !seen.insert(at) {
                report
                    .problems
                    .push(format!("free block {} is also in use", at));
                continue;
            }

            match self.read_decoded(at) {
                Ok(Block::Deleted) => (),
                Ok(_) => report
                    .problems
                    .push(format!("free block {} is not deleted", at)),
                Err(e) => report.problems.push(format!("{}: {}", at, e)),
            }
        }

        for n in 0..self.file.block_count() {
            let at = BlockId::from_number(n);
            if seen.contains(&at) {
                continue;
            }

            match self.file.read_block(at).map(|data| peek_tag(&data)) {
                Ok(Some(HEADER_BLOCK)) => report
                    .problems
                    .push(format!("header {} is not indexed", at)),
                Ok(Some(DELETED_BLOCK)) => report
                    .problems
                    .push(format!("deleted block {} is not free", at)),
                Ok(_) => report.orphan_blocks += 1,
                Err(e) => report.problems.push(format!("{}: {}", at, e)),
            }
        }

        if 0 != self.file.end_pos() % geom.block_size() as u64 {
            report.problems.push(format!(
                "file length {} is not a whole number of blocks",
                self.file.end_pos()
            ));
        }

        Ok(report)
    }

    fn verify_chain(
        &self,
        recipient: i64,
        start: BlockId,
        seen: &mut HashSet<BlockId>,
        report: &mut VerifyReport,
    ) {
        if !seen.insert(start) {
            report
                .problems
                .push(format!("header {} is indexed twice", start));
            return;
        }

        let mut link = match self.read_decoded(start) {
            Ok(Block::Header(h)) if h.to == recipient => h.next,
            Ok(Block::Header(h)) => {
                report.problems.push(format!(
                    "header {} is addressed to {} but indexed under {}",
                    start, h.to, recipient
                ));
                h.next
            }
            Ok(_) => {
                report
                    .problems
                    .push(format!("indexed block {} is not a header", start));
                return;
            }
            Err(e) => {
                report.problems.push(format!("{}: {}", start, e));
                return;
            }
        };

        while let Link::Next(at) = link {
            if !seen.insert(at) {
                report.problems.push(format!(
                    "chain from {} reaches {} which is already in use",
                    start, at
                ));
                return;
            }

            match self.read_decoded(at) {
                Ok(Block::Data(d)) => {
                    report.data_blocks += 1;
                    link = d.link;
                }
                Ok(_) => {
                    report.problems.push(format!(
                        "chain from {} reaches non-data block {}",
                        start, at
                    ));
                    return;
                }
                Err(e) => {
                    report.problems.push(format!("{}: {}", at, e));
                    return;
                }
            }
        }
    }

    fn read_decoded(&self, at: BlockId) -> Result<Block, Error> {
        Block::decode(&self.file.read_block(at)?, at, self.geom)
    }
}

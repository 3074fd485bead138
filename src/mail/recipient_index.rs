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

//! In-memory index from recipient to the messages waiting for them.

use std::collections::hash_map::{Entry, HashMap};
use std::collections::VecDeque;

use super::block::BlockId;

/// Maps each recipient with pending mail to the header blocks of that mail.
///
/// Each queue is ordered most-recent-first. A recipient without mail has no
/// entry at all, so a queue is never empty.
#[derive(Debug, Default)]
pub struct RecipientIndex {
    entries: HashMap<i64, VecDeque<BlockId>>,
}

impl RecipientIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the queue of `recipient`, most recent first.
    pub fn lookup(&self, recipient: i64) -> Option<&VecDeque<BlockId>> {
        self.entries.get(&recipient)
    }

    /// Record a message for `recipient` whose header is at `header`, as the
    /// most recent one.
    pub fn record(&mut self, recipient: i64, header: BlockId) {
        self.entries
            .entry(recipient)
            .or_insert_with(VecDeque::new)
            .push_front(header);
    }

    pub fn has_mail(&self, recipient: i64) -> bool {
        self.lookup(recipient).is_some()
    }

    /// Remove and return the oldest message of `recipient`.
    ///
    /// The recipient's entry disappears along with its last message.
    pub fn take_oldest(&mut self, recipient: i64) -> Option<BlockId> {
        match self.entries.entry(recipient) {
            Entry::Vacant(_) => None,
            Entry::Occupied(mut e) => {
                let header = e.get_mut().pop_back();
                if e.get().is_empty() {
                    e.remove();
                }
                header
            }
        }
    }

    /// The number of recipients with mail.
    pub fn recipients(&self) -> usize {
        self.entries.len()
    }

    /// The number of messages across all recipients.
    pub fn messages(&self) -> usize {
        self.entries.values().map(VecDeque::len).sum()
    }

    pub fn iter<'a>(
        &'a self,
    ) -> impl Iterator<Item = (i64, &'a VecDeque<BlockId>)> + 'a {
        self.entries.iter().map(|(&r, q)| (r, q))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

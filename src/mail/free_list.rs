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

//! The stack of deleted blocks available for reuse.

use super::block::BlockId;

/// A LIFO stack of free blocks.
///
/// When the stack is empty, allocation falls back to the end of the file.
/// The file only grows once something is actually written there.
#[derive(Debug, Default)]
pub struct FreeList {
    blocks: Vec<BlockId>,
}

impl FreeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: BlockId) {
        self.blocks.push(block);
    }

    /// Take the most recently freed block, or `end` if there is none.
    pub fn pop(&mut self, end: BlockId) -> BlockId {
        self.blocks.pop().unwrap_or(end)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn iter<'a>(&'a self) -> impl Iterator<Item = BlockId> + 'a {
        self.blocks.iter().copied()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }
}

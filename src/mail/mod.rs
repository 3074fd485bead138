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

//! The persistent mail store.
//!
//! All mail lives in a single file made of fixed-size blocks (see `block` for
//! the binary layout). A message is one header block, carrying the sender,
//! recipient, attached item, time, and the start of the text, followed by
//! zero or more data blocks carrying the rest of the text. Each block links
//! to the next by file offset; the last is tagged `LAST_BLOCK`. The file has
//! no header, no magic number, and no ordering: it is just a bag of blocks.
//!
//! Nothing but the blocks is persisted. When the store is booted, `scan()`
//! reads the whole file once and rebuilds two in-memory structures:
//!
//! - the `RecipientIndex`, from every header block;
//! - the `FreeList`, from every deleted block.
//!
//! Data blocks are only ever reached by following a chain from its header.
//!
//! Storing a message allocates blocks from the free list, appending to the
//! file when it is empty. Taking a message delivers the oldest waiting one,
//! marks every block of its chain deleted, and returns them to the free list.
//!
//! The store is not safe for concurrent use by multiple processes, and the
//! caller must serialise all calls within a process.
//!
//! # Failure
//!
//! Structural problems (a misaligned link, a broken chain, a file whose
//! length is not a whole number of blocks, I/O failure) permanently disable
//! the store. Every later operation fails with `Error::MailDisabled` and
//! `has_mail()` reports nothing, so the host can tell players the mail system
//! is having difficulties without crashing. Bad arguments only fail the call
//! at hand.

mod block;
mod block_io;
mod free_list;
mod letter;
mod messages;
mod recipient_index;
mod scan;
mod store;

pub use self::block::DEFAULT_BLOCK_SIZE;
pub use self::letter::Letter;
pub use self::store::MailStore;

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

//! Binary layout of the blocks making up the mail file.
//!
//! Every block is exactly `block_size` bytes and starts with an `i64` tag,
//! stored little-endian like every other integer in the file:
//!
//! - `-1` (`HEADER_BLOCK`): the first block of a message.
//! - `-2` (`LAST_BLOCK`): a data block ending its message's chain.
//! - `-3` (`DELETED_BLOCK`): a free block that may be overwritten.
//! - `>= 0`: a data block whose chain continues at that byte offset.
//!
//! A header block continues with:
//!
//! - `i64`: next block offset, or `LAST_BLOCK`
//! - `i64`: sender id
//! - `i64`: recipient id
//! - `i16`: attached item id, `NO_ITEM` for none
//! - `i64`: UNIX timestamp the message was stored at
//! - NUL-terminated text filling the rest of the block
//!
//! A data block has nothing but NUL-terminated text after its tag.

use std::fmt;
use std::io::{self, Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::support::error::Error;

pub const HEADER_BLOCK: i64 = -1;
pub const LAST_BLOCK: i64 = -2;
pub const DELETED_BLOCK: i64 = -3;

/// The attached item id meaning "nothing attached".
pub const NO_ITEM: i16 = -1;

pub const DEFAULT_BLOCK_SIZE: usize = 100;

const TAG_SIZE: usize = 8;
/// Tag, next block, from, to, attached item, timestamp.
const HEADER_FIXED_SIZE: usize = TAG_SIZE + 8 + 8 + 8 + 2 + 8;

/// Identifies a block in the mail file.
///
/// This holds the block *number*, not its byte offset, so it cannot describe
/// a position that is not on a block boundary. The byte offset is only
/// materialised against a `Geometry`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(u64);

impl BlockId {
    pub fn from_number(n: u64) -> Self {
        BlockId(n)
    }

    /// The byte offset of this block in a file laid out by `geom`.
    pub fn offset(self, geom: Geometry) -> u64 {
        self.0 * geom.block_size as u64
    }

    /// Convert a byte offset back into a `BlockId`.
    ///
    /// Fails with `MisalignedBlock` if `offset` is not on a block boundary.
    pub fn from_offset(offset: u64, geom: Geometry) -> Result<Self, Error> {
        let bs = geom.block_size as u64;
        if 0 != offset % bs {
            return Err(Error::MisalignedBlock(offset));
        }

        Ok(BlockId(offset / bs))
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The block size and the text capacities derived from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    block_size: usize,
}

impl Geometry {
    /// Validate `block_size`.
    ///
    /// The block must fit the fixed header fields plus at least one byte of
    /// text and its terminator.
    pub fn new(block_size: usize) -> Result<Self, Error> {
        if block_size < HEADER_FIXED_SIZE + 2 {
            return Err(Error::BlockSizeTooSmall(block_size));
        }

        Ok(Geometry { block_size })
    }

    pub fn block_size(self) -> usize {
        self.block_size
    }

    /// Bytes of message text carried by a header block.
    pub fn header_capacity(self) -> usize {
        self.block_size - HEADER_FIXED_SIZE - 1
    }

    /// Bytes of message text carried by a data block.
    pub fn data_capacity(self) -> usize {
        self.block_size - TAG_SIZE - 1
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Geometry {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

/// Where a chain goes after the current block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Link {
    Last,
    Next(BlockId),
}

impl Link {
    fn encode(self, geom: Geometry) -> i64 {
        match self {
            Link::Last => LAST_BLOCK,
            Link::Next(id) => id.offset(geom) as i64,
        }
    }

    fn decode(raw: i64, at: BlockId, geom: Geometry) -> Result<Self, Error> {
        if LAST_BLOCK == raw {
            Ok(Link::Last)
        } else if raw >= 0 {
            BlockId::from_offset(raw as u64, geom).map(Link::Next)
        } else {
            Err(Error::BrokenChain(at.offset(geom)))
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderBlock {
    pub next: Link,
    pub from: i64,
    pub to: i64,
    pub attached_item_id: i16,
    pub timestamp: i64,
    pub text: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataBlock {
    pub link: Link,
    pub text: Vec<u8>,
}

/// A decoded block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    Header(HeaderBlock),
    Data(DataBlock),
    Deleted,
}

impl Block {
    /// Point this block's chain at `link`.
    ///
    /// Does nothing to deleted blocks.
    pub fn set_link(&mut self, link: Link) {
        match *self {
            Block::Header(ref mut h) => h.next = link,
            Block::Data(ref mut d) => d.link = link,
            Block::Deleted => (),
        }
    }

    /// Serialise this block into exactly `geom.block_size()` bytes.
    ///
    /// Text beyond the block's capacity is truncated. Deleted blocks are
    /// zero-filled after the tag.
    pub fn encode(&self, geom: Geometry) -> Vec<u8> {
        let mut buf = vec![0u8; geom.block_size()];
        // Cannot fail: every field fits and text is truncated to the space
        // left in the buffer.
        let res = self.write_fields(&mut Cursor::new(&mut buf[..]), geom);
        debug_assert!(res.is_ok(), "Block overflowed {:?}", geom);
        buf
    }

    fn write_fields(
        &self,
        w: &mut impl Write,
        geom: Geometry,
    ) -> io::Result<()> {
        match *self {
            Block::Header(ref h) => {
                w.write_i64::<LittleEndian>(HEADER_BLOCK)?;
                w.write_i64::<LittleEndian>(h.next.encode(geom))?;
                w.write_i64::<LittleEndian>(h.from)?;
                w.write_i64::<LittleEndian>(h.to)?;
                w.write_i16::<LittleEndian>(h.attached_item_id)?;
                w.write_i64::<LittleEndian>(h.timestamp)?;
                w.write_all(truncate(&h.text, geom.header_capacity()))
            }
            Block::Data(ref d) => {
                w.write_i64::<LittleEndian>(d.link.encode(geom))?;
                w.write_all(truncate(&d.text, geom.data_capacity()))
            }
            Block::Deleted => w.write_i64::<LittleEndian>(DELETED_BLOCK),
        }
    }

    /// Decode the block stored at `at`.
    ///
    /// Fails if `buf` is not a whole block or if a link is misaligned or
    /// otherwise invalid.
    pub fn decode(
        buf: &[u8],
        at: BlockId,
        geom: Geometry,
    ) -> Result<Self, Error> {
        if buf.len() != geom.block_size() {
            return Err(Error::BrokenChain(at.offset(geom)));
        }

        let mut r = Cursor::new(buf);
        let tag = r.read_i64::<LittleEndian>()?;
        match tag {
            HEADER_BLOCK => {
                let next =
                    Link::decode(r.read_i64::<LittleEndian>()?, at, geom)?;
                let from = r.read_i64::<LittleEndian>()?;
                let to = r.read_i64::<LittleEndian>()?;
                let attached_item_id = r.read_i16::<LittleEndian>()?;
                let timestamp = r.read_i64::<LittleEndian>()?;
                Ok(Block::Header(HeaderBlock {
                    next,
                    from,
                    to,
                    attached_item_id,
                    timestamp,
                    text: unterminate(&buf[HEADER_FIXED_SIZE..]).to_vec(),
                }))
            }
            DELETED_BLOCK => Ok(Block::Deleted),
            raw => Ok(Block::Data(DataBlock {
                link: Link::decode(raw, at, geom)?,
                text: unterminate(&buf[TAG_SIZE..]).to_vec(),
            })),
        }
    }
}

/// Read only the tag of a raw block.
pub fn peek_tag(buf: &[u8]) -> Option<i64> {
    if buf.len() < TAG_SIZE {
        return None;
    }

    Cursor::new(buf).read_i64::<LittleEndian>().ok()
}

fn truncate(text: &[u8], capacity: usize) -> &[u8] {
    &text[..text.len().min(capacity)]
}

fn unterminate(text: &[u8]) -> &[u8] {
    let end = text.iter().position(|&b| 0 == b).unwrap_or(text.len());
    &text[..end]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_geometry_capacities() {
        let geom = Geometry::default();
        assert_eq!(100, geom.block_size());
        assert_eq!(57, geom.header_capacity());
        assert_eq!(91, geom.data_capacity());
    }

    #[test]
    fn geometry_rejects_tiny_blocks() {
        assert_matches!(Err(Error::BlockSizeTooSmall(43)), Geometry::new(43));
        let geom = Geometry::new(44).unwrap();
        assert_eq!(1, geom.header_capacity());
    }

    #[test]
    fn block_id_alignment() {
        let geom = Geometry::default();
        assert_eq!(
            BlockId::from_number(3),
            BlockId::from_offset(300, geom).unwrap()
        );
        assert_eq!(300, BlockId::from_number(3).offset(geom));
        assert_matches!(
            Err(Error::MisalignedBlock(250)),
            BlockId::from_offset(250, geom)
        );
    }

    #[test]
    fn header_layout() {
        let geom = Geometry::default();
        let block = Block::Header(HeaderBlock {
            next: Link::Next(BlockId::from_number(2)),
            from: 200,
            to: 100,
            attached_item_id: 3001,
            timestamp: 1_000_000,
            text: b"Hello World".to_vec(),
        });
        let buf = block.encode(geom);
        assert_eq!(100, buf.len());
        assert_eq!(Some(HEADER_BLOCK), peek_tag(&buf));
        // Next block is stored as a byte offset
        assert_eq!(&200i64.to_le_bytes(), &buf[8..16]);
        assert_eq!(&3001i16.to_le_bytes(), &buf[32..34]);
        assert_eq!(b"Hello World\0", &buf[42..54]);

        assert_eq!(
            block,
            Block::decode(&buf, BlockId::from_number(0), geom).unwrap()
        );
    }

    #[test]
    fn text_is_truncated_and_terminated() {
        let geom = Geometry::default();
        let block = Block::Data(DataBlock {
            link: Link::Last,
            text: vec![b'x'; 200],
        });
        let buf = block.encode(geom);
        assert_eq!(Some(LAST_BLOCK), peek_tag(&buf));
        assert_eq!(0, buf[99]);

        match Block::decode(&buf, BlockId::from_number(0), geom).unwrap() {
            Block::Data(d) => {
                assert_eq!(Link::Last, d.link);
                assert_eq!(vec![b'x'; 91], d.text);
            }
            b => panic!("Unexpected block: {:?}", b),
        }
    }

    #[test]
    fn deleted_block_is_zeroed() {
        let geom = Geometry::default();
        let buf = Block::Deleted.encode(geom);
        assert_eq!(Some(DELETED_BLOCK), peek_tag(&buf));
        assert!(buf[8..].iter().all(|&b| 0 == b));
        assert_eq!(
            Block::Deleted,
            Block::decode(&buf, BlockId::from_number(1), geom).unwrap()
        );
    }

    #[test]
    fn set_link_patches_either_kind() {
        let mut header = Block::Header(HeaderBlock {
            next: Link::Last,
            from: 1,
            to: 2,
            attached_item_id: NO_ITEM,
            timestamp: 0,
            text: b"a".to_vec(),
        });
        header.set_link(Link::Next(BlockId::from_number(7)));
        assert_matches!(
            Block::Header(HeaderBlock {
                next: Link::Next(BlockId(7)),
                ..
            }),
            header
        );

        let mut data = Block::Data(DataBlock {
            link: Link::Last,
            text: b"b".to_vec(),
        });
        data.set_link(Link::Next(BlockId::from_number(9)));
        let buf = data.encode(Geometry::default());
        assert_eq!(Some(900), peek_tag(&buf));
    }

    #[test]
    fn bad_links_are_rejected() {
        let geom = Geometry::default();
        let mut buf = Block::Deleted.encode(geom);
        buf[..8].copy_from_slice(&150i64.to_le_bytes());
        assert_matches!(
            Err(Error::MisalignedBlock(150)),
            Block::decode(&buf, BlockId::from_number(0), geom)
        );

        buf[..8].copy_from_slice(&(-7i64).to_le_bytes());
        assert_matches!(
            Err(Error::BrokenChain(400)),
            Block::decode(&buf, BlockId::from_number(4), geom)
        );
    }
}

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

//! Storing messages as block chains, and taking them back out.

use chrono::prelude::*;
use log::warn;

use super::block::{Block, BlockId, DataBlock, HeaderBlock, Link};
use super::letter::Letter;
use super::store::MailStore;
use crate::support::error::Error;

impl MailStore {
    /// Store a message from `from` to `to`, stamped with the current time.
    ///
    /// `text` must be non-empty and free of NUL bytes. It is not length
    /// limited here; callers are expected to cap it.
    ///
    /// Returns the block holding the message's header.
    pub fn store(
        &mut self,
        to: i64,
        from: i64,
        attached_item_id: i16,
        text: &str,
    ) -> Result<BlockId, Error> {
        self.store_at(to, from, attached_item_id, text, Utc::now().timestamp())
    }

    /// Like `store()`, but with an explicit UNIX `timestamp`.
    pub fn store_at(
        &mut self,
        to: i64,
        from: i64,
        attached_item_id: i16,
        text: &str,
        timestamp: i64,
    ) -> Result<BlockId, Error> {
        self.ensure_booted()?;

        let invalid = if to < 0 {
            Some(Error::BadRecipient(to))
        } else if from < 0 {
            Some(Error::BadSender(from))
        } else if text.is_empty() {
            Some(Error::EmptyMessage)
        } else if text.as_bytes().contains(&0) {
            Some(Error::NulInMessage)
        } else {
            None
        };
        if let Some(e) = invalid {
            warn!("Mail system -- rejected message {} -> {}: {}", from, to, e);
            return Err(e);
        }

        let result =
            self.write_chain(to, from, attached_item_id, text, timestamp);
        self.guard(result)
    }

    fn write_chain(
        &mut self,
        to: i64,
        from: i64,
        attached_item_id: i16,
        text: &str,
        timestamp: i64,
    ) -> Result<BlockId, Error> {
        let geom = self.geom;
        let (head, mut rest) = split(text.as_bytes(), geom.header_capacity());

        let mut prev = Block::Header(HeaderBlock {
            next: Link::Last,
            from,
            to,
            attached_item_id,
            timestamp,
            text: head.to_vec(),
        });
        let start = self.free_list.pop(self.file.end_block()?);
        // The message is indexed before any of it is on disk
        self.index.record(to, start);
        self.file.write_block(start, &prev.encode(geom))?;

        let mut prev_at = start;
        while !rest.is_empty() {
            let (chunk, tail) = split(rest, geom.data_capacity());
            rest = tail;

            let at = self.free_list.pop(self.file.end_block()?);
            prev.set_link(Link::Next(at));
            self.file.write_block(prev_at, &prev.encode(geom))?;

            prev = Block::Data(DataBlock {
                link: Link::Last,
                text: chunk.to_vec(),
            });
            self.file.write_block(at, &prev.encode(geom))?;
            prev_at = at;
        }

        Ok(start)
    }

    /// Take the oldest message waiting for `recipient` out of the store.
    ///
    /// Every block of the message is deleted and freed for reuse. Returns
    /// `None` if `recipient` has no mail; callers are expected to check
    /// `has_mail()` first.
    pub fn take(&mut self, recipient: i64) -> Result<Option<Letter>, Error> {
        self.ensure_booted()?;

        if recipient < 0 {
            warn!("Mail system -- take for invalid recipient {}", recipient);
            return Err(Error::BadRecipient(recipient));
        }

        let start = match self.index.take_oldest(recipient) {
            Some(start) => start,
            None => return Ok(None),
        };

        let result = self.read_delete(start).map(Some);
        self.guard(result)
    }

    fn read_delete(&mut self, start: BlockId) -> Result<Letter, Error> {
        let geom = self.geom;
        let header =
            match Block::decode(&self.file.read_block(start)?, start, geom)? {
                Block::Header(header) => header,
                _ => return Err(Error::NotAHeader(start.offset(geom))),
            };
        self.release(start)?;

        let mut body = header.text;
        let mut link = header.next;
        // A chain can visit each block at most once
        let mut hops_left = self.file.block_count();
        while let Link::Next(at) = link {
            if 0 == hops_left {
                return Err(Error::BrokenChain(at.offset(geom)));
            }
            hops_left -= 1;

            match Block::decode(&self.file.read_block(at)?, at, geom)? {
                Block::Data(data) => {
                    body.extend_from_slice(&data.text);
                    link = data.link;
                }
                _ => return Err(Error::BrokenChain(at.offset(geom))),
            }
            self.release(at)?;
        }

        Ok(Letter {
            to: header.to,
            from: header.from,
            attached_item_id: header.attached_item_id,
            timestamp: header.timestamp,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

fn split(text: &[u8], capacity: usize) -> (&[u8], &[u8]) {
    text.split_at(text.len().min(capacity))
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;
    use std::fs;
    use std::path::PathBuf;

    use proptest::prelude::*;
    use tempfile::TempDir;

    use super::*;
    use crate::mail::block::{peek_tag, Geometry, LAST_BLOCK, NO_ITEM};

    struct Setup {
        _tmpdir: TempDir,
        path: PathBuf,
        store: MailStore,
    }

    fn set_up() -> Setup {
        crate::init_test_log();

        let tmpdir = TempDir::new().unwrap();
        let path = tmpdir.path().join("plrmail");
        let mut store = MailStore::new(path.clone(), 100);
        store.scan().unwrap();
        Setup {
            _tmpdir: tmpdir,
            path,
            store,
        }
    }

    fn file_len(setup: &Setup) -> u64 {
        fs::metadata(&setup.path).unwrap().len()
    }

    fn raw_block(setup: &Setup, n: u64) -> Vec<u8> {
        let data = fs::read(&setup.path).unwrap();
        data[n as usize * 100..(n as usize + 1) * 100].to_vec()
    }

    #[test]
    fn short_message_is_one_block() {
        let mut setup = set_up();
        let header =
            setup.store.store(100, 200, NO_ITEM, "Hello World").unwrap();

        assert_eq!(BlockId::from_number(0), header);
        assert_eq!(100, file_len(&setup));
        assert!(setup.store.has_mail(100));
        assert!(!setup.store.has_mail(200));

        let letter = setup.store.take(100).unwrap().unwrap();
        assert_eq!(100, letter.to);
        assert_eq!(200, letter.from);
        assert_eq!(None, letter.attachment());
        assert_eq!("Hello World", letter.body);
        assert!(!setup.store.has_mail(100));
    }

    #[test]
    fn long_message_chains_data_blocks() {
        let mut setup = set_up();
        let capacity = Geometry::default().header_capacity();
        let text = (0..capacity * 3)
            .map(|i| (b'a' + (i % 26) as u8) as char)
            .collect::<String>();

        setup.store.store(100, 200, 3001, &text).unwrap();
        assert_eq!(300, file_len(&setup));

        // Header -> block 1 -> block 2 -> last
        assert_eq!(&100i64.to_le_bytes(), &raw_block(&setup, 0)[8..16]);
        assert_eq!(Some(200), peek_tag(&raw_block(&setup, 1)));
        assert_eq!(Some(LAST_BLOCK), peek_tag(&raw_block(&setup, 2)));

        let letter = setup.store.take(100).unwrap().unwrap();
        assert_eq!(text, letter.body);
        assert_eq!(Some(3001), letter.attachment());

        // Every block was freed
        assert_eq!(3, setup.store.stats().free_blocks);
        assert_eq!(300, file_len(&setup));
    }

    #[test]
    fn exact_fit_needs_no_data_block() {
        let mut setup = set_up();
        let capacity = Geometry::default().header_capacity();
        setup
            .store
            .store(1, 2, NO_ITEM, &"x".repeat(capacity))
            .unwrap();
        assert_eq!(100, file_len(&setup));

        setup
            .store
            .store(1, 2, NO_ITEM, &"y".repeat(capacity + 1))
            .unwrap();
        assert_eq!(300, file_len(&setup));
    }

    #[test]
    fn delivery_is_oldest_first() {
        let mut setup = set_up();
        for body in &["first", "second", "third"] {
            setup.store.store(100, 200, NO_ITEM, body).unwrap();
        }

        let mut bodies = Vec::new();
        while setup.store.has_mail(100) {
            bodies.push(setup.store.take(100).unwrap().unwrap().body);
        }
        assert_eq!(vec!["first", "second", "third"], bodies);
        assert!(setup.store.take(100).unwrap().is_none());
    }

    #[test]
    fn recipients_do_not_see_each_others_mail() {
        let mut setup = set_up();
        setup.store.store(1, 9, NO_ITEM, "for one (a)").unwrap();
        setup.store.store(2, 9, NO_ITEM, "for two (a)").unwrap();
        setup.store.store(1, 9, NO_ITEM, "for one (b)").unwrap();
        setup.store.store(2, 9, NO_ITEM, "for two (b)").unwrap();

        assert_eq!("for two (a)", setup.store.take(2).unwrap().unwrap().body);
        assert_eq!("for one (a)", setup.store.take(1).unwrap().unwrap().body);
        assert_eq!("for two (b)", setup.store.take(2).unwrap().unwrap().body);
        assert!(!setup.store.has_mail(2));
        assert!(setup.store.has_mail(1));
        assert_eq!("for one (b)", setup.store.take(1).unwrap().unwrap().body);
    }

    #[test]
    fn freed_blocks_are_reused() {
        let mut setup = set_up();
        let long = "z".repeat(200);
        let mut used = HashSet::new();
        for to in 0..4 {
            setup.store.store(to, 9, NO_ITEM, &long).unwrap();
        }
        let len = file_len(&setup);
        for to in 0..4 {
            setup.store.take(to).unwrap().unwrap();
        }
        for n in 0..len / 100 {
            used.insert(BlockId::from_number(n));
        }
        assert_eq!(used.len(), setup.store.stats().free_blocks);

        // Same total size again: the file must not grow
        for to in 10..14 {
            let header = setup.store.store(to, 9, NO_ITEM, &long).unwrap();
            assert!(used.contains(&header));
        }
        assert_eq!(len, file_len(&setup));
        assert_eq!(0, setup.store.stats().free_blocks);

        // One more has to append
        setup.store.store(20, 9, NO_ITEM, "tail").unwrap();
        assert_eq!(len + 100, file_len(&setup));
    }

    #[test]
    fn bad_arguments_change_nothing() {
        let mut setup = set_up();
        assert_matches!(
            Err(Error::BadRecipient(-1)),
            setup.store.store(-1, 200, NO_ITEM, "x")
        );
        assert_matches!(
            Err(Error::BadSender(-5)),
            setup.store.store(100, -5, NO_ITEM, "x")
        );
        assert_matches!(
            Err(Error::EmptyMessage),
            setup.store.store(100, 200, NO_ITEM, "")
        );
        assert_matches!(
            Err(Error::NulInMessage),
            setup.store.store(100, 200, NO_ITEM, "a\0b")
        );
        assert_matches!(Err(Error::BadRecipient(-1)), setup.store.take(-1));

        assert!(!setup.store.is_disabled());
        assert!(!setup.store.has_mail(100));
        assert_eq!(0, file_len(&setup));
    }

    #[test]
    fn corrupt_chain_disables_store() {
        let mut setup = set_up();
        setup.store.store(100, 200, NO_ITEM, &"q".repeat(150)).unwrap();
        setup.store.store(300, 200, NO_ITEM, "other").unwrap();

        // Point the data block's link halfway into a block
        let mut data = fs::read(&setup.path).unwrap();
        data[100..108].copy_from_slice(&150i64.to_le_bytes());
        fs::write(&setup.path, data).unwrap();

        assert_matches!(
            Err(Error::MisalignedBlock(150)),
            setup.store.take(100)
        );
        assert!(setup.store.is_disabled());
        assert!(!setup.store.has_mail(300));
        assert_matches!(Err(Error::MailDisabled), setup.store.take(300));
        assert_matches!(
            Err(Error::MailDisabled),
            setup.store.store(1, 2, NO_ITEM, "x")
        );
    }

    #[test]
    fn chain_loop_is_detected() {
        let mut setup = set_up();
        setup.store.store(100, 200, NO_ITEM, &"q".repeat(300)).unwrap();

        // Make the last data block link back to the first data block
        let mut data = fs::read(&setup.path).unwrap();
        let last = data.len() - 100;
        data[last..last + 8].copy_from_slice(&100i64.to_le_bytes());
        fs::write(&setup.path, data).unwrap();

        assert_matches!(Err(Error::BrokenChain(..)), setup.store.take(100));
        assert!(setup.store.is_disabled());
    }

    #[test]
    fn missing_header_disables_store() {
        let mut setup = set_up();
        setup.store.store(100, 200, NO_ITEM, "Hello").unwrap();
        fs::write(&setup.path, Block::Deleted.encode(Geometry::default()))
            .unwrap();

        assert_matches!(Err(Error::NotAHeader(0)), setup.store.take(100));
        assert!(setup.store.is_disabled());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        #[test]
        fn round_trip(
            to in 0i64..1000,
            from in 0i64..1000,
            item in -1i16..10000,
            text in "\\PC{1,300}",
        ) {
            let mut setup = set_up();
            setup.store.store(to, from, item, &text).unwrap();
            prop_assert!(setup.store.has_mail(to));

            let letter = setup.store.take(to).unwrap().unwrap();
            prop_assert_eq!(&text, &letter.body);
            prop_assert_eq!(item, letter.attached_item_id);
            prop_assert_eq!(from, letter.from);
            prop_assert!(!setup.store.has_mail(to));

            let geom = Geometry::default();
            let len = text.len();
            let expected_blocks = if len <= geom.header_capacity() {
                1
            } else {
                let rest = len - geom.header_capacity();
                1 + (rest + geom.data_capacity() - 1) / geom.data_capacity()
            };
            prop_assert_eq!(
                expected_blocks as u64 * 100,
                file_len(&setup)
            );
        }

        #[test]
        fn drain_never_resurfaces(
            bodies in prop::collection::vec("[a-z ]{1,150}", 1..8),
        ) {
            let mut setup = set_up();
            for body in &bodies {
                setup.store.store(7, 8, NO_ITEM, body).unwrap();
            }

            let mut taken = Vec::new();
            while setup.store.has_mail(7) {
                taken.push(setup.store.take(7).unwrap().unwrap().body);
            }
            prop_assert_eq!(&bodies, &taken);
            prop_assert!(setup.store.take(7).unwrap().is_none());
        }
    }
}

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

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Mail system is disabled")]
    MailDisabled,
    #[error("Mail file has not been scanned")]
    NotBooted,
    #[error("Invalid recipient id {0}")]
    BadRecipient(i64),
    #[error("Invalid sender id {0}")]
    BadSender(i64),
    #[error("Message text is empty")]
    EmptyMessage,
    #[error("Message text contains a NUL byte")]
    NulInMessage,
    #[error("Block size {0} cannot hold a header block")]
    BlockSizeTooSmall(usize),
    #[error("Offset {0} is not aligned to the block size")]
    MisalignedBlock(u64),
    #[error("Block at offset {0} is not a message header")]
    NotAHeader(u64),
    #[error("Message chain broken at offset {0}")]
    BrokenChain(u64),
    #[error("Mail file length {0} is not a multiple of the block size")]
    CorruptLength(u64),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Config(#[from] toml::de::Error),
}

impl Error {
    /// Returns whether this error leaves the mail engine in a state it cannot
    /// trust, so that it must refuse all further work.
    ///
    /// Argument errors are reported to the caller and change nothing.
    pub fn is_fault(&self) -> bool {
        match *self {
            Error::MailDisabled
            | Error::NotBooted
            | Error::BadRecipient(..)
            | Error::BadSender(..)
            | Error::EmptyMessage
            | Error::NulInMessage
            | Error::Config(..) => false,

            Error::BlockSizeTooSmall(..)
            | Error::MisalignedBlock(..)
            | Error::NotAHeader(..)
            | Error::BrokenChain(..)
            | Error::CorruptLength(..)
            | Error::Io(..) => true,
        }
    }
}

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

//! The commands operating on the mail store.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use chrono::prelude::*;
use log::error;

use super::main::{Command, SendSubcommand};
use crate::mail::{Letter, MailStore};
use crate::support::{error::Error, sysexits::*, system_config::SystemConfig};

const TECHNICAL_DIFFICULTIES: &str =
    "Sorry, the mail system is having technical difficulties.";

pub(super) fn run(root: &Path, config: SystemConfig, cmd: Command) {
    let path = root.join(&config.mail.file);
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            die!(EX_CONFIG, "'{}' seems to be missing", parent.display())
        }
        _ => (),
    }

    let mut store = MailStore::new(path, config.mail.block_size);
    let report = match store.scan() {
        Ok(report) => report,
        Err(e) => fail(e),
    };

    match cmd {
        Command::Scan => {
            println!(
                "{}: {} bytes, {} messages, {} free blocks",
                store.path().display(),
                report.file_len,
                report.messages,
                report.free_blocks
            );
        }

        Command::Check { id } => {
            if store.has_mail(id) {
                println!("You have mail waiting.");
            } else {
                println!("Sorry, you don't have any mail waiting.");
            }
        }

        Command::Send(cmd) => send(&mut store, &config, cmd),

        Command::Receive { id } => receive(&mut store, &config, id),

        Command::Verify => {
            let report = match store.verify() {
                Ok(report) => report,
                Err(e) => fail(e),
            };

            println!(
                "{} messages, {} data blocks, {} free blocks, \
                 {} orphaned blocks",
                report.messages,
                report.data_blocks,
                report.free_blocks,
                report.orphan_blocks
            );
            for problem in &report.problems {
                println!("PROBLEM: {}", problem);
            }

            if !report.is_clean() {
                EX_DATAERR.exit();
            }
        }

        Command::Stats => {
            let stats = store.stats();
            println!("block size:  {}", store.block_size());
            println!("file length: {}", stats.file_len);
            println!("messages:    {}", stats.messages);
            println!("recipients:  {}", stats.recipients);
            println!("free blocks: {}", stats.free_blocks);
            println!("disabled:    {}", stats.disabled);
        }
    }

    store.teardown();
}

fn send(store: &mut MailStore, config: &SystemConfig, cmd: SendSubcommand) {
    let mut text = String::new();
    let read = if "-" == cmd.input.as_os_str() {
        io::stdin().read_to_string(&mut text)
    } else {
        fs::File::open(&cmd.input).and_then(|mut f| f.read_to_string(&mut text))
    };
    if let Err(e) = read {
        die!(EX_NOINPUT, "Failed to read {}: {}", cmd.input.display(), e);
    }

    cap_length(&mut text, config.mail.max_message_size);

    match store.store(cmd.to, cmd.from, cmd.item, &text) {
        Ok(_) => println!("Message stored for {}.", cmd.to),
        Err(e) => fail(e),
    }
}

fn receive(store: &mut MailStore, config: &SystemConfig, id: i64) {
    if !store.has_mail(id) {
        println!("Sorry, you don't have any mail waiting.");
        return;
    }

    while store.has_mail(id) {
        let letter = match store.take(id) {
            Ok(Some(letter)) => letter,
            Ok(None) => break,
            Err(e) => fail(e),
        };

        print_letter(&letter, config);
    }
}

fn print_letter(letter: &Letter, config: &SystemConfig) {
    println!("{}", letter.render(&Local, |id| config.name_of(id)));
    if let Some(item) = letter.attachment() {
        println!("[Attached: item {}]", item);
    }
    println!();
}

/// Truncate `text` to at most `max` bytes, on a character boundary.
fn cap_length(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }

    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}

fn fail(e: Error) -> ! {
    match e {
        Error::MailDisabled => {
            die!(EX_UNAVAILABLE, "{}", TECHNICAL_DIFFICULTIES)
        }
        e if e.is_fault() => {
            error!("Mail operation failed: {}", e);
            die!(EX_UNAVAILABLE, "{}", TECHNICAL_DIFFICULTIES)
        }
        Error::BadRecipient(..) | Error::BadSender(..) => {
            die!(EX_USAGE, "{}", e)
        }
        Error::EmptyMessage | Error::NulInMessage => die!(EX_DATAERR, "{}", e),
        e => die!(EX_SOFTWARE, "{}", e),
    }
}

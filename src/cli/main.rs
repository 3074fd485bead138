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

use structopt::StructOpt;

use crate::support::sysexits::*;
use crate::support::system_config::{SystemConfig, CONFIG_FILE_NAME};

/// Inspect and operate the MUD mail store.
///
/// Every command boots the store first, exactly as the game does when it
/// starts, so `scan` problems are reported by all of them.
#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
struct Options {
    /// The directory containing `mudmail.toml`. The mail file is located
    /// relative to this.
    #[structopt(long, parse(from_os_str), default_value = ".")]
    root: PathBuf,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub(super) enum Command {
    /// Boot the mail store and report what the mail file contains.
    Scan,
    /// Report whether a player has mail waiting.
    Check {
        /// The player id.
        id: i64,
    },
    Send(SendSubcommand),
    /// Deliver all mail waiting for a player to standard output.
    ///
    /// Delivered mail is removed from the store.
    Receive {
        /// The player id.
        id: i64,
    },
    /// Check the mail file for broken chains, leaked blocks and the like.
    ///
    /// Exits with EX_DATAERR if any problem is found. Orphaned data blocks
    /// (from an interrupted store) are reported but are not a problem.
    Verify,
    /// Print counters describing the mail store.
    Stats,
}

/// Store a message.
///
/// The message text is read from the given file, or standard input if "-".
/// Text beyond `mail.max_message_size` bytes is dropped.
#[derive(StructOpt)]
pub(super) struct SendSubcommand {
    /// The id of the recipient.
    #[structopt(long)]
    pub(super) to: i64,

    /// The id of the sender.
    #[structopt(long)]
    pub(super) from: i64,

    /// The vnum of an item attached to the message, -1 for none.
    #[structopt(long, default_value = "-1", allow_hyphen_values = true)]
    pub(super) item: i16,

    /// The file containing the message text.
    #[structopt(parse(from_os_str), default_value = "-")]
    pub(super) input: PathBuf,
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let options = Options::from_clap(&match Options::clap().get_matches_safe()
    {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        }
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        }
    });

    let root = options.root;
    if !root.is_dir() {
        die!(EX_CONFIG, "'{}' is not a directory", root.display());
    }

    let config = match SystemConfig::load(&root) {
        Ok(config) => config,
        Err(e) => die!(
            EX_CONFIG,
            "Error in config file at '{}': {}",
            root.join(CONFIG_FILE_NAME).display(),
            e
        ),
    };

    init_logging(&root);

    super::post::run(&root, config, options.command);
}

fn init_logging(root: &Path) {
    if Ok(true) == nix::unistd::isatty(2) {
        // Running interactively; ignore logging configuration and just write
        // to stderr.
        crate::init_simple_log();
        return;
    }

    // The game usually runs us with stderr going nowhere useful, so either
    // follow the logging config or fall back to syslog.
    let log_config_file = root.join("logging.toml");
    if log_config_file.is_file() {
        log4rs::init_file(log_config_file, Default::default())
            .expect("Failed to initialise logging");
    } else {
        let formatter = syslog::Formatter3164 {
            facility: syslog::Facility::LOG_MAIL,
            hostname: None,
            process: env!("CARGO_PKG_NAME").to_owned(),
            pid: nix::unistd::getpid().as_raw(),
        };

        let logger =
            syslog::unix(formatter).expect("Failed to connect to syslog");
        log::set_boxed_logger(Box::new(syslog::BasicLogger::new(logger)))
            .map(|_| log::set_max_level(log::LevelFilter::Info))
            .expect("Failed to initialise logging");
    }
}

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

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::mail::DEFAULT_BLOCK_SIZE;
use crate::support::error::Error;
use crate::support::file_ops::IgnoreKinds;

/// The name of the configuration file under the root directory.
pub const CONFIG_FILE_NAME: &str = "mudmail.toml";

/// The system-wide configuration for Mudmail.
///
/// This is stored in a file named `mudmail.toml` under the root directory. A
/// missing file is equivalent to an empty one.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct SystemConfig {
    /// Options for the mail file itself.
    #[serde(default)]
    pub mail: MailConfig,

    /// Display names for player ids, keyed by the decimal id.
    ///
    /// These are only used to render the banner at the top of delivered
    /// mail. Ids without an entry are shown as `#<id>`.
    #[serde(default)]
    pub names: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct MailConfig {
    /// The path to the mail file, relative to the root directory.
    pub file: PathBuf,

    /// The size of every block in the mail file.
    ///
    /// This must never change once the file holds mail; the file carries no
    /// record of the size it was written with.
    pub block_size: usize,

    /// The longest message text, in bytes, that will be passed to the store.
    pub max_message_size: usize,
}

impl Default for MailConfig {
    fn default() -> Self {
        MailConfig {
            file: "etc/plrmail".into(),
            block_size: DEFAULT_BLOCK_SIZE,
            max_message_size: 4000,
        }
    }
}

impl SystemConfig {
    /// Load the configuration from `root`.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(root.join(CONFIG_FILE_NAME))
            .ignore_not_found()?;
        Ok(toml::from_str(&text)?)
    }

    /// Return the display name configured for `id`, if any.
    pub fn name_of(&self, id: i64) -> Option<String> {
        self.names.get(&id.to_string()).cloned()
    }
}

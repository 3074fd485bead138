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

use std::fmt::{self, Write as _};

use chrono::prelude::*;

use super::block::NO_ITEM;

/// A message taken out of the mail store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Letter {
    pub to: i64,
    pub from: i64,
    pub attached_item_id: i16,
    /// UNIX time at which the message was stored.
    pub timestamp: i64,
    pub body: String,
}

impl Letter {
    /// The item attached to this letter, if any.
    pub fn attachment(&self) -> Option<i16> {
        if NO_ITEM == self.attached_item_id {
            None
        } else {
            Some(self.attached_item_id)
        }
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.timestamp, 0).single()
    }

    /// Render the letter as it is handed to the recipient: a banner with the
    /// date, recipient and sender, followed by the body.
    ///
    /// `name_of` resolves player ids to display names; ids it does not know
    /// are shown as `#<id>`.
    pub fn render<Tz: TimeZone>(
        &self,
        tz: &Tz,
        name_of: impl Fn(i64) -> Option<String>,
    ) -> String
    where
        Tz::Offset: fmt::Display,
    {
        let date = match self.sent_at() {
            Some(at) => at.with_timezone(tz).format("%b %d %Y").to_string(),
            None => "unknown".to_owned(),
        };
        let name = |id: i64| name_of(id).unwrap_or_else(|| format!("#{}", id));

        let mut out = String::with_capacity(self.body.len() + 96);
        let _ = write!(
            out,
            " * * * * Mail System * * * *\n\
             Date: {}\n  To: {}\nFrom: {}\n\n",
            date,
            name(self.to),
            name(self.from),
        );
        out.push_str(&self.body);
        out
    }
}

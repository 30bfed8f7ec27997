//! Book record as seen by the HTTP API and the services
//!
//! The MongoDB representation lives in `db::schemas::book`; this is the
//! JSON shape the LIFF client sends and receives.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Result, TsundokuError};

/// Lowest and highest insult level accepted from clients
pub const MIN_INSULT_LEVEL: u8 = 1;
pub const MAX_INSULT_LEVEL: u8 = 5;

/// Reading status of a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    #[default]
    Unread,
    Reading,
    Insulted,
    Completed,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unread => "unread",
            Self::Reading => "reading",
            Self::Insulted => "insulted",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub book_id: String,
    pub user_id: String,
    pub title: String,
    pub author: String,
    pub deadline: DateTime<Utc>,
    pub status: BookStatus,
    pub insult_level: u8,
}

impl Book {
    /// Whether the deadline lies strictly before `now`
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.deadline < now
    }
}

/// Book fields as submitted by a client (create and update)
///
/// Everything is optional at the serde level so that missing fields
/// surface as a 400 with a readable message instead of a decode error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    #[serde(default)]
    pub book_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<BookStatus>,
    #[serde(default)]
    pub insult_level: Option<u8>,
}

impl BookInput {
    /// Validate the fields every create or update needs and build a record.
    ///
    /// `book_id` is left as given; new registrations carry an empty id
    /// until the store assigns one.
    pub fn into_book(self) -> Result<Book> {
        let deadline = self.deadline.filter(|d| !is_zero_instant(d));

        let deadline = match deadline {
            Some(d) if !self.title.is_empty() && !self.author.is_empty() && !self.user_id.is_empty() => d,
            _ => {
                return Err(TsundokuError::BadRequest(
                    "title, author, deadline, and userId are required".into(),
                ))
            }
        };

        let insult_level = match self.insult_level {
            None | Some(0) => MIN_INSULT_LEVEL,
            Some(level) if (MIN_INSULT_LEVEL..=MAX_INSULT_LEVEL).contains(&level) => level,
            Some(level) => {
                return Err(TsundokuError::BadRequest(format!(
                    "insultLevel must be between {} and {}, got {}",
                    MIN_INSULT_LEVEL, MAX_INSULT_LEVEL, level
                )))
            }
        };

        Ok(Book {
            book_id: self.book_id,
            user_id: self.user_id,
            title: self.title,
            author: self.author,
            deadline,
            status: self.status.unwrap_or_default(),
            insult_level,
        })
    }
}

/// The zero instant some clients send for an unset date (0001-01-01T00:00:00Z)
pub fn zero_instant() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub fn is_zero_instant(dt: &DateTime<Utc>) -> bool {
    *dt == zero_instant()
}

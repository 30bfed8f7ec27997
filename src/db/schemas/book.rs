//! Book document schema
//!
//! Stores one registered book per document. The record id doubles as the
//! MongoDB `_id`, so uniqueness is enforced by the primary key.

use bson::{doc, DateTime, Document};
use chrono::Utc;
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::types::book::{MAX_INSULT_LEVEL, MIN_INSULT_LEVEL};
use crate::types::{Book, BookStatus};

/// Collection name for books
pub const BOOK_COLLECTION: &str = "books";

/// Book document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BookDoc {
    /// Record id, same value as `book_id`
    #[serde(rename = "_id")]
    pub id: String,

    pub book_id: String,

    /// Owner (LINE user id)
    pub user_id: String,

    pub title: String,

    pub author: String,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub deadline: chrono::DateTime<Utc>,

    pub status: BookStatus,

    #[serde(default)]
    pub insult_level: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

impl From<Book> for BookDoc {
    fn from(book: Book) -> Self {
        Self {
            id: book.book_id.clone(),
            book_id: book.book_id,
            user_id: book.user_id,
            title: book.title,
            author: book.author,
            deadline: book.deadline,
            status: book.status,
            insult_level: i32::from(book.insult_level),
            created_at: None,
            updated_at: None,
        }
    }
}

impl From<BookDoc> for Book {
    fn from(doc: BookDoc) -> Self {
        let level = doc
            .insult_level
            .clamp(i32::from(MIN_INSULT_LEVEL), i32::from(MAX_INSULT_LEVEL));

        Self {
            book_id: doc.id,
            user_id: doc.user_id,
            title: doc.title,
            author: doc.author,
            deadline: doc.deadline,
            status: doc.status,
            insult_level: u8::try_from(level).unwrap_or(MIN_INSULT_LEVEL),
        }
    }
}

impl IntoIndexes for BookDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Listing by owner
            (
                doc! { "userId": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_id_index".to_string())
                        .build(),
                ),
            ),
            // Sweep scans by status
            (
                doc! { "status": 1 },
                Some(
                    IndexOptions::builder()
                        .name("status_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

//! User document schema
//!
//! Written by the LINE login bridge. Nothing in the service reads it back;
//! it exists so operators can see who has signed in.

use bson::{doc, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserDoc {
    /// Platform user id (the LINE user id)
    #[serde(rename = "_id")]
    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    pub line_user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

impl UserDoc {
    /// Create a new user document for a LINE login
    pub fn from_line(line_user_id: &str, display_name: Option<String>) -> Self {
        Self {
            user_id: line_user_id.to_string(),
            display_name,
            line_user_id: line_user_id.to_string(),
            created_at: None,
            updated_at: None,
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "lineUserId": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("line_user_id_unique".to_string())
                    .build(),
            ),
        )]
    }
}

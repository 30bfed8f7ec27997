//! Delayed deadline callbacks through QStash
//!
//! On registration a message is published with an `Upstash-Delay` equal to
//! the time left until the deadline; QStash later POSTs it back to
//! `/api/workflow/execute`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::types::{Book, Result, TsundokuError};

/// Path QStash calls back on
pub const WORKFLOW_PATH: &str = "/api/workflow/execute";

/// Body of the delayed callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowPayload {
    #[serde(default)]
    pub book_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub insult_level: u8,
}

impl From<&Book> for WorkflowPayload {
    fn from(book: &Book) -> Self {
        Self {
            book_id: book.book_id.clone(),
            user_id: book.user_id.clone(),
            insult_level: book.insult_level,
        }
    }
}

/// Schedules a callback for a book's deadline
#[async_trait]
pub trait NotificationScheduler: Send + Sync {
    async fn schedule(&self, book: &Book, now: DateTime<Utc>) -> Result<()>;
}

/// Milliseconds from `now` until `deadline`, never negative
pub fn delay_ms(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (deadline - now).num_milliseconds().max(0)
}

/// Absolute callback URL for a public host, with or without a scheme
pub fn callback_url(public_host: &str) -> String {
    let host = public_host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{}{}", host, WORKFLOW_PATH)
    } else {
        format!("https://{}{}", host, WORKFLOW_PATH)
    }
}

/// QStash publisher
pub struct QStashScheduler {
    client: reqwest::Client,
    base_url: String,
    token: String,
    callback: String,
}

impl QStashScheduler {
    pub fn new(base_url: &str, token: &str, public_host: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("tsundoku/1.0")
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            callback: callback_url(public_host),
        }
    }

    pub fn callback(&self) -> &str {
        &self.callback
    }
}

#[async_trait]
impl NotificationScheduler for QStashScheduler {
    async fn schedule(&self, book: &Book, now: DateTime<Utc>) -> Result<()> {
        let delay = delay_ms(book.deadline, now);

        let response = self
            .client
            .post(format!("{}/v2/publish/{}", self.base_url, self.callback))
            .bearer_auth(&self.token)
            .header("Upstash-Delay", format!("{}ms", delay))
            .json(&WorkflowPayload::from(book))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TsundokuError::Upstream(format!(
                "QStash publish failed ({}): {}",
                status, text
            )));
        }

        debug!(book_id = %book.book_id, delay_ms = delay, "Deadline callback scheduled");
        Ok(())
    }
}

//! POST /api/workflow/execute - delayed deadline callback
//!
//! QStash delivers the payload published at registration once the deadline
//! arrives. The book is re-read, so edits, completion or deletion since
//! registration are respected.

use chrono::Utc;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::authorize_owner;
use crate::routes::{json_response, parse_json, HttpResponse};
use crate::server::AppState;
use crate::services::WorkflowPayload;
use crate::types::{Result, TsundokuError};

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkflowResponse {
    pub message: String,
    pub notified: bool,
}

pub async fn handle_execute(state: &AppState, body: &[u8]) -> Result<HttpResponse> {
    let payload: WorkflowPayload = parse_json(body)?;
    if payload.book_id.is_empty() || payload.user_id.is_empty() {
        return Err(TsundokuError::BadRequest(
            "bookId and userId are required".into(),
        ));
    }

    let book = state
        .books
        .get(&payload.book_id)
        .await?
        .ok_or_else(|| TsundokuError::NotFound(format!("book {} not found", payload.book_id)))?;
    authorize_owner(&book, &payload.user_id)?;

    let (message, notified) = if state.sweeper.is_due(&book, Utc::now()) {
        state.sweeper.notify(&book).await?;
        info!(book_id = %book.book_id, user_id = %book.user_id, "Deadline callback notified user");
        ("Deadline passed, user notified", true)
    } else {
        info!(book_id = %book.book_id, status = %book.status, "Deadline callback skipped");
        ("Nothing to do", false)
    };

    Ok(json_response(
        StatusCode::OK,
        &WorkflowResponse {
            message: message.to_string(),
            notified,
        },
    ))
}

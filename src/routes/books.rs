//! Book registry routes
//!
//! - POST   /api/books           register a book
//! - GET    /api/books?userId=   list an owner's books
//! - PUT    /api/books           overwrite a book (owner only)
//! - DELETE /api/books           remove a book (owner only)
//! - POST   /api/books/complete  mark a book completed

use chrono::Utc;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::authorize_owner;
use crate::routes::{json_response, parse_json, HttpResponse, MessageResponse};
use crate::server::AppState;
use crate::types::{Book, BookInput, BookStatus, Result, TsundokuError};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResponse {
    pub message: String,
    pub book_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    #[serde(default)]
    user_id: String,
}

/// Body of DELETE and POST /complete
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookRef {
    #[serde(default)]
    book_id: String,
    #[serde(default)]
    user_id: Option<String>,
}

impl BookRef {
    fn caller(&self) -> Option<&str> {
        self.user_id.as_deref().filter(|u| !u.is_empty())
    }
}

/// Load a record or fail with 404
async fn load(state: &AppState, book_id: &str) -> Result<Book> {
    state
        .books
        .get(book_id)
        .await?
        .ok_or_else(|| TsundokuError::NotFound(format!("book {} not found", book_id)))
}

/// POST /api/books
pub async fn create(state: &AppState, body: &[u8]) -> Result<HttpResponse> {
    let input: BookInput = parse_json(body)?;
    let mut book = input.into_book()?;
    book.book_id.clear();

    let book = state.books.create(book).await?;
    info!(
        book_id = %book.book_id,
        user_id = %book.user_id,
        title = %book.title,
        deadline = %book.deadline,
        "Book registered"
    );

    if let Some(scheduler) = &state.scheduler {
        if let Err(e) = scheduler.schedule(&book, Utc::now()).await {
            warn!(book_id = %book.book_id, error = %e, "Failed to schedule deadline callback");
        }
    }

    Ok(json_response(
        StatusCode::CREATED,
        &CreatedResponse {
            message: "Book registered successfully".into(),
            book_id: book.book_id,
        },
    ))
}

/// GET /api/books?userId=
pub async fn list(state: &AppState, query: Option<&str>) -> Result<HttpResponse> {
    let query: ListQuery = serde_urlencoded::from_str(query.unwrap_or_default())
        .map_err(|e| TsundokuError::BadRequest(format!("Invalid query: {}", e)))?;

    if query.user_id.is_empty() {
        return Err(TsundokuError::BadRequest(
            "userId query parameter is required".into(),
        ));
    }

    let books = state.books.list_by_owner(&query.user_id).await?;
    Ok(json_response(StatusCode::OK, &books))
}

/// PUT /api/books
pub async fn update(state: &AppState, body: &[u8]) -> Result<HttpResponse> {
    let input: BookInput = parse_json(body)?;
    if input.book_id.is_empty() || input.user_id.is_empty() {
        return Err(TsundokuError::BadRequest(
            "bookId and userId are required".into(),
        ));
    }
    let book = input.into_book()?;

    let existing = load(state, &book.book_id).await?;
    authorize_owner(&existing, &book.user_id)?;

    if !state.books.replace(book.clone()).await? {
        return Err(TsundokuError::NotFound(format!(
            "book {} not found",
            book.book_id
        )));
    }

    info!(book_id = %book.book_id, status = %book.status, "Book updated");
    Ok(json_response(
        StatusCode::OK,
        &MessageResponse::new("Book updated successfully"),
    ))
}

/// DELETE /api/books
pub async fn delete(state: &AppState, body: &[u8]) -> Result<HttpResponse> {
    let target: BookRef = parse_json(body)?;
    let caller = match target.caller() {
        Some(caller) if !target.book_id.is_empty() => caller,
        _ => {
            return Err(TsundokuError::BadRequest(
                "bookId and userId are required".into(),
            ))
        }
    };

    let existing = load(state, &target.book_id).await?;
    authorize_owner(&existing, caller)?;

    if !state.books.delete(&target.book_id).await? {
        return Err(TsundokuError::NotFound(format!(
            "book {} not found",
            target.book_id
        )));
    }

    info!(book_id = %target.book_id, "Book deleted");
    Ok(json_response(
        StatusCode::OK,
        &MessageResponse::new("Book deleted successfully"),
    ))
}

/// POST /api/books/complete
pub async fn complete(state: &AppState, body: &[u8]) -> Result<HttpResponse> {
    let target: BookRef = parse_json(body)?;
    if target.book_id.is_empty() {
        return Err(TsundokuError::BadRequest("bookId is required".into()));
    }

    let existing = load(state, &target.book_id).await?;
    if let Some(caller) = target.caller() {
        authorize_owner(&existing, caller)?;
    }

    if !state
        .books
        .set_status(&target.book_id, BookStatus::Completed)
        .await?
    {
        return Err(TsundokuError::NotFound(format!(
            "book {} not found",
            target.book_id
        )));
    }

    info!(book_id = %target.book_id, "Book marked as completed");
    Ok(json_response(
        StatusCode::OK,
        &MessageResponse::new("Book marked as completed"),
    ))
}

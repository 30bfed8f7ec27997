//! In-memory record store
//!
//! Used in dev mode when MongoDB is unreachable, and by the test suite.
//! Data lives only as long as the process.

use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::db::schemas::UserDoc;
use crate::db::store::{new_record_id, BookStore, UserStore};
use crate::types::{Book, BookStatus, Result};

/// Simple in-memory book and user store
#[derive(Default)]
pub struct InMemoryStore {
    books: RwLock<HashMap<String, Book>>,
    users: RwLock<HashMap<String, UserDoc>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a stored user (tests and diagnostics)
    pub async fn user(&self, user_id: &str) -> Option<UserDoc> {
        self.users.read().await.get(user_id).cloned()
    }
}

#[async_trait::async_trait]
impl BookStore for InMemoryStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, mut book: Book) -> Result<Book> {
        book.book_id = new_record_id();
        self.books
            .write()
            .await
            .insert(book.book_id.clone(), book.clone());
        Ok(book)
    }

    async fn get(&self, book_id: &str) -> Result<Option<Book>> {
        Ok(self.books.read().await.get(book_id).cloned())
    }

    async fn list_by_owner(&self, user_id: &str) -> Result<Vec<Book>> {
        Ok(self
            .books
            .read()
            .await
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_by_status(&self, statuses: &[BookStatus]) -> Result<Vec<Book>> {
        Ok(self
            .books
            .read()
            .await
            .values()
            .filter(|b| statuses.contains(&b.status))
            .cloned()
            .collect())
    }

    async fn replace(&self, book: Book) -> Result<bool> {
        let mut books = self.books.write().await;
        match books.get_mut(&book.book_id) {
            Some(slot) => {
                *slot = book;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_status(&self, book_id: &str, status: BookStatus) -> Result<bool> {
        let mut books = self.books.write().await;
        match books.get_mut(book_id) {
            Some(book) => {
                book.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_if(
        &self,
        book_id: &str,
        expected: &[BookStatus],
        to: BookStatus,
    ) -> Result<bool> {
        let mut books = self.books.write().await;
        match books.get_mut(book_id) {
            Some(book) if expected.contains(&book.status) => {
                book.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, book_id: &str) -> Result<bool> {
        Ok(self.books.write().await.remove(book_id).is_some())
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryStore {
    async fn upsert_user(&self, user: UserDoc) -> Result<()> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.user_id) {
            Some(existing) => {
                existing.line_user_id = user.line_user_id;
                if user.display_name.is_some() {
                    existing.display_name = user.display_name;
                }
            }
            None => {
                users.insert(user.user_id.clone(), user);
            }
        }
        Ok(())
    }
}

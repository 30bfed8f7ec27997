//! Record store traits and the MongoDB implementation
//!
//! Handlers only see `dyn BookStore` / `dyn UserStore`, so the same code
//! runs against MongoDB in production and `InMemoryStore` in dev mode and
//! tests.

use bson::{doc, DateTime};
use uuid::Uuid;

use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::schemas::{BookDoc, UserDoc, BOOK_COLLECTION, USER_COLLECTION};
use crate::types::{Book, BookStatus, Result};

/// Persistence for book records
#[async_trait::async_trait]
pub trait BookStore: Send + Sync {
    /// Short name for health output ("mongodb", "memory")
    fn kind(&self) -> &'static str;

    /// Assign a fresh record id, persist the book and return it with the id set
    async fn create(&self, book: Book) -> Result<Book>;

    /// Load a book by record id
    async fn get(&self, book_id: &str) -> Result<Option<Book>>;

    /// All books belonging to an owner, in no particular order
    async fn list_by_owner(&self, user_id: &str) -> Result<Vec<Book>>;

    /// All books whose status is one of `statuses`
    async fn list_by_status(&self, statuses: &[BookStatus]) -> Result<Vec<Book>>;

    /// Overwrite a stored book; returns false when no record has that id
    async fn replace(&self, book: Book) -> Result<bool>;

    /// Change only the status field; returns false when no record has that id
    async fn set_status(&self, book_id: &str, status: BookStatus) -> Result<bool>;

    /// Change the status only while it is still one of `expected`; returns
    /// false when the record is missing or has moved on
    async fn mark_if(&self, book_id: &str, expected: &[BookStatus], to: BookStatus)
        -> Result<bool>;

    /// Remove a record; returns false when no record has that id
    async fn delete(&self, book_id: &str) -> Result<bool>;
}

/// Persistence for users created by the login bridge
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn upsert_user(&self, user: UserDoc) -> Result<()>;
}

/// New opaque record id
pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// MongoDB Implementation
// =============================================================================

/// MongoDB-backed book and user store
#[derive(Clone)]
pub struct MongoStore {
    books: MongoCollection<BookDoc>,
    users: MongoCollection<UserDoc>,
}

impl MongoStore {
    /// Open the collections and apply their indexes
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        let books = mongo.collection::<BookDoc>(BOOK_COLLECTION).await?;
        let users = mongo.collection::<UserDoc>(USER_COLLECTION).await?;
        Ok(Self { books, users })
    }
}

fn status_values(statuses: &[BookStatus]) -> Vec<&'static str> {
    statuses.iter().map(BookStatus::as_str).collect()
}

#[async_trait::async_trait]
impl BookStore for MongoStore {
    fn kind(&self) -> &'static str {
        "mongodb"
    }

    async fn create(&self, mut book: Book) -> Result<Book> {
        book.book_id = new_record_id();

        let mut doc = BookDoc::from(book.clone());
        let now = DateTime::now();
        doc.created_at = Some(now);
        doc.updated_at = Some(now);

        self.books.insert_one(&doc).await?;
        Ok(book)
    }

    async fn get(&self, book_id: &str) -> Result<Option<Book>> {
        let doc = self.books.find_one(doc! { "_id": book_id }).await?;
        Ok(doc.map(Book::from))
    }

    async fn list_by_owner(&self, user_id: &str) -> Result<Vec<Book>> {
        let docs = self.books.find_many(doc! { "userId": user_id }).await?;
        Ok(docs.into_iter().map(Book::from).collect())
    }

    async fn list_by_status(&self, statuses: &[BookStatus]) -> Result<Vec<Book>> {
        let filter = doc! { "status": { "$in": status_values(statuses) } };
        let docs = self.books.find_many(filter).await?;
        Ok(docs.into_iter().map(Book::from).collect())
    }

    async fn replace(&self, book: Book) -> Result<bool> {
        let filter = doc! { "_id": &book.book_id };
        let existing = self.books.find_one(filter.clone()).await?;
        let Some(existing) = existing else {
            return Ok(false);
        };

        let mut doc = BookDoc::from(book);
        doc.created_at = existing.created_at;
        doc.updated_at = Some(DateTime::now());

        self.books.replace_one(filter, &doc).await
    }

    async fn set_status(&self, book_id: &str, status: BookStatus) -> Result<bool> {
        self.books
            .update_one(
                doc! { "_id": book_id },
                doc! {
                    "$set": {
                        "status": status.as_str(),
                        "updatedAt": DateTime::now(),
                    }
                },
            )
            .await
    }

    async fn mark_if(
        &self,
        book_id: &str,
        expected: &[BookStatus],
        to: BookStatus,
    ) -> Result<bool> {
        self.books
            .update_one(
                doc! {
                    "_id": book_id,
                    "status": { "$in": status_values(expected) },
                },
                doc! {
                    "$set": {
                        "status": to.as_str(),
                        "updatedAt": DateTime::now(),
                    }
                },
            )
            .await
    }

    async fn delete(&self, book_id: &str) -> Result<bool> {
        self.books.delete_one(doc! { "_id": book_id }).await
    }
}

#[async_trait::async_trait]
impl UserStore for MongoStore {
    async fn upsert_user(&self, user: UserDoc) -> Result<()> {
        let now = DateTime::now();
        let mut set = doc! {
            "lineUserId": &user.line_user_id,
            "updatedAt": now,
        };
        if let Some(name) = &user.display_name {
            set.insert("displayName", name);
        }

        self.users
            .upsert_one(
                doc! { "_id": &user.user_id },
                doc! {
                    "$set": set,
                    "$setOnInsert": { "createdAt": now },
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_ids_are_unique() {
        let a = new_record_id();
        let b = new_record_id();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn test_status_filter_values() {
        assert_eq!(
            status_values(&[BookStatus::Unread, BookStatus::Insulted]),
            vec!["unread", "insulted"]
        );
    }
}

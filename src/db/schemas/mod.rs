//! Database schemas for Tsundoku
//!
//! Defines MongoDB document structures for books and users.

mod book;
mod user;

pub use book::{BookDoc, BOOK_COLLECTION};
pub use user::{UserDoc, USER_COLLECTION};

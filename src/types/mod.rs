//! Shared types: the error enum and the book record

pub mod book;
pub mod error;

pub use book::{Book, BookInput, BookStatus};
pub use error::{Result, TsundokuError};

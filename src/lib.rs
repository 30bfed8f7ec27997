//! Tsundoku - reading-deadline shaming backend
//!
//! "Read it, or hear about it"
//!
//! Backend for a LINE mini-app where users register books they mean to
//! read by a deadline. Once a deadline passes unread, the service sends the
//! owner a taunt over LINE.
//!
//! ## Services
//!
//! - **Identity bridge**: LINE login to platform custom token
//! - **Book registry**: per-owner CRUD over MongoDB
//! - **Deadline sweep**: finds overdue books, generates a taunt, pushes it
//! - **Delayed trigger**: optional QStash callback at each book's deadline

pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, TsundokuError};

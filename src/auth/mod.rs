//! Authentication and authorization for Tsundoku
//!
//! Provides:
//! - Custom token generation for the LINE login bridge
//! - The owner check shared by every book mutation
//! - The shared-secret check guarding the deadline sweep

pub mod ownership;
pub mod token;

pub use ownership::{authorize_owner, extract_bearer, verify_cron_secret};
pub use token::{CustomTokenClaims, TokenIssuer};

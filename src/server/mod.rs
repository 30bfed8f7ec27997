//! HTTP server

pub mod http;

pub use http::{run, serve, AppState};

#[cfg(test)]
mod testing;

#[cfg(test)]
pub(crate) use testing::test_state;

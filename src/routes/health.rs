//! Liveness and build information
//!
//! - /          plain greeting, kept for the LIFF client's reachability check
//! - /health    liveness check (also /healthz)
//! - /version   build information for deployment verification

use hyper::StatusCode;
use serde::{Deserialize, Serialize};

use crate::routes::{json_response, text_response, HttpResponse};
use crate::server::AppState;

/// Health response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Backing store ("mongodb" or "memory")
    pub store: String,
    /// Seconds since startup
    pub uptime: u64,
    pub timestamp: String,
}

/// Version information
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    /// Cargo package version
    pub version: &'static str,
    /// Git commit hash (short)
    pub commit: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

pub fn hello() -> HttpResponse {
    text_response(StatusCode::OK, "Hello from Backend!")
}

pub fn health_check(state: &AppState) -> HttpResponse {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            store: state.books.kind().into(),
            uptime: state.started_at.elapsed().as_secs(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        },
    )
}

pub fn version_info() -> HttpResponse {
    json_response(
        StatusCode::OK,
        &VersionResponse {
            version: env!("CARGO_PKG_VERSION"),
            commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
            build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
            service: "tsundoku",
        },
    )
}

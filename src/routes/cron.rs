//! GET/POST /api/cron/check - run the deadline sweep

use chrono::Utc;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};

use crate::auth::verify_cron_secret;
use crate::routes::{json_response, HttpResponse};
use crate::server::AppState;
use crate::types::Result;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub message: String,
    pub expired_count: usize,
}

pub async fn handle_check(state: &AppState, auth_header: Option<&str>) -> Result<HttpResponse> {
    verify_cron_secret(state.args.cron_secret.as_deref(), auth_header)?;

    let report = state.sweeper.run(Utc::now()).await?;

    Ok(json_response(
        StatusCode::OK,
        &SweepResponse {
            message: report.message(),
            expired_count: report.expired,
        },
    ))
}

//! LINE login bridge
//!
//! POST /api/auth/line exchanges a LINE login for a platform custom token.
//! The LINE access token is accepted as presented.

use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::schemas::UserDoc;
use crate::routes::{json_response, parse_json, HttpResponse};
use crate::server::AppState;
use crate::types::{Result, TsundokuError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineAuthRequest {
    #[serde(default)]
    pub line_access_token: String,
    #[serde(default, rename = "lineUserID")]
    pub line_user_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineAuthResponse {
    pub custom_token: String,
}

/// POST /api/auth/line
pub async fn handle_line_auth(state: &AppState, body: &[u8]) -> Result<HttpResponse> {
    let request: LineAuthRequest = parse_json(body)?;

    if request.line_access_token.is_empty() || request.line_user_id.is_empty() {
        return Err(TsundokuError::BadRequest(
            "lineAccessToken and lineUserID are required".into(),
        ));
    }

    let custom_token = state.tokens.issue_custom_token(&request.line_user_id)?;

    let user = UserDoc::from_line(
        &request.line_user_id,
        request.display_name.filter(|n| !n.is_empty()),
    );
    if let Err(e) = state.users.upsert_user(user).await {
        warn!(line_user_id = %request.line_user_id, error = %e, "Failed to upsert user");
    }

    info!(line_user_id = %request.line_user_id, "Issued custom token");
    Ok(json_response(
        StatusCode::OK,
        &LineAuthResponse { custom_token },
    ))
}

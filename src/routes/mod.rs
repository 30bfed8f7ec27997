//! HTTP route handlers
//!
//! Handlers take the already-read request body and return
//! `Result<HttpResponse>`; `server::http` turns errors into JSON bodies via
//! [`error_response`]. Every response carries the CORS headers.

pub mod auth_routes;
pub mod books;
pub mod cron;
pub mod health;
pub mod workflow;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::types::{Result, TsundokuError};

/// Response type produced by every handler
pub type HttpResponse = Response<Full<Bytes>>;

/// Largest request body accepted
pub const MAX_BODY_BYTES: usize = 64 * 1024;

const CORS_METHODS: &str = "POST, GET, OPTIONS, PUT, DELETE";
const CORS_HEADERS: &str =
    "Accept, Content-Type, Content-Length, Accept-Encoding, X-CSRF-Token, Authorization";

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// JSON body carrying only a message
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Add the CORS headers every response carries
pub fn with_cors<B>(mut response: Response<B>) -> Response<B> {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(CORS_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(CORS_HEADERS),
    );
    response
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> HttpResponse {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    with_cors(response)
}

pub fn text_response(status: StatusCode, text: &'static str) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::from_static(text.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    with_cors(response)
}

/// Render an error as `{error, code}` with its status
pub fn error_response(err: TsundokuError) -> HttpResponse {
    let status = err.status_code();
    if status.is_server_error() {
        error!(error = %err, "Request failed");
    }
    json_response(
        status,
        &ErrorResponse {
            code: err.code().to_string(),
            error: err.to_string(),
        },
    )
}

/// CORS preflight response
pub fn preflight() -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::OK;
    with_cors(response)
}

pub fn not_found(path: &str) -> HttpResponse {
    error_response(TsundokuError::NotFound(format!("no route for {}", path)))
}

pub fn method_not_allowed() -> HttpResponse {
    error_response(TsundokuError::MethodNotAllowed)
}

/// Read a request body, rejecting anything over [`MAX_BODY_BYTES`]
pub async fn read_body<B>(body: B) -> Result<Bytes>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(TsundokuError::BadRequest("Request body too large".into()))
        }
        Err(e) => Err(TsundokuError::BadRequest(format!(
            "Failed to read body: {}",
            e
        ))),
    }
}

/// Decode a JSON request body
pub fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    if body.is_empty() {
        return Err(TsundokuError::BadRequest("Request body is empty".into()));
    }
    serde_json::from_slice(body)
        .map_err(|e| TsundokuError::BadRequest(format!("Invalid JSON: {}", e)))
}

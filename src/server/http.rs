//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo; one task per connection. Pattern from
//! doorway/src/server/http.rs.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::http::request::Parts;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::auth::TokenIssuer;
use crate::config::Args;
use crate::db::{BookStore, UserStore};
use crate::routes::{self, read_body, HttpResponse};
use crate::services::{DeadlineSweeper, NotificationScheduler};
use crate::types::{Result, TsundokuError};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub books: Arc<dyn BookStore>,
    pub users: Arc<dyn UserStore>,
    pub tokens: TokenIssuer,
    pub sweeper: Arc<DeadlineSweeper>,
    /// Present when delayed deadline callbacks are configured
    pub scheduler: Option<Arc<dyn NotificationScheduler>>,
    pub started_at: Instant,
}

/// Bind to the configured address and serve forever
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Tsundoku listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - not for production use");
    }
    if state.args.cron_secret.is_none() {
        warn!("CRON_SECRET not set - /api/cron/check is open to anyone");
    }

    serve(listener, state).await;
    Ok(())
}

/// Accept connections on an already-bound listener
pub async fn serve(listener: TcpListener, state: Arc<AppState>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        debug!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    info!("[{}] {} {}", addr, req.method(), req.uri().path());

    let (parts, body) = req.into_parts();
    let response = match dispatch(&state, &parts, body).await {
        Ok(response) => response,
        Err(e) => routes::error_response(e),
    };

    Ok(to_boxed(response))
}

async fn dispatch(state: &AppState, parts: &Parts, body: Incoming) -> Result<HttpResponse> {
    let method = &parts.method;
    let path = parts.uri.path();

    if method == Method::OPTIONS {
        return Ok(routes::preflight());
    }

    match path {
        "/" => match *method {
            Method::GET => Ok(routes::health::hello()),
            _ => Err(TsundokuError::MethodNotAllowed),
        },

        "/health" | "/healthz" => match *method {
            Method::GET => Ok(routes::health::health_check(state)),
            _ => Err(TsundokuError::MethodNotAllowed),
        },

        "/version" => match *method {
            Method::GET => Ok(routes::health::version_info()),
            _ => Err(TsundokuError::MethodNotAllowed),
        },

        "/api/auth/line" => match *method {
            Method::POST => {
                let body = read_body(body).await?;
                routes::auth_routes::handle_line_auth(state, &body).await
            }
            _ => Err(TsundokuError::MethodNotAllowed),
        },

        "/api/books" => match *method {
            Method::GET => routes::books::list(state, parts.uri.query()).await,
            Method::POST => {
                let body = read_body(body).await?;
                routes::books::create(state, &body).await
            }
            Method::PUT => {
                let body = read_body(body).await?;
                routes::books::update(state, &body).await
            }
            Method::DELETE => {
                let body = read_body(body).await?;
                routes::books::delete(state, &body).await
            }
            _ => Err(TsundokuError::MethodNotAllowed),
        },

        "/api/books/complete" => match *method {
            Method::POST => {
                let body = read_body(body).await?;
                routes::books::complete(state, &body).await
            }
            _ => Err(TsundokuError::MethodNotAllowed),
        },

        "/api/cron/check" => match *method {
            Method::GET | Method::POST => {
                let auth = parts
                    .headers
                    .get(hyper::header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok());
                routes::cron::handle_check(state, auth).await
            }
            _ => Err(TsundokuError::MethodNotAllowed),
        },

        "/api/workflow/execute" => match *method {
            Method::POST => {
                let body = read_body(body).await?;
                routes::workflow::handle_execute(state, &body).await
            }
            _ => Err(TsundokuError::MethodNotAllowed),
        },

        _ => Ok(routes::not_found(path)),
    }
}

fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

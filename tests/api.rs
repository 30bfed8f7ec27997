//! End-to-end tests against the real HTTP server
//!
//! Each test starts the server on an ephemeral port over an in-memory store
//! and a messenger that records pushes instead of calling LINE.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use tsundoku::auth::TokenIssuer;
use tsundoku::config::Args;
use tsundoku::db::{BookStore, InMemoryStore};
use tsundoku::server::{self, AppState};
use tsundoku::services::{DeadlineSweeper, Messenger, StaticInsults};
use tsundoku::types::{BookStatus, Result};

#[derive(Default)]
struct RecordingMessenger {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn push(&self, to: &str, text: &str) -> Result<()> {
        self.sent.lock().await.push((to.to_string(), text.to_string()));
        Ok(())
    }
}

/// Dev-mode arguments that ignore the process environment
fn isolated_args() -> Args {
    Args {
        listen: SocketAddr::from(([127, 0, 0, 1], 0)),
        dev_mode: true,
        mongodb_uri: "mongodb://localhost:27017".into(),
        mongodb_db: "tsundoku".into(),
        service_account_key_json: None,
        token_secret: None,
        token_expiry_seconds: 3600,
        cron_secret: None,
        line_channel_access_token: None,
        line_api_url: "https://api.line.me".into(),
        gemini_api_key: None,
        gemini_model: "gemini-1.5-flash".into(),
        gemini_api_url: "https://generativelanguage.googleapis.com".into(),
        qstash_url: None,
        qstash_token: None,
        public_host: None,
        sweep_include_insulted: false,
        sweep_interval_secs: None,
        request_timeout_ms: 10_000,
        log_level: "info".into(),
    }
}

struct TestServer {
    base: String,
    client: reqwest::Client,
    store: Arc<InMemoryStore>,
    messenger: Arc<RecordingMessenger>,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    async fn start_with(configure: impl FnOnce(&mut Args)) -> Self {
        let mut args = isolated_args();
        configure(&mut args);

        let store = Arc::new(InMemoryStore::new());
        let messenger = Arc::new(RecordingMessenger::default());
        let sweeper = DeadlineSweeper::new(
            store.clone(),
            Arc::new(StaticInsults::new()),
            messenger.clone(),
            args.sweep_statuses(),
        );

        let state = Arc::new(AppState {
            args,
            books: store.clone(),
            users: store.clone(),
            tokens: TokenIssuer::new_dev(),
            sweeper: Arc::new(sweeper),
            scheduler: None,
            started_at: Instant::now(),
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(server::serve(listener, state));

        Self {
            base: format!("http://{}", addr),
            client: reqwest::Client::new(),
            store,
            messenger,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn register(&self, body: Value) -> String {
        let response = self
            .client
            .post(self.url("/api/books"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["message"], "Book registered successfully");
        body["bookId"].as_str().unwrap().to_string()
    }

    async fn list(&self, user_id: &str) -> Vec<Value> {
        let response = self
            .client
            .get(self.url("/api/books"))
            .query(&[("userId", user_id)])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.unwrap()
    }
}

fn overdue_book(user_id: &str) -> Value {
    json!({
        "title": "The Pragmatic Programmer",
        "author": "Hunt & Thomas",
        "deadline": "2024-01-01T00:00:00Z",
        "insultLevel": 3,
        "userId": user_id
    })
}

#[tokio::test]
async fn test_register_then_sweep_insults_owner() {
    let server = TestServer::start().await;
    let id = server.register(overdue_book("u1")).await;

    let response = server
        .client
        .post(server.url("/api/cron/check"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["expiredCount"], 1);
    assert_eq!(body["message"], "Checked deadlines. Found 1 expired books.");

    let sent = server.messenger.sent.lock().await.clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "u1");

    let books = server.list("u1").await;
    assert_eq!(books[0]["bookId"], id.as_str());
    assert_eq!(books[0]["status"], "insulted");

    // Already insulted: not picked up again
    let response = server
        .client
        .get(server.url("/api/cron/check"))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["expiredCount"], 0);
    assert_eq!(server.messenger.sent.lock().await.len(), 1);
}

#[tokio::test]
async fn test_identical_registrations_get_distinct_ids() {
    let server = TestServer::start().await;
    let a = server.register(overdue_book("u1")).await;
    let b = server.register(overdue_book("u1")).await;
    assert_ne!(a, b);

    let books = server.list("u1").await;
    assert_eq!(books.len(), 2);
}

#[tokio::test]
async fn test_register_validation() {
    let server = TestServer::start().await;

    for body in [
        json!({ "author": "a", "deadline": "2024-01-01T00:00:00Z", "userId": "u1" }),
        json!({ "title": "t", "deadline": "2024-01-01T00:00:00Z", "userId": "u1" }),
        json!({ "title": "t", "author": "a", "userId": "u1" }),
        json!({ "title": "t", "author": "a", "deadline": "0001-01-01T00:00:00Z", "userId": "u1" }),
        json!({ "title": "t", "author": "a", "deadline": "2024-01-01T00:00:00Z" }),
    ] {
        let response = server
            .client
            .post(server.url("/api/books"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {}", body);
        let error: Value = response.json().await.unwrap();
        assert_eq!(error["code"], "BAD_REQUEST");
    }

    let response = server
        .client
        .post(server.url("/api/books"))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_requires_user_id() {
    let server = TestServer::start().await;
    let response = server
        .client
        .get(server.url("/api/books"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mutations_by_non_owner_are_forbidden() {
    let server = TestServer::start().await;
    let id = server.register(overdue_book("u1")).await;

    let response = server
        .client
        .put(server.url("/api/books"))
        .json(&json!({
            "bookId": id, "userId": "u2", "title": "Mine now",
            "author": "x", "deadline": "2030-01-01T00:00:00Z"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = server
        .client
        .delete(server.url("/api/books"))
        .json(&json!({ "bookId": id, "userId": "u2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let stored = server.store.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.title, "The Pragmatic Programmer");
    assert_eq!(stored.user_id, "u1");

    let response = server
        .client
        .delete(server.url("/api/books"))
        .json(&json!({ "bookId": id, "userId": "u1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(server.list("u1").await.is_empty());
}

#[tokio::test]
async fn test_completed_books_are_never_swept() {
    let server = TestServer::start_with(|args| args.sweep_include_insulted = true).await;
    let id = server.register(overdue_book("u1")).await;

    let response = server
        .client
        .post(server.url("/api/books/complete"))
        .json(&json!({ "bookId": id, "userId": "u1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Book marked as completed");

    let response = server
        .client
        .post(server.url("/api/cron/check"))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["expiredCount"], 0);
    assert!(server.messenger.sent.lock().await.is_empty());

    let stored = server.store.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, BookStatus::Completed);
}

#[tokio::test]
async fn test_cron_secret_enforced_when_configured() {
    let server = TestServer::start_with(|args| args.cron_secret = Some("s3cret".into())).await;
    server.register(overdue_book("u1")).await;

    let response = server
        .client
        .post(server.url("/api/cron/check"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = server
        .client
        .post(server.url("/api/cron/check"))
        .bearer_auth("wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(server.messenger.sent.lock().await.is_empty());

    let response = server
        .client
        .post(server.url("/api/cron/check"))
        .bearer_auth("s3cret")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_line_auth_issues_token_and_records_user() {
    let server = TestServer::start().await;

    let response = server
        .client
        .post(server.url("/api/auth/line"))
        .json(&json!({
            "lineAccessToken": "line-access",
            "lineUserID": "U4af4980629",
            "displayName": "Taro"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    let token = body["customToken"].as_str().unwrap();
    assert_eq!(token.split('.').count(), 3);

    let user = server.store.user("U4af4980629").await.unwrap();
    assert_eq!(user.display_name.as_deref(), Some("Taro"));

    let response = server
        .client
        .post(server.url("/api/auth/line"))
        .json(&json!({ "lineAccessToken": "line-access" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cors_and_routing() {
    let server = TestServer::start().await;

    let response = server
        .client
        .request(reqwest::Method::OPTIONS, server.url("/api/books"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(
        response.headers()["access-control-allow-methods"],
        "POST, GET, OPTIONS, PUT, DELETE"
    );

    let response = server.client.get(server.url("/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(response.text().await.unwrap(), "Hello from Backend!");

    let response = server.client.get(server.url("/health")).send().await.unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["store"], "memory");

    let response = server.client.get(server.url("/nope")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = server
        .client
        .patch(server.url("/api/books"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let server = TestServer::start().await;
    let huge = json!({
        "title": "x".repeat(70 * 1024), "author": "a",
        "deadline": "2030-01-01T00:00:00Z", "userId": "u1"
    });
    let response = server
        .client
        .post(server.url("/api/books"))
        .json(&huge)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(server.list("u1").await.is_empty());
}

//! Fixtures for handler unit tests

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::auth::TokenIssuer;
use crate::config::Args;
use crate::db::InMemoryStore;
use crate::server::AppState;
use crate::services::{DeadlineSweeper, Messenger, StaticInsults};
use crate::types::Result;

/// Messenger that records pushes instead of sending them
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMessenger {
    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn push(&self, to: &str, text: &str) -> Result<()> {
        self.sent.lock().await.push((to.to_string(), text.to_string()));
        Ok(())
    }
}

/// Dev-mode arguments built without consulting the environment
pub fn test_args() -> Args {
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

/// Dev-mode state over an in-memory store
pub fn test_state() -> (AppState, Arc<RecordingMessenger>) {
    let args = test_args();
    let store = Arc::new(InMemoryStore::new());
    let messenger = Arc::new(RecordingMessenger::default());

    let sweeper = DeadlineSweeper::new(
        store.clone(),
        Arc::new(StaticInsults::new()),
        messenger.clone(),
        args.sweep_statuses(),
    );

    let state = AppState {
        args,
        books: store.clone(),
        users: store,
        tokens: TokenIssuer::new_dev(),
        sweeper: Arc::new(sweeper),
        scheduler: None,
        started_at: Instant::now(),
    };

    (state, messenger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BookStatus;

    #[test]
    fn test_fixture_args_are_fixed() {
        let args = test_args();
        assert!(args.dev_mode);
        assert!(args.cron_secret.is_none());
        assert!(args.token_secret.is_none());
        assert!(args.gemini_api_key.is_none());
        assert!(args.qstash().is_none());
        assert_eq!(args.sweep_statuses(), vec![BookStatus::Unread]);
        assert!(args.validate().is_ok());
    }
}

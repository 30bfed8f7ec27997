//! LINE Messaging API push delivery

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::types::{Result, TsundokuError};

/// Delivers a text message to a platform user
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn push(&self, to: &str, text: &str) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: Vec<TextMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

/// Push client for the LINE Messaging API
pub struct LineMessenger {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl LineMessenger {
    /// `access_token` may be absent; every push then fails
    pub fn new(base_url: &str, access_token: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("tsundoku/1.0")
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.filter(|t| !t.is_empty()),
        }
    }
}

#[async_trait]
impl Messenger for LineMessenger {
    async fn push(&self, to: &str, text: &str) -> Result<()> {
        let token = self.access_token.as_deref().ok_or_else(|| {
            TsundokuError::Config("LINE_CHANNEL_ACCESS_TOKEN is not set".into())
        })?;

        let body = PushRequest {
            to,
            messages: vec![TextMessage { kind: "text", text }],
        };

        let response = self
            .client
            .post(format!("{}/v2/bot/message/push", self.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TsundokuError::Upstream(format!("LINE API error: {}", text)));
        }

        debug!(to = %to, "LINE push delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_push_sends_bearer_and_text_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/bot/message/push"))
            .and(header("authorization", "Bearer line-token"))
            .and(body_json(serde_json::json!({
                "to": "U123",
                "messages": [ { "type": "text", "text": "早く読め" } ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let messenger = LineMessenger::new(
            &server.uri(),
            Some("line-token".into()),
            Duration::from_secs(5),
        );
        messenger.push("U123", "早く読め").await.unwrap();
    }

    #[tokio::test]
    async fn test_non_success_includes_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"message":"Invalid user"}"#),
            )
            .mount(&server)
            .await;

        let messenger =
            LineMessenger::new(&server.uri(), Some("t".into()), Duration::from_secs(5));
        let err = messenger.push("nobody", "hi").await.unwrap_err();
        assert!(matches!(err, TsundokuError::Upstream(_)));
        assert!(err.to_string().contains("Invalid user"));
    }

    #[tokio::test]
    async fn test_missing_token_fails_without_calling_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let messenger = LineMessenger::new(&server.uri(), None, Duration::from_secs(5));
        assert!(messenger.push("U1", "hi").await.is_err());

        let messenger =
            LineMessenger::new(&server.uri(), Some(String::new()), Duration::from_secs(5));
        assert!(messenger.push("U1", "hi").await.is_err());
    }
}

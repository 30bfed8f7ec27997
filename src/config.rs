//! Configuration for Tsundoku
//!
//! CLI arguments and environment variable handling using clap.
//! Pattern adapted from doorway/src/config.rs

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use crate::types::BookStatus;

/// Longest lifetime a custom token may have
pub const MAX_TOKEN_EXPIRY_SECONDS: u64 = 3600;

/// Minimum length for an HS256 token secret
pub const MIN_TOKEN_SECRET_LEN: usize = 32;

/// Tsundoku - reading-deadline shaming backend
#[derive(Parser, Debug, Clone)]
#[command(name = "tsundoku")]
#[command(about = "Backend for the tsundoku LINE app: book registry, deadline sweep, LINE notifier")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8081")]
    pub listen: SocketAddr,

    /// Enable development mode (in-memory store fallback, built-in signing secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "tsundoku")]
    pub mongodb_db: String,

    /// Service account key JSON (client_email + private_key) for RS256 custom tokens
    #[arg(long, env = "SERVICE_ACCOUNT_KEY_JSON", hide_env_values = true)]
    pub service_account_key_json: Option<String>,

    /// Shared secret for HS256 custom tokens when no service account is configured
    #[arg(long, env = "TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: Option<String>,

    /// Custom token expiry in seconds (capped at one hour)
    #[arg(long, env = "TOKEN_EXPIRY_SECONDS", default_value = "3600")]
    pub token_expiry_seconds: u64,

    /// Shared secret expected as `Authorization: Bearer <secret>` on the sweep endpoint
    #[arg(long, env = "CRON_SECRET", hide_env_values = true)]
    pub cron_secret: Option<String>,

    /// LINE Messaging API channel access token
    #[arg(long, env = "LINE_CHANNEL_ACCESS_TOKEN", hide_env_values = true)]
    pub line_channel_access_token: Option<String>,

    /// LINE Messaging API base URL
    #[arg(long, env = "LINE_API_URL", default_value = "https://api.line.me")]
    pub line_api_url: String,

    /// Gemini API key; when unset the static message pool is used
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-1.5-flash")]
    pub gemini_model: String,

    /// Gemini API base URL
    #[arg(
        long,
        env = "GEMINI_API_URL",
        default_value = "https://generativelanguage.googleapis.com"
    )]
    pub gemini_api_url: String,

    /// QStash base URL for delayed deadline callbacks
    #[arg(long, env = "QSTASH_URL")]
    pub qstash_url: Option<String>,

    /// QStash token
    #[arg(long, env = "QSTASH_TOKEN", hide_env_values = true)]
    pub qstash_token: Option<String>,

    /// Public hostname QStash calls back to (e.g. "tsundoku.example.com")
    #[arg(long, env = "PUBLIC_HOST")]
    pub public_host: Option<String>,

    /// Also re-notify books that were already insulted
    #[arg(long, env = "SWEEP_INCLUDE_INSULTED", default_value = "false")]
    pub sweep_include_insulted: bool,

    /// Run the deadline sweep in-process every N seconds (off when unset)
    #[arg(long, env = "SWEEP_INTERVAL_SECS")]
    pub sweep_interval_secs: Option<u64>,

    /// Outbound request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "10000")]
    pub request_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Statuses the sweep treats as eligible for a notification
    pub fn sweep_statuses(&self) -> Vec<BookStatus> {
        if self.sweep_include_insulted {
            vec![BookStatus::Unread, BookStatus::Insulted]
        } else {
            vec![BookStatus::Unread]
        }
    }

    /// Custom token lifetime, capped at the one hour the platform accepts
    pub fn token_expiry(&self) -> u64 {
        self.token_expiry_seconds.min(MAX_TOKEN_EXPIRY_SECONDS)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// QStash settings when all three are present
    pub fn qstash(&self) -> Option<(&str, &str, &str)> {
        match (&self.qstash_url, &self.qstash_token, &self.public_host) {
            (Some(url), Some(token), Some(host)) => {
                Some((url.as_str(), token.as_str(), host.as_str()))
            }
            _ => None,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode
            && self.service_account_key_json.is_none()
            && self.token_secret.is_none()
        {
            return Err(
                "SERVICE_ACCOUNT_KEY_JSON or TOKEN_SECRET is required in production mode".to_string(),
            );
        }

        if let Some(secret) = &self.token_secret {
            if secret.len() < MIN_TOKEN_SECRET_LEN {
                return Err(format!(
                    "TOKEN_SECRET must be at least {} characters",
                    MIN_TOKEN_SECRET_LEN
                ));
            }
        }

        let qstash_parts = [
            self.qstash_url.is_some(),
            self.qstash_token.is_some(),
            self.public_host.is_some(),
        ];
        if qstash_parts.iter().any(|p| *p) && !qstash_parts.iter().all(|p| *p) {
            return Err("QSTASH_URL, QSTASH_TOKEN and PUBLIC_HOST must be set together".to_string());
        }

        Ok(())
    }
}

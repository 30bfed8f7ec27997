//! Custom token issuance for the LINE login bridge
//!
//! Produces tokens in the Firebase custom-token shape: the `uid` claim
//! carries the LINE user id and the client exchanges the token with the
//! identity platform for a session.
//!
//! Security notes:
//! - With a service-account key, tokens are signed RS256 with its private key
//! - Otherwise they are signed HS256 with TOKEN_SECRET (or a dev secret)
//! - Expiry is at most one hour
//!
//! Adapted from doorway/src/auth/jwt.rs

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::{Args, MAX_TOKEN_EXPIRY_SECONDS, MIN_TOKEN_SECRET_LEN};
use crate::types::TsundokuError;

/// Audience the identity platform expects on custom tokens
pub const CUSTOM_TOKEN_AUDIENCE: &str =
    "https://identitytoolkit.googleapis.com/google.identity.identitytoolkit.v1.IdentityToolkit";

/// Issuer used for HS256 tokens
pub const SHARED_SECRET_ISSUER: &str = "tsundoku";

/// Longest uid the identity platform accepts
pub const MAX_UID_LEN: usize = 128;

/// Payload stored in a custom token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomTokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Platform user id (the LINE user id)
    pub uid: String,
}

/// Fields of a service-account key file this service needs
#[derive(Debug, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
}

/// Custom token generator
#[derive(Clone)]
pub struct TokenIssuer {
    issuer: String,
    algorithm: Algorithm,
    key: EncodingKey,
    expiry_seconds: u64,
}

impl TokenIssuer {
    /// Build an RS256 issuer from a service-account key JSON document
    pub fn from_service_account(json: &str, expiry_seconds: u64) -> Result<Self, TsundokuError> {
        let account: ServiceAccountKey = serde_json::from_str(json)
            .map_err(|e| TsundokuError::Config(format!("Invalid service account JSON: {}", e)))?;

        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| TsundokuError::Config(format!("Invalid service account key: {}", e)))?;

        Ok(Self {
            issuer: account.client_email,
            algorithm: Algorithm::RS256,
            key,
            expiry_seconds: expiry_seconds.min(MAX_TOKEN_EXPIRY_SECONDS),
        })
    }

    /// Build an HS256 issuer from a shared secret
    ///
    /// Returns an error if the secret is empty or too short
    pub fn from_secret(secret: &str, expiry_seconds: u64) -> Result<Self, TsundokuError> {
        if secret.len() < MIN_TOKEN_SECRET_LEN {
            return Err(TsundokuError::Config(format!(
                "TOKEN_SECRET must be at least {} characters",
                MIN_TOKEN_SECRET_LEN
            )));
        }

        Ok(Self {
            issuer: SHARED_SECRET_ISSUER.to_string(),
            algorithm: Algorithm::HS256,
            key: EncodingKey::from_secret(secret.as_bytes()),
            expiry_seconds: expiry_seconds.min(MAX_TOKEN_EXPIRY_SECONDS),
        })
    }

    /// Create an issuer for dev mode
    pub fn new_dev() -> Self {
        Self {
            issuer: SHARED_SECRET_ISSUER.to_string(),
            algorithm: Algorithm::HS256,
            key: EncodingKey::from_secret(dev_secret().as_bytes()),
            expiry_seconds: MAX_TOKEN_EXPIRY_SECONDS,
        }
    }

    /// Pick the signing material from configuration.
    ///
    /// Service account first, then TOKEN_SECRET, then the dev secret when
    /// dev mode is on.
    pub fn from_args(args: &Args) -> Result<Self, TsundokuError> {
        if let Some(json) = &args.service_account_key_json {
            return Self::from_service_account(json, args.token_expiry());
        }
        if let Some(secret) = &args.token_secret {
            return Self::from_secret(secret, args.token_expiry());
        }
        if args.dev_mode {
            return Ok(Self::new_dev());
        }
        Err(TsundokuError::Config(
            "No signing key configured for custom tokens".into(),
        ))
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Issue a custom token whose `uid` is the given platform user id
    pub fn issue_custom_token(&self, uid: &str) -> Result<String, TsundokuError> {
        if uid.is_empty() || uid.len() > MAX_UID_LEN {
            return Err(TsundokuError::Auth(format!(
                "uid must be 1-{} characters",
                MAX_UID_LEN
            )));
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| TsundokuError::Auth(format!("System time error: {}", e)))?
            .as_secs();

        let claims = CustomTokenClaims {
            iss: self.issuer.clone(),
            sub: self.issuer.clone(),
            aud: CUSTOM_TOKEN_AUDIENCE.to_string(),
            iat: now,
            exp: now + self.expiry_seconds,
            uid: uid.to_string(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.key)
            .map_err(|e| TsundokuError::Auth(format!("Failed to generate token: {}", e)))
    }
}

fn dev_secret() -> &'static str {
    "dev-mode-secret-not-for-production-use-123456"
}

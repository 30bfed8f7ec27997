//! Ownership and shared-secret checks
//!
//! The service has no session model: callers identify themselves with the
//! `userId` they send, and the only rule is that it must equal the stored
//! owner. The sweep endpoint is guarded separately by a shared secret.

use crate::types::{Book, TsundokuError};

/// Allow the call only when `caller` owns `book`
pub fn authorize_owner(book: &Book, caller: &str) -> Result<(), TsundokuError> {
    if book.user_id == caller {
        Ok(())
    } else {
        Err(TsundokuError::Forbidden(
            "book does not belong to this user".into(),
        ))
    }
}

/// Extract the token from a strict `Bearer <token>` Authorization header
pub fn extract_bearer(auth_header: Option<&str>) -> Option<&str> {
    let token = auth_header?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Check the sweep's shared secret.
///
/// When no secret is configured every caller is accepted.
pub fn verify_cron_secret(
    configured: Option<&str>,
    auth_header: Option<&str>,
) -> Result<(), TsundokuError> {
    let expected = match configured {
        Some(secret) if !secret.is_empty() => secret,
        _ => return Ok(()),
    };

    match extract_bearer(auth_header) {
        Some(token) if token == expected => Ok(()),
        _ => Err(TsundokuError::Unauthorized("invalid cron secret".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BookStatus;

    fn owned_by(user_id: &str) -> Book {
        Book {
            book_id: "b1".into(),
            user_id: user_id.into(),
            title: "t".into(),
            author: "a".into(),
            deadline: "2024-01-01T00:00:00Z".parse().unwrap(),
            status: BookStatus::Unread,
            insult_level: 1,
        }
    }

    #[test]
    fn test_owner_allowed_others_forbidden() {
        let book = owned_by("u1");
        assert!(authorize_owner(&book, "u1").is_ok());

        let err = authorize_owner(&book, "u2").unwrap_err();
        assert!(matches!(err, TsundokuError::Forbidden(_)));
        assert!(authorize_owner(&book, "").is_err());
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(Some("Bearer abc123")), Some("abc123"));
        assert_eq!(extract_bearer(Some("Bearer ")), None);
        assert_eq!(extract_bearer(Some("abc123")), None);
        assert_eq!(extract_bearer(Some("Basic abc123")), None);
        assert_eq!(extract_bearer(None), None);
    }

    #[test]
    fn test_cron_secret_only_enforced_when_configured() {
        assert!(verify_cron_secret(None, None).is_ok());
        assert!(verify_cron_secret(Some(""), None).is_ok());

        assert!(verify_cron_secret(Some("s3cret"), Some("Bearer s3cret")).is_ok());
        assert!(verify_cron_secret(Some("s3cret"), Some("Bearer wrong")).is_err());
        assert!(verify_cron_secret(Some("s3cret"), None).is_err());
    }
}

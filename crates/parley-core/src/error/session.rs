//! Session lifecycle errors.

use thiserror::Error;

use crate::identifiers::SessionKey;

/// Errors raised by the session store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// `create_session` was called for a key that already exists.
    #[error("Session '{0}' already exists")]
    AlreadyExists(SessionKey),

    /// The key does not name an existing session.
    #[error("Session '{0}' not found")]
    NotFound(SessionKey),
}

impl SessionError {
    pub fn key(&self) -> &SessionKey {
        match self {
            SessionError::AlreadyExists(key) | SessionError::NotFound(key) => key,
        }
    }

    /// Error code suitable for logging or reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            SessionError::AlreadyExists(_) => "SESSION_ALREADY_EXISTS",
            SessionError::NotFound(_) => "SESSION_NOT_FOUND",
        }
    }
}

/// Result type for session store operations.
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_slash_separated_key() {
        let key = SessionKey::parse("app", "user_1", "s1").unwrap();
        let err = SessionError::AlreadyExists(key.clone());
        assert_eq!(err.to_string(), "Session 'app/user_1/s1' already exists");
        assert_eq!(err.key(), &key);
        assert_eq!(
            SessionError::NotFound(key).error_code(),
            "SESSION_NOT_FOUND"
        );
    }
}

//! Authentication error types.
//!
//! This module defines errors that can occur while issuing or validating
//! access tokens.

use persistent_values_storage::StorageError;
use thiserror::Error;

/// Message returned to callers presenting an unknown or malformed token.
pub const INVALID_ACCESS_TOKEN_MESSAGE: &str = "Access token is invalid";

/// Access token errors.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`. Downstream match expressions
/// must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// The token is absent, or not recorded as a valid token in the store.
    #[error("Access token is invalid")]
    InvalidAccessToken,

    /// Every generated candidate collided with an existing entry.
    #[error("Could not issue an access token after {attempts} attempts")]
    IssuanceExhausted {
        /// Number of candidates generated before giving up.
        attempts: u32,
    },

    /// Store failure during token lookup or persistence.
    ///
    /// Wraps the original [`StorageError`] to preserve the full error source
    /// chain for structured logging.
    #[error("Token storage error: {0}")]
    Storage(
        /// The underlying storage error.
        #[source]
        StorageError,
    ),
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        AuthError::Storage(err)
    }
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(AuthError::InvalidAccessToken.to_string(), INVALID_ACCESS_TOKEN_MESSAGE);

        let err = AuthError::IssuanceExhausted { attempts: 3 };
        assert_eq!(err.to_string(), "Could not issue an access token after 3 attempts");
    }

    #[test]
    fn test_storage_error_from_conversion() {
        let auth_err: AuthError = StorageError::Timeout.into();
        assert!(matches!(auth_err, AuthError::Storage(_)));
        assert_eq!(auth_err.to_string(), "Token storage error: Operation timeout");
    }

    #[test]
    fn test_storage_error_preserves_source_chain() {
        let auth_err = AuthError::Storage(StorageError::connection("connection refused"));
        let source = auth_err.source().expect("source chain must be preserved");
        assert_eq!(source.to_string(), "Connection error: connection refused");
    }
}

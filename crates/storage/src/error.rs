//! Storage error types and result alias.
//!
//! Every [`ValueStore`](crate::ValueStore) implementation maps its internal
//! failures to [`StorageError`]. The service never distinguishes between
//! these variants when answering a request: any of them surfaces as a
//! generic failure to the caller.
//!
//! # Example
//!
//! ```
//! use persistent_values_storage::{StorageError, StorageResult};
//!
//! fn lookup(_key: &str) -> StorageResult<String> {
//!     Err(StorageError::connection("store unreachable"))
//! }
//!
//! assert!(lookup("tok|k").is_err());
//! ```

use std::sync::Arc;

use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while talking to the backing store.
///
/// Errors preserve their source chain via `#[source]` so that structured
/// logging can print the full context.
///
/// # Non-exhaustive
///
/// New variants may be added in minor releases. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The store could not be reached.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
        /// The underlying error that caused this connection failure.
        #[source]
        source: Option<BoxError>,
    },

    /// Backend-specific failure that fits no other category.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
        /// The underlying error that caused this internal failure.
        #[source]
        source: Option<BoxError>,
    },

    /// The operation exceeded its time limit.
    #[error("Operation timeout")]
    Timeout,
}

impl StorageError {
    /// Creates a new `Connection` error with the given message.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Creates a new `Internal` error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Timeout
    }

    /// Returns `true` for failures that may succeed when retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(StorageError::connection("refused").to_string(), "Connection error: refused");
        assert_eq!(StorageError::internal("boom").to_string(), "Internal error: boom");
        assert_eq!(StorageError::timeout().to_string(), "Operation timeout");
    }

    #[test]
    fn source_chain_is_preserved() {
        let err = StorageError::Internal {
            message: "write failed".into(),
            source: Some(Arc::new(StorageError::Timeout)),
        };
        let source = err.source().expect("source exists");
        assert_eq!(source.to_string(), "Operation timeout");
    }

    #[test]
    fn transient_classification() {
        assert!(StorageError::connection("x").is_transient());
        assert!(StorageError::timeout().is_transient());
        assert!(!StorageError::internal("x").is_transient());
    }
}

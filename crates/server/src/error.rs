//! Request rejections and configuration errors.
//!
//! A [`Rejection`] is the explicit result of a failed validation step or a
//! failed handler: a status code plus the message returned to the caller as
//! `{"error": message}`. Nothing in the request path panics or unwinds to
//! signal a client error.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use persistent_values_authn::{AuthError, INVALID_ACCESS_TOKEN_MESSAGE};
use persistent_values_storage::StorageError;
use serde::Serialize;
use thiserror::Error;

use crate::response::json_response;

/// Message sent for any failure that is not the caller's fault.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Message sent for unmatched routes.
pub const NOT_FOUND_MESSAGE: &str = "Not found";

/// A request rejected with a status code and a caller-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}: {message}")]
pub struct Rejection {
    /// HTTP status of the response.
    pub status: StatusCode,
    /// Message placed in the `error` field of the body.
    pub message: String,
}

impl Rejection {
    /// Creates a rejection with an arbitrary status.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    /// 400: the request failed schema validation.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 401: the access token is missing or unknown.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// 413: the request carries more than the allowed amount of data.
    #[must_use]
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, message)
    }

    /// 404 with the standard message.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE)
    }

    /// 500 with the standard message. The cause is logged, never sent.
    #[must_use]
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        json_response(self.status, &ErrorBody { error: &self.message })
    }
}

impl From<StorageError> for Rejection {
    fn from(err: StorageError) -> Self {
        let source = std::error::Error::source(&err).map(ToString::to_string);
        tracing::error!(
            error = %err,
            source = ?source,
            transient = err.is_transient(),
            "Store operation failed"
        );
        Self::internal()
    }
}

impl From<AuthError> for Rejection {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidAccessToken => Self::unauthorized(INVALID_ACCESS_TOKEN_MESSAGE),
            AuthError::Storage(storage) => storage.into(),
            other => {
                tracing::error!(error = %other, "Access token operation failed");
                Self::internal()
            },
        }
    }
}

/// Errors raised while validating a [`ServerConfig`](crate::ServerConfig).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A numeric field is below its allowed minimum.
    #[error("{field} must be at least {min}, got {value}")]
    BelowMinimum {
        /// Name of the offending field.
        field: &'static str,
        /// Minimum allowed value.
        min: String,
        /// Configured value.
        value: String,
    },
}

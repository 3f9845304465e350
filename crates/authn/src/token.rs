//! Access token type and generators.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Exact length of a well-formed access token.
pub const ACCESS_TOKEN_LENGTH: usize = 36;

/// An opaque access token. Also the identity of the tenant holding it.
///
/// Serializes as the bare token string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps an existing token string without validating it.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for AccessToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<AccessToken> for String {
    fn from(token: AccessToken) -> Self {
        token.0
    }
}

/// Source of candidate access tokens.
///
/// Candidates must be [`ACCESS_TOKEN_LENGTH`] characters long and must not
/// contain the key separator used by
/// [`derive_key`](persistent_values_storage::keys::derive_key).
pub trait TokenGenerator: Send + Sync {
    /// Produces the next candidate.
    fn generate(&self) -> AccessToken;
}

/// Generates hyphenated random (v4) UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidTokenGenerator;

impl TokenGenerator for UuidTokenGenerator {
    fn generate(&self) -> AccessToken {
        AccessToken(Uuid::new_v4().hyphenated().to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use persistent_values_storage::keys::KEY_SEPARATOR;

    use super::*;

    #[test]
    fn uuid_tokens_have_fixed_length() {
        let token = UuidTokenGenerator.generate();
        assert_eq!(token.as_str().len(), ACCESS_TOKEN_LENGTH);
        assert!(!token.as_str().contains(KEY_SEPARATOR));
    }

    #[test]
    fn uuid_tokens_are_distinct() {
        let generator = UuidTokenGenerator;
        assert_ne!(generator.generate(), generator.generate());
    }

    #[test]
    fn serializes_transparently() {
        let token = AccessToken::new("abc");
        assert_eq!(serde_json::to_string(&token).unwrap(), r#""abc""#);
    }
}

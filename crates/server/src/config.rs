//! Server configuration.

use std::{net::SocketAddr, time::Duration};

use persistent_values_authn::IssuerConfig;
use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, validators::DEFAULT_MAX_VALUES_PER_REQUEST};

/// Default bind address.
pub const DEFAULT_LISTEN_ADDR: SocketAddr =
    SocketAddr::V4(std::net::SocketAddrV4::new(std::net::Ipv4Addr::LOCALHOST, 8787));

/// Default cap on buffered request bodies (64 KiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

/// Default per-request timeout (30 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`router`](fn@crate::router) and the server binary.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use persistent_values_server::ServerConfig;
///
/// let config = ServerConfig::builder()
///     .max_values_per_request(10)
///     .request_timeout(Duration::from_secs(5))
///     .build()?;
/// assert_eq!(config.max_values_per_request(), 10);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the server binds to.
    #[serde(default = "default_listen_addr")]
    pub(crate) listen_addr: SocketAddr,

    /// Most entries accepted by one set-multiple request.
    #[serde(default = "default_max_values_per_request")]
    pub(crate) max_values_per_request: usize,

    /// Largest request body buffered for validation.
    #[serde(default = "default_max_body_bytes")]
    pub(crate) max_body_bytes: usize,

    /// Candidates tried when issuing a token. `None` retries until a free
    /// token is found.
    #[serde(default)]
    pub(crate) token_issue_max_attempts: Option<u32>,

    /// Per-request timeout.
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub(crate) request_timeout: Duration,
}

fn default_listen_addr() -> SocketAddr {
    DEFAULT_LISTEN_ADDR
}

fn default_max_values_per_request() -> usize {
    DEFAULT_MAX_VALUES_PER_REQUEST
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

#[bon::bon]
impl ServerConfig {
    /// Creates a validated configuration. Every field is optional and falls
    /// back to its default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BelowMinimum`] if a limit or timeout is zero.
    #[builder]
    pub fn new(
        #[builder(default = DEFAULT_LISTEN_ADDR)] listen_addr: SocketAddr,
        #[builder(default = DEFAULT_MAX_VALUES_PER_REQUEST)] max_values_per_request: usize,
        #[builder(default = DEFAULT_MAX_BODY_BYTES)] max_body_bytes: usize,
        token_issue_max_attempts: Option<u32>,
        #[builder(default = DEFAULT_REQUEST_TIMEOUT)] request_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            listen_addr,
            max_values_per_request,
            max_body_bytes,
            token_issue_max_attempts,
            request_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks limits that deserialization alone cannot enforce.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BelowMinimum`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        at_least("max_values_per_request", self.max_values_per_request, 1)?;
        at_least("max_body_bytes", self.max_body_bytes, 1)?;
        if let Some(attempts) = self.token_issue_max_attempts {
            at_least("token_issue_max_attempts", attempts, 1)?;
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::BelowMinimum {
                field: "request_timeout",
                min: "1ms".to_owned(),
                value: format!("{:?}", self.request_timeout),
            });
        }
        Ok(())
    }

    /// Address the server binds to.
    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    /// Most entries accepted by one set-multiple request.
    #[must_use]
    pub fn max_values_per_request(&self) -> usize {
        self.max_values_per_request
    }

    /// Largest request body buffered for validation.
    #[must_use]
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Retry bound for token issuance.
    #[must_use]
    pub fn token_issue_max_attempts(&self) -> Option<u32> {
        self.token_issue_max_attempts
    }

    /// Per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Token issuer settings derived from this configuration.
    #[must_use]
    pub fn issuer_config(&self) -> IssuerConfig {
        IssuerConfig { max_attempts: self.token_issue_max_attempts }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR,
            max_values_per_request: DEFAULT_MAX_VALUES_PER_REQUEST,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            token_issue_max_attempts: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

fn at_least<T>(field: &'static str, value: T, min: T) -> Result<(), ConfigError>
where
    T: PartialOrd + ToString,
{
    if value < min {
        return Err(ConfigError::BelowMinimum {
            field,
            min: min.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let config = ServerConfig::builder().build().unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.listen_addr().to_string(), "127.0.0.1:8787");
        assert_eq!(config.max_values_per_request(), 5);
        assert_eq!(config.max_body_bytes(), 64 * 1024);
        assert_eq!(config.token_issue_max_attempts(), None);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn builder_rejects_zero_limit() {
        let err = ServerConfig::builder().max_values_per_request(0).build().unwrap_err();
        assert_eq!(err.to_string(), "max_values_per_request must be at least 1, got 0");
    }

    #[test]
    fn builder_rejects_zero_attempts() {
        let err = ServerConfig::builder().token_issue_max_attempts(0).build().unwrap_err();
        assert!(err.to_string().starts_with("token_issue_max_attempts"));
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        let err = ServerConfig::builder().request_timeout(Duration::ZERO).build().unwrap_err();
        assert!(err.to_string().starts_with("request_timeout must be at least 1ms"));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"max_values_per_request": 8, "request_timeout": "2s"}"#)
                .unwrap();
        assert_eq!(config.max_values_per_request(), 8);
        assert_eq!(config.request_timeout(), Duration::from_secs(2));
        assert_eq!(config.max_body_bytes(), DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    fn deserialize_rejects_unknown_fields() {
        let result = serde_json::from_str::<ServerConfig>(r#"{"max_valuez": 8}"#);
        assert!(result.is_err());
    }

    #[test]
    fn issuer_config_carries_bound() {
        let config = ServerConfig::builder().token_issue_max_attempts(3).build().unwrap();
        assert_eq!(config.issuer_config(), IssuerConfig::bounded(3));
    }
}

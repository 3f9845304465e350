//! Validators that run after the schema check.

use std::sync::Arc;

use async_trait::async_trait;
use persistent_values_authn::verify_access_token;
use persistent_values_storage::ValueStore;

use crate::{error::Rejection, locals::PartialLocals, pipeline::LocalsValidator};

/// Default cap on entries in one set-multiple request.
pub const DEFAULT_MAX_VALUES_PER_REQUEST: usize = 5;

/// Accepts a request only if its access token is a known, self-referencing
/// store entry.
#[derive(Clone)]
pub struct AccessControlValidator {
    store: Arc<dyn ValueStore>,
}

impl AccessControlValidator {
    /// Creates a validator that looks tokens up in `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ValueStore>) -> Self {
        Self { store }
    }
}

impl std::fmt::Debug for AccessControlValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessControlValidator").finish_non_exhaustive()
    }
}

#[async_trait]
impl LocalsValidator for AccessControlValidator {
    fn name(&self) -> &'static str {
        "access_control"
    }

    async fn validate(&self, locals: &PartialLocals) -> Option<Rejection> {
        verify_access_token(self.store.as_ref(), locals.access_token.as_deref())
            .await
            .err()
            .map(Rejection::from)
    }
}

/// Caps the number of entries in a set-multiple request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimitValidator {
    max_values: usize,
}

impl ResourceLimitValidator {
    /// Creates a validator that allows at most `max_values` entries.
    #[must_use]
    pub fn new(max_values: usize) -> Self {
        Self { max_values }
    }

    /// The configured threshold.
    #[must_use]
    pub fn max_values(&self) -> usize {
        self.max_values
    }
}

impl Default for ResourceLimitValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_VALUES_PER_REQUEST)
    }
}

#[async_trait]
impl LocalsValidator for ResourceLimitValidator {
    fn name(&self) -> &'static str {
        "resource_limit"
    }

    async fn validate(&self, locals: &PartialLocals) -> Option<Rejection> {
        let count = locals.values_len().unwrap_or(0);
        (count > self.max_values).then(|| {
            Rejection::payload_too_large(format!(
                "Too many values, the limit is {} values per request",
                self.max_values
            ))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use axum::http::StatusCode;
    use persistent_values_storage::{
        MemoryStore, PutOptions,
        testutil::{OTHER_TEST_TOKEN, RecordingStore, TEST_TOKEN},
    };
    use serde_json::{Map, json};

    use super::*;

    fn with_values(count: usize) -> PartialLocals {
        let values: Map<_, _> = (0..count).map(|i| (format!("k{i}"), json!(i))).collect();
        PartialLocals { values: Some(values.into()), ..PartialLocals::default() }
    }

    fn with_token(token: Option<&str>) -> PartialLocals {
        PartialLocals { access_token: token.map(str::to_owned), ..PartialLocals::default() }
    }

    #[tokio::test]
    async fn limit_allows_up_to_threshold() {
        let validator = ResourceLimitValidator::default();
        assert_eq!(validator.validate(&with_values(5)).await, None);
    }

    #[tokio::test]
    async fn limit_rejects_over_threshold() {
        let rejection = ResourceLimitValidator::default().validate(&with_values(6)).await.unwrap();
        assert_eq!(rejection.status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(rejection.message, "Too many values, the limit is 5 values per request");
    }

    #[tokio::test]
    async fn limit_ignores_absent_values() {
        let validator = ResourceLimitValidator::new(0);
        assert_eq!(validator.validate(&PartialLocals::default()).await, None);
    }

    #[tokio::test]
    async fn limit_uses_configured_threshold() {
        let rejection = ResourceLimitValidator::new(2).validate(&with_values(3)).await.unwrap();
        assert_eq!(rejection.message, "Too many values, the limit is 2 values per request");
    }

    #[tokio::test]
    async fn access_control_accepts_self_referencing_token() {
        let store = RecordingStore::with_token(TEST_TOKEN).await;
        let validator = AccessControlValidator::new(Arc::new(store.clone()));
        assert_eq!(validator.validate(&with_token(Some(TEST_TOKEN))).await, None);
        assert_eq!(store.gets(), vec![TEST_TOKEN.to_owned()]);
    }

    #[tokio::test]
    async fn access_control_rejects_unknown_token() {
        let validator = AccessControlValidator::new(Arc::new(MemoryStore::new()));
        let rejection = validator.validate(&with_token(Some(TEST_TOKEN))).await.unwrap();
        assert_eq!(rejection, Rejection::unauthorized("Access token is invalid"));
    }

    #[tokio::test]
    async fn access_control_rejects_mismatched_entry() {
        let store = MemoryStore::new();
        store.put(TEST_TOKEN, OTHER_TEST_TOKEN.to_owned(), PutOptions::touched_now()).await.unwrap();
        let validator = AccessControlValidator::new(Arc::new(store));
        let rejection = validator.validate(&with_token(Some(TEST_TOKEN))).await.unwrap();
        assert_eq!(rejection.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn access_control_rejects_missing_token() {
        let store = RecordingStore::new();
        let validator = AccessControlValidator::new(Arc::new(store.clone()));
        let rejection = validator.validate(&with_token(None)).await.unwrap();
        assert_eq!(rejection.status, StatusCode::UNAUTHORIZED);
        assert!(store.calls().is_empty());
    }
}

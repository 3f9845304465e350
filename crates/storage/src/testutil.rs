//! Shared test utilities for code built on [`ValueStore`].
//!
//! Feature-gated behind `testutil` so it never leaks into production builds.
//!
//! ```toml
//! [dev-dependencies]
//! persistent-values-storage = { workspace = true, features = ["testutil"] }
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    backend::{Metadata, OutputFormat, PutOptions, ValueStore},
    error::{StorageError, StorageResult},
    memory::MemoryStore,
    value::Value,
};

/// A well-formed, 36-character access token for tests.
pub const TEST_TOKEN: &str = "00000000-0000-4000-8000-000000000000";

/// A second well-formed token, for cross-tenant tests.
pub const OTHER_TEST_TOKEN: &str = "11111111-1111-4111-8111-111111111111";

/// One call observed by a [`RecordingStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    /// A `get` call.
    Get {
        /// Requested key.
        key: String,
        /// Requested format.
        format: OutputFormat,
    },
    /// A `put` call.
    Put {
        /// Written key.
        key: String,
        /// Written text.
        value: String,
        /// Written metadata.
        metadata: Metadata,
    },
}

/// A [`MemoryStore`] that records every call made through [`ValueStore`].
///
/// Seeding through [`RecordingStore::seed`] bypasses the recording, so
/// assertions only see calls made by the code under test.
#[derive(Debug, Clone, Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    calls: Arc<Mutex<Vec<StoreCall>>>,
    fail_puts: Arc<AtomicBool>,
}

impl RecordingStore {
    /// Creates an empty recording store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store in which `token` is a valid access token.
    pub async fn with_token(token: &str) -> Self {
        let store = Self::new();
        store.seed(token, token).await;
        store
    }

    /// Writes an entry without recording the call.
    ///
    /// # Panics
    ///
    /// Panics if the underlying put fails (it cannot for [`MemoryStore`]).
    pub async fn seed(&self, key: &str, value: &str) {
        self.inner
            .put(key, value.to_owned(), PutOptions::touched_now())
            .await
            .expect("memory store put cannot fail");
    }

    /// Makes every subsequent `put` fail with [`StorageError::Internal`].
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// All recorded calls, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    /// Recorded `put` calls as `(key, value)` pairs, in order.
    #[must_use]
    pub fn puts(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                StoreCall::Put { key, value, .. } => Some((key.clone(), value.clone())),
                StoreCall::Get { .. } => None,
            })
            .collect()
    }

    /// Recorded `get` keys, in order.
    #[must_use]
    pub fn gets(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                StoreCall::Get { key, .. } => Some(key.clone()),
                StoreCall::Put { .. } => None,
            })
            .collect()
    }

    /// The underlying memory store.
    #[must_use]
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl ValueStore for RecordingStore {
    async fn get(&self, key: &str, format: OutputFormat) -> StorageResult<Option<Value>> {
        self.calls.lock().push(StoreCall::Get { key: key.to_owned(), format });
        self.inner.get(key, format).await
    }

    async fn put(&self, key: &str, value: String, options: PutOptions) -> StorageResult<()> {
        self.calls.lock().push(StoreCall::Put {
            key: key.to_owned(),
            value: value.clone(),
            metadata: options.metadata,
        });
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::internal(format!("injected put failure for {key}")));
        }
        self.inner.put(key, value, options).await
    }
}

/// Assert that a [`StorageResult`] is an error.
#[macro_export]
macro_rules! assert_storage_error {
    ($result:expr) => {
        assert!($result.is_err(), "expected a StorageError, got: {:?}", $result);
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_uuid_shaped() {
        assert_eq!(TEST_TOKEN.len(), 36);
        assert_eq!(OTHER_TEST_TOKEN.len(), 36);
    }

    #[tokio::test]
    async fn seeding_is_not_recorded() {
        let store = RecordingStore::with_token(TEST_TOKEN).await;
        assert!(store.calls().is_empty());
        assert_eq!(store.get_text(TEST_TOKEN).await.unwrap().as_deref(), Some(TEST_TOKEN));
        assert_eq!(store.gets(), vec![TEST_TOKEN.to_owned()]);
    }

    #[tokio::test]
    async fn injected_put_failure() {
        let store = RecordingStore::new();
        store.fail_puts(true);
        let result = store.put("k", "v".into(), PutOptions::touched_now()).await;
        assert_storage_error!(result);
        assert_eq!(store.puts(), vec![("k".to_owned(), "v".to_owned())]);
        assert!(store.inner().is_empty());
    }
}

//! Store capability trait.
//!
//! The service consumes its key-value engine only through [`ValueStore`]:
//! a `get` that can hand back raw text or JSON-parsed scalars, and a `put`
//! that always carries [`Metadata`]. The engine itself is external; the
//! crate ships [`MemoryStore`](crate::MemoryStore) for tests and local runs.
//!
//! # Implementing a Store
//!
//! 1. Implement [`ValueStore::get`] and [`ValueStore::put`]
//! 2. Map engine-specific errors to [`StorageError`](crate::StorageError)
//!
//! Everything the service layer needs on top (namespacing, value encoding,
//! token markers) is built from these two operations.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    error::StorageResult,
    value::{Value, decode_json},
};

/// How a stored entry should be returned by [`ValueStore::get`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// The stored text, as a [`Value::String`].
    #[default]
    Text,
    /// The stored text parsed as JSON, see [`decode_json`].
    Json,
}

impl OutputFormat {
    /// Maps an `output` query parameter to a format. Only `json` selects
    /// [`OutputFormat::Json`]; anything else, including absence, is text.
    #[must_use]
    pub fn from_query(output: Option<&str>) -> Self {
        match output {
            Some("json") => Self::Json,
            _ => Self::Text,
        }
    }

    /// Converts raw stored text into the value handed to callers.
    #[must_use]
    pub fn decode(self, stored: &str) -> Value {
        match self {
            Self::Text => Value::String(stored.to_owned()),
            Self::Json => decode_json(stored),
        }
    }
}

/// Advisory metadata written alongside every entry.
///
/// Never read back for correctness; concurrent refreshes for the same entry
/// may interleave freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Unix timestamp in milliseconds of the last read or write.
    pub last_used: i64,
}

impl Metadata {
    /// Metadata stamped with the current time.
    #[must_use]
    pub fn now() -> Self {
        Self { last_used: Utc::now().timestamp_millis() }
    }
}

/// Options for [`ValueStore::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutOptions {
    /// Metadata stored with the entry.
    pub metadata: Metadata,
}

impl PutOptions {
    /// Options carrying freshly stamped [`Metadata`].
    #[must_use]
    pub fn touched_now() -> Self {
        Self { metadata: Metadata::now() }
    }
}

/// Flat, eventually-consistent string key-value store.
///
/// Implementations must be thread-safe (`Send + Sync`); the service shares one
/// instance across all requests behind an `Arc`.
///
/// # Example
///
/// ```
/// use persistent_values_storage::{MemoryStore, OutputFormat, PutOptions, Value, ValueStore};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let store = MemoryStore::new();
///
/// store.put("tok|answer", "42".to_owned(), PutOptions::touched_now()).await.unwrap();
///
/// let text = store.get("tok|answer", OutputFormat::Text).await.unwrap();
/// assert_eq!(text, Some(Value::from("42")));
///
/// let json = store.get("tok|answer", OutputFormat::Json).await.unwrap();
/// assert_eq!(json, Some(Value::from(42)));
/// # });
/// ```
#[async_trait]
pub trait ValueStore: Send + Sync {
    /// Retrieves the entry stored under `key`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))` if the key exists, decoded per `format`
    /// - `Ok(None)` if the key doesn't exist
    /// - `Err(...)` on storage errors
    #[must_use = "store operations may fail and errors must be handled"]
    async fn get(&self, key: &str, format: OutputFormat) -> StorageResult<Option<Value>>;

    /// Stores `value` under `key`, overwriting any existing entry and its
    /// metadata.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn put(&self, key: &str, value: String, options: PutOptions) -> StorageResult<()>;

    /// Retrieves the raw stored text under `key`.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn get_text(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.get(key, OutputFormat::Text).await?.map(|value| match value {
            Value::String(text) => text,
            other => other.encode(),
        }))
    }
}

//! In-memory store implementation.
//!
//! This module provides [`MemoryStore`], an in-memory implementation of
//! [`ValueStore`] suitable for testing and local development.
//!
//! # Features
//!
//! - **Thread-safe**: Uses [`parking_lot::RwLock`] for concurrent access
//! - **Ordered storage**: Entries are kept in a [`BTreeMap`], so a tenant's keys sit next to each
//!   other
//! - **Metadata**: The [`Metadata`] of the last `put` is retained per entry
//!
//! # Limitations
//!
//! - Data is not persisted; all data is lost when the process exits
//! - Reads are immediately consistent, which is stronger than the contract

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{
    backend::{Metadata, OutputFormat, PutOptions, ValueStore},
    error::StorageResult,
    value::Value,
};

/// A stored entry: raw text plus its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    /// The text written by the last `put`.
    pub value: String,
    /// The metadata written by the last `put`.
    pub metadata: Metadata,
}

/// In-memory store backed by a [`BTreeMap`].
///
/// # Cloning
///
/// `MemoryStore` is cheaply cloneable via [`Arc`]. All clones share the
/// same underlying data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<BTreeMap<String, StoredEntry>>>,
}

impl MemoryStore {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the metadata of the entry under `key`, if present.
    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<Metadata> {
        self.entries.read().get(key).map(|entry| entry.metadata)
    }

    /// Returns a copy of the entry under `key`, if present.
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<StoredEntry> {
        self.entries.read().get(key).cloned()
    }

    /// Number of stored entries, token markers included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl ValueStore for MemoryStore {
    #[tracing::instrument(skip(self))]
    async fn get(&self, key: &str, format: OutputFormat) -> StorageResult<Option<Value>> {
        let entries = self.entries.read();
        Ok(entries.get(key).map(|entry| format.decode(&entry.value)))
    }

    #[tracing::instrument(skip(self, value), fields(value_len = value.len()))]
    async fn put(&self, key: &str, value: String, options: PutOptions) -> StorageResult<()> {
        let mut entries = self.entries.write();
        entries.insert(key.to_owned(), StoredEntry { value, metadata: options.metadata });
        Ok(())
    }
}

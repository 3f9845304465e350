//! Store capability and encoding layer for the persistent values service.
//!
//! Many tenants share one flat key-value store. This crate provides the
//! pieces that make that safe:
//!
//! - [`ValueStore`]: the `get`/`put` capability the service consumes
//! - [`keys`]: derivation of tenant-scoped store keys
//! - [`Value`]: the closed set of storable values and their text encoding
//! - [`MemoryStore`]: an in-memory store for tests and local runs
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    HTTP handlers                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │        keys::derive_key          Value::encode              │
//! │   ({token}|{key} namespacing)   (typed value → text)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │                  ValueStore trait (get, put)                │
//! ├──────────────┬──────────────────────────────────────────────┤
//! │ MemoryStore  │          external key-value engine           │
//! └──────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use persistent_values_storage::{
//!     MemoryStore, OutputFormat, PutOptions, Value, ValueStore, keys::derive_key,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::new();
//!     let key = derive_key("00000000-0000-4000-8000-000000000000", "enabled");
//!
//!     store.put(&key, Value::from(true).encode(), PutOptions::touched_now()).await?;
//!
//!     let value = store.get(&key, OutputFormat::Json).await?;
//!     assert_eq!(value, Some(Value::from(true)));
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with a call-recording store and fixed test
//!   tokens. Enable this in `[dev-dependencies]` for integration tests.

#![deny(unsafe_code)]

pub mod backend;
pub mod error;
pub mod keys;
pub mod memory;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod value;

// Re-export primary types at crate root for convenience
pub use backend::{Metadata, OutputFormat, PutOptions, ValueStore};
pub use error::{BoxError, StorageError, StorageResult};
pub use memory::{MemoryStore, StoredEntry};
pub use value::{MAX_STRING_VALUE_LENGTH, MIN_STRING_VALUE_LENGTH, Value, Values, decode_json};

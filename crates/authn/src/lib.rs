//! # Persistent Values Authentication
//!
//! Access tokens for the persistent values service. A token is both a
//! credential and a tenant identity: it is valid exactly when the store holds
//! an entry whose key and value are both the token.
//!
//! This crate provides:
//! - **Issuance**: [`TokenIssuer`] finds an unused candidate and persists its marker
//! - **Validation**: [`verify_access_token`] checks the self-referential marker
//! - **Touch**: [`touch_access_token`] refreshes the marker's "last used" metadata
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use persistent_values_authn::{IssuerConfig, TokenIssuer, verify_access_token};
//! use persistent_values_storage::MemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let issuer = TokenIssuer::new(store.clone(), IssuerConfig::default());
//!
//! let token = issuer.issue().await?;
//! verify_access_token(store.as_ref(), Some(token.as_str())).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Authentication error types.
pub mod error;
/// Token issuance.
pub mod issuer;
/// Access token type and generators.
pub mod token;
/// Token validation and touch.
pub mod validation;

// Re-export key types for convenience
pub use error::{AuthError, INVALID_ACCESS_TOKEN_MESSAGE, Result};
pub use issuer::{IssuerConfig, TokenIssuer};
pub use token::{ACCESS_TOKEN_LENGTH, AccessToken, TokenGenerator, UuidTokenGenerator};
pub use validation::{touch_access_token, verify_access_token};

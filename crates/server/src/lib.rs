//! # Persistent Values Server
//!
//! HTTP front end of the persistent values service. Callers obtain an access
//! token, then read and write small values under it; the token doubles as
//! the tenant namespace in the shared store.
//!
//! | Route | Method | Purpose |
//! |-------|--------|---------|
//! | `/values/new_access_token` | GET | issue a token for `x-github-repo` |
//! | `/values/get` | GET | read `key`, optionally `output=json` |
//! | `/values/set` | POST | write `{"value": ..}` under `key` |
//! | `/values/set_multiple` | POST | write a key → value map |
//!
//! Every route runs a [`ValidationPipeline`] first: locals are extracted,
//! checked against the route [`Schema`], passed through the route's
//! validators and attached to the request. A failing step answers with a
//! [`Rejection`].
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use persistent_values_server::{AppState, ServerConfig, router};
//! use persistent_values_storage::MemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::default();
//! let state = AppState::new(Arc::new(MemoryStore::new()), &config);
//! let app = router(state, &config);
//!
//! let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod locals;
pub mod pipeline;
pub mod response;
pub mod router;
pub mod schema;
pub mod validators;

pub use config::ServerConfig;
pub use error::{ConfigError, Rejection};
pub use locals::{Endpoint, Locals, PartialLocals};
pub use pipeline::{LocalsValidator, ValidationPipeline};
pub use router::{AppState, router};
pub use schema::{Schema, SchemaError, SchemaValidator};
pub use validators::{AccessControlValidator, ResourceLimitValidator};

//! `persistent-values` binary: serves the API over an in-memory store.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use persistent_values_server::{AppState, ServerConfig, router};
use persistent_values_storage::MemoryStore;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Parser)]
#[command(name = "persistent-values", version, about = "Multi-tenant persistent key-value HTTP service")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "PERSISTENT_VALUES_LISTEN_ADDR", default_value = "127.0.0.1:8787")]
    listen_addr: SocketAddr,

    /// Most entries accepted by one set-multiple request.
    #[arg(long, env = "PERSISTENT_VALUES_MAX_VALUES", default_value_t = 5)]
    max_values_per_request: usize,

    /// Largest request body, in bytes, buffered for validation.
    #[arg(long, env = "PERSISTENT_VALUES_MAX_BODY_BYTES", default_value_t = 64 * 1024)]
    max_body_bytes: usize,

    /// Give up issuing a token after this many colliding candidates.
    #[arg(long, env = "PERSISTENT_VALUES_TOKEN_ISSUE_MAX_ATTEMPTS")]
    token_issue_max_attempts: Option<u32>,

    /// Per-request timeout, in seconds.
    #[arg(long, env = "PERSISTENT_VALUES_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,
}

impl Args {
    fn into_config(self) -> anyhow::Result<ServerConfig> {
        ServerConfig::builder()
            .listen_addr(self.listen_addr)
            .max_values_per_request(self.max_values_per_request)
            .max_body_bytes(self.max_body_bytes)
            .maybe_token_issue_max_attempts(self.token_issue_max_attempts)
            .request_timeout(Duration::from_secs(self.request_timeout_secs))
            .build()
            .context("invalid configuration")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::registry().with(filter).with(fmt::layer().with_target(false)).init();

    let config = Args::parse().into_config()?;
    let state = AppState::new(Arc::new(MemoryStore::new()), &config);
    let app = router(state, &config);

    let listener = TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr()))?;
    info!(addr = %config.listen_addr(), "Persistent values server listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

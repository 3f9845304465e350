//! Route table and shared state.

use std::sync::Arc;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{MethodRouter, get, post},
};
use persistent_values_authn::TokenIssuer;
use persistent_values_storage::ValueStore;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{
    config::ServerConfig,
    handlers,
    locals::Endpoint,
    pipeline::{ValidationPipeline, set_parsed_url, validate_request},
    validators::{AccessControlValidator, ResourceLimitValidator},
};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// The backing store.
    pub store: Arc<dyn ValueStore>,
    /// Issues new access tokens against `store`.
    pub issuer: Arc<TokenIssuer>,
}

impl AppState {
    /// State over `store`, with an issuer configured from `config`.
    #[must_use]
    pub fn new(store: Arc<dyn ValueStore>, config: &ServerConfig) -> Self {
        let issuer = Arc::new(TokenIssuer::new(store.clone(), config.issuer_config()));
        Self { store, issuer }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").field("issuer", &self.issuer).finish_non_exhaustive()
    }
}

/// Builds one validation pipeline per endpoint, with its validators in
/// their fixed order.
#[must_use]
pub fn pipelines(store: &Arc<dyn ValueStore>, config: &ServerConfig) -> [ValidationPipeline; 4] {
    let access = Arc::new(AccessControlValidator::new(store.clone()));
    let limit = Arc::new(ResourceLimitValidator::new(config.max_values_per_request()));
    let max_body = config.max_body_bytes();

    [
        ValidationPipeline::new(Endpoint::IssueToken, max_body),
        ValidationPipeline::new(Endpoint::GetValue, max_body).with_validator(access.clone()),
        ValidationPipeline::new(Endpoint::SetValue, max_body).with_validator(access.clone()),
        ValidationPipeline::new(Endpoint::SetMultipleValues, max_body)
            .with_validator(limit)
            .with_validator(access),
    ]
}

fn validated(route: MethodRouter<AppState>, pipeline: ValidationPipeline) -> MethodRouter<AppState> {
    route
        .route_layer(from_fn_with_state(Arc::new(pipeline), validate_request))
        .fallback(handlers::not_found)
}

/// Builds the service router.
///
/// Each route runs its validation pipeline before the handler. Unknown
/// paths, and known paths hit with the wrong method, get a JSON 404.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let [issue, get_value, set_value, set_multiple] = pipelines(&state.store, config);

    Router::new()
        .route(Endpoint::IssueToken.path(), validated(get(handlers::issue_token), issue))
        .route(Endpoint::GetValue.path(), validated(get(handlers::get_value), get_value))
        .route(Endpoint::SetValue.path(), validated(post(handlers::set_value), set_value))
        .route(
            Endpoint::SetMultipleValues.path(),
            validated(post(handlers::set_multiple_values), set_multiple),
        )
        .fallback(handlers::not_found)
        .layer(from_fn(set_parsed_url))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

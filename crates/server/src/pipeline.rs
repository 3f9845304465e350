//! Per-endpoint request validation.
//!
//! A [`ValidationPipeline`] runs before every validated handler:
//!
//! 1. extract [`PartialLocals`] from the buffered request
//! 2. check them against the endpoint [`SchemaValidator`]
//! 3. run each [`LocalsValidator`] in order, stopping at the first rejection
//! 4. narrow the locals and attach them to the request extensions
//!
//! Every step returns a value; a failed step short-circuits with a
//! [`Rejection`] that the middleware renders as the response.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{Instrument, debug, debug_span};

use crate::{
    error::Rejection,
    locals::{Endpoint, Extractor, Locals, ParsedUrl, PartialLocals},
    schema::{Schema, SchemaValidator},
};

/// A check that runs on locals that already passed the schema.
#[async_trait]
pub trait LocalsValidator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Returns `Some` to reject the request.
    async fn validate(&self, locals: &PartialLocals) -> Option<Rejection>;
}

/// Validation chain of one endpoint.
#[derive(Clone)]
pub struct ValidationPipeline {
    endpoint: Endpoint,
    extractor: Extractor,
    schema: Arc<dyn SchemaValidator>,
    validators: Vec<Arc<dyn LocalsValidator>>,
    max_body_bytes: usize,
}

impl std::fmt::Debug for ValidationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let validators: Vec<_> = self.validators.iter().map(|v| v.name()).collect();
        f.debug_struct("ValidationPipeline")
            .field("endpoint", &self.endpoint)
            .field("validators", &validators)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

impl ValidationPipeline {
    /// Pipeline with the endpoint's own extractor and schema and no extra
    /// validators.
    #[must_use]
    pub fn new(endpoint: Endpoint, max_body_bytes: usize) -> Self {
        Self {
            endpoint,
            extractor: endpoint.extractor(),
            schema: Arc::new(*Schema::for_endpoint(endpoint)),
            validators: Vec::new(),
            max_body_bytes,
        }
    }

    /// Replaces the schema validator.
    #[must_use]
    pub fn with_schema(mut self, schema: Arc<dyn SchemaValidator>) -> Self {
        self.schema = schema;
        self
    }

    /// Appends a validator. Validators run in the order they are added.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn LocalsValidator>) -> Self {
        self.validators.push(validator);
        self
    }

    /// The endpoint this pipeline guards.
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// Runs the chain on `request`. On success the typed locals are in the
    /// request extensions.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] of the first failed step.
    pub async fn run(&self, request: &mut axum::http::Request<Bytes>) -> Result<(), Rejection> {
        let partial = (self.extractor)(request);

        if let Err(errors) = self.schema.validate(&partial) {
            let first = errors.into_iter().next().map_or_else(
                || "Request is invalid".to_owned(),
                |error| error.message,
            );
            debug!(endpoint = %self.endpoint, error = %first, "Schema validation failed");
            return Err(Rejection::bad_request(first));
        }

        for validator in &self.validators {
            if let Some(rejection) = validator.validate(&partial).await {
                debug!(
                    endpoint = %self.endpoint,
                    validator = validator.name(),
                    status = %rejection.status,
                    "Request rejected"
                );
                return Err(rejection);
            }
        }

        Locals::narrow(self.endpoint, partial)?.attach(request.extensions_mut());
        Ok(())
    }
}

/// Stores the parsed request URL in the extensions for later layers.
pub async fn set_parsed_url(mut request: Request, next: Next) -> Response {
    if let Some(parsed) = ParsedUrl::parse(request.uri()) {
        request.extensions_mut().insert(parsed);
    }
    next.run(request).await
}

/// Middleware running `pipeline` before the wrapped handler.
///
/// The body is buffered up to the pipeline's byte limit. A body that cannot
/// be read, including one over the limit, is treated as empty so that only
/// the body-derived fields go missing.
pub async fn validate_request(
    State(pipeline): State<Arc<ValidationPipeline>>,
    request: Request,
    next: Next,
) -> Response {
    let span = debug_span!("validate_request", endpoint = %pipeline.endpoint);
    async move {
        let (parts, body) = request.into_parts();
        let bytes = axum::body::to_bytes(body, pipeline.max_body_bytes).await.unwrap_or_else(|err| {
            debug!(error = %err, "Failed to buffer request body");
            Bytes::new()
        });

        let mut buffered = axum::http::Request::from_parts(parts, bytes);
        match pipeline.run(&mut buffered).await {
            Ok(()) => next.run(buffered.map(Body::from)).await,
            Err(rejection) => rejection.into_response(),
        }
    }
    .instrument(span)
    .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::http::StatusCode;
    use persistent_values_storage::testutil::TEST_TOKEN;

    use super::*;
    use crate::{
        locals::{ACCESS_TOKEN_HEADER, Field, GetValueLocals},
        schema::SchemaError,
    };

    #[derive(Default)]
    struct CountingValidator {
        calls: AtomicUsize,
        reject: Option<Rejection>,
    }

    impl CountingValidator {
        fn rejecting(rejection: Rejection) -> Self {
            Self { calls: AtomicUsize::new(0), reject: Some(rejection) }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LocalsValidator for CountingValidator {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn validate(&self, _locals: &PartialLocals) -> Option<Rejection> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reject.clone()
        }
    }

    fn get_request(uri: &str, token: Option<&str>) -> axum::http::Request<Bytes> {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(ACCESS_TOKEN_HEADER, token);
        }
        builder.body(Bytes::new()).unwrap()
    }

    #[tokio::test]
    async fn schema_failure_skips_validators() {
        let validator = Arc::new(CountingValidator::default());
        let pipeline = ValidationPipeline::new(Endpoint::GetValue, 1024)
            .with_validator(validator.clone());

        let mut request = get_request("/values/get", Some(TEST_TOKEN));
        let rejection = pipeline.run(&mut request).await.unwrap_err();

        assert_eq!(rejection, Rejection::bad_request("must have required property 'key'"));
        assert_eq!(validator.calls(), 0);
        assert!(request.extensions().get::<GetValueLocals>().is_none());
    }

    #[tokio::test]
    async fn first_rejection_stops_the_chain() {
        let first = Arc::new(CountingValidator::rejecting(Rejection::payload_too_large("full")));
        let second = Arc::new(CountingValidator::default());
        let pipeline = ValidationPipeline::new(Endpoint::GetValue, 1024)
            .with_validator(first.clone())
            .with_validator(second.clone());

        let mut request = get_request("/values/get?key=k", Some(TEST_TOKEN));
        let rejection = pipeline.run(&mut request).await.unwrap_err();

        assert_eq!(rejection.status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn success_attaches_locals() {
        let validator = Arc::new(CountingValidator::default());
        let pipeline = ValidationPipeline::new(Endpoint::GetValue, 1024)
            .with_validator(validator.clone());

        let mut request = get_request("/values/get?key=colour", Some(TEST_TOKEN));
        pipeline.run(&mut request).await.unwrap();

        assert_eq!(validator.calls(), 1);
        assert_eq!(
            request.extensions().get::<GetValueLocals>(),
            Some(&GetValueLocals { access_token: TEST_TOKEN.into(), key: "colour".into() })
        );
    }

    #[tokio::test]
    async fn custom_schema_is_used() {
        struct RejectAll;

        impl SchemaValidator for RejectAll {
            fn validate(
                &self,
                _locals: &PartialLocals,
            ) -> Result<(), Vec<SchemaError>> {
                Err(vec![SchemaError {
                    field: Field::Key,
                    message: "nope".into(),
                }])
            }
        }

        let pipeline =
            ValidationPipeline::new(Endpoint::GetValue, 1024).with_schema(Arc::new(RejectAll));
        let mut request = get_request("/values/get?key=k", Some(TEST_TOKEN));
        assert_eq!(pipeline.run(&mut request).await.unwrap_err().message, "nope");
    }
}

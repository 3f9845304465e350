//! Collision-free access token issuance.
//!
//! A token is valid when the store holds an entry whose key and value are
//! both the token. Issuing one means finding a candidate nobody holds yet
//! and writing that self-referential marker.

use std::sync::Arc;

use persistent_values_storage::{OutputFormat, PutOptions, ValueStore};

use crate::{
    error::{AuthError, Result},
    token::{AccessToken, TokenGenerator, UuidTokenGenerator},
};

/// Configuration for [`TokenIssuer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IssuerConfig {
    /// Upper bound on generate-and-check cycles. `None` retries until a free
    /// candidate is found, which terminates quickly with a strong random
    /// source but never gives up.
    pub max_attempts: Option<u32>,
}

impl IssuerConfig {
    /// Configuration that gives up after `max_attempts` collisions.
    #[must_use]
    pub fn bounded(max_attempts: u32) -> Self {
        Self { max_attempts: Some(max_attempts) }
    }
}

/// Issues new access tokens against a [`ValueStore`].
pub struct TokenIssuer {
    store: Arc<dyn ValueStore>,
    generator: Arc<dyn TokenGenerator>,
    config: IssuerConfig,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").field("config", &self.config).finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Creates an issuer using random UUID candidates.
    #[must_use]
    pub fn new(store: Arc<dyn ValueStore>, config: IssuerConfig) -> Self {
        Self::with_generator(store, Arc::new(UuidTokenGenerator), config)
    }

    /// Creates an issuer drawing candidates from `generator`.
    #[must_use]
    pub fn with_generator(
        store: Arc<dyn ValueStore>,
        generator: Arc<dyn TokenGenerator>,
        config: IssuerConfig,
    ) -> Self {
        Self { store, generator, config }
    }

    /// Issues and persists a fresh access token.
    ///
    /// # Errors
    ///
    /// - [`AuthError::IssuanceExhausted`] if the configured attempt bound is reached
    /// - [`AuthError::Storage`] if the store lookup or write fails
    #[tracing::instrument(skip(self))]
    pub async fn issue(&self) -> Result<AccessToken> {
        let mut attempts: u32 = 0;

        let token = loop {
            if self.config.max_attempts.is_some_and(|max| attempts >= max) {
                tracing::warn!(attempts, "Token issuance gave up after repeated collisions");
                return Err(AuthError::IssuanceExhausted { attempts });
            }
            attempts += 1;

            let candidate = self.generator.generate();
            if self.store.get(candidate.as_str(), OutputFormat::Text).await?.is_none() {
                break candidate;
            }
            tracing::debug!(attempts, "Token candidate already taken, retrying");
        };

        self.store
            .put(token.as_str(), token.as_str().to_owned(), PutOptions::touched_now())
            .await?;

        tracing::debug!(attempts, "Issued access token");
        Ok(token)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use parking_lot::Mutex;
    use persistent_values_storage::testutil::{OTHER_TEST_TOKEN, RecordingStore, TEST_TOKEN};

    use super::*;

    /// Hands out a fixed sequence of candidates, repeating the last one.
    struct SequenceGenerator {
        tokens: Mutex<Vec<&'static str>>,
        generated: Mutex<u32>,
    }

    impl SequenceGenerator {
        fn new(tokens: &[&'static str]) -> Self {
            let mut tokens = tokens.to_vec();
            tokens.reverse();
            Self { tokens: Mutex::new(tokens), generated: Mutex::new(0) }
        }

        fn generated(&self) -> u32 {
            *self.generated.lock()
        }
    }

    impl TokenGenerator for SequenceGenerator {
        fn generate(&self) -> AccessToken {
            *self.generated.lock() += 1;
            let mut tokens = self.tokens.lock();
            let next = if tokens.len() > 1 { tokens.pop() } else { tokens.last().copied() };
            AccessToken::new(next.expect("sequence must not be empty"))
        }
    }

    #[tokio::test]
    async fn issue_persists_self_referential_marker() {
        let store = RecordingStore::new();
        let issuer = TokenIssuer::new(Arc::new(store.clone()), IssuerConfig::default());

        let token = issuer.issue().await.unwrap();

        assert_eq!(token.as_str().len(), crate::ACCESS_TOKEN_LENGTH);
        assert_eq!(store.puts(), vec![(token.to_string(), token.to_string())]);
        assert!(store.inner().metadata(token.as_str()).is_some());
    }

    #[tokio::test]
    async fn issue_retries_past_collision() {
        let store = RecordingStore::with_token(TEST_TOKEN).await;
        let generator = Arc::new(SequenceGenerator::new(&[TEST_TOKEN, OTHER_TEST_TOKEN]));
        let issuer = TokenIssuer::with_generator(
            Arc::new(store.clone()),
            generator.clone(),
            IssuerConfig::default(),
        );

        let token = issuer.issue().await.unwrap();

        assert_eq!(token.as_str(), OTHER_TEST_TOKEN);
        assert!(generator.generated() >= 2);
        assert_eq!(store.gets(), vec![TEST_TOKEN.to_owned(), OTHER_TEST_TOKEN.to_owned()]);
        assert_eq!(store.puts(), vec![(OTHER_TEST_TOKEN.to_owned(), OTHER_TEST_TOKEN.to_owned())]);
    }

    #[tokio::test]
    async fn bounded_issuer_gives_up() {
        let store = RecordingStore::with_token(TEST_TOKEN).await;
        let generator = Arc::new(SequenceGenerator::new(&[TEST_TOKEN]));
        let issuer = TokenIssuer::with_generator(
            Arc::new(store.clone()),
            generator.clone(),
            IssuerConfig::bounded(3),
        );

        let err = issuer.issue().await.unwrap_err();

        assert!(matches!(err, AuthError::IssuanceExhausted { attempts: 3 }));
        assert_eq!(generator.generated(), 3);
        assert!(store.puts().is_empty());
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let store = RecordingStore::new();
        store.fail_puts(true);
        let issuer = TokenIssuer::new(Arc::new(store), IssuerConfig::default());

        let err = issuer.issue().await.unwrap_err();
        assert!(matches!(err, AuthError::Storage(_)));
    }
}

//! Access token validation and touch.
//!
//! A token is valid only when the store returns exactly the token string
//! for a lookup of the token itself. Presence alone is not enough: an entry
//! under the token's name holding anything else does not count.

use persistent_values_storage::{PutOptions, ValueStore};

use crate::error::{AuthError, Result};

/// Verifies that `access_token` is a valid token recorded in `store`.
///
/// # Errors
///
/// - [`AuthError::InvalidAccessToken`] if the token is absent or empty, unknown to the store, or
///   not self-referential
/// - [`AuthError::Storage`] if the lookup itself fails
///
/// # Examples
///
/// ```
/// use persistent_values_authn::validation::verify_access_token;
/// use persistent_values_storage::{MemoryStore, PutOptions, ValueStore};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let store = MemoryStore::new();
/// let token = "00000000-0000-4000-8000-000000000000";
///
/// assert!(verify_access_token(&store, Some(token)).await.is_err());
///
/// store.put(token, token.to_owned(), PutOptions::touched_now()).await.unwrap();
/// assert!(verify_access_token(&store, Some(token)).await.is_ok());
/// # });
/// ```
#[tracing::instrument(skip(store, access_token))]
pub async fn verify_access_token<S>(store: &S, access_token: Option<&str>) -> Result<()>
where
    S: ValueStore + ?Sized,
{
    let Some(access_token) = access_token.filter(|token| !token.is_empty()) else {
        return Err(AuthError::InvalidAccessToken);
    };

    match store.get_text(access_token).await? {
        Some(stored) if stored == access_token => Ok(()),
        _ => Err(AuthError::InvalidAccessToken),
    }
}

/// Refreshes the "last used" metadata of a token's marker entry.
///
/// Called after each successful read or write made with a validated token.
/// This is advisory bookkeeping, not an expiry mechanism.
///
/// # Errors
///
/// Returns [`AuthError::Storage`] if the write fails.
#[tracing::instrument(skip(store, access_token))]
pub async fn touch_access_token<S>(store: &S, access_token: &str) -> Result<()>
where
    S: ValueStore + ?Sized,
{
    store.put(access_token, access_token.to_owned(), PutOptions::touched_now()).await?;
    Ok(())
}

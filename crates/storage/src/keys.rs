//! Tenant-scoped key derivation.
//!
//! The backing store is flat: it has no notion of tenants. Every tenant key
//! is therefore written under `{access_token}|{key}`, which keeps two tenants
//! using the same logical key from overwriting each other.
//!
//! Injectivity holds only while neither the token nor the key contains
//! [`KEY_SEPARATOR`]. Issued tokens are UUIDs and never do; keys are not
//! checked for it.

/// Separator placed between the access token and the tenant's key.
pub const KEY_SEPARATOR: char = '|';

/// Derives the store key for `key` within the namespace of `access_token`.
///
/// # Examples
///
/// ```
/// use persistent_values_storage::keys::derive_key;
///
/// assert_eq!(derive_key("tok", "k"), "tok|k");
/// ```
#[must_use]
pub fn derive_key(access_token: &str, key: &str) -> String {
    let mut namespaced = String::with_capacity(access_token.len() + 1 + key.len());
    namespaced.push_str(access_token);
    namespaced.push(KEY_SEPARATOR);
    namespaced.push_str(key);
    namespaced
}

/// Splits a namespaced key on the first separator into `(access_token, key)`.
///
/// Returns `None` if the separator does not occur.
#[must_use]
pub fn split_key(namespaced: &str) -> Option<(&str, &str)> {
    namespaced.split_once(KEY_SEPARATOR)
}

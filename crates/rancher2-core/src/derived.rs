//! Derived-field helpers.
//!
//! Pure, stateless transforms for attributes that the control plane does not
//! store as-is but that the provider exposes as first-class fields.

use rand::distributions::Alphanumeric;
use rand::{CryptoRng, Rng};

use crate::error::{CoreError, Result};

/// Prefix of a principal identifier backed by an external directory service.
pub const DIRECTORY_PRINCIPAL_PREFIX: &str = "directory_user://";

/// Separator between the access key and the secret key of an API token.
pub const ACCESS_SECRET_SEPARATOR: char = ':';

/// Length of a synthesized bootstrap password.
pub const SYNTHESIZED_PASSWORD_LEN: usize = 32;

/// Return the distinguished name of the first directory-backed principal.
///
/// Returns an empty string if no principal carries the directory prefix.
#[must_use]
pub fn extract_directory_identity<S: AsRef<str>>(principal_ids: &[S]) -> &str {
    principal_ids
        .iter()
        .find_map(|id| id.as_ref().strip_prefix(DIRECTORY_PRINCIPAL_PREFIX))
        .unwrap_or_default()
}

/// Encode a distinguished name as a directory-backed principal identifier.
#[must_use]
pub fn directory_principal(distinguished_name: &str) -> String {
    format!("{DIRECTORY_PRINCIPAL_PREFIX}{distinguished_name}")
}

/// Split a combined `<access-key>:<secret-key>` token.
///
/// # Errors
///
/// Returns [`CoreError::MalformedToken`] unless the token consists of exactly
/// two non-empty parts.
pub fn split_access_secret(token: &str) -> Result<(&str, &str)> {
    let Some((access, secret)) = token.split_once(ACCESS_SECRET_SEPARATOR) else {
        return Err(CoreError::MalformedToken("no separator found"));
    };
    if secret.contains(ACCESS_SECRET_SEPARATOR) {
        return Err(CoreError::MalformedToken("more than two parts"));
    }
    if access.is_empty() || secret.is_empty() {
        return Err(CoreError::MalformedToken("empty key part"));
    }
    Ok((access, secret))
}

/// Generate a bootstrap password from a cryptographically secure generator.
#[must_use]
pub fn synthesize_password<R: Rng + CryptoRng>(rng: &mut R) -> String {
    (0..SYNTHESIZED_PASSWORD_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect()
}

//! Common error types for the rancher2 provider.
//!
//! This module provides shared error types that are used across multiple crates.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur while handling identifiers and derived fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An invalid identifier was provided.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] crate::ids::IdError),

    /// A combined `<access-key>:<secret-key>` token could not be split.
    ///
    /// The token itself is never included in the message.
    #[error("malformed API token: expected `<access-key>:<secret-key>`, {0}")]
    MalformedToken(&'static str),
}

//! Client error types.

use rancher2_core::ResourceId;
use thiserror::Error;

/// A result type using `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while talking to the remote API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A mutating call targeted a record that does not exist.
    #[error("{collection} {id} not found")]
    NotFound {
        /// Collection the call was made against.
        collection: &'static str,
        /// Identity of the missing record.
        id: ResourceId,
    },

    /// The remote rejected the request.
    #[error("API error ({status}) on {collection}: {message}")]
    Api {
        /// Collection the call was made against.
        collection: &'static str,
        /// HTTP status code.
        status: u16,
        /// Machine-readable error code, if the remote sent one.
        code: Option<String>,
        /// Human-readable message.
        message: String,
    },

    /// The request could not be sent or the response could not be received.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body could not be decoded.
    #[error("failed to decode {collection} response: {message}")]
    Decode {
        /// Collection the call was made against.
        collection: &'static str,
        /// Decoder message.
        message: String,
    },

    /// The client could not be constructed from its configuration.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl ClientError {
    /// Returns true if the remote reported the target as absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Api { status: 404, .. }
        )
    }

    /// Returns the HTTP status code associated with this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::Api { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            Self::Decode { .. } | Self::InvalidConfig(_) => None,
        }
    }
}

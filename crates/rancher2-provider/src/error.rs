//! Error types for the provider.
//!
//! Every failure is a returned value. [`ProviderError::category`] maps each
//! variant onto the five classes a host engine needs to distinguish.

use rancher2_client::ClientError;
use rancher2_core::{CoreError, ResourceId};
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;

/// A result type using `ProviderError`.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Coarse classification of a [`ProviderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The remote object is absent.
    NotFound,
    /// A natural-key collision or an unsupported in-place change.
    Conflict,
    /// More than one record matched a query expected to be unique.
    Ambiguous,
    /// Any other remote failure: auth, validation, network, malformed data.
    RemoteFault,
    /// Missing or invalid connection parameters or declared configuration.
    Configuration,
}

/// Errors that can occur in provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The record targeted by an operation no longer exists.
    #[error("{kind} with ID \"{id}\" could not be found")]
    NotFound {
        /// Resource kind.
        kind: &'static str,
        /// Identity of the missing record.
        id: ResourceId,
    },

    /// A lookup by criteria matched nothing.
    #[error("{kind} not found matching {criteria}")]
    NoMatch {
        /// Resource kind.
        kind: &'static str,
        /// Rendered search criteria.
        criteria: String,
    },

    /// A record with the same natural key already exists.
    #[error("{kind} with {key} (ID: \"{id}\") already exists")]
    AlreadyExists {
        /// Resource kind.
        kind: &'static str,
        /// Rendered natural key.
        key: String,
        /// Identity of the conflicting record.
        id: ResourceId,
    },

    /// A lookup expected to be unique matched several records.
    #[error("more than one {kind} found matching {criteria}: {count}")]
    Ambiguous {
        /// Resource kind.
        kind: &'static str,
        /// Rendered search criteria.
        criteria: String,
        /// Number of matches.
        count: usize,
    },

    /// The change set touches fields that cannot be updated in place.
    #[error("{kind} must be replaced to change {}", .fields.join(", "))]
    RequiresReplacement {
        /// Resource kind.
        kind: &'static str,
        /// Fields forcing replacement.
        fields: Vec<&'static str>,
    },

    /// A required field was declared empty.
    #[error("{kind} requires a value for \"{field}\"")]
    MissingField {
        /// Resource kind.
        kind: &'static str,
        /// Schema field name.
        field: &'static str,
    },

    /// The kind cannot be adopted into tracked state.
    #[error("{kind} does not support import")]
    ImportUnsupported {
        /// Resource kind.
        kind: &'static str,
    },

    /// The remote accepted a create but returned no identity.
    #[error("remote returned a {kind} without an identity")]
    MissingIdentity {
        /// Resource kind.
        kind: &'static str,
    },

    /// An update failed after some fields were already committed.
    #[error("update partially applied (committed: {}): {source}", .committed.join(", "))]
    PartialUpdate {
        /// Fields committed before the failure.
        committed: Vec<&'static str>,
        /// The failure that stopped the update.
        #[source]
        source: Box<ProviderError>,
    },

    /// A tracked-state or declared-configuration document could not be
    /// converted.
    #[error("invalid {kind} state: {message}")]
    InvalidState {
        /// Resource kind.
        kind: &'static str,
        /// Decoder message.
        message: String,
    },

    /// No resource or data source is registered under the given name.
    #[error("unknown {registry}: {name}")]
    UnknownType {
        /// `"resource"` or `"data source"`.
        registry: &'static str,
        /// Requested type name.
        name: String,
    },

    /// Derived-field error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Remote API error.
    #[error("remote error: {0}")]
    Remote(#[from] ClientError),

    /// Connection configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ProviderError {
    /// Classify the error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } | Self::NoMatch { .. } => ErrorCategory::NotFound,
            Self::AlreadyExists { .. } | Self::RequiresReplacement { .. } => {
                ErrorCategory::Conflict
            }
            Self::Ambiguous { .. } => ErrorCategory::Ambiguous,
            Self::Remote(err) if err.is_not_found() => ErrorCategory::NotFound,
            Self::Remote(_) | Self::MissingIdentity { .. } | Self::Core(_) => {
                ErrorCategory::RemoteFault
            }
            Self::PartialUpdate { source, .. } => source.category(),
            Self::MissingField { .. }
            | Self::ImportUnsupported { .. }
            | Self::InvalidState { .. }
            | Self::UnknownType { .. }
            | Self::Config(_) => ErrorCategory::Configuration,
        }
    }

    /// Returns true if the error means the remote object is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    /// Fields committed before the failure, if the update was partial.
    #[must_use]
    pub fn committed(&self) -> &[&'static str] {
        match self {
            Self::PartialUpdate { committed, .. } => committed,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> ResourceId {
        ResourceId::new(value).unwrap()
    }

    #[test]
    fn categories() {
        assert_eq!(
            ProviderError::NotFound { kind: "cluster", id: id("c-1") }.category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            ProviderError::AlreadyExists {
                kind: "cluster",
                key: r#"name="prod""#.into(),
                id: id("c-1"),
            }
            .category(),
            ErrorCategory::Conflict
        );
        assert_eq!(
            ProviderError::Ambiguous {
                kind: "project",
                criteria: String::new(),
                count: 2,
            }
            .category(),
            ErrorCategory::Ambiguous
        );
        assert_eq!(
            ProviderError::Config(ConfigError::Missing(vec!["api_url"])).category(),
            ErrorCategory::Configuration
        );
    }

    #[test]
    fn remote_not_found_is_not_found() {
        let err = ProviderError::from(ClientError::Api {
            collection: "users",
            status: 404,
            code: None,
            message: "gone".into(),
        });
        assert!(err.is_not_found());

        let err = ProviderError::from(ClientError::Api {
            collection: "users",
            status: 401,
            code: None,
            message: "unauthorized".into(),
        });
        assert_eq!(err.category(), ErrorCategory::RemoteFault);
    }

    #[test]
    fn partial_update_reports_committed_fields() {
        let err = ProviderError::PartialUpdate {
            committed: vec!["name"],
            source: Box::new(ProviderError::Remote(ClientError::Api {
                collection: "clusters",
                status: 500,
                code: None,
                message: "boom".into(),
            })),
        };
        assert_eq!(err.committed(), ["name"]);
        assert_eq!(err.category(), ErrorCategory::RemoteFault);
        assert!(err.to_string().contains("committed: name"));
    }

    #[test]
    fn conflict_message_names_existing_id() {
        let err = ProviderError::AlreadyExists {
            kind: "cluster",
            key: r#"name="prod""#.into(),
            id: id("c-7xk2p"),
        };
        assert_eq!(
            err.to_string(),
            r#"cluster with name="prod" (ID: "c-7xk2p") already exists"#
        );
    }
}

//! The managed resource kinds.

pub mod cluster;
pub mod project;
pub mod registration_token;
pub mod token;
pub mod user;

pub use cluster::{ClusterKind, ClusterState};
pub use project::{ProjectKind, ProjectState};
pub use registration_token::{RegistrationTokenKind, RegistrationTokenState};
pub use token::{TokenKind, TokenState};
pub use user::{OsPasswordGenerator, PasswordGenerator, UserKind, UserState};

use rancher2_core::ResourceId;

/// Render an optional identity as a tracked-state string.
pub(crate) fn id_string(id: Option<&ResourceId>) -> String {
    id.map(ToString::to_string).unwrap_or_default()
}

/// Include `value` in a patch only if `field` changed.
pub(crate) fn changed(
    changes: &crate::schema::ChangeSet,
    field: &str,
    value: &str,
) -> Option<String> {
    changes.contains(field).then(|| value.to_string())
}

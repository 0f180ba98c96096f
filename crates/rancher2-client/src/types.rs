//! Remote record types and their typed partial updates.
//!
//! Field names follow the camelCase wire format of the Rancher v3 API. Every
//! patch type serializes only the fields that are set, so `Some(..)` means
//! "send this field" and `None` means "leave it untouched".

use std::fmt;

use chrono::{DateTime, Utc};
use rancher2_core::ResourceId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A record type owned by the remote control plane.
pub trait RemoteResource:
    Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static
{
    /// Path segment of the collection under the API base URL.
    const COLLECTION: &'static str;

    /// Typed partial update accepted by the collection.
    type Patch: Serialize + fmt::Debug + Default + Send + Sync;

    /// Identity assigned by the remote, absent on create payloads.
    fn id(&self) -> Option<&ResourceId>;
}

/// A downstream cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    /// Remote identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    /// Remote-assigned UUID.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uuid: String,
    /// Globally unique cluster name.
    #[serde(default)]
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

/// Partial update for a [`Cluster`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterPatch {
    /// New name. The API requires it on every update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RemoteResource for Cluster {
    const COLLECTION: &'static str = "clusters";
    type Patch = ClusterPatch;

    fn id(&self) -> Option<&ResourceId> {
        self.id.as_ref()
    }
}

/// A token used to register an existing Kubernetes cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRegistrationToken {
    /// Remote identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    /// Owning cluster.
    #[serde(default)]
    pub cluster_id: String,
    /// Token name, computed by the remote when not supplied.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Registration bearer token.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
    /// Shell command importing the cluster.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub command: String,
    /// Shell command importing the cluster without TLS verification.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub insecure_command: String,
    /// URL of the import manifest.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub manifest_url: String,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

/// Partial update for a [`ClusterRegistrationToken`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRegistrationTokenPatch {
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RemoteResource for ClusterRegistrationToken {
    const COLLECTION: &'static str = "clusterregistrationtokens";
    type Patch = ClusterRegistrationTokenPatch;

    fn id(&self) -> Option<&ResourceId> {
        self.id.as_ref()
    }
}

/// A project within a cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Remote identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    /// Remote-assigned UUID.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uuid: String,
    /// Owning cluster.
    #[serde(default)]
    pub cluster_id: String,
    /// Name, unique within the owning cluster.
    #[serde(default)]
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

/// Partial update for a [`Project`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RemoteResource for Project {
    const COLLECTION: &'static str = "projects";
    type Patch = ProjectPatch;

    fn id(&self) -> Option<&ResourceId> {
        self.id.as_ref()
    }
}

/// A personal API token.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// Remote identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    /// Remote-assigned UUID.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uuid: String,
    /// Token name, computed by the remote.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Owning user.
    #[serde(default)]
    pub user_id: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Combined `<access-key>:<secret-key>`, only returned on creation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
    /// Whether the token was derived from a login session.
    #[serde(default)]
    pub is_derived: bool,
    /// Whether the token has expired.
    #[serde(default)]
    pub expired: bool,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("id", &self.id)
            .field("uuid", &self.uuid)
            .field("name", &self.name)
            .field("user_id", &self.user_id)
            .field("description", &self.description)
            .field("token", &redacted(&self.token))
            .field("is_derived", &self.is_derived)
            .field("expired", &self.expired)
            .field("created", &self.created)
            .finish()
    }
}

/// Partial update for a [`Token`]. Tokens are immutable once issued.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TokenPatch {}

impl RemoteResource for Token {
    const COLLECTION: &'static str = "tokens";
    type Patch = TokenPatch;

    fn id(&self) -> Option<&ResourceId> {
        self.id.as_ref()
    }
}

/// A user account.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Remote identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    /// Remote-assigned UUID.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uuid: String,
    /// Login name, empty for directory-only accounts.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Password. Write-only: the remote never echoes it back.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    /// Principal identifiers associated with the account.
    #[serde(default)]
    pub principal_ids: Vec<String>,
    /// Whether the user must change the password on next login.
    #[serde(default)]
    pub must_change_password: bool,
    /// Whether the account is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Set by the remote on the account the request authenticated as.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub me: bool,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("uuid", &self.uuid)
            .field("username", &self.username)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("password", &redacted(&self.password))
            .field("principal_ids", &self.principal_ids)
            .field("must_change_password", &self.must_change_password)
            .field("enabled", &self.enabled)
            .field("me", &self.me)
            .field("created", &self.created)
            .finish()
    }
}

/// Partial update for a [`User`].
#[derive(Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    /// New password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// New display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Replacement principal identifier list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_ids: Option<Vec<String>>,
}

impl fmt::Debug for UserPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserPatch")
            .field("password", &self.password.as_deref().map(redacted))
            .field("name", &self.name)
            .field("description", &self.description)
            .field("principal_ids", &self.principal_ids)
            .finish()
    }
}

impl RemoteResource for User {
    const COLLECTION: &'static str = "users";
    type Patch = UserPatch;

    fn id(&self) -> Option<&ResourceId> {
        self.id.as_ref()
    }
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() {
        ""
    } else {
        "<redacted>"
    }
}

/// Envelope of a collection listing.
#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse<R> {
    #[serde(default = "Vec::new")]
    pub data: Vec<R>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_create_payload_omits_identity() {
        let cluster = Cluster {
            name: "prod".into(),
            description: "production".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&cluster).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "name": "prod", "description": "production" })
        );
    }

    #[test]
    fn project_uses_camel_case_wire_names() {
        let json = r#"{"id":"c-1:p-2","uuid":"u","clusterId":"c-1","name":"billing","description":""}"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert_eq!(project.cluster_id, "c-1");
        assert_eq!(project.id.unwrap().as_str(), "c-1:p-2");
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let patch = ClusterPatch {
            name: Some("prod".into()),
            description: None,
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({ "name": "prod" })
        );
        assert_eq!(
            serde_json::to_value(UserPatch::default()).unwrap(),
            serde_json::json!({})
        );
    }

    #[test]
    fn user_patch_principal_ids_wire_name() {
        let patch = UserPatch {
            principal_ids: Some(vec!["directory_user://CN=Jane".into()]),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json["principalIds"][0], "directory_user://CN=Jane");
    }

    #[test]
    fn user_debug_redacts_password() {
        let user = User {
            username: "jane".into(),
            password: "hunter2".into(),
            ..Default::default()
        };
        let debug = format!("{user:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn token_debug_redacts_secret() {
        let token = Token {
            token: "token-abc:secret".into(),
            ..Default::default()
        };
        assert!(!format!("{token:?}").contains("secret"));
    }

    #[test]
    fn list_response_tolerates_missing_data() {
        let list: ListResponse<Cluster> = serde_json::from_str("{}").unwrap();
        assert!(list.data.is_empty());
    }
}

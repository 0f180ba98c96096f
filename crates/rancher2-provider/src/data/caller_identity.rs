//! The account the provider authenticates as.

use async_trait::async_trait;
use rancher2_client::{Filters, RancherApi};
use rancher2_core::ResourceId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{encode, exists_by_id, expect_one, DataSource};
use crate::error::Result;
use crate::schema::{FieldSchema, Presence, Schema};

const KIND: &str = "current user";

/// Result of a caller identity lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallerIdentity {
    /// Identity of the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Remote-assigned UUID.
    pub uuid: String,
}

/// Looks up the enabled user the request authenticated as.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallerIdentityLookup;

impl CallerIdentityLookup {
    /// Field schema.
    pub const SCHEMA: Schema = Schema::new(&[
        FieldSchema::string("name", Presence::Computed, "Display name of the current user"),
        FieldSchema::string("description", Presence::Computed, "Description of the current user"),
        FieldSchema::string("uuid", Presence::Computed, "UUID of the current user"),
    ]);

    /// Resolve the current user.
    ///
    /// # Errors
    ///
    /// Fails unless exactly one enabled user is flagged as the caller.
    pub async fn lookup(&self, api: &dyn RancherApi) -> Result<CallerIdentity> {
        let filters = Filters::new().eq("me", true).eq("enabled", true);
        let user = expect_one(KIND, &filters, api.users().list(&filters).await?)?;
        tracing::debug!(id = ?user.id, "Resolved caller identity");

        Ok(CallerIdentity {
            id: user.id,
            name: user.name,
            description: user.description,
            uuid: user.uuid,
        })
    }
}

#[async_trait]
impl DataSource for CallerIdentityLookup {
    fn type_name(&self) -> &'static str {
        "rancher2_caller_identity"
    }

    fn schema(&self) -> Schema {
        Self::SCHEMA
    }

    async fn read(&self, api: &dyn RancherApi, _query: Value) -> Result<Value> {
        encode(KIND, &self.lookup(api).await?)
    }

    async fn exists(&self, api: &dyn RancherApi, state: Value) -> Result<bool> {
        exists_by_id(KIND, api.users(), &state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use rancher2_client::{MemoryRancher, User};

    fn user(username: &str, me: bool, enabled: bool) -> User {
        User {
            username: username.into(),
            name: username.to_uppercase(),
            me,
            enabled: Some(enabled),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn resolves_the_enabled_caller() {
        let api = MemoryRancher::new();
        api.users.insert(user("admin", false, true)).unwrap();
        api.users.insert(user("stale", true, false)).unwrap();
        let me = api.users.insert(user("jane", true, true)).unwrap();

        let identity = CallerIdentityLookup.lookup(&api).await.unwrap();
        assert_eq!(identity.id, me.id);
        assert_eq!(identity.name, "JANE");
        assert_eq!(identity.uuid, me.uuid);
    }

    #[tokio::test]
    async fn no_caller_is_an_error() {
        let api = MemoryRancher::new();
        api.users.insert(user("admin", false, true)).unwrap();

        let err = CallerIdentityLookup.lookup(&api).await.unwrap_err();
        assert!(matches!(err, ProviderError::NoMatch { .. }));
    }

    #[tokio::test]
    async fn several_callers_is_an_error() {
        let api = MemoryRancher::new();
        api.users.insert(user("jane", true, true)).unwrap();
        api.users.insert(user("john", true, true)).unwrap();

        let err = CallerIdentityLookup.lookup(&api).await.unwrap_err();
        assert!(matches!(err, ProviderError::Ambiguous { count: 2, .. }));
    }

    #[tokio::test]
    async fn erased_read_and_exists() {
        let api = MemoryRancher::new();
        api.users.insert(user("jane", true, true)).unwrap();

        let state = CallerIdentityLookup
            .read(&api, Value::Null)
            .await
            .unwrap();
        assert_eq!(state["name"], "JANE");
        assert!(CallerIdentityLookup.exists(&api, state).await.unwrap());
    }
}

//! Provider registry.
//!
//! [`Provider`] owns the remote handle and maps registry names onto
//! resource controllers and lookups. Hosts talk to it in JSON: declared
//! configuration in, tracked state out.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use rancher2_client::{HttpRancherClient, RancherApi};
use rancher2_core::ResourceId;
use serde::Serialize;
use serde_json::Value;

use crate::config::ProviderConfig;
use crate::data::{CallerIdentityLookup, DataSource, ProjectLookup, TokenLookup};
use crate::error::{ProviderError, Result};
use crate::lifecycle::{invalid_state, Lifecycle, Plan, ResourceKind, Tracked};
use crate::resources::{
    ClusterKind, OsPasswordGenerator, PasswordGenerator, ProjectKind, RegistrationTokenKind,
    TokenKind, UserKind,
};
use crate::schema::{FieldSchema, Presence, Schema};

/// Schema of the provider's own connection inputs.
pub const PROVIDER_SCHEMA: Schema = Schema::new(&[
    FieldSchema::string("api_url", Presence::Optional, "The URL to the Rancher API"),
    FieldSchema::string("access_key", Presence::Optional, "API key used to authenticate")
        .sensitive(),
    FieldSchema::string("secret_key", Presence::Optional, "API secret used to authenticate")
        .sensitive(),
    FieldSchema::string(
        "token",
        Presence::Optional,
        "Combined access and secret key, split on the first colon",
    )
    .sensitive(),
    FieldSchema::string("cacert", Presence::Optional, "CA certificate used to verify the API"),
    FieldSchema::string(
        "current_server",
        Presence::Optional,
        "Server to select from the Rancher CLI configuration",
    ),
]);

/// A resource controller, erased over JSON documents.
#[async_trait]
pub trait ManagedResource: Send + Sync {
    /// Registry name, e.g. `rancher2_cluster`.
    fn type_name(&self) -> &'static str;

    /// Field schema.
    fn schema(&self) -> Schema;

    /// Whether an existing remote object can be adopted.
    fn importable(&self) -> bool;

    /// Create from declared configuration and return the tracked state.
    ///
    /// # Errors
    ///
    /// See [`Lifecycle::create`].
    async fn create(&self, api: &dyn RancherApi, config: Value) -> Result<Value>;

    /// Refresh tracked state, which must carry an `id`.
    ///
    /// # Errors
    ///
    /// See [`Lifecycle::read`].
    async fn read(&self, api: &dyn RancherApi, tracked: Value) -> Result<Value>;

    /// Apply declared configuration to tracked state and return the commit.
    ///
    /// # Errors
    ///
    /// See [`Lifecycle::update`].
    async fn update(&self, api: &dyn RancherApi, tracked: Value, config: Value) -> Result<Value>;

    /// Delete by identity.
    ///
    /// # Errors
    ///
    /// See [`Lifecycle::delete`].
    async fn delete(&self, api: &dyn RancherApi, id: &ResourceId) -> Result<()>;

    /// Check existence by identity.
    ///
    /// # Errors
    ///
    /// See [`Lifecycle::exists`].
    async fn exists(&self, api: &dyn RancherApi, id: &ResourceId) -> Result<bool>;

    /// Adopt an existing object and return the imported set.
    ///
    /// # Errors
    ///
    /// See [`Lifecycle::import`].
    async fn import(&self, api: &dyn RancherApi, id: &ResourceId) -> Result<Value>;

    /// Compute what reaching the declared configuration requires.
    ///
    /// # Errors
    ///
    /// See [`Lifecycle::plan`].
    fn plan(&self, tracked: Value, config: Value) -> Result<Plan>;
}

fn decode<K: ResourceKind, T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(invalid_state::<K>)
}

fn encode<K: ResourceKind, T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(invalid_state::<K>)
}

fn tracked_id<K: ResourceKind>(tracked: &Tracked<K::State>) -> Result<&ResourceId> {
    tracked.id.as_ref().ok_or(ProviderError::MissingField {
        kind: K::KIND,
        field: "id",
    })
}

#[async_trait]
impl<K: ResourceKind> ManagedResource for Lifecycle<K> {
    fn type_name(&self) -> &'static str {
        K::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        K::SCHEMA
    }

    fn importable(&self) -> bool {
        K::IMPORTABLE
    }

    async fn create(&self, api: &dyn RancherApi, config: Value) -> Result<Value> {
        let desired: K::State = decode::<K, _>(config)?;
        encode::<K, _>(&Lifecycle::create(self, api, &desired).await?)
    }

    async fn read(&self, api: &dyn RancherApi, tracked: Value) -> Result<Value> {
        let tracked: Tracked<K::State> = decode::<K, _>(tracked)?;
        let id = tracked_id::<K>(&tracked)?;
        encode::<K, _>(&Lifecycle::read(self, api, id, &tracked.state).await?)
    }

    async fn update(&self, api: &dyn RancherApi, tracked: Value, config: Value) -> Result<Value> {
        let tracked: Tracked<K::State> = decode::<K, _>(tracked)?;
        let desired: K::State = decode::<K, _>(config)?;
        let id = tracked_id::<K>(&tracked)?;
        encode::<K, _>(&Lifecycle::update(self, api, id, &tracked.state, &desired).await?)
    }

    async fn delete(&self, api: &dyn RancherApi, id: &ResourceId) -> Result<()> {
        Lifecycle::delete(self, api, id).await
    }

    async fn exists(&self, api: &dyn RancherApi, id: &ResourceId) -> Result<bool> {
        Lifecycle::exists(self, api, id).await
    }

    async fn import(&self, api: &dyn RancherApi, id: &ResourceId) -> Result<Value> {
        encode::<K, _>(&Lifecycle::import(self, api, id).await?)
    }

    fn plan(&self, tracked: Value, config: Value) -> Result<Plan> {
        let tracked: Tracked<K::State> = decode::<K, _>(tracked)?;
        let desired: K::State = decode::<K, _>(config)?;
        Lifecycle::plan(self, &tracked, &desired)
    }
}

/// Schema of a registered resource.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceSchema {
    /// Whether import is supported.
    pub importable: bool,
    /// Field schema.
    pub fields: Schema,
}

/// Everything a host needs to know about the provider.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSchema {
    /// Connection inputs.
    pub provider: Schema,
    /// Resources by registry name.
    pub resources: BTreeMap<&'static str, ResourceSchema>,
    /// Lookups by registry name.
    pub data_sources: BTreeMap<&'static str, Schema>,
}

/// Controllers and lookups by registry name.
struct Registry {
    resources: BTreeMap<&'static str, Box<dyn ManagedResource>>,
    data_sources: BTreeMap<&'static str, Box<dyn DataSource>>,
}

impl Registry {
    fn new(passwords: Arc<dyn PasswordGenerator>) -> Self {
        let mut registry = Self {
            resources: BTreeMap::new(),
            data_sources: BTreeMap::new(),
        };
        registry.register_resource(Lifecycle::new(ClusterKind));
        registry.register_resource(Lifecycle::new(RegistrationTokenKind));
        registry.register_resource(Lifecycle::new(ProjectKind));
        registry.register_resource(Lifecycle::new(TokenKind));
        registry.register_resource(Lifecycle::new(UserKind::new(passwords)));
        registry.register_data_source(CallerIdentityLookup);
        registry.register_data_source(ProjectLookup);
        registry.register_data_source(TokenLookup);
        registry
    }

    fn register_resource<R: ManagedResource + 'static>(&mut self, resource: R) {
        self.resources.insert(resource.type_name(), Box::new(resource));
    }

    fn register_data_source<D: DataSource + 'static>(&mut self, source: D) {
        self.data_sources.insert(source.type_name(), Box::new(source));
    }

    fn schema(&self) -> ProviderSchema {
        ProviderSchema {
            provider: PROVIDER_SCHEMA,
            resources: self
                .resources
                .iter()
                .map(|(name, resource)| {
                    let schema = ResourceSchema {
                        importable: resource.importable(),
                        fields: resource.schema(),
                    };
                    (*name, schema)
                })
                .collect(),
            data_sources: self
                .data_sources
                .iter()
                .map(|(name, source)| (*name, source.schema()))
                .collect(),
        }
    }
}

/// The provider: a remote handle plus the registered controllers.
pub struct Provider {
    api: Arc<dyn RancherApi>,
    registry: Registry,
}

impl Provider {
    /// Create a provider over an existing remote handle.
    #[must_use]
    pub fn new(api: Arc<dyn RancherApi>) -> Self {
        Self {
            api,
            registry: Registry::new(Arc::new(OsPasswordGenerator)),
        }
    }

    /// Resolve connection parameters and connect over HTTPS.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`] if the parameters cannot be
    /// resolved, or [`ProviderError::Remote`] if the client cannot be built.
    pub fn connect(config: &ProviderConfig) -> Result<Self> {
        let client_config = config.resolve()?;
        let client = HttpRancherClient::new(&client_config)?;
        tracing::info!(api_url = %client.base_url(), "Configured Rancher client");
        Ok(Self::new(Arc::new(client)))
    }

    /// Replace the source of synthesized user passwords.
    #[must_use]
    pub fn with_password_generator(mut self, passwords: Arc<dyn PasswordGenerator>) -> Self {
        self.registry
            .register_resource(Lifecycle::new(UserKind::new(passwords)));
        self
    }

    /// Schema of every registered resource and lookup, without connecting.
    #[must_use]
    pub fn describe() -> ProviderSchema {
        Registry::new(Arc::new(OsPasswordGenerator)).schema()
    }

    /// The remote handle.
    #[must_use]
    pub fn api(&self) -> &dyn RancherApi {
        self.api.as_ref()
    }

    /// Look up a resource controller by registry name.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::UnknownType`] for unregistered names.
    pub fn resource(&self, name: &str) -> Result<&dyn ManagedResource> {
        self.registry
            .resources
            .get(name)
            .map(AsRef::as_ref)
            .ok_or_else(|| ProviderError::UnknownType {
                registry: "resource",
                name: name.to_string(),
            })
    }

    /// Look up a data source by registry name.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::UnknownType`] for unregistered names.
    pub fn data_source(&self, name: &str) -> Result<&dyn DataSource> {
        self.registry
            .data_sources
            .get(name)
            .map(AsRef::as_ref)
            .ok_or_else(|| ProviderError::UnknownType {
                registry: "data source",
                name: name.to_string(),
            })
    }

    /// Registry names of all resources.
    pub fn resource_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.registry.resources.keys().copied()
    }

    /// Registry names of all data sources.
    pub fn data_source_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.registry.data_sources.keys().copied()
    }

    /// Full provider schema.
    #[must_use]
    pub fn schema(&self) -> ProviderSchema {
        self.registry.schema()
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("resources", &self.resource_names().collect::<Vec<_>>())
            .field("data_sources", &self.data_source_names().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rancher2_client::MemoryRancher;
    use serde_json::json;

    struct Fixed;

    impl PasswordGenerator for Fixed {
        fn generate(&self) -> String {
            "fixed".into()
        }
    }

    fn provider() -> (Arc<MemoryRancher>, Provider) {
        let api = Arc::new(MemoryRancher::new());
        let provider = Provider::new(api.clone());
        (api, provider)
    }

    #[test]
    fn registry_names() {
        let (_, provider) = provider();
        assert_eq!(
            provider.resource_names().collect::<Vec<_>>(),
            [
                "rancher2_cluster",
                "rancher2_cluster_registration_token",
                "rancher2_project",
                "rancher2_token",
                "rancher2_user",
            ]
        );
        assert_eq!(
            provider.data_source_names().collect::<Vec<_>>(),
            ["rancher2_caller_identity", "rancher2_project", "rancher2_token"]
        );
    }

    #[test]
    fn unknown_type() {
        let (_, provider) = provider();
        let err = provider.resource("rancher2_node_pool").err().unwrap();
        assert!(matches!(err, ProviderError::UnknownType { .. }));
    }

    #[test]
    fn schema_flags_importers() {
        let schema = serde_json::to_value(Provider::describe()).unwrap();

        assert_eq!(
            schema["resources"]["rancher2_cluster_registration_token"]["importable"],
            false
        );
        assert_eq!(schema["resources"]["rancher2_user"]["importable"], true);
        assert_eq!(schema["provider"][1]["name"], "access_key");
        assert_eq!(schema["provider"][1]["sensitive"], true);
        assert_eq!(schema["data_sources"]["rancher2_token"][0]["name"], "user_id");
    }

    #[tokio::test]
    async fn json_round_trip_through_registry() {
        let (api, provider) = provider();
        let clusters = provider.resource("rancher2_cluster").unwrap();

        let tracked = clusters
            .create(provider.api(), json!({ "name": "prod" }))
            .await
            .unwrap();
        assert_eq!(tracked["id"], "c-1");
        assert_eq!(tracked["cluster_id"], "c-1");

        let commit = clusters
            .update(
                provider.api(),
                tracked.clone(),
                json!({ "name": "prod", "description": "production" }),
            )
            .await
            .unwrap();
        assert_eq!(commit["committed"], json!(["description"]));
        assert_eq!(commit["tracked"]["description"], "production");
        assert_eq!(api.clusters.records()[0].description, "production");

        let refreshed = clusters.read(provider.api(), tracked).await.unwrap();
        assert_eq!(refreshed["description"], "production");
    }

    #[tokio::test]
    async fn read_requires_identity() {
        let (_, provider) = provider();
        let err = provider
            .resource("rancher2_cluster")
            .unwrap()
            .read(provider.api(), json!({ "name": "prod" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::MissingField { field: "id", .. }));
    }

    #[tokio::test]
    async fn plan_without_identity_is_create() {
        let (_, provider) = provider();
        let plan = provider
            .resource("rancher2_project")
            .unwrap()
            .plan(json!({}), json!({ "cluster_id": "c-1", "name": "billing" }))
            .unwrap();
        assert_eq!(plan, Plan::Create);
    }

    #[tokio::test]
    async fn injected_password_generator() {
        let (api, provider) = provider();
        let provider = provider.with_password_generator(Arc::new(Fixed));

        let tracked = provider
            .resource("rancher2_user")
            .unwrap()
            .create(provider.api(), json!({ "username": "jane" }))
            .await
            .unwrap();
        assert_eq!(tracked["password"], "fixed");
        assert_eq!(api.users.records()[0].password, "fixed");
    }

    #[tokio::test]
    async fn import_returns_a_set() {
        let (_, provider) = provider();
        let clusters = provider.resource("rancher2_cluster").unwrap();
        clusters
            .create(provider.api(), json!({ "name": "prod" }))
            .await
            .unwrap();

        let id = ResourceId::new("c-1").unwrap();
        let imported = clusters.import(provider.api(), &id).await.unwrap();
        assert_eq!(imported.as_array().map(Vec::len), Some(1));
        assert_eq!(imported[0]["name"], "prod");
    }

    #[tokio::test]
    async fn lookups_through_registry() {
        let (api, provider) = provider();
        api.projects
            .insert(rancher2_client::Project {
                cluster_id: "c-1".into(),
                name: "billing".into(),
                ..Default::default()
            })
            .unwrap();

        let record = provider
            .data_source("rancher2_project")
            .unwrap()
            .read(provider.api(), json!({ "cluster_id": "c-1", "name": "billing" }))
            .await
            .unwrap();
        assert_eq!(record["name"], "billing");
    }

    #[test]
    fn connect_reports_missing_parameters() {
        let config = ProviderConfig {
            api_url: Some("https://rancher.example.com".into()),
            ..Default::default()
        };
        let err = Provider::connect(&config).unwrap_err();
        assert!(matches!(err, ProviderError::Config(_)));
        assert!(err.to_string().contains("access_key"));
    }
}

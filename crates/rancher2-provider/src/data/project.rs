//! Project lookup by cluster and name.

use async_trait::async_trait;
use rancher2_client::{Filters, RancherApi};
use rancher2_core::ResourceId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{decode, encode, expect_one, DataSource};
use crate::error::{ProviderError, Result};
use crate::schema::{FieldSchema, Presence, Schema};

const KIND: &str = "project";

/// Lookup criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectQuery {
    /// Owning cluster.
    pub cluster_id: String,
    /// Project name.
    pub name: String,
}

impl ProjectQuery {
    fn filters(&self) -> Result<Filters> {
        for (field, value) in [("cluster_id", &self.cluster_id), ("name", &self.name)] {
            if value.is_empty() {
                return Err(ProviderError::MissingField { kind: KIND, field });
            }
        }
        Ok(Filters::new()
            .eq("clusterId", &self.cluster_id)
            .eq("name", &self.name))
    }
}

/// The matched project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectRecord {
    /// Identity of the project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    /// Owning cluster.
    pub cluster_id: String,
    /// Project name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Remote-assigned UUID.
    pub uuid: String,
}

/// Looks up a single project by name within a cluster.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectLookup;

impl ProjectLookup {
    /// Field schema.
    pub const SCHEMA: Schema = Schema::new(&[
        FieldSchema::string(
            "cluster_id",
            Presence::Required,
            "ID of the cluster owning the project",
        ),
        FieldSchema::string("name", Presence::Required, "Name of the project"),
        FieldSchema::string("description", Presence::Computed, "Description of the project"),
        FieldSchema::string("uuid", Presence::Computed, "UUID of the project"),
    ]);

    /// Resolve the project matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NoMatch`] naming the criteria if nothing
    /// matches and [`ProviderError::Ambiguous`] with the count if several do.
    pub async fn lookup(&self, api: &dyn RancherApi, query: &ProjectQuery) -> Result<ProjectRecord> {
        let filters = query.filters()?;
        let project = expect_one(KIND, &filters, api.projects().list(&filters).await?)?;

        Ok(ProjectRecord {
            id: project.id,
            cluster_id: project.cluster_id,
            name: project.name,
            description: project.description,
            uuid: project.uuid,
        })
    }

    /// Returns false if nothing matches `query`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Ambiguous`] if several projects match, or
    /// any remote error.
    pub async fn exists(&self, api: &dyn RancherApi, query: &ProjectQuery) -> Result<bool> {
        match self.lookup(api, query).await {
            Ok(_) => Ok(true),
            Err(ProviderError::NoMatch { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl DataSource for ProjectLookup {
    fn type_name(&self) -> &'static str {
        "rancher2_project"
    }

    fn schema(&self) -> Schema {
        Self::SCHEMA
    }

    async fn read(&self, api: &dyn RancherApi, query: Value) -> Result<Value> {
        let query: ProjectQuery = decode(KIND, query)?;
        encode(KIND, &self.lookup(api, &query).await?)
    }

    async fn exists(&self, api: &dyn RancherApi, state: Value) -> Result<bool> {
        let query: ProjectQuery = decode(KIND, state)?;
        ProjectLookup::exists(self, api, &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use rancher2_client::{MemoryRancher, Project};

    fn project(cluster_id: &str, name: &str) -> Project {
        Project {
            cluster_id: cluster_id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    fn query(cluster_id: &str, name: &str) -> ProjectQuery {
        ProjectQuery {
            cluster_id: cluster_id.into(),
            name: name.into(),
        }
    }

    #[tokio::test]
    async fn single_match() {
        let api = MemoryRancher::new();
        api.projects.insert(project("c-2", "billing")).unwrap();
        let stored = api
            .projects
            .insert(Project {
                description: "Invoices".into(),
                ..project("c-1", "billing")
            })
            .unwrap();

        let record = ProjectLookup.lookup(&api, &query("c-1", "billing")).await.unwrap();
        assert_eq!(record.id, stored.id);
        assert_eq!(record.description, "Invoices");
        assert_eq!(record.uuid, stored.uuid);
    }

    #[tokio::test]
    async fn zero_matches_names_the_project() {
        let api = MemoryRancher::new();

        let err = ProjectLookup
            .lookup(&api, &query("c-1", "billing"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NoMatch { .. }));
        assert!(err.to_string().contains("billing"));
        assert!(!ProjectLookup.exists(&api, &query("c-1", "billing")).await.unwrap());
    }

    #[tokio::test]
    async fn two_matches_report_the_count() {
        let api = MemoryRancher::new();
        api.projects.insert(project("c-1", "billing")).unwrap();
        api.projects.insert(project("c-1", "billing")).unwrap();

        let err = ProjectLookup
            .lookup(&api, &query("c-1", "billing"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Ambiguous { count: 2, .. }));
        assert_eq!(err.category(), ErrorCategory::Ambiguous);

        let err = ProjectLookup
            .exists(&api, &query("c-1", "billing"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Ambiguous { count: 2, .. }));
    }

    #[tokio::test]
    async fn name_is_required() {
        let api = MemoryRancher::new();
        let err = ProjectLookup.lookup(&api, &query("c-1", "")).await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingField { field: "name", .. }));
        assert_eq!(api.projects.list_calls(), 0);
    }

    #[tokio::test]
    async fn erased_read() {
        let api = MemoryRancher::new();
        api.projects.insert(project("c-1", "billing")).unwrap();

        let state = DataSource::read(
            &ProjectLookup,
            &api,
            serde_json::json!({ "cluster_id": "c-1", "name": "billing" }),
        )
        .await
        .unwrap();
        assert_eq!(state["cluster_id"], "c-1");
        assert!(DataSource::exists(&ProjectLookup, &api, state).await.unwrap());
    }
}

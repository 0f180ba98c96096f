//! Project resource.

use rancher2_client::{Collection, Project, ProjectPatch, RancherApi};
use serde::{Deserialize, Serialize};

use super::changed;
use crate::error::Result;
use crate::lifecycle::ResourceKind;
use crate::resolver::NaturalKey;
use crate::schema::{ChangeSet, FieldSchema, Presence, Schema};

/// Tracked state of a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectState {
    /// Owning cluster. Changing it replaces the project.
    pub cluster_id: String,
    /// Name, unique within the owning cluster.
    pub name: String,
    /// Free-form description.
    pub description: String,
}

/// Project kind. Names are unique per cluster.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectKind;

impl ResourceKind for ProjectKind {
    type Remote = Project;
    type State = ProjectState;

    const TYPE_NAME: &'static str = "rancher2_project";
    const KIND: &'static str = "project";
    const SCHEMA: Schema = Schema::new(&[
        FieldSchema::string(
            "cluster_id",
            Presence::Required,
            "ID of the cluster for whom to create the project",
        )
        .force_new(),
        FieldSchema::string("name", Presence::Required, "Name of the project"),
        FieldSchema::string("description", Presence::Optional, "Description of the project"),
    ]);

    fn collection<'a>(&self, api: &'a dyn RancherApi) -> &'a dyn Collection<Project> {
        api.projects()
    }

    fn natural_key(&self, desired: &ProjectState) -> Option<NaturalKey> {
        Some(NaturalKey::new("name", &desired.name).within("clusterId", &desired.cluster_id))
    }

    fn create_payload(&self, desired: &ProjectState) -> Project {
        Project {
            cluster_id: desired.cluster_id.clone(),
            name: desired.name.clone(),
            description: desired.description.clone(),
            ..Default::default()
        }
    }

    fn project(&self, remote: &Project, state: &mut ProjectState) -> Result<()> {
        state.cluster_id.clone_from(&remote.cluster_id);
        state.name.clone_from(&remote.name);
        state.description.clone_from(&remote.description);
        Ok(())
    }

    fn build_patch(&self, desired: &ProjectState, changes: &ChangeSet) -> ProjectPatch {
        ProjectPatch {
            name: changed(changes, "name", &desired.name),
            description: changed(changes, "description", &desired.description),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::lifecycle::Lifecycle;
    use rancher2_client::MemoryRancher;

    fn project(cluster_id: &str, name: &str) -> ProjectState {
        ProjectState {
            cluster_id: cluster_id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn names_are_unique_per_cluster() {
        let api = MemoryRancher::new();
        let lifecycle = Lifecycle::new(ProjectKind);

        let first = lifecycle.create(&api, &project("c-1", "billing")).await.unwrap();
        lifecycle.create(&api, &project("c-2", "billing")).await.unwrap();

        let err = lifecycle
            .create(&api, &project("c-1", "billing"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AlreadyExists { ref id, .. } if Some(id) == first.id.as_ref()));
        assert_eq!(api.projects.records().len(), 2);
    }

    #[tokio::test]
    async fn create_requires_cluster() {
        let api = MemoryRancher::new();
        let err = Lifecycle::new(ProjectKind)
            .create(&api, &project("", "billing"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::MissingField { field: "cluster_id", .. }));
    }

    #[tokio::test]
    async fn update_sends_only_changed_fields() {
        let api = MemoryRancher::new();
        let lifecycle = Lifecycle::new(ProjectKind);
        let tracked = lifecycle.create(&api, &project("c-1", "billing")).await.unwrap();

        let desired = ProjectState {
            description: "Invoices".into(),
            ..project("c-1", "billing")
        };
        let commit = lifecycle
            .update(&api, tracked.id.as_ref().unwrap(), &tracked.state, &desired)
            .await
            .unwrap();

        assert_eq!(
            api.projects.last_patch().unwrap(),
            serde_json::json!({ "description": "Invoices" })
        );
        assert_eq!(commit.tracked.state, desired);
    }

    #[tokio::test]
    async fn rename_collides_within_cluster() {
        let api = MemoryRancher::new();
        let lifecycle = Lifecycle::new(ProjectKind);
        lifecycle.create(&api, &project("c-1", "billing")).await.unwrap();
        let payroll = lifecycle.create(&api, &project("c-1", "payroll")).await.unwrap();

        let err = lifecycle
            .update(
                &api,
                payroll.id.as_ref().unwrap(),
                &payroll.state,
                &project("c-1", "billing"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AlreadyExists { .. }));
    }
}

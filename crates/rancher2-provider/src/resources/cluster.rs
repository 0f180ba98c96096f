//! Cluster resource.

use rancher2_client::{Cluster, ClusterPatch, Collection, RancherApi};
use serde::{Deserialize, Serialize};

use super::{changed, id_string};
use crate::error::Result;
use crate::lifecycle::ResourceKind;
use crate::resolver::NaturalKey;
use crate::schema::{ChangeSet, FieldSchema, Presence, Schema};

/// Tracked state of a cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterState {
    /// Mirror of the remote identity.
    pub cluster_id: String,
    /// Globally unique name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Remote-assigned UUID.
    pub uuid: String,
}

/// Cluster kind. Names are globally unique.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterKind;

impl ResourceKind for ClusterKind {
    type Remote = Cluster;
    type State = ClusterState;

    const TYPE_NAME: &'static str = "rancher2_cluster";
    const KIND: &'static str = "cluster";
    const SCHEMA: Schema = Schema::new(&[
        FieldSchema::string("cluster_id", Presence::Computed, "ID of the cluster"),
        FieldSchema::string("name", Presence::Required, "Name of the cluster"),
        FieldSchema::string("description", Presence::Optional, "Description of the cluster"),
        FieldSchema::string("uuid", Presence::Computed, "UUID of the cluster"),
    ]);

    fn collection<'a>(&self, api: &'a dyn RancherApi) -> &'a dyn Collection<Cluster> {
        api.clusters()
    }

    fn natural_key(&self, desired: &ClusterState) -> Option<NaturalKey> {
        Some(NaturalKey::new("name", &desired.name))
    }

    fn create_payload(&self, desired: &ClusterState) -> Cluster {
        Cluster {
            name: desired.name.clone(),
            description: desired.description.clone(),
            ..Default::default()
        }
    }

    fn project(&self, remote: &Cluster, state: &mut ClusterState) -> Result<()> {
        state.cluster_id = id_string(remote.id.as_ref());
        state.name.clone_from(&remote.name);
        state.description.clone_from(&remote.description);
        state.uuid.clone_from(&remote.uuid);
        Ok(())
    }

    // The API rejects cluster updates that omit the name.
    fn build_patch(&self, desired: &ClusterState, changes: &ChangeSet) -> ClusterPatch {
        ClusterPatch {
            name: Some(desired.name.clone()),
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

    fn cluster(name: &str) -> ClusterState {
        ClusterState {
            name: name.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn prod_scenario() {
        let api = MemoryRancher::new();
        let lifecycle = Lifecycle::new(ClusterKind);

        let first = lifecycle.create(&api, &cluster("prod")).await.unwrap();
        let first_id = first.id.clone().unwrap();
        assert_eq!(
            api.clusters.records()[0].id.as_ref(),
            Some(&first_id)
        );

        let err = lifecycle.create(&api, &cluster("prod")).await.unwrap_err();
        assert!(matches!(err, ProviderError::AlreadyExists { ref id, .. } if *id == first_id));
        assert!(err.to_string().contains(first_id.as_str()));

        // Tracked state still says "staging" but the remote is already "prod".
        let stale = ClusterState {
            name: "staging".into(),
            ..first.state.clone()
        };
        let lists_before = api.clusters.list_calls();
        let commit = lifecycle
            .update(&api, &first_id, &stale, &cluster("prod"))
            .await
            .unwrap();
        assert_eq!(api.clusters.list_calls(), lists_before);
        assert_eq!(commit.tracked.state.name, "prod");
    }

    #[tokio::test]
    async fn description_only_update_resends_name() {
        let api = MemoryRancher::new();
        let lifecycle = Lifecycle::new(ClusterKind);
        let tracked = lifecycle.create(&api, &cluster("prod")).await.unwrap();

        let desired = ClusterState {
            description: "production".into(),
            ..cluster("prod")
        };
        lifecycle
            .update(&api, tracked.id.as_ref().unwrap(), &tracked.state, &desired)
            .await
            .unwrap();

        let patch = api.clusters.last_patch().unwrap();
        assert_eq!(patch["name"], "prod");
        assert_eq!(patch["description"], "production");
    }

    #[tokio::test]
    async fn rename_to_free_name() {
        let api = MemoryRancher::new();
        let lifecycle = Lifecycle::new(ClusterKind);
        let tracked = lifecycle.create(&api, &cluster("prod")).await.unwrap();

        let commit = lifecycle
            .update(
                &api,
                tracked.id.as_ref().unwrap(),
                &tracked.state,
                &cluster("production"),
            )
            .await
            .unwrap();

        assert_eq!(commit.committed, ["name"]);
        assert_eq!(api.clusters.records()[0].name, "production");
        assert_eq!(
            api.clusters.last_patch().unwrap(),
            serde_json::json!({ "name": "production" })
        );
    }
}

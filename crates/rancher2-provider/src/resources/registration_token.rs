//! Cluster registration token resource.
//!
//! The remote computes the token and the import commands; only the name can
//! be changed afterwards. There is no importer for this kind.

use rancher2_client::{
    ClusterRegistrationToken, ClusterRegistrationTokenPatch, Collection, RancherApi,
};
use serde::{Deserialize, Serialize};

use super::changed;
use crate::error::Result;
use crate::lifecycle::ResourceKind;
use crate::schema::{ChangeSet, DiffSuppress, FieldSchema, Presence, Schema};

/// Tracked state of a cluster registration token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationTokenState {
    /// Owning cluster. Changing it replaces the token.
    pub cluster_id: String,
    /// Token name; the remote picks one when left empty.
    pub name: String,
    /// Registration bearer token.
    pub token: String,
    /// Import command.
    pub command: String,
    /// Import command skipping TLS verification.
    pub insecure_command: String,
    /// Import manifest URL.
    pub manifest_url: String,
}

/// Cluster registration token kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistrationTokenKind;

impl ResourceKind for RegistrationTokenKind {
    type Remote = ClusterRegistrationToken;
    type State = RegistrationTokenState;

    const TYPE_NAME: &'static str = "rancher2_cluster_registration_token";
    const KIND: &'static str = "cluster registration token";
    const IMPORTABLE: bool = false;
    const SCHEMA: Schema = Schema::new(&[
        FieldSchema::string("cluster_id", Presence::Required, "ID of the cluster").force_new(),
        FieldSchema::string("name", Presence::Optional, "Name of the registration token")
            .suppress(DiffSuppress::EmptyNewValue),
        FieldSchema::string("token", Presence::Computed, "Registration token").sensitive(),
        FieldSchema::string("manifest_url", Presence::Computed, "URL of the import manifest"),
        FieldSchema::string("command", Presence::Computed, "Command importing the cluster"),
        FieldSchema::string(
            "insecure_command",
            Presence::Computed,
            "Command importing the cluster without TLS verification",
        ),
    ]);

    fn collection<'a>(
        &self,
        api: &'a dyn RancherApi,
    ) -> &'a dyn Collection<ClusterRegistrationToken> {
        api.cluster_registration_tokens()
    }

    fn create_payload(&self, desired: &RegistrationTokenState) -> ClusterRegistrationToken {
        ClusterRegistrationToken {
            cluster_id: desired.cluster_id.clone(),
            ..Default::default()
        }
    }

    fn project(
        &self,
        remote: &ClusterRegistrationToken,
        state: &mut RegistrationTokenState,
    ) -> Result<()> {
        if !remote.cluster_id.is_empty() {
            state.cluster_id.clone_from(&remote.cluster_id);
        }
        state.name.clone_from(&remote.name);
        state.token.clone_from(&remote.token);
        state.command.clone_from(&remote.command);
        state.insecure_command.clone_from(&remote.insecure_command);
        state.manifest_url.clone_from(&remote.manifest_url);
        Ok(())
    }

    fn build_patch(
        &self,
        desired: &RegistrationTokenState,
        changes: &ChangeSet,
    ) -> ClusterRegistrationTokenPatch {
        ClusterRegistrationTokenPatch {
            name: changed(changes, "name", &desired.name),
        }
    }
}

//! Generic resource lifecycle controller.
//!
//! A [`Lifecycle`] drives one [`ResourceKind`] through create, read, update,
//! delete, exists and import against a [`RancherApi`]. It holds no state of
//! its own: every call re-derives what it needs from the remote.
//!
//! # Update flow
//!
//! ```text
//!   diff(prior, desired) ──▶ force-new field? ──yes──▶ RequiresReplacement
//!            │                      │no
//!            │                      ▼
//!            │               fetch current ──absent──▶ NotFound
//!            │                      │
//!            │                      ▼
//!            │        natural key changed? ──remote already equal──▶ commit key
//!            │                      │differs
//!            │                      ▼
//!            │               resolve key ──match──▶ AlreadyExists
//!            │                      │none
//!            ▼                      ▼
//!      pending fields ──────▶ remote update ──▶ project into state
//! ```

use rancher2_client::{Collection, Lookup, RancherApi, RemoteResource};
use rancher2_core::ResourceId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ProviderError, Result};
use crate::resolver::{self, NaturalKey};
use crate::schema::{ChangeSet, Schema};

/// Capabilities and field mapping of one managed resource kind.
pub trait ResourceKind: Send + Sync + 'static {
    /// Remote record type.
    type Remote: RemoteResource;

    /// Tracked-state record. Field names match [`Self::SCHEMA`].
    type State: Serialize + DeserializeOwned + Clone + Default + std::fmt::Debug + Send + Sync;

    /// Registry name, e.g. `rancher2_cluster`.
    const TYPE_NAME: &'static str;

    /// Noun used in messages and logs.
    const KIND: &'static str;

    /// Field schema.
    const SCHEMA: Schema;

    /// Whether declared changes are applied remotely. When false, `update`
    /// succeeds without doing anything.
    const UPDATABLE: bool = true;

    /// Whether an existing remote object can be adopted.
    const IMPORTABLE: bool = true;

    /// The collection holding records of this kind.
    fn collection<'a>(&self, api: &'a dyn RancherApi) -> &'a dyn Collection<Self::Remote>;

    /// Key that must be unique before create or rename.
    ///
    /// `None` disables the uniqueness check. The key field must share its
    /// name between the wire format and tracked state.
    fn natural_key(&self, _desired: &Self::State) -> Option<NaturalKey> {
        None
    }

    /// Build the record sent on create.
    fn create_payload(&self, desired: &Self::State) -> Self::Remote;

    /// Copy write-only values from the sent payload into tracked state.
    fn remember_write_only(&self, _sent: &Self::Remote, _state: &mut Self::State) {}

    /// Project remote-owned and derived fields into tracked state.
    ///
    /// # Errors
    ///
    /// Returns an error if a derived field cannot be computed.
    fn project(&self, remote: &Self::Remote, state: &mut Self::State) -> Result<()>;

    /// Build the partial update for the declared changes.
    ///
    /// Kinds that are not [`Self::UPDATABLE`] keep the empty default.
    fn build_patch(
        &self,
        _desired: &Self::State,
        _changes: &ChangeSet,
    ) -> <Self::Remote as RemoteResource>::Patch {
        <<Self::Remote as RemoteResource>::Patch>::default()
    }
}

/// Tracked state together with the remote identity it mirrors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tracked<S> {
    /// Remote identity; `None` once the object is known to be gone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    /// Mirrored fields.
    #[serde(flatten)]
    pub state: S,
}

impl<S> Tracked<S> {
    /// Returns true if the tracked object exists.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.id.is_some()
    }
}

/// Result of a successful update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Commit<S> {
    /// State after the update.
    pub tracked: Tracked<S>,
    /// Fields now consistent with the declared configuration.
    pub committed: Vec<&'static str>,
}

/// What the host has to do to reach the declared configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Plan {
    /// Nothing is tracked yet.
    Create,
    /// Tracked state already matches.
    NoOp,
    /// Changes can be applied in place.
    Update {
        /// Declared changes.
        changes: ChangeSet,
    },
    /// Changes touch force-new fields.
    Replace {
        /// Fields forcing replacement.
        fields: Vec<&'static str>,
        /// All declared changes.
        changes: ChangeSet,
    },
}

/// Lifecycle controller for one resource kind.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle<K> {
    kind: K,
}

impl<K: ResourceKind> Lifecycle<K> {
    /// Create a controller for `kind`.
    #[must_use]
    pub const fn new(kind: K) -> Self {
        Self { kind }
    }

    /// The kind this controller drives.
    #[must_use]
    pub const fn kind(&self) -> &K {
        &self.kind
    }

    /// Create the remote object and return its tracked state.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::AlreadyExists`] naming the conflicting ID if
    /// the natural key is taken, [`ProviderError::MissingField`] for empty
    /// required fields, or any remote error.
    pub async fn create(
        &self,
        api: &dyn RancherApi,
        desired: &K::State,
    ) -> Result<Tracked<K::State>> {
        let snapshot = snapshot::<K>(desired)?;
        if let Some(field) = K::SCHEMA.missing_required(&snapshot).first().copied() {
            return Err(ProviderError::MissingField {
                kind: K::KIND,
                field,
            });
        }

        let collection = self.kind.collection(api);
        if let Some(key) = self.kind.natural_key(desired) {
            if let Some(existing) = resolver::find_by_natural_key(collection, &key).await? {
                return Err(conflict::<K>(&key, &existing));
            }
        }

        let payload = self.kind.create_payload(desired);
        let created = collection.create(&payload).await?;
        let id = created
            .id()
            .cloned()
            .ok_or(ProviderError::MissingIdentity { kind: K::KIND })?;

        let mut state = desired.clone();
        self.kind.remember_write_only(&payload, &mut state);
        self.kind.project(&created, &mut state)?;

        tracing::info!(kind = K::KIND, id = %id, "Created resource");
        Ok(Tracked {
            id: Some(id),
            state,
        })
    }

    /// Refresh tracked state from the remote.
    ///
    /// A missing object clears the tracked identity and is not an error.
    ///
    /// # Errors
    ///
    /// Returns any remote error other than not-found.
    pub async fn read(
        &self,
        api: &dyn RancherApi,
        id: &ResourceId,
        prior: &K::State,
    ) -> Result<Tracked<K::State>> {
        let Some(remote) = self.fetch(api, id).await? else {
            tracing::warn!(kind = K::KIND, id = %id, "Resource no longer exists, clearing identity");
            return Ok(Tracked {
                id: None,
                state: prior.clone(),
            });
        };

        let mut state = prior.clone();
        self.kind.project(&remote, &mut state)?;
        Ok(Tracked {
            id: Some(id.clone()),
            state,
        })
    }

    /// Apply the declared changes between `prior` and `desired`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::RequiresReplacement`] if a force-new field
    /// changed, [`ProviderError::NotFound`] if the object is gone,
    /// [`ProviderError::AlreadyExists`] on a rename collision, and
    /// [`ProviderError::PartialUpdate`] if the remote update fails after the
    /// natural key was already found consistent.
    pub async fn update(
        &self,
        api: &dyn RancherApi,
        id: &ResourceId,
        prior: &K::State,
        desired: &K::State,
    ) -> Result<Commit<K::State>> {
        if !K::UPDATABLE {
            tracing::debug!(kind = K::KIND, id = %id, "Kind has no update path");
            return Ok(Commit {
                tracked: Tracked {
                    id: Some(id.clone()),
                    state: prior.clone(),
                },
                committed: Vec::new(),
            });
        }

        let prior_snapshot = snapshot::<K>(prior)?;
        let desired_snapshot = snapshot::<K>(desired)?;
        let changes = K::SCHEMA.diff(&prior_snapshot, &desired_snapshot);
        let replace = changes.force_new_fields();
        if !replace.is_empty() {
            return Err(ProviderError::RequiresReplacement {
                kind: K::KIND,
                fields: replace,
            });
        }

        let current = self
            .fetch(api, id)
            .await?
            .ok_or_else(|| ProviderError::NotFound {
                kind: K::KIND,
                id: id.clone(),
            })?;
        let collection = self.kind.collection(api);

        let mut committed = Vec::new();
        let renamed_key = self
            .kind
            .natural_key(desired)
            .filter(|key| changes.contains(key.field()));
        if let Some(key) = renamed_key {
            if key.matches(&current) {
                tracing::debug!(
                    kind = K::KIND,
                    id = %id,
                    field = key.field(),
                    "Remote already carries the declared key"
                );
                committed.push(key.field());
            } else if let Some(existing) = resolver::find_by_natural_key(collection, &key)
                .await?
                .filter(|existing| existing.id() != Some(id))
            {
                return Err(conflict::<K>(&key, &existing));
            }
        }

        let pending = changes
            .fields()
            .into_iter()
            .any(|field| !committed.contains(&field));
        let updated = if pending {
            let patch = self.kind.build_patch(desired, &changes);
            tracing::debug!(kind = K::KIND, id = %id, patch = ?patch, "Sending update");
            match collection.update(id, &patch).await {
                Ok(updated) => updated,
                Err(err) if committed.is_empty() => return Err(err.into()),
                Err(err) => {
                    return Err(ProviderError::PartialUpdate {
                        committed,
                        source: Box::new(err.into()),
                    })
                }
            }
        } else {
            current
        };

        let mut state = merge::<K>(prior_snapshot, &desired_snapshot, &changes.fields())?;
        self.kind.project(&updated, &mut state)?;

        tracing::info!(
            kind = K::KIND,
            id = %id,
            fields = ?changes.fields(),
            remote_call = pending,
            "Updated resource"
        );
        Ok(Commit {
            tracked: Tracked {
                id: Some(id.clone()),
                state,
            },
            committed: changes.fields(),
        })
    }

    /// Delete the remote object. Deleting an absent object succeeds.
    ///
    /// # Errors
    ///
    /// Returns any remote error other than not-found.
    pub async fn delete(&self, api: &dyn RancherApi, id: &ResourceId) -> Result<()> {
        if self.fetch(api, id).await?.is_none() {
            tracing::debug!(kind = K::KIND, id = %id, "Already deleted");
            return Ok(());
        }

        match self.kind.collection(api).delete(id).await {
            Ok(()) => {
                tracing::info!(kind = K::KIND, id = %id, "Deleted resource");
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                tracing::debug!(kind = K::KIND, id = %id, "Deleted concurrently");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Returns false if and only if the remote reports the object absent.
    ///
    /// # Errors
    ///
    /// Returns any remote error other than not-found.
    pub async fn exists(&self, api: &dyn RancherApi, id: &ResourceId) -> Result<bool> {
        Ok(self.fetch(api, id).await?.is_some())
    }

    /// Adopt an existing remote object. The result is the complete imported
    /// set, which always holds exactly one record.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::ImportUnsupported`] for kinds without an
    /// importer and [`ProviderError::NotFound`] if the object does not exist.
    pub async fn import(
        &self,
        api: &dyn RancherApi,
        id: &ResourceId,
    ) -> Result<Vec<Tracked<K::State>>> {
        if !K::IMPORTABLE {
            return Err(ProviderError::ImportUnsupported { kind: K::KIND });
        }

        let tracked = self.read(api, id, &K::State::default()).await?;
        if !tracked.is_present() {
            return Err(ProviderError::NotFound {
                kind: K::KIND,
                id: id.clone(),
            });
        }
        Ok(vec![tracked])
    }

    /// Compute what reaching `desired` from `tracked` requires.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidState`] if either record cannot be
    /// serialized.
    pub fn plan(&self, tracked: &Tracked<K::State>, desired: &K::State) -> Result<Plan> {
        if !tracked.is_present() {
            return Ok(Plan::Create);
        }

        let changes = K::SCHEMA.diff(&snapshot::<K>(&tracked.state)?, &snapshot::<K>(desired)?);
        let fields = changes.force_new_fields();
        Ok(if !fields.is_empty() {
            Plan::Replace { fields, changes }
        } else if changes.is_empty() {
            Plan::NoOp
        } else {
            Plan::Update { changes }
        })
    }

    async fn fetch(&self, api: &dyn RancherApi, id: &ResourceId) -> Result<Option<K::Remote>> {
        match self.kind.collection(api).by_id(id).await {
            Ok(Lookup::Found(remote)) => Ok(Some(remote)),
            Ok(Lookup::NotFound) => Ok(None),
            Err(err) if err.is_not_found() => Ok(None),
            Ok(Lookup::Ambiguous(count)) => Err(ProviderError::Ambiguous {
                kind: K::KIND,
                criteria: format!("id={:?}", id.as_str()),
                count,
            }),
            Err(err) => Err(err.into()),
        }
    }
}

fn conflict<K: ResourceKind>(key: &NaturalKey, existing: &K::Remote) -> ProviderError {
    match existing.id() {
        Some(id) => ProviderError::AlreadyExists {
            kind: K::KIND,
            key: key.to_string(),
            id: id.clone(),
        },
        None => ProviderError::MissingIdentity { kind: K::KIND },
    }
}

pub(crate) fn snapshot<K: ResourceKind>(state: &K::State) -> Result<Map<String, Value>> {
    match serde_json::to_value(state) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(invalid_state::<K>("expected an object")),
        Err(err) => Err(invalid_state::<K>(err)),
    }
}

/// Overlay the changed fields of `desired` onto `prior`.
fn merge<K: ResourceKind>(
    mut prior: Map<String, Value>,
    desired: &Map<String, Value>,
    fields: &[&'static str],
) -> Result<K::State> {
    for field in fields {
        match desired.get(*field) {
            Some(value) => prior.insert((*field).to_string(), value.clone()),
            None => prior.remove(*field),
        };
    }
    serde_json::from_value(Value::Object(prior)).map_err(invalid_state::<K>)
}

pub(crate) fn invalid_state<K: ResourceKind>(message: impl ToString) -> ProviderError {
    ProviderError::InvalidState {
        kind: K::KIND,
        message: message.to_string(),
    }
}

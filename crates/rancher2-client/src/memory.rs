//! In-memory implementation of the client facade for tests.
//!
//! Records are kept as typed values; filtering and patching operate on their
//! JSON wire form so that behavior matches the HTTP API's exact-match filters.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rancher2_core::ResourceId;
use serde_json::Value;

use crate::error::{ClientError, Result};
use crate::filters::{FilterValue, Filters};
use crate::types::{Cluster, ClusterRegistrationToken, Project, RemoteResource, Token, User};
use crate::{Collection, Lookup, RancherApi};

type CreateHook<R> = fn(&mut R);

/// An in-memory collection with call counters and fault injection.
pub struct MemoryCollection<R> {
    records: Mutex<Vec<R>>,
    id_prefix: &'static str,
    next_id: AtomicU64,
    on_create: Option<CreateHook<R>>,
    injected: Mutex<Option<(u16, String)>>,
    injected_update: Mutex<Option<(u16, String)>>,
    last_patch: Mutex<Option<Value>>,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl<R: RemoteResource> MemoryCollection<R> {
    /// Create an empty collection assigning IDs with the given prefix.
    #[must_use]
    pub fn new(id_prefix: &'static str) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            id_prefix,
            next_id: AtomicU64::new(1),
            on_create: None,
            injected: Mutex::new(None),
            injected_update: Mutex::new(None),
            last_patch: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// Run `hook` on every created record to fill in remote-computed fields.
    #[must_use]
    pub fn with_create_hook(mut self, hook: CreateHook<R>) -> Self {
        self.on_create = Some(hook);
        self
    }

    /// Store a record as-is, assigning an identity if it has none.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] if the record cannot be stamped
    /// through its JSON form.
    pub fn insert(&self, record: R) -> Result<R> {
        let record = if record.id().is_some() {
            record
        } else {
            self.stamp(&record)?
        };
        self.records.lock().push(record.clone());
        Ok(record)
    }

    /// Snapshot of all stored records.
    #[must_use]
    pub fn records(&self) -> Vec<R> {
        self.records.lock().clone()
    }

    /// Remove a record behind the provider's back.
    pub fn remove(&self, id: &ResourceId) {
        self.records.lock().retain(|r| r.id() != Some(id));
    }

    /// Replace a stored record behind the provider's back.
    pub fn replace(&self, record: R) {
        let mut records = self.records.lock();
        if let Some(slot) = records.iter_mut().find(|r| r.id() == record.id()) {
            *slot = record;
        }
    }

    /// Make the next call fail with an API error carrying `status`.
    pub fn fail_next(&self, status: u16, message: impl Into<String>) {
        *self.injected.lock() = Some((status, message.into()));
    }

    /// Make the next update fail with an API error carrying `status`, leaving
    /// other calls untouched.
    pub fn fail_next_update(&self, status: u16, message: impl Into<String>) {
        *self.injected_update.lock() = Some((status, message.into()));
    }

    /// JSON body of the most recent update.
    #[must_use]
    pub fn last_patch(&self) -> Option<Value> {
        self.last_patch.lock().clone()
    }

    /// Number of list calls made.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of create calls made.
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of update calls made.
    #[must_use]
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Number of delete calls made.
    #[must_use]
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn take_injected(&self) -> Result<()> {
        Self::raise(self.injected.lock().take())
    }

    fn raise(injected: Option<(u16, String)>) -> Result<()> {
        match injected {
            Some((status, message)) => Err(ClientError::Api {
                collection: R::COLLECTION,
                status,
                code: None,
                message,
            }),
            None => Ok(()),
        }
    }

    /// Assign identity, UUID and creation time to a record.
    fn stamp(&self, record: &R) -> Result<R> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut value = to_value::<R>(record)?;
        if let Value::Object(fields) = &mut value {
            fields.insert("id".into(), Value::from(format!("{}{n}", self.id_prefix)));
            fields.insert("uuid".into(), Value::from(uuid::Uuid::new_v4().to_string()));
            fields.insert("created".into(), Value::from(Utc::now().to_rfc3339()));
        }
        from_value(value)
    }

    fn find(&self, id: &ResourceId) -> Option<R> {
        self.records
            .lock()
            .iter()
            .find(|r| r.id() == Some(id))
            .cloned()
    }

    fn not_found(id: &ResourceId) -> ClientError {
        ClientError::NotFound {
            collection: R::COLLECTION,
            id: id.clone(),
        }
    }
}

#[async_trait]
impl<R: RemoteResource> Collection<R> for MemoryCollection<R> {
    async fn list(&self, filters: &Filters) -> Result<Vec<R>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.take_injected()?;

        let records = self.records.lock().clone();
        let mut matches = Vec::new();
        for record in records {
            if matches_filters(&to_value::<R>(&record)?, filters) {
                matches.push(record);
            }
        }
        Ok(matches)
    }

    async fn create(&self, record: &R) -> Result<R> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.take_injected()?;

        let mut created = self.stamp(record)?;
        if let Some(hook) = self.on_create {
            hook(&mut created);
        }
        self.records.lock().push(created.clone());
        Ok(created)
    }

    async fn by_id(&self, id: &ResourceId) -> Result<Lookup<R>> {
        self.take_injected()?;
        Ok(self.find(id).map_or(Lookup::NotFound, Lookup::Found))
    }

    async fn update(&self, id: &ResourceId, patch: &R::Patch) -> Result<R> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.take_injected()?;
        Self::raise(self.injected_update.lock().take())?;

        let patch = serde_json::to_value(patch).map_err(|e| decode_error::<R>(&e))?;
        *self.last_patch.lock() = Some(patch.clone());

        let mut records = self.records.lock();
        let slot = records
            .iter_mut()
            .find(|r| r.id() == Some(id))
            .ok_or_else(|| Self::not_found(id))?;

        let mut value = to_value::<R>(slot)?;
        if let (Value::Object(fields), Value::Object(changes)) = (&mut value, patch) {
            fields.extend(changes);
        }
        *slot = from_value(value)?;
        Ok(slot.clone())
    }

    async fn delete(&self, id: &ResourceId) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.take_injected()?;

        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|r| r.id() != Some(id));
        if records.len() == before {
            return Err(Self::not_found(id));
        }
        Ok(())
    }
}

fn to_value<R: RemoteResource>(record: &R) -> Result<Value> {
    serde_json::to_value(record).map_err(|e| decode_error::<R>(&e))
}

fn from_value<R: RemoteResource>(value: Value) -> Result<R> {
    serde_json::from_value(value).map_err(|e| decode_error::<R>(&e))
}

fn decode_error<R: RemoteResource>(err: &serde_json::Error) -> ClientError {
    ClientError::Decode {
        collection: R::COLLECTION,
        message: err.to_string(),
    }
}

/// Exact-match filtering on the wire form; absent fields compare as their
/// zero value because the wire form omits empty strings and `false`.
fn matches_filters(record: &Value, filters: &Filters) -> bool {
    filters.iter().all(|(field, expected)| {
        let actual = record.get(field);
        match expected {
            FilterValue::Str(value) => actual.and_then(Value::as_str).unwrap_or("") == value,
            FilterValue::Bool(value) => actual.and_then(Value::as_bool).unwrap_or(false) == *value,
        }
    })
}

/// In-memory control plane with one collection per kind.
pub struct MemoryRancher {
    /// Clusters.
    pub clusters: MemoryCollection<Cluster>,
    /// Cluster registration tokens.
    pub cluster_registration_tokens: MemoryCollection<ClusterRegistrationToken>,
    /// Projects.
    pub projects: MemoryCollection<Project>,
    /// Personal API tokens.
    pub tokens: MemoryCollection<Token>,
    /// Users.
    pub users: MemoryCollection<User>,
}

impl MemoryRancher {
    /// Create an empty control plane that computes remote-owned fields the
    /// way the real API does.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clusters: MemoryCollection::new("c-"),
            cluster_registration_tokens: MemoryCollection::new("crt-")
                .with_create_hook(fill_registration_token),
            projects: MemoryCollection::new("p-"),
            tokens: MemoryCollection::new("token-").with_create_hook(fill_token),
            users: MemoryCollection::new("u-"),
        }
    }
}

impl Default for MemoryRancher {
    fn default() -> Self {
        Self::new()
    }
}

fn fill_registration_token(token: &mut ClusterRegistrationToken) {
    let secret = uuid::Uuid::new_v4().simple().to_string();
    let manifest_url = format!("https://rancher.test/v3/import/{secret}.yaml");
    if token.name.is_empty() {
        token.name = "default-token".to_string();
    }
    token.command = format!("kubectl apply -f {manifest_url}");
    token.insecure_command = format!("curl --insecure -sfL {manifest_url} | kubectl apply -f -");
    token.manifest_url = manifest_url;
    token.token = secret;
}

fn fill_token(token: &mut Token) {
    let id = token.id.as_ref().map(ToString::to_string).unwrap_or_default();
    token.token = format!("{id}:{}", uuid::Uuid::new_v4().simple());
    token.name = id;
}

impl RancherApi for MemoryRancher {
    fn clusters(&self) -> &dyn Collection<Cluster> {
        &self.clusters
    }

    fn cluster_registration_tokens(&self) -> &dyn Collection<ClusterRegistrationToken> {
        &self.cluster_registration_tokens
    }

    fn projects(&self) -> &dyn Collection<Project> {
        &self.projects
    }

    fn tokens(&self) -> &dyn Collection<Token> {
        &self.tokens
    }

    fn users(&self) -> &dyn Collection<User> {
        &self.users
    }
}

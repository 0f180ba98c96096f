//! User resource.
//!
//! Local accounts are keyed by `username`, which must be unique. Accounts
//! backed by an external directory carry a `directory_user` distinguished
//! name that maps to a `directory_user://` principal on the remote. A local
//! account declared without a password gets a synthesized one, kept in
//! tracked state because the remote never returns it.

use std::fmt;
use std::sync::Arc;

use rancher2_client::{Collection, RancherApi, User, UserPatch};
use rancher2_core::derived::{directory_principal, extract_directory_identity, synthesize_password};
use serde::{Deserialize, Serialize};

use super::{changed, id_string};
use crate::error::Result;
use crate::lifecycle::ResourceKind;
use crate::resolver::NaturalKey;
use crate::schema::{
    ChangeSet, DiffSuppress, FieldSchema, Presence, Schema, DIRECTORY_USER_FIELD,
};

/// Source of bootstrap passwords for local accounts.
pub trait PasswordGenerator: Send + Sync {
    /// Produce a fresh password.
    fn generate(&self) -> String;
}

/// Generates passwords from the operating system's CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsPasswordGenerator;

impl PasswordGenerator for OsPasswordGenerator {
    fn generate(&self) -> String {
        synthesize_password(&mut rand::rngs::OsRng)
    }
}

/// Tracked state of a user.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserState {
    /// Mirror of the remote identity.
    pub user_id: String,
    /// Remote-assigned UUID.
    pub uuid: String,
    /// Login name. Changing it replaces the user.
    pub username: String,
    /// Password, declared or synthesized on create.
    pub password: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Distinguished name of the backing directory account.
    pub directory_user: String,
}

impl fmt::Debug for UserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserState")
            .field("user_id", &self.user_id)
            .field("uuid", &self.uuid)
            .field("username", &self.username)
            .field("password", &(!self.password.is_empty()).then_some("<redacted>"))
            .field("name", &self.name)
            .field("description", &self.description)
            .field("directory_user", &self.directory_user)
            .finish()
    }
}

/// User kind.
#[derive(Clone)]
pub struct UserKind {
    passwords: Arc<dyn PasswordGenerator>,
}

impl UserKind {
    /// Create a user kind drawing bootstrap passwords from `passwords`.
    #[must_use]
    pub fn new(passwords: Arc<dyn PasswordGenerator>) -> Self {
        Self { passwords }
    }
}

impl Default for UserKind {
    fn default() -> Self {
        Self::new(Arc::new(OsPasswordGenerator))
    }
}

impl fmt::Debug for UserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserKind").finish_non_exhaustive()
    }
}

impl ResourceKind for UserKind {
    type Remote = User;
    type State = UserState;

    const TYPE_NAME: &'static str = "rancher2_user";
    const KIND: &'static str = "user";
    const SCHEMA: Schema = Schema::new(&[
        FieldSchema::string("user_id", Presence::Computed, "ID of the user"),
        FieldSchema::string("uuid", Presence::Computed, "UUID of the user"),
        FieldSchema::string("username", Presence::Optional, "Login name of the user").force_new(),
        FieldSchema::string(
            "password",
            Presence::Optional,
            "Password of the user, generated when omitted",
        )
        .sensitive()
        .suppress(DiffSuppress::ClearingKnownValue),
        FieldSchema::string("name", Presence::Optional, "Display name of the user")
            .suppress(DiffSuppress::EmptyWhenDirectoryIdentitySet),
        FieldSchema::string("description", Presence::Optional, "Description of the user"),
        FieldSchema::string(
            DIRECTORY_USER_FIELD,
            Presence::Optional,
            "Distinguished name of the directory account backing the user",
        ),
    ]);

    fn collection<'a>(&self, api: &'a dyn RancherApi) -> &'a dyn Collection<User> {
        api.users()
    }

    fn natural_key(&self, desired: &UserState) -> Option<NaturalKey> {
        (!desired.username.is_empty()).then(|| NaturalKey::new("username", &desired.username))
    }

    fn create_payload(&self, desired: &UserState) -> User {
        let password = if desired.username.is_empty() {
            String::new()
        } else if desired.password.is_empty() {
            self.passwords.generate()
        } else {
            desired.password.clone()
        };
        let principal_ids = if desired.directory_user.is_empty() {
            Vec::new()
        } else {
            vec![directory_principal(&desired.directory_user)]
        };

        User {
            username: desired.username.clone(),
            password,
            name: desired.name.clone(),
            description: desired.description.clone(),
            principal_ids,
            must_change_password: false,
            ..Default::default()
        }
    }

    fn remember_write_only(&self, sent: &User, state: &mut UserState) {
        state.password.clone_from(&sent.password);
    }

    fn project(&self, remote: &User, state: &mut UserState) -> Result<()> {
        state.user_id = id_string(remote.id.as_ref());
        state.uuid.clone_from(&remote.uuid);
        state.username.clone_from(&remote.username);
        state.name.clone_from(&remote.name);
        state.description.clone_from(&remote.description);
        state.directory_user = extract_directory_identity(&remote.principal_ids).to_string();
        Ok(())
    }

    fn build_patch(&self, desired: &UserState, changes: &ChangeSet) -> UserPatch {
        let principal_ids = changes.contains(DIRECTORY_USER_FIELD).then(|| {
            if desired.directory_user.is_empty() {
                Vec::new()
            } else {
                vec![directory_principal(&desired.directory_user)]
            }
        });

        UserPatch {
            password: changed(changes, "password", &desired.password),
            name: changed(changes, "name", &desired.name),
            description: changed(changes, "description", &desired.description),
            principal_ids,
        }
    }
}

//! Personal API token resource.
//!
//! Token material is only returned by the remote on creation, so the split
//! access and secret keys are kept from that response. Updates are accepted
//! and do nothing.

use rancher2_client::{Collection, RancherApi, Token};
use rancher2_core::derived::split_access_secret;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::lifecycle::ResourceKind;
use crate::schema::{FieldSchema, Presence, Schema};

/// Tracked state of an API token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenState {
    /// Owning user. Changing it replaces the token.
    pub user_id: String,
    /// Free-form description.
    pub description: String,
    /// Combined `<access-key>:<secret-key>`.
    pub token: String,
    /// Access key part of the token.
    pub access_key: String,
    /// Secret key part of the token.
    pub secret_key: String,
    /// Whether the token was derived from a login session.
    pub is_derived: bool,
    /// Whether the token has expired.
    pub expired: bool,
}

/// API token kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenKind;

impl ResourceKind for TokenKind {
    type Remote = Token;
    type State = TokenState;

    const TYPE_NAME: &'static str = "rancher2_token";
    const KIND: &'static str = "token";
    const UPDATABLE: bool = false;
    const SCHEMA: Schema = Schema::new(&[
        FieldSchema::string("user_id", Presence::Required, "ID of the user owning the token")
            .force_new(),
        FieldSchema::string("description", Presence::Optional, "Description of the token"),
        FieldSchema::string("token", Presence::Computed, "Combined access and secret key")
            .sensitive(),
        FieldSchema::string("access_key", Presence::Computed, "Access key of the token"),
        FieldSchema::string("secret_key", Presence::Computed, "Secret key of the token")
            .sensitive(),
        FieldSchema::bool("is_derived", Presence::Computed, "Whether the token is derived"),
        FieldSchema::bool("expired", Presence::Computed, "Whether the token has expired"),
    ]);

    fn collection<'a>(&self, api: &'a dyn RancherApi) -> &'a dyn Collection<Token> {
        api.tokens()
    }

    fn create_payload(&self, desired: &TokenState) -> Token {
        Token {
            user_id: desired.user_id.clone(),
            description: desired.description.clone(),
            ..Default::default()
        }
    }

    fn project(&self, remote: &Token, state: &mut TokenState) -> Result<()> {
        state.user_id.clone_from(&remote.user_id);
        state.description.clone_from(&remote.description);
        state.is_derived = remote.is_derived;
        state.expired = remote.expired;
        if !remote.token.is_empty() {
            let (access_key, secret_key) = split_access_secret(&remote.token)?;
            state.access_key = access_key.to_string();
            state.secret_key = secret_key.to_string();
            state.token.clone_from(&remote.token);
        }
        Ok(())
    }
}

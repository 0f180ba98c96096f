//! Token lookup by owner.

use async_trait::async_trait;
use rancher2_client::{Filters, RancherApi};
use rancher2_core::ResourceId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{decode, encode, exists_by_id, expect_one, DataSource};
use crate::error::{ProviderError, Result};
use crate::schema::{FieldSchema, Presence, Schema};

const KIND: &str = "token";

/// Lookup criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenQuery {
    /// Owning user.
    pub user_id: String,
    /// Restrict to expired or unexpired tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expired: Option<bool>,
}

impl TokenQuery {
    fn filters(&self) -> Result<Filters> {
        if self.user_id.is_empty() {
            return Err(ProviderError::MissingField {
                kind: KIND,
                field: "user_id",
            });
        }
        let filters = Filters::new().eq("userId", &self.user_id);
        Ok(match self.expired {
            Some(expired) => filters.eq("expired", expired),
            None => filters,
        })
    }
}

/// The matched token. Secret material is never part of a lookup result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenRecord {
    /// Identity of the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    /// Owning user.
    pub user_id: String,
    /// Token name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Whether the token was derived from a login session.
    pub is_derived: bool,
    /// Whether the token has expired.
    pub expired: bool,
    /// Remote-assigned UUID.
    pub uuid: String,
}

/// Looks up a single token of a user.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenLookup;

impl TokenLookup {
    /// Field schema.
    pub const SCHEMA: Schema = Schema::new(&[
        FieldSchema::string("user_id", Presence::Required, "ID of the user owning the token"),
        FieldSchema::bool("expired", Presence::Optional, "Match only expired or unexpired tokens"),
        FieldSchema::bool("is_derived", Presence::Computed, "Whether the token is derived"),
        FieldSchema::string("name", Presence::Computed, "Name of the token"),
        FieldSchema::string("description", Presence::Computed, "Description of the token"),
        FieldSchema::string("uuid", Presence::Computed, "UUID of the token"),
    ]);

    /// Resolve the token matching `query`.
    ///
    /// # Errors
    ///
    /// Fails unless exactly one token matches.
    pub async fn lookup(&self, api: &dyn RancherApi, query: &TokenQuery) -> Result<TokenRecord> {
        let filters = query.filters()?;
        let token = expect_one(KIND, &filters, api.tokens().list(&filters).await?)?;

        Ok(TokenRecord {
            id: token.id,
            user_id: token.user_id,
            name: token.name,
            description: token.description,
            is_derived: token.is_derived,
            expired: token.expired,
            uuid: token.uuid,
        })
    }
}

#[async_trait]
impl DataSource for TokenLookup {
    fn type_name(&self) -> &'static str {
        "rancher2_token"
    }

    fn schema(&self) -> Schema {
        Self::SCHEMA
    }

    async fn read(&self, api: &dyn RancherApi, query: Value) -> Result<Value> {
        let query: TokenQuery = decode(KIND, query)?;
        encode(KIND, &self.lookup(api, &query).await?)
    }

    async fn exists(&self, api: &dyn RancherApi, state: Value) -> Result<bool> {
        exists_by_id(KIND, api.tokens(), &state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rancher2_client::{MemoryRancher, Token};

    fn token(user_id: &str, expired: bool) -> Token {
        Token {
            user_id: user_id.into(),
            expired,
            ..Default::default()
        }
    }

    fn query(user_id: &str, expired: Option<bool>) -> TokenQuery {
        TokenQuery {
            user_id: user_id.into(),
            expired,
        }
    }

    #[tokio::test]
    async fn expired_flag_narrows_the_match() {
        let api = MemoryRancher::new();
        api.tokens.insert(token("u-1", true)).unwrap();
        let live = api
            .tokens
            .insert(Token {
                description: "CI".into(),
                ..token("u-1", false)
            })
            .unwrap();
        api.tokens.insert(token("u-2", false)).unwrap();

        let record = TokenLookup
            .lookup(&api, &query("u-1", Some(false)))
            .await
            .unwrap();
        assert_eq!(record.id, live.id);
        assert_eq!(record.description, "CI");
        assert!(!record.expired);
    }

    #[tokio::test]
    async fn several_matches_is_an_error() {
        let api = MemoryRancher::new();
        api.tokens.insert(token("u-1", true)).unwrap();
        api.tokens.insert(token("u-1", false)).unwrap();

        let err = TokenLookup.lookup(&api, &query("u-1", None)).await.unwrap_err();
        assert!(matches!(err, ProviderError::Ambiguous { count: 2, .. }));
    }

    #[tokio::test]
    async fn no_match_names_the_criteria() {
        let api = MemoryRancher::new();
        api.tokens.insert(token("u-1", false)).unwrap();

        let err = TokenLookup
            .lookup(&api, &query("u-1", Some(true)))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NoMatch { .. }));
        let message = err.to_string();
        assert!(message.contains("u-1"));
        assert!(message.contains("expired=true"));
    }

    #[tokio::test]
    async fn user_is_required() {
        let api = MemoryRancher::new();
        let err = TokenLookup.lookup(&api, &query("", None)).await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingField { field: "user_id", .. }));
    }

    #[tokio::test]
    async fn erased_read_omits_secret() {
        let api = MemoryRancher::new();
        api.tokens
            .insert(Token {
                token: "token-1:s3cret".into(),
                ..token("u-1", false)
            })
            .unwrap();

        let state = DataSource::read(&TokenLookup, &api, serde_json::json!({ "user_id": "u-1" }))
            .await
            .unwrap();
        assert!(!state.to_string().contains("s3cret"));
        assert!(DataSource::exists(&TokenLookup, &api, state).await.unwrap());
    }
}

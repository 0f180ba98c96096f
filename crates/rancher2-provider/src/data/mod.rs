//! Read-only lookups.
//!
//! Each lookup has a typed entry point (`lookup`) and an erased
//! [`DataSource`] implementation used by the provider registry. A lookup
//! expects exactly one match: zero matches and multiple matches are both
//! errors.

pub mod caller_identity;
pub mod project;
pub mod token;

pub use caller_identity::{CallerIdentity, CallerIdentityLookup};
pub use project::{ProjectLookup, ProjectQuery, ProjectRecord};
pub use token::{TokenLookup, TokenQuery, TokenRecord};

use async_trait::async_trait;
use rancher2_client::{Collection, Filters, Lookup, RancherApi, RemoteResource};
use rancher2_core::{CoreError, ResourceId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ProviderError, Result};
use crate::schema::Schema;

/// A read-only lookup, erased over JSON documents.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Registry name, e.g. `rancher2_project`.
    fn type_name(&self) -> &'static str;

    /// Field schema of the query and its result.
    fn schema(&self) -> Schema;

    /// Run the lookup described by `query` and return the matched record.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NoMatch`] or [`ProviderError::Ambiguous`]
    /// unless exactly one record matches, or any remote error.
    async fn read(&self, api: &dyn RancherApi, query: Value) -> Result<Value>;

    /// Check whether the record behind a previous lookup result still exists.
    ///
    /// # Errors
    ///
    /// Returns any remote error other than not-found.
    async fn exists(&self, api: &dyn RancherApi, state: Value) -> Result<bool>;
}

/// Require exactly one match.
pub(crate) fn expect_one<R>(kind: &'static str, filters: &Filters, matches: Vec<R>) -> Result<R> {
    match Lookup::from_matches(matches) {
        Lookup::Found(record) => Ok(record),
        Lookup::NotFound => Err(ProviderError::NoMatch {
            kind,
            criteria: filters.to_string(),
        }),
        Lookup::Ambiguous(count) => Err(ProviderError::Ambiguous {
            kind,
            criteria: filters.to_string(),
            count,
        }),
    }
}

/// Existence check by the `id` carried in a previous lookup result.
pub(crate) async fn exists_by_id<R: RemoteResource>(
    kind: &'static str,
    collection: &dyn Collection<R>,
    state: &Value,
) -> Result<bool> {
    let id = state
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or(ProviderError::MissingField { kind, field: "id" })?;
    let id = ResourceId::new(id).map_err(CoreError::from)?;

    match collection.by_id(&id).await {
        Ok(lookup) => Ok(!lookup.is_not_found()),
        Err(err) if err.is_not_found() => Ok(false),
        Err(err) => Err(err.into()),
    }
}

pub(crate) fn decode<Q: DeserializeOwned>(kind: &'static str, value: Value) -> Result<Q> {
    serde_json::from_value(value).map_err(|err| ProviderError::InvalidState {
        kind,
        message: err.to_string(),
    })
}

pub(crate) fn encode<S: Serialize>(kind: &'static str, record: &S) -> Result<Value> {
    serde_json::to_value(record).map_err(|err| ProviderError::InvalidState {
        kind,
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use rancher2_client::{MemoryRancher, Token};

    #[test]
    fn expect_one_classifies_matches() {
        let filters = Filters::new().eq("name", "billing");

        let err = expect_one::<u8>("project", &filters, vec![]).unwrap_err();
        assert!(matches!(err, ProviderError::NoMatch { .. }));
        assert!(err.to_string().contains("billing"));

        let err = expect_one("project", &filters, vec![1u8, 2]).unwrap_err();
        assert!(matches!(err, ProviderError::Ambiguous { count: 2, .. }));
        assert_eq!(err.category(), ErrorCategory::Ambiguous);

        assert_eq!(expect_one("project", &filters, vec![3u8]).unwrap(), 3);
    }

    #[tokio::test]
    async fn exists_by_id_tolerates_missing_records() {
        let api = MemoryRancher::new();
        let token = api.tokens.insert(Token::default()).unwrap();
        let state = serde_json::json!({ "id": token.id.unwrap().as_str() });

        assert!(exists_by_id("token", api.tokens(), &state).await.unwrap());
        api.tokens.remove(&ResourceId::new("token-1").unwrap());
        assert!(!exists_by_id("token", api.tokens(), &state).await.unwrap());

        api.tokens.fail_next(401, "Unauthorized");
        assert!(exists_by_id("token", api.tokens(), &state).await.is_err());
    }

    #[tokio::test]
    async fn exists_by_id_requires_identity() {
        let api = MemoryRancher::new();
        let err = exists_by_id("token", api.tokens(), &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::MissingField { field: "id", .. }));
    }
}

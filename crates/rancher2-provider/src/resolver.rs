//! Natural-key lookups used to pre-empt duplicate creation.

use std::fmt;

use rancher2_client::{Collection, Filters, RemoteResource};
use serde_json::Value;

/// A caller-meaningful key, optionally scoped to a parent, expressed with
/// wire field names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaturalKey {
    scope: Option<(&'static str, String)>,
    field: &'static str,
    value: String,
}

impl NaturalKey {
    /// A globally unique key.
    #[must_use]
    pub fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            scope: None,
            field,
            value: value.into(),
        }
    }

    /// Restrict uniqueness to records whose `field` equals `value`.
    #[must_use]
    pub fn within(mut self, field: &'static str, value: impl Into<String>) -> Self {
        self.scope = Some((field, value.into()));
        self
    }

    /// Wire name of the key field.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        self.field
    }

    /// Exact-match filters selecting records with this key.
    #[must_use]
    pub fn filters(&self) -> Filters {
        let filters = match &self.scope {
            Some((field, value)) => Filters::new().eq(*field, value),
            None => Filters::new(),
        };
        filters.eq(self.field, &self.value)
    }

    /// Returns true if `record` carries this key.
    #[must_use]
    pub fn matches<R: RemoteResource>(&self, record: &R) -> bool {
        let Ok(wire) = serde_json::to_value(record) else {
            return false;
        };
        let equals = |field: &str, expected: &str| {
            wire.get(field).and_then(Value::as_str).unwrap_or_default() == expected
        };
        self.scope
            .as_ref()
            .is_none_or(|(field, value)| equals(field, value))
            && equals(self.field, &self.value)
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.filters(), f)
    }
}

/// Return every record carrying `key`.
///
/// # Errors
///
/// Facade errors propagate unchanged.
pub async fn find_all<R: RemoteResource>(
    collection: &dyn Collection<R>,
    key: &NaturalKey,
) -> rancher2_client::Result<Vec<R>> {
    tracing::debug!(collection = R::COLLECTION, key = %key, "Resolving natural key");
    collection.list(&key.filters()).await
}

/// Return the first record carrying `key`, if any.
///
/// # Errors
///
/// Facade errors propagate unchanged.
pub async fn find_by_natural_key<R: RemoteResource>(
    collection: &dyn Collection<R>,
    key: &NaturalKey,
) -> rancher2_client::Result<Option<R>> {
    Ok(find_all(collection, key).await?.into_iter().next())
}

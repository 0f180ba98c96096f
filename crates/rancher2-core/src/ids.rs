//! Remote resource identifiers.
//!
//! The control plane assigns every record an opaque string identity (for
//! example `c-7xk2p` for a cluster or `c-7xk2p:p-4n8bz` for a project). The
//! provider never interprets these IDs; it only requires them to be non-empty.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An opaque, non-empty identifier assigned by the remote control plane.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    /// Create a new `ResourceId`.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::Empty`] if the value is empty or only whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(IdError::Empty);
        }
        Ok(Self(value))
    }

    /// Return the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identifier and return the owned string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({})", self.0)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ResourceId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ResourceId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ResourceId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The identifier was empty.
    #[error("identifier must not be empty")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_id_roundtrip() {
        let id = ResourceId::new("c-7xk2p").unwrap();
        let parsed: ResourceId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert_eq!(id, "c-7xk2p");
    }

    #[test]
    fn resource_id_rejects_empty() {
        assert_eq!(ResourceId::new(""), Err(IdError::Empty));
        assert_eq!(ResourceId::new("   "), Err(IdError::Empty));
    }

    #[test]
    fn resource_id_keeps_composite_form() {
        let id = ResourceId::new("c-7xk2p:p-4n8bz").unwrap();
        assert_eq!(id.as_str(), "c-7xk2p:p-4n8bz");
    }

    #[test]
    fn resource_id_serde_json() {
        let id = ResourceId::new("u-mo773").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"u-mo773\"");
        let parsed: ResourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn resource_id_serde_rejects_empty() {
        let result: Result<ResourceId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }
}

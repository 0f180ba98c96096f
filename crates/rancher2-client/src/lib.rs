//! Typed client facade for the Rancher v3 management API.
//!
//! This crate exposes one [`Collection`] per managed resource kind, each with
//! the same five operations (`list`, `create`, `by_id`, `update`, `delete`).
//! Callers never inspect error types to detect missing objects: `by_id` decides
//! that once, at the boundary, and returns a [`Lookup`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐
//! │   Provider       │────▶│   RancherApi     │
//! │   (lifecycle)    │     │   (trait)        │
//! └──────────────────┘     └────────┬─────────┘
//!                                   │
//!                  ┌────────────────┴────────────────┐
//!                  ▼                                 ▼
//!         ┌──────────────────┐              ┌──────────────────┐
//!         │ HttpRancherClient│              │  MemoryRancher   │
//!         │ (reqwest)        │              │  (test-utils)    │
//!         └────────┬─────────┘              └──────────────────┘
//!                  │ HTTPS
//!         ┌────────▼─────────┐
//!         │  Rancher /v3     │
//!         └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use rancher2_client::{ClientConfig, Filters, HttpRancherClient, RancherApi};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new("https://rancher.example.com/", "token-abc12", "s3cr3t");
//! let client = HttpRancherClient::new(&config)?;
//!
//! let clusters = client
//!     .clusters()
//!     .list(&Filters::new().eq("name", "prod"))
//!     .await?;
//! println!("found {} cluster(s)", clusters.len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod filters;
pub mod http;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod types;

use async_trait::async_trait;
use rancher2_core::ResourceId;

pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use filters::{FilterValue, Filters};
pub use http::{HttpCollection, HttpRancherClient};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::{MemoryCollection, MemoryRancher};
pub use types::{
    Cluster, ClusterPatch, ClusterRegistrationToken, ClusterRegistrationTokenPatch, Project,
    ProjectPatch, RemoteResource, Token, TokenPatch, User, UserPatch,
};

/// Outcome of a lookup that is expected to match at most one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<R> {
    /// Exactly one record matched.
    Found(R),
    /// The remote reported the record as absent.
    NotFound,
    /// More than one record matched; carries the match count.
    Ambiguous(usize),
}

impl<R> Lookup<R> {
    /// Classify the result of a list query that should match at most once.
    #[must_use]
    pub fn from_matches(mut matches: Vec<R>) -> Self {
        if matches.len() > 1 {
            return Self::Ambiguous(matches.len());
        }
        matches.pop().map_or(Self::NotFound, Self::Found)
    }

    /// Return the record if exactly one matched.
    #[must_use]
    pub fn found(self) -> Option<R> {
        match self {
            Self::Found(record) => Some(record),
            Self::NotFound | Self::Ambiguous(_) => None,
        }
    }

    /// Returns true if the remote reported the record as absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// The five remote operations available for one resource kind.
#[async_trait]
pub trait Collection<R: RemoteResource>: Send + Sync {
    /// List records matching every filter exactly.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the remote rejects it.
    async fn list(&self, filters: &Filters) -> Result<Vec<R>>;

    /// Create a record and return it as stored by the remote.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the remote rejects it.
    async fn create(&self, record: &R) -> Result<R>;

    /// Fetch a record by its identity.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than the record being absent.
    async fn by_id(&self, id: &ResourceId) -> Result<Lookup<R>>;

    /// Apply a partial update and return the updated record.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the remote rejects it.
    async fn update(&self, id: &ResourceId, patch: &R::Patch) -> Result<R>;

    /// Delete a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the remote rejects it.
    async fn delete(&self, id: &ResourceId) -> Result<()>;
}

/// Handle to a remote control plane, exposing one collection per kind.
///
/// Implementations must be safe to share between concurrently reconciled
/// resource instances.
pub trait RancherApi: Send + Sync {
    /// Cluster collection.
    fn clusters(&self) -> &dyn Collection<Cluster>;

    /// Cluster registration token collection.
    fn cluster_registration_tokens(&self) -> &dyn Collection<ClusterRegistrationToken>;

    /// Project collection.
    fn projects(&self) -> &dyn Collection<Project>;

    /// Personal API token collection.
    fn tokens(&self) -> &dyn Collection<Token>;

    /// User collection.
    fn users(&self) -> &dyn Collection<User>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_from_matches() {
        assert_eq!(Lookup::<u8>::from_matches(vec![]), Lookup::NotFound);
        assert_eq!(Lookup::from_matches(vec![7u8]), Lookup::Found(7));
        assert_eq!(Lookup::from_matches(vec![1u8, 2]), Lookup::Ambiguous(2));
    }

    #[test]
    fn lookup_found_only_for_single_match() {
        assert_eq!(Lookup::Found(3u8).found(), Some(3));
        assert_eq!(Lookup::<u8>::NotFound.found(), None);
        assert_eq!(Lookup::<u8>::Ambiguous(4).found(), None);
        assert!(Lookup::<u8>::NotFound.is_not_found());
    }
}

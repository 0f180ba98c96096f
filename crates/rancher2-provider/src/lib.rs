//! Infrastructure-as-code provider for Rancher v3 resources.
//!
//! This crate turns declared configuration into remote objects and keeps
//! tracked state in sync with the control plane:
//!
//! - **Lifecycle**: one generic controller ([`Lifecycle`]) drives every
//!   resource kind through create, read, update, delete, exists and import
//! - **Resources**: clusters, projects, cluster registration tokens, API
//!   tokens and users, each supplying a schema and its field mapping
//! - **Lookups**: read-only queries for the calling user, a project by name
//!   and a token by owner
//! - **Resolver**: natural-key lookups that prevent duplicate creation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Host (CLI / engine)                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ JSON
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Provider                           │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │  Lifecycle  │ │   Lookups   │ │  Schema / Diff      │    │
//! │  │  per kind   │ │             │ │  suppression        │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                    ┌───────────────────┐
//!                    │    RancherApi     │
//!                    └───────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use rancher2_provider::{ClusterKind, ClusterState, Lifecycle, Provider, ProviderConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProviderConfig {
//!     api_url: Some("https://rancher.example.com".into()),
//!     token: Some("token-abc12:s3cr3t".into()),
//!     ..Default::default()
//! };
//! let provider = Provider::connect(&config)?;
//!
//! let clusters = Lifecycle::new(ClusterKind);
//! let desired = ClusterState {
//!     name: "prod".into(),
//!     ..Default::default()
//! };
//! let tracked = clusters.create(provider.api(), &desired).await?;
//! println!("created cluster {:?}", tracked.id);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod data;
pub mod error;
pub mod lifecycle;
pub mod provider;
pub mod resolver;
pub mod resources;
pub mod schema;

pub use config::{ConfigError, ProviderConfig};
pub use data::DataSource;
pub use error::{ErrorCategory, ProviderError, Result};
pub use lifecycle::{Commit, Lifecycle, Plan, ResourceKind, Tracked};
pub use provider::{ManagedResource, Provider, ProviderSchema};
pub use resolver::NaturalKey;
pub use resources::{
    ClusterKind, ClusterState, OsPasswordGenerator, PasswordGenerator, ProjectKind,
    ProjectState, RegistrationTokenKind, RegistrationTokenState, TokenKind, TokenState,
    UserKind, UserState,
};
pub use schema::{ChangeSet, Schema};

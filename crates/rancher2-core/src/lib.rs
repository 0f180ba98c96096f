//! Core types and utilities for the rancher2 provider.
//!
//! This crate provides the foundational pieces shared by the client facade and
//! the provider:
//!
//! - **Identifiers**: [`ResourceId`], the opaque remote-assigned identity
//! - **Derived fields**: pure helpers that compute attributes the remote does not
//!   store directly (directory identities, access/secret splitting, bootstrap
//!   passwords)
//! - **Error types**: [`CoreError`]
//!
//! # Example
//!
//! ```
//! use rancher2_core::{derived, ResourceId};
//!
//! let id = ResourceId::new("c-7xk2p").unwrap();
//! assert_eq!(id.as_str(), "c-7xk2p");
//!
//! let principals = ["local://u-1", "directory_user://CN=Jane,OU=People"];
//! assert_eq!(derived::extract_directory_identity(&principals), "CN=Jane,OU=People");
//!
//! let (access, secret) = derived::split_access_secret("token-abc123:secret-xyz789").unwrap();
//! assert_eq!((access, secret), ("token-abc123", "secret-xyz789"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod derived;
pub mod error;
pub mod ids;

pub use error::{CoreError, Result};
pub use ids::{IdError, ResourceId};

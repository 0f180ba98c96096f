//! Provider connection configuration.
//!
//! Explicit parameters take precedence. When none of the connection
//! parameters are supplied, the Rancher CLI configuration file at
//! `~/.rancher/cli2.json` is read instead.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rancher2_client::ClientConfig;
use serde::Deserialize;
use thiserror::Error;

/// Location of the CLI configuration file relative to the home directory.
pub const CLI_CONFIG_PATH: &str = ".rancher/cli2.json";

/// Errors raised while resolving connection parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more required parameters are absent.
    #[error("required configuration parameter(s): {}", .0.join(","))]
    Missing(Vec<&'static str>),

    /// The combined token has no `:` separator.
    #[error("token must have the form <access-key>:<secret-key>")]
    InvalidToken,

    /// The home directory could not be determined.
    #[error("unable to determine the home directory of the current user")]
    HomeDir,

    /// The CLI configuration file could not be read.
    #[error("unable to read Rancher CLI configuration file {}: {source}", .path.display())]
    ReadCliFile {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The CLI configuration file is not valid JSON of the expected shape.
    #[error("unable to parse Rancher CLI configuration file {}: {source}", .path.display())]
    ParseCliFile {
        /// File path.
        path: PathBuf,
        /// Underlying decode error.
        source: serde_json::Error,
    },

    /// The selected server is not present in the CLI configuration file.
    #[error("unable to find server with ID '{server}' in Rancher CLI configuration file {}", .path.display())]
    UnknownServer {
        /// Requested server name.
        server: String,
        /// File path.
        path: PathBuf,
    },
}

/// Inputs accepted by the provider.
///
/// Empty strings are treated the same as absent values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// URL of the Rancher server.
    pub api_url: Option<String>,
    /// API access key.
    pub access_key: Option<String>,
    /// API secret key.
    pub secret_key: Option<String>,
    /// Combined `<access-key>:<secret-key>`, overriding the separate keys.
    pub token: Option<String>,
    /// PEM-encoded CA certificate.
    pub cacert: Option<String>,
    /// Server entry to use from the CLI configuration file.
    pub current_server: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CliFile {
    #[serde(rename = "Servers", default)]
    servers: HashMap<String, CliServer>,
    #[serde(rename = "CurrentServer", default)]
    current_server: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliServer {
    #[serde(default)]
    access_key: String,
    #[serde(default)]
    secret_key: String,
    #[serde(rename = "cacert", default)]
    ca_cert: String,
    #[serde(default)]
    url: String,
}

impl ProviderConfig {
    /// Resolve the connection parameters into a client configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming every missing parameter, or describing
    /// why the CLI configuration file could not be used.
    pub fn resolve(&self) -> Result<ClientConfig, ConfigError> {
        if self.is_unset() {
            let home = dirs::home_dir().ok_or(ConfigError::HomeDir)?;
            return self.resolve_from_file(&home.join(CLI_CONFIG_PATH));
        }
        self.resolve_explicit()
    }

    /// Returns true if no connection parameter was supplied.
    ///
    /// `current_server` only selects an entry of the CLI file and does not
    /// count as a connection parameter.
    #[must_use]
    pub fn is_unset(&self) -> bool {
        [
            &self.api_url,
            &self.access_key,
            &self.secret_key,
            &self.token,
            &self.cacert,
        ]
        .into_iter()
        .all(|value| non_empty(value.as_deref()).is_none())
    }

    fn resolve_explicit(&self) -> Result<ClientConfig, ConfigError> {
        let (mut access_key, mut secret_key) = (
            non_empty(self.access_key.as_deref()).unwrap_or_default(),
            non_empty(self.secret_key.as_deref()).unwrap_or_default(),
        );
        if let Some(token) = non_empty(self.token.as_deref()) {
            let (access, secret) = token.split_once(':').ok_or(ConfigError::InvalidToken)?;
            access_key = access;
            secret_key = secret;
        }
        let api_url = non_empty(self.api_url.as_deref()).unwrap_or_default();

        let missing: Vec<&'static str> = [
            ("api_url", api_url),
            ("access_key", access_key),
            ("secret_key", secret_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let config = ClientConfig::new(api_url, access_key, secret_key);
        Ok(match non_empty(self.cacert.as_deref()) {
            Some(pem) => config.with_ca_cert(pem),
            None => config,
        })
    }

    fn resolve_from_file(&self, path: &Path) -> Result<ClientConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadCliFile {
            path: path.to_path_buf(),
            source,
        })?;
        let file: CliFile =
            serde_json::from_str(&contents).map_err(|source| ConfigError::ParseCliFile {
                path: path.to_path_buf(),
                source,
            })?;

        let server_name = non_empty(self.current_server.as_deref())
            .map_or_else(|| file.current_server.clone(), ToString::to_string);
        let server = file
            .servers
            .get(&server_name)
            .ok_or_else(|| ConfigError::UnknownServer {
                server: server_name.clone(),
                path: path.to_path_buf(),
            })?;

        tracing::debug!(
            server = %server_name,
            path = %path.display(),
            "Using Rancher CLI configuration"
        );

        Ok(ClientConfig::new(&server.url, &server.access_key, &server.secret_key)
            .with_ca_cert(server.ca_cert.as_str()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

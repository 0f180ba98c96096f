//! Client connection settings.

use std::fmt;
use std::time::Duration;

/// API version path segment appended to the base URL.
pub const API_VERSION_SUFFIX: &str = "/v3";

/// Connection settings for a [`crate::HttpRancherClient`].
#[derive(Clone)]
pub struct ClientConfig {
    /// Normalized API base URL, always ending in `/v3`.
    pub url: String,
    /// API access key.
    pub access_key: String,
    /// API secret key.
    pub secret_key: String,
    /// PEM-encoded CA certificate to trust in addition to the system roots.
    pub ca_cert: Option<String>,
    /// Overall request timeout.
    pub timeout: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration, normalizing the base URL.
    #[must_use]
    pub fn new(
        url: impl AsRef<str>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            url: normalize_url(url.as_ref()),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            ca_cert: None,
            timeout: Self::default_timeout(),
            connect_timeout: Self::default_connect_timeout(),
        }
    }

    /// Trust the given PEM-encoded CA certificate. Empty input is ignored.
    #[must_use]
    pub fn with_ca_cert(mut self, pem: impl Into<String>) -> Self {
        let pem = pem.into();
        self.ca_cert = (!pem.trim().is_empty()).then_some(pem);
        self
    }

    const fn default_timeout() -> Duration {
        Duration::from_secs(30)
    }

    const fn default_connect_timeout() -> Duration {
        Duration::from_secs(5)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("ca_cert", &self.ca_cert.as_ref().map(|_| "<pem>"))
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Strip one trailing slash and append the API version segment if absent.
#[must_use]
pub fn normalize_url(url: &str) -> String {
    let url = url.strip_suffix('/').unwrap_or(url);
    if url.ends_with(API_VERSION_SUFFIX) {
        url.to_string()
    } else {
        format!("{url}{API_VERSION_SUFFIX}")
    }
}

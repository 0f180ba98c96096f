//! HTTP implementation of the client facade.
//!
//! Every collection lives under `{base_url}/{collection}`, records under
//! `{base_url}/{collection}/{id}`. Requests authenticate with HTTP basic auth
//! using the access key and secret key.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use rancher2_core::ResourceId;
use reqwest::{Certificate, StatusCode, Url};
use serde::Deserialize;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::filters::Filters;
use crate::types::{
    Cluster, ClusterRegistrationToken, ListResponse, Project, RemoteResource, Token, User,
};
use crate::{Collection, Lookup, RancherApi};

/// Shared connection state for all collections of one client.
#[derive(Debug)]
struct Transport {
    client: reqwest::Client,
    base_url: String,
    access_key: String,
    secret_key: String,
}

/// Error body returned by the API.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP-backed collection for one resource kind.
pub struct HttpCollection<R> {
    transport: Arc<Transport>,
    _record: PhantomData<fn() -> R>,
}

impl<R: RemoteResource> HttpCollection<R> {
    fn new(transport: Arc<Transport>) -> Self {
        Self {
            transport,
            _record: PhantomData,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.transport.base_url, R::COLLECTION)
    }

    fn item_url(&self, id: &ResourceId) -> String {
        format!("{}/{}", self.collection_url(), id)
    }

    fn request(&self, method: reqwest::Method, url: impl reqwest::IntoUrl) -> reqwest::RequestBuilder {
        self.transport
            .client
            .request(method, url)
            .basic_auth(&self.transport.access_key, Some(&self.transport.secret_key))
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        response.json::<T>().await.map_err(|e| ClientError::Decode {
            collection: R::COLLECTION,
            message: e.to_string(),
        })
    }

    /// Convert a non-success response into an API error.
    async fn api_error(response: reqwest::Response) -> ClientError {
        let status = response.status();
        let body = response.json::<ErrorResponse>().await.ok();
        let (code, message) = match body {
            Some(ErrorResponse { code, message }) => (
                code,
                message.unwrap_or_else(|| format!("API returned status {status}")),
            ),
            None => (None, format!("API returned status {status}")),
        };

        tracing::debug!(
            collection = R::COLLECTION,
            status = %status,
            error = %message,
            "Remote API rejected request"
        );

        ClientError::Api {
            collection: R::COLLECTION,
            status: status.as_u16(),
            code,
            message,
        }
    }
}

#[async_trait]
impl<R: RemoteResource> Collection<R> for HttpCollection<R> {
    async fn list(&self, filters: &Filters) -> Result<Vec<R>> {
        let mut url = Url::parse(&self.collection_url())
            .map_err(|e| ClientError::InvalidConfig(format!("invalid API URL: {e}")))?;
        if !filters.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (field, value) in filters.iter() {
                pairs.append_pair(field, &value.to_query_value());
            }
        }

        let response = self.request(reqwest::Method::GET, url).send().await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let list: ListResponse<R> = Self::decode(response).await?;
        tracing::debug!(
            collection = R::COLLECTION,
            filters = %filters,
            matches = list.data.len(),
            "Listed records"
        );
        Ok(list.data)
    }

    async fn create(&self, record: &R) -> Result<R> {
        let response = self
            .request(reqwest::Method::POST, self.collection_url())
            .json(record)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Self::decode(response).await
    }

    async fn by_id(&self, id: &ResourceId) -> Result<Lookup<R>> {
        let response = self
            .request(reqwest::Method::GET, self.item_url(id))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                tracing::debug!(collection = R::COLLECTION, id = %id, "Record not found");
                Ok(Lookup::NotFound)
            }
            status if status.is_success() => Self::decode(response).await.map(Lookup::Found),
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn update(&self, id: &ResourceId, patch: &R::Patch) -> Result<R> {
        let response = self
            .request(reqwest::Method::PUT, self.item_url(id))
            .json(patch)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ClientError::NotFound {
                collection: R::COLLECTION,
                id: id.clone(),
            }),
            status if status.is_success() => Self::decode(response).await,
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn delete(&self, id: &ResourceId) -> Result<()> {
        let response = self
            .request(reqwest::Method::DELETE, self.item_url(id))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ClientError::NotFound {
                collection: R::COLLECTION,
                id: id.clone(),
            }),
            status if status.is_success() => Ok(()),
            _ => Err(Self::api_error(response).await),
        }
    }
}

/// HTTP client for the Rancher v3 management API.
pub struct HttpRancherClient {
    base_url: String,
    clusters: HttpCollection<Cluster>,
    cluster_registration_tokens: HttpCollection<ClusterRegistrationToken>,
    projects: HttpCollection<Project>,
    tokens: HttpCollection<Token>,
    users: HttpCollection<User>,
}

impl HttpRancherClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidConfig` if the CA certificate cannot be
    /// parsed or the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout);

        if let Some(pem) = &config.ca_cert {
            let cert = Certificate::from_pem(pem.as_bytes())
                .map_err(|e| ClientError::InvalidConfig(format!("invalid CA certificate: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder
            .build()
            .map_err(|e| ClientError::InvalidConfig(format!("failed to create HTTP client: {e}")))?;

        Ok(Self::with_client(client, config))
    }

    /// Create a new client with a custom reqwest client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, config: &ClientConfig) -> Self {
        let transport = Arc::new(Transport {
            client,
            base_url: config.url.clone(),
            access_key: config.access_key.clone(),
            secret_key: config.secret_key.clone(),
        });

        Self {
            base_url: config.url.clone(),
            clusters: HttpCollection::new(Arc::clone(&transport)),
            cluster_registration_tokens: HttpCollection::new(Arc::clone(&transport)),
            projects: HttpCollection::new(Arc::clone(&transport)),
            tokens: HttpCollection::new(Arc::clone(&transport)),
            users: HttpCollection::new(transport),
        }
    }

    /// Get the normalized API base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl RancherApi for HttpRancherClient {
    fn clusters(&self) -> &dyn Collection<Cluster> {
        &self.clusters
    }

    fn cluster_registration_tokens(&self) -> &dyn Collection<ClusterRegistrationToken> {
        &self.cluster_registration_tokens
    }

    fn projects(&self) -> &dyn Collection<Project> {
        &self.projects
    }

    fn tokens(&self) -> &dyn Collection<Token> {
        &self.tokens
    }

    fn users(&self) -> &dyn Collection<User> {
        &self.users
    }
}

//! Client construction: credentials, endpoint mode and overrides.

use std::sync::{Mutex, PoisonError};

use reqwest::ClientBuilder as HttpClientBuilder;
use snafu::ResultExt;
use url::Url;

use crate::backend::auth::{AuthConfig, ServiceAccountKey, ServiceAccountTokenSource};
use crate::backend::studio::{StudioBackend, DEFAULT_BASE_URL};
use crate::backend::vertex::{VertexAuth, VertexBackend};
use crate::client::Client;
use crate::common::Model;
use crate::error::{
    Error, InvalidApiKeySnafu, MissingCredentialsSnafu, PerformRequestNewSnafu,
    ServiceAccountKeyParseSnafu,
};

/// Process-wide default base-URL override, read once per builder.
/// Last writer wins; only writes made before a builder is constructed
/// can affect that builder.
static BASE_URL_OVERRIDE: Mutex<Option<Url>> = Mutex::new(None);

/// Override the default base URL for clients built after this call.
///
/// An explicit [`ClientBuilder::with_base_url`] always wins over this
/// process-wide default.
pub fn set_default_base_url(url: Url) {
    let mut cell = BASE_URL_OVERRIDE.lock().unwrap_or_else(PoisonError::into_inner);
    *cell = Some(url);
}

fn default_base_url_override() -> Option<Url> {
    BASE_URL_OVERRIDE.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

#[derive(Debug, Clone)]
struct VertexConfig {
    project_id: String,
    location: String,
}

/// A builder for [`Client`].
///
/// The endpoint mode is fixed at build time: configuring a cloud
/// project/location routes every request to the regional endpoint,
/// otherwise the direct API-key endpoint is used.
pub struct ClientBuilder {
    model: Model,
    client_builder: HttpClientBuilder,
    base_url: Option<Url>,
    api_key: Option<String>,
    service_account_json: Option<String>,
    vertex: Option<VertexConfig>,
    vertex_bearer_token: Option<String>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with the given API key.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            model: Model::default(),
            client_builder: HttpClientBuilder::default(),
            base_url: default_base_url_override(),
            api_key: Some(key.into()),
            service_account_json: None,
            vertex: None,
            vertex_bearer_token: None,
        }
    }

    /// Creates a new `ClientBuilder` without an API key, for service
    /// account or cloud project/location authentication.
    pub fn new_without_api_key() -> Self {
        Self {
            model: Model::default(),
            client_builder: HttpClientBuilder::default(),
            base_url: default_base_url_override(),
            api_key: None,
            service_account_json: None,
            vertex: None,
            vertex_bearer_token: None,
        }
    }

    /// Sets the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the model for the client.
    pub fn with_model(mut self, model: impl Into<Model>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets a custom `reqwest::ClientBuilder`.
    pub fn with_http_client(mut self, client_builder: HttpClientBuilder) -> Self {
        self.client_builder = client_builder;
        self
    }

    /// Sets a custom base URL for the API.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Configures authentication from a service account JSON key.
    pub fn with_service_account_json(mut self, service_account_json: &str) -> Result<Self, Error> {
        // Validate eagerly so a bad key fails here, not on first request.
        serde_json::from_str::<ServiceAccountKey>(service_account_json)
            .context(ServiceAccountKeyParseSnafu)?;
        self.service_account_json = Some(service_account_json.to_string());
        Ok(self)
    }

    /// Routes requests to the cloud project/location endpoint.
    pub fn with_project(
        mut self,
        project_id: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        self.vertex = Some(VertexConfig {
            project_id: project_id.into(),
            location: location.into(),
        });
        self
    }

    /// Supplies a pre-fetched bearer token for the cloud mode.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.vertex_bearer_token = Some(token.into());
        self
    }

    /// Builds the [`Client`].
    pub fn build(self) -> Result<Client, Error> {
        // Cloud project/location mode wins when configured.
        if let Some(config) = self.vertex {
            let auth = if let Some(token) = self.vertex_bearer_token {
                VertexAuth::BearerToken(token)
            } else if let Some(json) = &self.service_account_json {
                let key: ServiceAccountKey =
                    serde_json::from_str(json).context(ServiceAccountKeyParseSnafu)?;
                VertexAuth::ServiceAccount(ServiceAccountTokenSource::new(key))
            } else {
                return MissingCredentialsSnafu.fail();
            };

            let http_client = self.client_builder.build().context(PerformRequestNewSnafu)?;
            let backend = VertexBackend::new(
                http_client,
                self.base_url,
                config.project_id,
                config.location,
                auth,
                self.model,
            )?;
            return Ok(Client::new(Box::new(backend)));
        }

        // Otherwise, the direct API-key endpoint.
        let auth = if let Some(key) = self.api_key {
            AuthConfig::ApiKey(key)
        } else if let Some(json) = self.service_account_json {
            let key: ServiceAccountKey =
                serde_json::from_str(&json).context(ServiceAccountKeyParseSnafu)?;
            AuthConfig::ServiceAccount(ServiceAccountTokenSource::new(key))
        } else {
            return MissingCredentialsSnafu.fail();
        };

        let mut headers = reqwest::header::HeaderMap::new();
        if let AuthConfig::ApiKey(ref key) = auth {
            headers.insert(
                "x-goog-api-key",
                reqwest::header::HeaderValue::from_str(key).context(InvalidApiKeySnafu)?,
            );
        }

        let http_client = self
            .client_builder
            .default_headers(headers)
            .build()
            .context(PerformRequestNewSnafu)?;

        let backend = StudioBackend::new_with_client(
            http_client,
            self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.clone()),
            self.model,
            auth,
        );

        Ok(Client::new(Box::new(backend)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_without_credentials_fails() {
        let result = ClientBuilder::new_without_api_key().build();
        assert!(matches!(result, Err(Error::MissingCredentials)));
    }

    #[test]
    fn vertex_mode_requires_auth() {
        let result = ClientBuilder::new_without_api_key()
            .with_project("proj", "us-central1")
            .build();
        assert!(matches!(result, Err(Error::MissingCredentials)));
    }

    #[test]
    fn api_key_mode_builds() {
        let client = ClientBuilder::new("test-key").with_model("models/test").build().unwrap();
        assert_eq!(client.model().as_str(), "models/test");
    }
}

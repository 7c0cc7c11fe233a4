//! Service-account authentication: a cached access token obtained by
//! exchanging a signed JWT assertion.

use std::sync::Arc;

use jsonwebtoken::{EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use tokio::sync::Mutex;

use crate::backend::check_response;
use crate::error::{DecodeResponseSnafu, Error, ServiceAccountJwtSnafu};

/// How the direct-endpoint backend authenticates its requests.
#[derive(Debug, Clone)]
pub(crate) enum AuthConfig {
    ApiKey(String),
    ServiceAccount(ServiceAccountTokenSource),
}

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    token_uri: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: i64,
}

/// Token source caching the access token until shortly before expiry.
#[derive(Debug, Clone)]
pub(crate) struct ServiceAccountTokenSource {
    key: ServiceAccountKey,
    scopes: Vec<String>,
    cached: Arc<Mutex<Option<CachedToken>>>,
}

impl ServiceAccountTokenSource {
    pub(crate) fn new(key: ServiceAccountKey) -> Self {
        Self {
            key,
            scopes: vec!["https://www.googleapis.com/auth/cloud-platform".to_string()],
            cached: Arc::new(Mutex::new(None)),
        }
    }

    pub(crate) async fn access_token(&self, http_client: &Client) -> Result<String, Error> {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        {
            let cache = self.cached.lock().await;
            if let Some(token) = cache.as_ref() {
                // 60s slack so a token never expires mid-request
                if token.expires_at.saturating_sub(60) > now {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let jwt = self.build_jwt(now)?;
        let token = self.fetch_token(http_client, jwt).await?;

        let mut cache = self.cached.lock().await;
        let access_token = token.access_token.clone();
        *cache = Some(token);
        Ok(access_token)
    }

    fn build_jwt(&self, now: i64) -> Result<String, Error> {
        #[derive(Serialize)]
        struct Claims<'a> {
            iss: &'a str,
            scope: &'a str,
            aud: &'a str,
            iat: i64,
            exp: i64,
        }

        let exp = now + 3600;
        let scope = self.scopes.join(" ");
        let claims = Claims {
            iss: &self.key.client_email,
            scope: &scope,
            aud: &self.key.token_uri,
            iat: now,
            exp,
        };
        let encoding_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .context(ServiceAccountJwtSnafu)?;
        jsonwebtoken::encode(
            &Header::new(jsonwebtoken::Algorithm::RS256),
            &claims,
            &encoding_key,
        )
        .context(ServiceAccountJwtSnafu)
    }

    async fn fetch_token(&self, http_client: &Client, jwt: String) -> Result<CachedToken, Error> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: i64,
        }

        let url = &self.key.token_uri;
        let response = http_client
            .post(url)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", &jwt),
            ])
            .send()
            .await
            .map_err(|e| Error::ServiceAccountToken { source: e, url: url.clone() })?;

        let response = check_response(response).await?;
        let token: TokenResponse = response.json().await.context(DecodeResponseSnafu)?;
        let expires_at = time::OffsetDateTime::now_utc().unix_timestamp() + token.expires_in;
        Ok(CachedToken { access_token: token.access_token, expires_at })
    }
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use thiserror::Error;

use crate::credential::IdentityToken;
use crate::retry::Retryable;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity token request is not configured: {0} is not set")]
    NotConfigured(&'static str),

    #[error("identity token request URL is invalid: {0}")]
    InvalidUrl(String),

    #[error("identity provider returned status {0}")]
    Status(u16),

    #[error("identity provider response has no token")]
    MissingValue,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl Retryable for IdentityError {}

/// Source of workload identity tokens
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn id_token(&self, audience: &str) -> Result<IdentityToken, IdentityError>;
}

#[derive(Deserialize)]
struct IdTokenResponse {
    value: Option<String>,
}

/// Identity provider backed by the CI runner's token request endpoint
pub struct ActionsIdentityProvider {
    http_client: Client,
    request_url: Option<String>,
    request_token: Option<String>,
}

impl ActionsIdentityProvider {
    pub fn new(
        request_url: Option<String>,
        request_token: Option<String>,
    ) -> Result<Self, IdentityError> {
        let http_client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            http_client,
            request_url,
            request_token,
        })
    }
}

#[async_trait]
impl IdentityProvider for ActionsIdentityProvider {
    async fn id_token(&self, audience: &str) -> Result<IdentityToken, IdentityError> {
        let request_url = self
            .request_url
            .as_deref()
            .ok_or(IdentityError::NotConfigured("ACTIONS_ID_TOKEN_REQUEST_URL"))?;
        let request_token = self
            .request_token
            .as_deref()
            .ok_or(IdentityError::NotConfigured("ACTIONS_ID_TOKEN_REQUEST_TOKEN"))?;

        let mut url =
            Url::parse(request_url).map_err(|e| IdentityError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut().append_pair("audience", audience);

        let response = self
            .http_client
            .get(url)
            .bearer_auth(request_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::Status(status.as_u16()));
        }

        let body: IdTokenResponse = response.json().await?;
        match body.value {
            Some(value) if !value.is_empty() => Ok(IdentityToken::new(value)),
            _ => Err(IdentityError::MissingValue),
        }
    }
}

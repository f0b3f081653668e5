use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::credential::{
    CredentialError, CredentialOutcome, IdentityProvider, IdentityToken, PermissionOverlay,
    ScopedCredential, WORKFLOW_NOT_ON_DEFAULT_BRANCH,
};
use crate::retry::RetryPolicy;

pub const DEFAULT_EXCHANGE_URL: &str =
    "https://api.anthropic.com/api/github/github-app-token-exchange";
pub const ID_TOKEN_AUDIENCE: &str = "claude-code-github-action";

#[derive(Deserialize, Default)]
struct ExchangeErrorBody {
    error: Option<ExchangeErrorDetail>,
}

#[derive(Deserialize)]
struct ExchangeErrorDetail {
    message: Option<String>,
    details: Option<ExchangeErrorCode>,
}

#[derive(Deserialize)]
struct ExchangeErrorCode {
    error_code: Option<String>,
}

#[derive(Deserialize)]
struct ExchangeResponse {
    token: Option<String>,
    app_token: Option<String>,
}

/// Resolves the scoped credential for a run
pub struct CredentialBroker {
    identity: Box<dyn IdentityProvider>,
    http_client: Client,
    exchange_url: String,
    audience: String,
    overlay: Option<PermissionOverlay>,
    override_credential: Option<ScopedCredential>,
    retry: RetryPolicy,
}

impl CredentialBroker {
    pub fn new(identity: Box<dyn IdentityProvider>) -> Result<Self, CredentialError> {
        let http_client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            identity,
            http_client,
            exchange_url: DEFAULT_EXCHANGE_URL.to_string(),
            audience: ID_TOKEN_AUDIENCE.to_string(),
            overlay: None,
            override_credential: None,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_exchange_url(mut self, url: impl Into<String>) -> Self {
        self.exchange_url = url.into();
        self
    }

    pub fn with_overlay(mut self, overlay: Option<PermissionOverlay>) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn with_override(mut self, credential: Option<ScopedCredential>) -> Self {
        self.override_credential = credential;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn has_override(&self) -> bool {
        self.override_credential.is_some()
    }

    /// Produce the run's credential.
    ///
    /// An override credential is returned verbatim without any network
    /// call. Otherwise an identity token is fetched and exchanged, each step
    /// retried under the broker's policy. A workflow-validation rejection is
    /// reported as [`CredentialOutcome::Skipped`], never as an error.
    pub async fn resolve(&self) -> Result<CredentialOutcome, CredentialError> {
        if let Some(credential) = &self.override_credential {
            info!("using provided override credential");
            return Ok(CredentialOutcome::Issued(credential.clone()));
        }

        info!("requesting identity token");
        let identity_token = self
            .retry
            .retry("identity token", || self.identity.id_token(&self.audience))
            .await
            .map_err(CredentialError::IdentityUnavailable)?;
        info!("identity token obtained");

        info!("exchanging identity token for scoped credential");
        let exchanged = self
            .retry
            .retry("credential exchange", || self.exchange(&identity_token))
            .await;

        match exchanged {
            Ok(credential) => {
                info!("scoped credential obtained");
                Ok(CredentialOutcome::Issued(credential))
            }
            Err(CredentialError::WorkflowValidation(reason)) => {
                warn!(%reason, "skipping run due to workflow validation");
                info!(
                    "this is expected when the workflow is being added to a repository or changed \
                     in a pull request; it will run once the change is merged to the default branch"
                );
                Ok(CredentialOutcome::Skipped { reason })
            }
            Err(err) => Err(err),
        }
    }

    /// Single exchange attempt against the token-exchange endpoint
    pub async fn exchange(
        &self,
        identity_token: &IdentityToken,
    ) -> Result<ScopedCredential, CredentialError> {
        let mut request = self
            .http_client
            .post(&self.exchange_url)
            .bearer_auth(identity_token.expose());
        if let Some(overlay) = &self.overlay {
            request = request.json(&json!({ "permissions": overlay }));
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body: ExchangeErrorBody = serde_json::from_str(&text).unwrap_or_default();
            let detail = body.error;
            let code = detail
                .as_ref()
                .and_then(|d| d.details.as_ref())
                .and_then(|d| d.error_code.as_deref());

            if code == Some(WORKFLOW_NOT_ON_DEFAULT_BRANCH) {
                let message = detail
                    .and_then(|d| d.message)
                    .unwrap_or_else(|| "Workflow validation failed".to_string());
                return Err(CredentialError::WorkflowValidation(message));
            }

            let message = detail
                .and_then(|d| d.message)
                .unwrap_or_else(|| "Unknown error".to_string());
            error!(status = status.as_u16(), %message, "credential exchange failed");
            return Err(CredentialError::ExchangeRejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: ExchangeResponse = response
            .json()
            .await
            .map_err(|e| CredentialError::InvalidResponse(e.to_string()))?;

        [body.token, body.app_token]
            .into_iter()
            .flatten()
            .find(|token| !token.is_empty())
            .map(ScopedCredential::new)
            .ok_or(CredentialError::CredentialMissing)
    }
}

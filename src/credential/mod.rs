//! Workload-identity exchange for a scoped repository credential.
//!
//! ```text
//! override credential? ──yes──> Issued(override)
//!        │ no
//!        v
//! identity token (retried) ──> exchange (retried) ──> Issued(credential)
//!                                    │
//!                                    └── workflow not on default branch ──> Skipped
//! ```

pub mod broker;
pub mod identity;
pub mod permissions;

pub use broker::{CredentialBroker, DEFAULT_EXCHANGE_URL, ID_TOKEN_AUDIENCE};
pub use identity::{ActionsIdentityProvider, IdentityError, IdentityProvider};
pub use permissions::{PermissionOverlay, parse_additional_permissions};

use std::fmt;

use thiserror::Error;

use crate::retry::Retryable;

/// Error code the exchange endpoint uses when the workflow file cannot be
/// matched against the repository's default branch
pub const WORKFLOW_NOT_ON_DEFAULT_BRANCH: &str = "workflow_not_found_on_default_branch";

/// Short-lived workload identity token. Never logged.
#[derive(Clone)]
pub struct IdentityToken(String);

impl IdentityToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdentityToken(***)")
    }
}

/// Repository access credential for the rest of the run. Never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct ScopedCredential(String);

impl ScopedCredential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ScopedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ScopedCredential(***)")
    }
}

/// Result of resolving the run's credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialOutcome {
    Issued(ScopedCredential),
    /// The run should end cleanly without doing any work
    Skipped { reason: String },
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error(
        "Could not fetch an OIDC token. Did you remember to add `id-token: write` \
         to your workflow permissions? ({0})"
    )]
    IdentityUnavailable(#[source] IdentityError),

    #[error("Workflow validation failed: {0}")]
    WorkflowValidation(String),

    #[error("App token exchange failed ({status}): {message}")]
    ExchangeRejected { status: u16, message: String },

    #[error("App token not found in response")]
    CredentialMissing,

    #[error("Invalid exchange response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl Retryable for CredentialError {
    fn skips_retry(&self) -> bool {
        matches!(self, CredentialError::WorkflowValidation(_))
    }
}

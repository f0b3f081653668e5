use async_trait::async_trait;
use thiserror::Error;

use crate::auth::{AccountType, PermissionLevel};
use crate::credential::ScopedCredential;

/// Errors that can occur while talking to the repository host
#[derive(Debug, Error)]
pub enum HostError {
    #[error("{operation} failed with status {status}: {message}")]
    Api {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("Credential cannot be sent as an HTTP header")]
    InvalidCredential,

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// A conversation comment on an issue or pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: u64,
    pub author: String,
    pub body: String,
    pub created_at: String,
}

/// Head branch of a pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestHead {
    pub branch: String,
    pub open: bool,
}

/// Operations the run needs from the repository host.
///
/// Every call is scoped to the repository the run was triggered in.
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    async fn account_type(&self, login: &str) -> Result<AccountType, HostError>;

    async fn permission_level(&self, login: &str) -> Result<PermissionLevel, HostError>;

    async fn default_branch(&self) -> Result<String, HostError>;

    async fn pull_request_head(&self, number: u64) -> Result<PullRequestHead, HostError>;

    async fn list_issue_comments(&self, number: u64) -> Result<Vec<Comment>, HostError>;

    /// Create a comment and return its id
    async fn create_comment(&self, number: u64, body: &str) -> Result<u64, HostError>;

    async fn update_comment(&self, comment_id: u64, body: &str) -> Result<(), HostError>;
}

/// Builds a [`RepositoryHost`] once the run's credential is known
pub trait HostConnector: Send + Sync {
    fn connect(&self, credential: &ScopedCredential) -> Result<Box<dyn RepositoryHost>, HostError>;
}

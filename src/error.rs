use std::io;
use thiserror::Error;

// Module-level errors aggregated by RunError
use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::credential::CredentialError;
use crate::github::HostError;
use crate::orchestrator::OutputError;
use crate::security::ValidationError;
use crate::workload::WorkloadError;

/// Errors that can occur while running git
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Empty git command")]
    EmptyCommand,

    /// Only the subcommand is recorded; arguments may carry credentials
    #[error("git {subcommand} failed with exit code {code}: {detail}")]
    CommandFailed {
        subcommand: String,
        code: i32,
        detail: String,
    },

    #[error("Failed to execute git: {0}")]
    Spawn(#[from] io::Error),
}

/// Classification of a run failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network or identity errors, surfaced after retries are exhausted
    RetryableTransient,
    AuthorizationDenied,
    /// A path or branch name broke a validation rule
    ValidationRejected,
    ExecutionFailure,
    Configuration,
}

/// Top-level run error that wraps all module-specific errors
///
/// Every module error converts via `From`, so phases can use `?` and the
/// orchestrator still sees the original error for attribution.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("GitHub API error: {0}")]
    Host(#[from] HostError),

    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error(transparent)]
    Workload(#[from] WorkloadError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to write outputs: {0}")]
    Output(#[from] OutputError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RunError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunError::Auth(AuthError::Lookup { .. }) => ErrorKind::RetryableTransient,
            RunError::Auth(_) => ErrorKind::AuthorizationDenied,
            RunError::Credential(_) | RunError::Host(_) => ErrorKind::RetryableTransient,
            RunError::Validation(_) => ErrorKind::ValidationRejected,
            RunError::Git(_) | RunError::Workload(_) | RunError::Io(_) => {
                ErrorKind::ExecutionFailure
            }
            RunError::Config(_) | RunError::Output(_) => ErrorKind::Configuration,
        }
    }
}

/// Result type for git operations
pub type GitResult<T> = std::result::Result<T, GitError>;

/// Result type for run-level operations
pub type RunResult<T> = std::result::Result<T, RunError>;

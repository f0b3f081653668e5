pub mod branch;
pub mod path;

pub use branch::{ValidatedBranchName, validate_branch_name};
pub use path::{ValidatedPath, validate_path_within_repo};

use std::path::PathBuf;
use thiserror::Error;

/// Characters git reserves inside ref names.
///
/// Kept in one place so the branch validator and its error messages agree.
pub const GIT_RESERVED_CHARS: &[char] = &['~', '^', ':', '?', '*', '[', ']', '\\'];

/// Shell sequences that must never reach a command line, checked in order.
pub const SHELL_METACHARACTERS: &[&str] = &["$(", "`", ";", "&&", "||", "|", "<", ">"];

/// Rejections produced by the path and branch-name validators
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Repository root does not exist: {}", root.display())]
    RootNotFound {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path '{}' resolves outside the repository root {}", path.display(), root.display())]
    PathEscapesRoot { path: PathBuf, root: PathBuf },

    #[error("Parent directory of '{}' does not exist", path.display())]
    ParentNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to resolve '{}': {source}", path.display())]
    Resolution {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid branch name: {reason}")]
    InvalidBranchName { name: String, reason: String },
}

impl ValidationError {
    pub(crate) fn branch(name: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidBranchName {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

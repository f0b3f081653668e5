pub mod client;
pub mod host;

pub use client::{GithubClient, GithubConnector};
pub use host::{Comment, HostConnector, HostError, PullRequestHead, RepositoryHost};

use std::fmt;

/// `owner/name` pair identifying a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn parse(raw: &str) -> Option<Self> {
        let (owner, name) = raw.trim().split_once('/')?;
        let owner = owner.trim();
        let name = name.trim();
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_ref_parse() {
        let repo = RepoRef::parse("octo/widgets").unwrap();
        assert_eq!(repo.owner, "octo");
        assert_eq!(repo.name, "widgets");
        assert_eq!(repo.to_string(), "octo/widgets");
    }

    #[test]
    fn test_repo_ref_rejects_malformed() {
        assert!(RepoRef::parse("octo").is_none());
        assert!(RepoRef::parse("/widgets").is_none());
        assert!(RepoRef::parse("octo/").is_none());
        assert!(RepoRef::parse("a/b/c").is_none());
    }
}

use chrono::{DateTime, Utc};
use tracing::info;

use crate::credential::ScopedCredential;
use crate::error::RunResult;
use crate::git::GitExecutor;
use crate::github::RepoRef;
use crate::security::{ValidatedBranchName, ValidationError, validate_branch_name};

pub const GIT_USER_NAME: &str = "claude[bot]";
pub const GIT_USER_EMAIL: &str = "209825114+claude[bot]@users.noreply.github.com";

/// Name for a fresh branch working on an issue or closed pull request.
///
/// `kind` is `issue` or `pr`. The result is lower-cased and validated.
pub fn new_branch_name(
    prefix: &str,
    kind: &str,
    number: u64,
    now: DateTime<Utc>,
) -> Result<ValidatedBranchName, ValidationError> {
    let name = format!("{prefix}{kind}-{number}-{}", now.format("%Y%m%d-%H%M")).to_lowercase();
    validate_branch_name(&name)
}

/// Create `branch` from the tip of `base` on origin and check it out
pub fn checkout_new_branch(
    git: &GitExecutor,
    branch: &ValidatedBranchName,
    base: &ValidatedBranchName,
) -> RunResult<()> {
    info!(branch = %branch, base = %base, "creating branch");
    git.run(&["fetch", "origin", base.as_str(), "--depth=1"])?;
    let start_point = format!("origin/{base}");
    git.run(&["checkout", "-b", branch.as_str(), &start_point])?;
    Ok(())
}

/// Fetch an existing remote branch and check it out
pub fn checkout_existing_branch(git: &GitExecutor, branch: &ValidatedBranchName) -> RunResult<()> {
    info!(branch = %branch, "checking out existing branch");
    git.run(&["fetch", "origin", branch.as_str(), "--depth=20"])?;
    git.run(&["checkout", branch.as_str()])?;
    Ok(())
}

/// Set the commit identity and point origin at an authenticated URL
pub fn configure_auth(
    git: &GitExecutor,
    credential: &ScopedCredential,
    server_url: &str,
    repo: &RepoRef,
) -> RunResult<()> {
    git.run(&["config", "user.name", GIT_USER_NAME])?;
    git.run(&["config", "user.email", GIT_USER_EMAIL])?;

    let remote = authenticated_remote_url(credential, server_url, repo);
    git.run(&["remote", "set-url", "origin", &remote])?;
    info!("git authentication configured");
    Ok(())
}

fn authenticated_remote_url(
    credential: &ScopedCredential,
    server_url: &str,
    repo: &RepoRef,
) -> String {
    let host = server_url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    format!(
        "https://x-access-token:{}@{host}/{repo}.git",
        credential.expose()
    )
}

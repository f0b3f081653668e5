use std::fmt;

use tracing::{info, warn};

use crate::auth::{AuthError, BOT_SUFFIX};
use crate::github::RepositoryHost;

/// Repository permission level for a collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionLevel {
    Admin,
    Maintain,
    Write,
    Triage,
    Read,
    None,
    Other(String),
}

impl PermissionLevel {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "admin" => PermissionLevel::Admin,
            "maintain" => PermissionLevel::Maintain,
            "write" => PermissionLevel::Write,
            "triage" => PermissionLevel::Triage,
            "read" => PermissionLevel::Read,
            "none" => PermissionLevel::None,
            other => PermissionLevel::Other(other.to_string()),
        }
    }

    pub fn can_write(&self) -> bool {
        matches!(
            self,
            PermissionLevel::Admin | PermissionLevel::Maintain | PermissionLevel::Write
        )
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PermissionLevel::Admin => "admin",
            PermissionLevel::Maintain => "maintain",
            PermissionLevel::Write => "write",
            PermissionLevel::Triage => "triage",
            PermissionLevel::Read => "read",
            PermissionLevel::None => "none",
            PermissionLevel::Other(raw) => raw,
        };
        f.write_str(s)
    }
}

/// How the write gate was satisfied without a permission lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bypass {
    OverrideCredential,
    AllowListed,
    GithubApp,
}

/// Decide whether the gate can be passed before asking the host.
pub fn permission_bypass(
    actor: &str,
    allowed_non_write_users: &str,
    override_credential_provided: bool,
) -> Option<Bypass> {
    if override_credential_provided {
        return Some(Bypass::OverrideCredential);
    }

    let allowed = allowed_non_write_users.trim();
    if allowed == "*"
        || allowed
            .split(',')
            .map(str::trim)
            .any(|user| !user.is_empty() && user == actor)
    {
        return Some(Bypass::AllowListed);
    }

    if actor.ends_with(BOT_SUFFIX) {
        return Some(Bypass::GithubApp);
    }

    None
}

/// Pure write gate: succeeds on a bypass or a write-capable `level`
pub fn check_write_permission(
    actor: &str,
    level: Option<&PermissionLevel>,
    allowed_non_write_users: &str,
    override_credential_provided: bool,
) -> Result<(), AuthError> {
    if permission_bypass(actor, allowed_non_write_users, override_credential_provided).is_some() {
        return Ok(());
    }

    match level {
        Some(level) if level.can_write() => Ok(()),
        Some(level) => Err(AuthError::InsufficientPermission {
            actor: actor.to_string(),
            level: level.to_string(),
        }),
        None => Err(AuthError::InsufficientPermission {
            actor: actor.to_string(),
            level: "unknown".to_string(),
        }),
    }
}

/// Apply the write gate, querying the host only when no bypass applies
pub async fn ensure_write_permission(
    host: &dyn RepositoryHost,
    actor: &str,
    allowed_non_write_users: &str,
    override_credential_provided: bool,
) -> Result<(), AuthError> {
    info!(actor, "checking permissions");

    match permission_bypass(actor, allowed_non_write_users, override_credential_provided) {
        Some(Bypass::OverrideCredential) => {
            info!(actor, "override credential provided, skipping permission check");
            return Ok(());
        }
        Some(Bypass::AllowListed) => {
            warn!(
                actor,
                "SECURITY WARNING: bypassing write permission check due to allowed_non_write_users; \
                 this should only be used for workflows with very limited permissions"
            );
            return Ok(());
        }
        Some(Bypass::GithubApp) => {
            info!(actor, "actor is a GitHub App");
            return Ok(());
        }
        None => {}
    }

    let level = host
        .permission_level(actor)
        .await
        .map_err(|source| AuthError::Lookup {
            actor: actor.to_string(),
            source,
        })?;
    info!(actor, %level, "permission level retrieved");

    let result = check_write_permission(actor, Some(&level), allowed_non_write_users, false);
    if result.is_err() {
        warn!(actor, %level, "actor has insufficient permissions");
    }
    result
}

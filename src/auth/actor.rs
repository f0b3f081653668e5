use std::fmt;

use tracing::info;

use crate::auth::{AuthError, BOT_SUFFIX};
use crate::github::RepositoryHost;

/// Account type as reported by the repository host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountType {
    User,
    Bot,
    Organization,
    Other(String),
}

impl AccountType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "User" => AccountType::User,
            "Bot" => AccountType::Bot,
            "Organization" => AccountType::Organization,
            other => AccountType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountType::User => f.write_str("User"),
            AccountType::Bot => f.write_str("Bot"),
            AccountType::Organization => f.write_str("Organization"),
            AccountType::Other(raw) => f.write_str(raw),
        }
    }
}

fn normalize_bot_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    match lower.strip_suffix(BOT_SUFFIX) {
        Some(stripped) => stripped.to_string(),
        None => lower,
    }
}

/// Fail unless `actor` is a human account or an allow-listed bot.
///
/// `allowed_bots` is a comma-separated list of bot names (with or without
/// the `[bot]` suffix, case-insensitive), or `*` to allow every bot.
pub fn check_human_actor(
    actor: &str,
    account_type: &AccountType,
    allowed_bots: &str,
) -> Result<(), AuthError> {
    match account_type {
        AccountType::User => {
            info!(actor, "verified human actor");
            Ok(())
        }
        AccountType::Bot => {
            if allowed_bots.trim() == "*" {
                info!(actor, "all bots are allowed");
                return Ok(());
            }

            let bot_name = normalize_bot_name(actor);
            let allowed = allowed_bots
                .split(',')
                .map(normalize_bot_name)
                .filter(|bot| !bot.is_empty())
                .any(|bot| bot == bot_name);

            if allowed {
                info!(bot = %bot_name, "bot is in allowed list");
                Ok(())
            } else {
                Err(AuthError::BotNotAllowed {
                    actor: bot_name,
                    account_type: account_type.to_string(),
                })
            }
        }
        other => Err(AuthError::NonHumanActor {
            actor: actor.to_string(),
            account_type: other.to_string(),
        }),
    }
}

/// Look up the actor's account type and apply [`check_human_actor`]
pub async fn ensure_human_actor(
    host: &dyn RepositoryHost,
    actor: &str,
    allowed_bots: &str,
) -> Result<(), AuthError> {
    let account_type = host
        .account_type(actor)
        .await
        .map_err(|source| AuthError::Lookup {
            actor: actor.to_string(),
            source,
        })?;
    info!(actor, %account_type, "actor type");
    check_human_actor(actor, &account_type, allowed_bots)
}

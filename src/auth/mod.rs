//! Decides whether the actor that triggered a run may drive it.
//!
//! The gates are pure functions over facts fetched from the repository host,
//! plus thin async wrappers that do the fetching.

pub mod actor;
pub mod filter;
pub mod permission;

pub use actor::{AccountType, check_human_actor, ensure_human_actor};
pub use filter::{ActorFilterList, actor_matches, should_include_comment_by_actor};
pub use permission::{PermissionLevel, check_write_permission, ensure_write_permission};

use thiserror::Error;

use crate::github::HostError;

/// Suffix GitHub appends to app and bot logins
pub const BOT_SUFFIX: &str = "[bot]";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(
        "Workflow initiated by non-human actor: {actor} (type: {account_type}). \
         Add bot to allowed_bots list or use '*' to allow all bots."
    )]
    BotNotAllowed { actor: String, account_type: String },

    #[error("Workflow initiated by non-human actor: {actor} (type: {account_type}).")]
    NonHumanActor { actor: String, account_type: String },

    #[error("Actor {actor} does not have write permissions to the repository (permission: {level})")]
    InsufficientPermission { actor: String, level: String },

    #[error("Failed to check permissions for {actor}: {source}")]
    Lookup {
        actor: String,
        #[source]
        source: HostError,
    },
}

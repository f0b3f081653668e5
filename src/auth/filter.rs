use crate::auth::BOT_SUFFIX;

/// Reserved pattern matching any login ending in the bot suffix
pub const BOT_WILDCARD: &str = "*[bot]";

/// Ordered actor patterns parsed from a comma-separated setting.
///
/// An empty list places no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorFilterList(Vec<String>);

impl ActorFilterList {
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|pattern| !pattern.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn patterns(&self) -> &[String] {
        &self.0
    }

    pub fn matches(&self, actor: &str) -> bool {
        self.0.iter().any(|pattern| actor_matches(actor, pattern))
    }
}

/// Exact match, or the bot wildcard against a `[bot]`-suffixed login
pub fn actor_matches(actor: &str, pattern: &str) -> bool {
    pattern == actor || (pattern == BOT_WILDCARD && actor.ends_with(BOT_SUFFIX))
}

/// Whether a comment by `actor` belongs in the conversation context.
///
/// Exclusion wins over inclusion; a non-empty include list keeps only its
/// matches.
pub fn should_include_comment_by_actor(
    actor: &str,
    include: &ActorFilterList,
    exclude: &ActorFilterList,
) -> bool {
    if exclude.matches(actor) {
        return false;
    }
    include.is_empty() || include.matches(actor)
}

use serde::Deserialize;

use crate::config::ConfigError;

/// Events that target an issue or pull request conversation
const ENTITY_EVENTS: &[&str] = &[
    "issues",
    "issue_comment",
    "pull_request",
    "pull_request_review",
    "pull_request_review_comment",
];

#[derive(Debug, Deserialize, Default)]
struct RawEvent {
    action: Option<String>,
    comment: Option<RawBody>,
    review: Option<RawBody>,
    issue: Option<RawIssue>,
    pull_request: Option<RawIssue>,
    label: Option<RawLabel>,
    assignee: Option<RawUser>,
}

#[derive(Debug, Deserialize)]
struct RawBody {
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    number: u64,
    title: Option<String>,
    body: Option<String>,
    state: Option<String>,
    // Present on issues that are pull requests
    pull_request: Option<serde_json::Value>,
    head: Option<RawHead>,
}

#[derive(Debug, Deserialize)]
struct RawHead {
    #[serde(rename = "ref")]
    branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    login: String,
}

/// The issue or pull request a run is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub number: u64,
    pub is_pr: bool,
    pub title: String,
    pub body: String,
    pub open: bool,
    /// Head branch when the payload carries it (pull_request events)
    pub head_branch: Option<String>,
}

/// The triggering event, reduced to what the run needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventContext {
    pub event_name: String,
    pub action: Option<String>,
    pub entity: Option<Entity>,
    /// Body of the triggering comment or review
    pub comment_body: Option<String>,
    pub label: Option<String>,
    pub assignee: Option<String>,
}

impl EventContext {
    /// Parse an event payload as written by the CI runner
    pub fn from_payload(event_name: &str, payload: &str) -> Result<Self, ConfigError> {
        let raw: RawEvent = if payload.trim().is_empty() {
            RawEvent::default()
        } else {
            serde_json::from_str(payload)?
        };

        let entity = match (raw.pull_request, raw.issue) {
            (Some(pr), _) => Some(entity_from(pr, true)),
            (None, Some(issue)) => {
                let is_pr = issue.pull_request.is_some();
                Some(entity_from(issue, is_pr))
            }
            (None, None) => None,
        };

        let comment_body = raw
            .comment
            .and_then(|c| c.body)
            .or_else(|| raw.review.and_then(|r| r.body));

        Ok(Self {
            event_name: event_name.to_string(),
            action: raw.action,
            entity,
            comment_body,
            label: raw.label.map(|l| l.name),
            assignee: raw.assignee.map(|a| a.login),
        })
    }

    /// Whether the event is about an issue or pull request conversation
    pub fn is_entity_event(&self) -> bool {
        ENTITY_EVENTS.contains(&self.event_name.as_str())
    }

    pub fn action_is(&self, action: &str) -> bool {
        self.action.as_deref() == Some(action)
    }
}

fn entity_from(raw: RawIssue, is_pr: bool) -> Entity {
    Entity {
        number: raw.number,
        is_pr,
        title: raw.title.unwrap_or_default(),
        body: raw.body.unwrap_or_default(),
        open: raw.state.as_deref().is_none_or(|state| state == "open"),
        head_branch: raw.head.and_then(|h| h.branch),
    }
}

use regex::Regex;
use tracing::info;

use crate::config::{EventContext, TriggerConfig};

/// Whether `text` mentions `phrase` as a standalone word.
///
/// The phrase must be preceded by the start of the text or whitespace, and
/// followed by the end, whitespace or sentence punctuation.
pub fn contains_trigger_phrase(text: &str, phrase: &str) -> bool {
    let pattern = format!(r"(^|\s){}([\s.,!?;:]|$)", regex::escape(phrase));
    match Regex::new(&pattern) {
        Ok(re) => re.is_match(text),
        Err(_) => false,
    }
}

/// Decide whether the event asks for a run.
///
/// An explicit prompt always triggers. Otherwise assignment, labelling or a
/// mention of the trigger phrase in the relevant text does.
pub fn check_contains_trigger(
    event: &EventContext,
    trigger: &TriggerConfig,
    prompt: Option<&str>,
) -> bool {
    if prompt.is_some_and(|p| !p.trim().is_empty()) {
        info!("explicit prompt provided, trigger satisfied");
        return true;
    }

    let event_name = event.event_name.as_str();

    if event_name == "issues" && event.action_is("assigned") {
        if let (Some(wanted), Some(assignee)) = (&trigger.assignee, &event.assignee) {
            let wanted = wanted.trim_start_matches('@');
            if !wanted.is_empty() && assignee == wanted {
                info!(assignee = %assignee, "issue assigned to trigger user");
                return true;
            }
        }
    }

    if matches!(event_name, "issues" | "pull_request") && event.action_is("labeled") {
        if event.label.as_deref() == Some(trigger.label.as_str()) {
            info!(label = %trigger.label, "trigger label applied");
            return true;
        }
    }

    if matches!(event_name, "issues" | "pull_request")
        && (event.action_is("opened") || event.action_is("edited"))
    {
        if let Some(entity) = &event.entity {
            if contains_trigger_phrase(&entity.body, &trigger.phrase)
                || contains_trigger_phrase(&entity.title, &trigger.phrase)
            {
                info!(phrase = %trigger.phrase, "trigger phrase found in title or body");
                return true;
            }
        }
    }

    if matches!(
        event_name,
        "issue_comment" | "pull_request_review_comment" | "pull_request_review"
    ) {
        if let Some(body) = &event.comment_body {
            if contains_trigger_phrase(body, &trigger.phrase) {
                info!(phrase = %trigger.phrase, "trigger phrase found in comment");
                return true;
            }
        }
    }

    info!("no trigger found");
    false
}

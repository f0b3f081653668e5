pub mod prepare;
pub mod trigger;

pub use prepare::{ModePreparer, PrepareContext, Prepared, Preparer, PROMPT_DIR, PROMPT_FILE};
pub use trigger::{check_contains_trigger, contains_trigger_phrase};

use crate::config::EventContext;

/// How a run interacts with the conversation that triggered it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Responds to a mention, label or assignment on an issue or PR
    Tag,
    /// Runs a configured prompt for automation events
    Agent,
}

impl Mode {
    pub fn detect(event: &EventContext, prompt: Option<&str>) -> Self {
        let has_prompt = prompt.is_some_and(|p| !p.trim().is_empty());
        if has_prompt && !event.is_entity_event() {
            Mode::Agent
        } else {
            Mode::Tag
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Tag => "tag",
            Mode::Agent => "agent",
        }
    }
}

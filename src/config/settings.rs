use std::fs;
use std::path::PathBuf;

use crate::auth::ActorFilterList;
use crate::config::{ConfigError, EventContext};
use crate::credential::{
    DEFAULT_EXCHANGE_URL, PermissionOverlay, ScopedCredential, parse_additional_permissions,
};
use crate::github::RepoRef;
use crate::retry::RetryPolicy;

const DEFAULT_API_URL: &str = "https://api.github.com";
const DEFAULT_SERVER_URL: &str = "https://github.com";
const DEFAULT_TRIGGER_PHRASE: &str = "@claude";
const DEFAULT_LABEL_TRIGGER: &str = "claude";
const DEFAULT_BRANCH_PREFIX: &str = "claude/";
const DEFAULT_WORKLOAD_COMMAND: &str = "claude";
const DEFAULT_WORKLOAD_ARGS: &str = "-p";

/// Trigger settings for tag mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerConfig {
    pub phrase: String,
    pub assignee: Option<String>,
    pub label: String,
}

/// Workload command line, run without a shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadConfig {
    pub command: String,
    pub args: Vec<String>,
}

/// Immutable run configuration, built once at process start
#[derive(Debug, Clone)]
pub struct Config {
    pub repository: RepoRef,
    pub actor: String,
    pub event: EventContext,
    pub repo_root: PathBuf,
    pub runner_temp: PathBuf,
    pub api_url: String,
    pub server_url: String,
    pub run_id: Option<String>,
    pub output_file: Option<PathBuf>,

    pub override_credential: Option<ScopedCredential>,
    pub permission_overlay: Option<PermissionOverlay>,
    pub exchange_url: String,
    pub id_token_request_url: Option<String>,
    pub id_token_request_token: Option<String>,
    pub retry: RetryPolicy,

    pub allowed_bots: String,
    pub allowed_non_write_users: String,
    pub include_comments_by_actor: ActorFilterList,
    pub exclude_comments_by_actor: ActorFilterList,

    pub trigger: TriggerConfig,
    pub prompt: Option<String>,
    pub branch_prefix: String,
    pub base_branch: Option<String>,
    pub workload: WorkloadConfig,
}

impl Config {
    /// Build configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let repository_raw = require("GITHUB_REPOSITORY")?;
        let repository = RepoRef::parse(&repository_raw).ok_or_else(|| {
            ConfigError::InvalidValue(format!(
                "GITHUB_REPOSITORY must be owner/repo, got '{repository_raw}'"
            ))
        })?;

        let event_name = require("GITHUB_EVENT_NAME")?;
        let payload = match get("GITHUB_EVENT_PATH") {
            Some(path) => fs::read_to_string(&path)?,
            None => String::new(),
        };
        let event = EventContext::from_payload(&event_name, &payload)?;

        let repo_root = match get("GITHUB_WORKSPACE") {
            Some(path) => PathBuf::from(path),
            None => std::env::current_dir()?,
        };
        let runner_temp = get("RUNNER_TEMP")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);

        let workload_args =
            get("WORKLOAD_ARGS").unwrap_or_else(|| DEFAULT_WORKLOAD_ARGS.to_string());

        let config = Config {
            repository,
            actor: require("GITHUB_ACTOR")?,
            event,
            repo_root,
            runner_temp,
            api_url: get("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            server_url: get("GITHUB_SERVER_URL").unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            run_id: get("GITHUB_RUN_ID"),
            output_file: get("GITHUB_OUTPUT").map(PathBuf::from),

            override_credential: get("OVERRIDE_GITHUB_TOKEN").map(ScopedCredential::new),
            permission_overlay: get("ADDITIONAL_PERMISSIONS")
                .and_then(|raw| parse_additional_permissions(&raw)),
            exchange_url: get("TOKEN_EXCHANGE_URL")
                .unwrap_or_else(|| DEFAULT_EXCHANGE_URL.to_string()),
            id_token_request_url: get("ACTIONS_ID_TOKEN_REQUEST_URL"),
            id_token_request_token: get("ACTIONS_ID_TOKEN_REQUEST_TOKEN"),
            retry: RetryPolicy::default(),

            allowed_bots: get("ALLOWED_BOTS").unwrap_or_default(),
            allowed_non_write_users: get("ALLOWED_NON_WRITE_USERS").unwrap_or_default(),
            include_comments_by_actor: ActorFilterList::parse(
                &get("INCLUDE_COMMENTS_BY_ACTOR").unwrap_or_default(),
            ),
            exclude_comments_by_actor: ActorFilterList::parse(
                &get("EXCLUDE_COMMENTS_BY_ACTOR").unwrap_or_default(),
            ),

            trigger: TriggerConfig {
                phrase: get("TRIGGER_PHRASE").unwrap_or_else(|| DEFAULT_TRIGGER_PHRASE.to_string()),
                assignee: get("ASSIGNEE_TRIGGER"),
                label: get("LABEL_TRIGGER").unwrap_or_else(|| DEFAULT_LABEL_TRIGGER.to_string()),
            },
            prompt: get("PROMPT"),
            branch_prefix: get("BRANCH_PREFIX")
                .unwrap_or_else(|| DEFAULT_BRANCH_PREFIX.to_string()),
            base_branch: get("BASE_BRANCH"),
            workload: WorkloadConfig {
                command: get("WORKLOAD_COMMAND")
                    .unwrap_or_else(|| DEFAULT_WORKLOAD_COMMAND.to_string()),
                args: workload_args.split_whitespace().map(str::to_string).collect(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        if self.trigger.phrase.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "TRIGGER_PHRASE must not be blank".to_string(),
            ));
        }

        if self.workload.command.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "WORKLOAD_COMMAND must not be blank".to_string(),
            ));
        }

        Ok(())
    }

    /// Link to the CI job running this process, when known
    pub fn run_url(&self) -> Option<String> {
        self.run_id.as_ref().map(|id| {
            format!(
                "{}/{}/actions/runs/{}",
                self.server_url.trim_end_matches('/'),
                self.repository,
                id
            )
        })
    }

    pub fn override_credential_provided(&self) -> bool {
        self.override_credential.is_some()
    }
}

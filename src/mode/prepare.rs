use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::auth::should_include_comment_by_actor;
use crate::config::{Config, ConfigError, Entity};
use crate::credential::ScopedCredential;
use crate::error::RunResult;
use crate::git::{self, GitExecutor};
use crate::github::{Comment, RepositoryHost};
use crate::mode::Mode;
use crate::security::{ValidatedBranchName, validate_branch_name, validate_path_within_repo};

/// Directory under the runner temp dir holding the prompt
pub const PROMPT_DIR: &str = "claude-prompts";
pub const PROMPT_FILE: &str = "claude-prompt.txt";

/// Everything a preparation step may consult
pub struct PrepareContext<'a> {
    pub config: &'a Config,
    pub mode: Mode,
    pub host: &'a dyn RepositoryHost,
    pub credential: &'a ScopedCredential,
}

/// Side effects of preparation, recorded as each one completes.
///
/// A failed preparation leaves whatever it managed to create here, so
/// cleanup can still update the tracking comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prepared {
    pub tracking_comment_id: Option<u64>,
    pub branch: Option<ValidatedBranchName>,
    pub prompt_file: Option<PathBuf>,
}

/// Mode-specific preparation run before the workload
#[async_trait]
pub trait Preparer: Send + Sync {
    async fn prepare(&self, ctx: &PrepareContext<'_>, prepared: &mut Prepared) -> RunResult<()>;
}

/// Preparation against a real checkout and repository host
#[derive(Debug, Default)]
pub struct ModePreparer;

#[async_trait]
impl Preparer for ModePreparer {
    async fn prepare(&self, ctx: &PrepareContext<'_>, prepared: &mut Prepared) -> RunResult<()> {
        match ctx.mode {
            Mode::Agent => prepare_agent(ctx.config, prepared),
            Mode::Tag => {
                let entity = ctx.config.event.entity.as_ref().ok_or_else(|| {
                    ConfigError::InvalidValue(format!(
                        "event '{}' carries no issue or pull request",
                        ctx.config.event.event_name
                    ))
                })?;
                prepare_tag(ctx, entity, prepared).await
            }
        }
    }
}

fn prepare_agent(config: &Config, prepared: &mut Prepared) -> RunResult<()> {
    let prompt = config
        .prompt
        .as_deref()
        .ok_or(ConfigError::Missing("PROMPT"))?;
    prepared.prompt_file = Some(write_prompt_file(&config.runner_temp, prompt)?);
    Ok(())
}

async fn prepare_tag(
    ctx: &PrepareContext<'_>,
    entity: &Entity,
    prepared: &mut Prepared,
) -> RunResult<()> {
    let config = ctx.config;

    let body = working_comment_body(config.run_url().as_deref());
    let comment_id = ctx.host.create_comment(entity.number, &body).await?;
    info!(comment_id, "created tracking comment");
    prepared.tracking_comment_id = Some(comment_id);

    let git = GitExecutor::new(&config.repo_root);
    git::configure_auth(&git, ctx.credential, &config.server_url, &config.repository)?;

    let branch = setup_branch(ctx, &git, entity).await?;
    prepared.branch = Some(branch.clone());

    let comments: Vec<Comment> = ctx
        .host
        .list_issue_comments(entity.number)
        .await?
        .into_iter()
        .filter(|c| c.id != comment_id)
        .filter(|c| {
            should_include_comment_by_actor(
                &c.author,
                &config.include_comments_by_actor,
                &config.exclude_comments_by_actor,
            )
        })
        .collect();
    info!(count = comments.len(), "collected conversation comments");

    let prompt = build_tag_prompt(
        entity,
        &comments,
        config.event.comment_body.as_deref(),
        &branch,
        config.prompt.as_deref(),
    );
    prepared.prompt_file = Some(write_prompt_file(&config.runner_temp, &prompt)?);
    Ok(())
}

async fn setup_branch(
    ctx: &PrepareContext<'_>,
    git: &GitExecutor,
    entity: &Entity,
) -> RunResult<ValidatedBranchName> {
    let config = ctx.config;

    if entity.is_pr {
        let head = match &entity.head_branch {
            Some(branch) if entity.open => Some(branch.clone()),
            _ => {
                let head = ctx.host.pull_request_head(entity.number).await?;
                head.open.then_some(head.branch)
            }
        };
        if let Some(head) = head {
            let branch = validate_branch_name(&head)?;
            git::checkout_existing_branch(git, &branch)?;
            return Ok(branch);
        }
    }

    let base = match &config.base_branch {
        Some(base) => base.clone(),
        None => ctx.host.default_branch().await?,
    };
    let base = validate_branch_name(&base)?;
    let kind = if entity.is_pr { "pr" } else { "issue" };
    let branch = git::new_branch_name(&config.branch_prefix, kind, entity.number, Utc::now())?;
    git::checkout_new_branch(git, &branch, &base)?;
    Ok(branch)
}

/// Write the prompt under `runner_temp`, refusing any location outside it
pub fn write_prompt_file(runner_temp: &Path, content: &str) -> RunResult<PathBuf> {
    fs::create_dir_all(runner_temp.join(PROMPT_DIR))?;
    let target = validate_path_within_repo(Path::new(PROMPT_DIR).join(PROMPT_FILE), runner_temp)?;
    fs::write(target.as_path(), content)?;
    info!(path = %target.as_path().display(), "prompt written");
    Ok(target.into_path_buf())
}

pub fn working_comment_body(run_url: Option<&str>) -> String {
    match run_url {
        Some(url) => format!("Claude is working… [View job run]({url})"),
        None => "Claude is working…".to_string(),
    }
}

/// Assemble the prompt for a conversation-driven run
pub fn build_tag_prompt(
    entity: &Entity,
    comments: &[Comment],
    trigger_comment: Option<&str>,
    branch: &ValidatedBranchName,
    custom_instructions: Option<&str>,
) -> String {
    let kind = if entity.is_pr { "pull request" } else { "issue" };
    let mut prompt = format!(
        "You are working on {kind} #{} on branch `{branch}`.\n\n<title>\n{}\n</title>\n\n<body>\n{}\n</body>\n",
        entity.number, entity.title, entity.body
    );

    if !comments.is_empty() {
        prompt.push_str("\n<comments>\n");
        for comment in comments {
            prompt.push_str(&format!(
                "[{} at {}]: {}\n",
                comment.author, comment.created_at, comment.body
            ));
        }
        prompt.push_str("</comments>\n");
    }

    if let Some(trigger) = trigger_comment {
        prompt.push_str(&format!("\n<trigger_comment>\n{trigger}\n</trigger_comment>\n"));
    }

    if let Some(instructions) = custom_instructions {
        prompt.push_str(&format!("\n<instructions>\n{instructions}\n</instructions>\n"));
    }

    prompt
}

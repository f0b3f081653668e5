//! The external command a run exists to execute.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::WorkloadConfig;
use crate::credential::ScopedCredential;

#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error("Failed to start workload '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read prompt file: {0}")]
    Prompt(#[source] std::io::Error),

    #[error("Workload failed with exit code {}", .code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    Failed { code: Option<i32> },

    #[error("Failed waiting for workload: {0}")]
    Wait(#[source] std::io::Error),
}

/// Inputs handed to the workload once preparation is complete
#[derive(Debug, Clone)]
pub struct WorkloadRequest {
    pub prompt_file: PathBuf,
    pub repo_root: PathBuf,
    pub credential: ScopedCredential,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub exit_code: i32,
}

/// Runs the prepared workload exactly once
#[async_trait]
pub trait Workload: Send + Sync {
    async fn execute(&self, request: &WorkloadRequest) -> Result<ExecutionReport, WorkloadError>;
}

/// Spawns the configured command with the prompt on stdin
pub struct CommandWorkload {
    command: String,
    args: Vec<String>,
}

impl CommandWorkload {
    pub fn new(config: &WorkloadConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }

    fn command(&self, repo_root: &Path, credential: &ScopedCredential) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .current_dir(repo_root)
            .env("GITHUB_TOKEN", credential.expose())
            .env("GH_TOKEN", credential.expose())
            .stdin(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Workload for CommandWorkload {
    async fn execute(&self, request: &WorkloadRequest) -> Result<ExecutionReport, WorkloadError> {
        let prompt = tokio::fs::read(&request.prompt_file)
            .await
            .map_err(WorkloadError::Prompt)?;

        info!(command = %self.command, "starting workload");
        let mut child = self
            .command(&request.repo_root, &request.credential)
            .spawn()
            .map_err(|source| WorkloadError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A workload that ignores stdin closes the pipe early
            if let Err(err) = stdin.write_all(&prompt).await {
                warn!(error = %err, "workload did not read the full prompt");
            }
            drop(stdin);
        }

        let status = child.wait().await.map_err(WorkloadError::Wait)?;
        if !status.success() {
            return Err(WorkloadError::Failed {
                code: status.code(),
            });
        }

        info!("workload finished");
        Ok(ExecutionReport {
            exit_code: status.code().unwrap_or(0),
        })
    }
}

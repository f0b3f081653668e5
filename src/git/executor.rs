use crate::error::{GitError, GitResult};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::LazyLock;
use tracing::debug;

static URL_USERINFO: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"://[^/@\s]+@").ok());

/// Executes git commands within a repository
#[derive(Debug)]
pub struct GitExecutor {
    repo_path: PathBuf,
}

impl GitExecutor {
    /// Create a new GitExecutor for the given repository path
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Self {
        Self {
            repo_path: repo_path.as_ref().to_path_buf(),
        }
    }

    /// Run git with an argument vector and return its stdout. No shell is
    /// involved.
    ///
    /// Example: `executor.run(&["checkout", "-b", branch])`
    pub fn run(&self, args: &[&str]) -> GitResult<String> {
        let subcommand = match args.first() {
            Some(first) => *first,
            None => return Err(GitError::EmptyCommand),
        };

        debug!(subcommand, "running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()?;

        process_output(output, subcommand)
    }
}

fn process_output(output: Output, subcommand: &str) -> GitResult<String> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::CommandFailed {
            subcommand: subcommand.to_string(),
            code: output.status.code().unwrap_or(-1),
            detail: redact_userinfo(stderr.trim()),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Replace `user:password@` in URLs with `***@`
pub fn redact_userinfo(text: &str) -> String {
    match URL_USERINFO.as_ref() {
        Some(re) => re.replace_all(text, "://***@").into_owned(),
        None => text.to_string(),
    }
}

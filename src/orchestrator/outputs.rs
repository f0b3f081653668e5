use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;

pub const CONTAINS_TRIGGER: &str = "contains_trigger";
pub const GITHUB_TOKEN: &str = "github_token";
pub const SKIPPED_WORKFLOW_MISMATCH: &str = "skipped_due_to_workflow_validation_mismatch";
pub const PREPARE_SUCCESS: &str = "prepare_success";
pub const PREPARE_ERROR: &str = "prepare_error";
pub const FAILURE_STAGE: &str = "failure_stage";
pub const BRANCH_NAME: &str = "branch_name";
pub const CONCLUSION: &str = "conclusion";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output '{key}': {source}")]
    Write {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("Value for output '{0}' contains the heredoc delimiter")]
    DelimiterCollision(String),
}

/// Key/value channel to later steps of the job
pub trait OutputSink {
    fn set(&mut self, key: &str, value: &str) -> Result<(), OutputError>;

    /// Ask the host to mask `secret` in all further log output
    fn mask(&mut self, _secret: &str) -> Result<(), OutputError> {
        Ok(())
    }
}

/// Appends to the runner's `GITHUB_OUTPUT` file
#[derive(Debug, Clone)]
pub struct GithubOutputFile {
    path: PathBuf,
    delimiter: String,
}

impl GithubOutputFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        Self {
            path: path.into(),
            delimiter: format!("ACTIONRUN_EOF_{nanos:x}"),
        }
    }
}

impl OutputSink for GithubOutputFile {
    fn set(&mut self, key: &str, value: &str) -> Result<(), OutputError> {
        if value.contains(&self.delimiter) || key.contains(&self.delimiter) {
            return Err(OutputError::DelimiterCollision(key.to_string()));
        }

        let entry = format!("{key}<<{delim}\n{value}\n{delim}\n", delim = self.delimiter);
        let write = || -> io::Result<()> {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            file.write_all(entry.as_bytes())
        };
        write().map_err(|source| OutputError::Write {
            key: key.to_string(),
            source,
        })
    }

    fn mask(&mut self, secret: &str) -> Result<(), OutputError> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "::add-mask::{secret}").map_err(|source| OutputError::Write {
            key: "add-mask".to_string(),
            source,
        })
    }
}

/// In-memory sink
#[derive(Debug, Clone, Default)]
pub struct MemoryOutputs {
    values: BTreeMap<String, String>,
    masked: Vec<String>,
}

impl MemoryOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn masked(&self) -> &[String] {
        &self.masked
    }
}

impl OutputSink for MemoryOutputs {
    fn set(&mut self, key: &str, value: &str) -> Result<(), OutputError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn mask(&mut self, secret: &str) -> Result<(), OutputError> {
        self.masked.push(secret.to_string());
        Ok(())
    }
}

pub mod auth;
pub mod config;
pub mod credential;
pub mod error;
pub mod exit_codes;
pub mod git;
pub mod github;
pub mod logging;
pub mod mode;
pub mod orchestrator;
pub mod retry;
pub mod security;
pub mod workload;

// Re-export commonly used types for convenience
pub use config::Config;
pub use error::{ErrorKind, GitError, RunError, RunResult};
pub use orchestrator::{PhaseOrchestrator, RunOutcome, RunReport};
pub use retry::RetryPolicy;

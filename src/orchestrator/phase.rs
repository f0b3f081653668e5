use std::fmt;

use crate::error::RunError;

/// Phases of a run, in the only order they can be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunPhase {
    Init,
    Authenticated,
    PermissionChecked,
    TriggerChecked,
    Prepared,
    Executed,
    CleanedUp,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Init => "init",
            RunPhase::Authenticated => "authenticated",
            RunPhase::PermissionChecked => "permission_checked",
            RunPhase::TriggerChecked => "trigger_checked",
            RunPhase::Prepared => "prepared",
            RunPhase::Executed => "executed",
            RunPhase::CleanedUp => "cleaned_up",
        }
    }

    /// Whether every preparation side effect has completed
    pub fn preparation_complete(&self) -> bool {
        *self >= RunPhase::Prepared
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which half of the run a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Preparation,
    Execution,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Preparation => "prepare",
            FailureStage::Execution => "execute",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute a failure given the last phase reached before it.
///
/// Anything before preparation completes is a preparation failure. The
/// workload can only fail during execution.
pub fn attribute(reached: RunPhase, error: &RunError) -> FailureStage {
    if matches!(error, RunError::Workload(_)) || reached.preparation_complete() {
        FailureStage::Execution
    } else {
        FailureStage::Preparation
    }
}

//! Top-level state machine for a single run.
//!
//! ```text
//! INIT -> AUTHENTICATED -> PERMISSION_CHECKED -> TRIGGER_CHECKED -> PREPARED -> EXECUTED
//!            │                                        │                              │
//!            └─ skip: outputs only                    └─ no trigger ──┐              │
//!                                                                     v              v
//!                                           any failure ────────> CLEANED_UP <───────┘
//! ```
//!
//! A failure before `PREPARED` is attributed to preparation, anything after
//! it to execution.

pub mod outputs;
pub mod phase;
pub mod run;

pub use outputs::{GithubOutputFile, MemoryOutputs, OutputError, OutputSink};
pub use phase::{FailureStage, RunPhase, attribute};
pub use run::{PhaseOrchestrator, RunOutcome, RunReport, status_comment_body};

use tracing::{error, info, warn};

use crate::auth::{ensure_human_actor, ensure_write_permission};
use crate::config::{Config, ConfigError};
use crate::credential::{CredentialBroker, CredentialOutcome, ScopedCredential};
use crate::error::{ErrorKind, RunResult};
use crate::github::{HostConnector, RepositoryHost};
use crate::mode::{Mode, PrepareContext, Prepared, Preparer, check_contains_trigger};
use crate::orchestrator::outputs::{self, OutputError, OutputSink};
use crate::orchestrator::phase::{FailureStage, RunPhase, attribute};
use crate::workload::{Workload, WorkloadRequest};

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// No trigger was present; nothing was done
    NoTrigger,
    /// The credential exchange asked for a clean skip
    Skipped { reason: String },
    Failed {
        stage: FailureStage,
        kind: ErrorKind,
        message: String,
    },
}

impl RunOutcome {
    pub fn conclusion(&self) -> &'static str {
        match self {
            RunOutcome::Completed | RunOutcome::NoTrigger => "success",
            RunOutcome::Skipped { .. } => "skipped",
            RunOutcome::Failed { .. } => "failure",
        }
    }
}

/// Final state of a run as seen by the caller
#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Last phase reached before the run ended or failed
    pub reached: RunPhase,
    /// Phase after cleanup; equal to `reached` for skipped runs
    pub phase: RunPhase,
    pub prepared: Prepared,
    pub outputs_written: bool,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.outputs_written && !matches!(self.outcome, RunOutcome::Failed { .. })
    }
}

enum Flow {
    Completed,
    NoTrigger,
    Skipped { reason: String },
}

/// Mutable bookkeeping for one run
struct RunState {
    phase: RunPhase,
    contains_trigger: bool,
    credential: Option<ScopedCredential>,
    host: Option<Box<dyn RepositoryHost>>,
    prepared: Prepared,
}

fn advance(phase: &mut RunPhase, next: RunPhase) {
    info!(from = %phase, to = %next, "phase transition");
    *phase = next;
}

/// Drives one run through its phases
pub struct PhaseOrchestrator {
    config: Config,
    broker: CredentialBroker,
    connector: Box<dyn HostConnector>,
    preparer: Box<dyn Preparer>,
    workload: Box<dyn Workload>,
}

impl PhaseOrchestrator {
    pub fn new(
        config: Config,
        broker: CredentialBroker,
        connector: Box<dyn HostConnector>,
        preparer: Box<dyn Preparer>,
        workload: Box<dyn Workload>,
    ) -> Self {
        Self {
            config,
            broker,
            connector,
            preparer,
            workload,
        }
    }

    /// Run every phase, clean up and publish outputs.
    ///
    /// Failures are reported through the returned [`RunReport`], never as an
    /// error. Cleanup runs exactly once unless the run was skipped.
    pub async fn run(&self, outputs: &mut dyn OutputSink) -> RunReport {
        let mut state = RunState {
            phase: RunPhase::Init,
            contains_trigger: false,
            credential: None,
            host: None,
            prepared: Prepared::default(),
        };
        let mode = Mode::detect(&self.config.event, self.config.prompt.as_deref());
        info!(
            mode = mode.as_str(),
            event = %self.config.event.event_name,
            actor = %self.config.actor,
            "starting run"
        );

        let outcome = match self.drive(&mut state, mode, outputs).await {
            Ok(Flow::Skipped { reason }) => {
                warn!(%reason, "skipping run: workflow does not match the default branch");
                let outcome = RunOutcome::Skipped { reason };
                let outputs_written = self.emit(&state, state.phase, &outcome, outputs);
                return RunReport {
                    outcome,
                    reached: state.phase,
                    phase: state.phase,
                    prepared: state.prepared,
                    outputs_written,
                };
            }
            Ok(Flow::NoTrigger) => RunOutcome::NoTrigger,
            Ok(Flow::Completed) => RunOutcome::Completed,
            Err(err) => {
                let stage = attribute(state.phase, &err);
                error!(stage = %stage, phase = %state.phase, error = %err, "run failed");
                RunOutcome::Failed {
                    stage,
                    kind: err.kind(),
                    message: err.to_string(),
                }
            }
        };

        let reached = state.phase;
        self.cleanup(&state, &outcome).await;
        advance(&mut state.phase, RunPhase::CleanedUp);

        let outputs_written = self.emit(&state, reached, &outcome, outputs);
        RunReport {
            outcome,
            reached,
            phase: state.phase,
            prepared: state.prepared,
            outputs_written,
        }
    }

    async fn drive(
        &self,
        state: &mut RunState,
        mode: Mode,
        outputs: &mut dyn OutputSink,
    ) -> RunResult<Flow> {
        let config = &self.config;

        let credential = match self.broker.resolve().await? {
            CredentialOutcome::Issued(credential) => credential,
            CredentialOutcome::Skipped { reason } => return Ok(Flow::Skipped { reason }),
        };
        outputs.mask(credential.expose())?;
        state.credential = Some(credential.clone());
        advance(&mut state.phase, RunPhase::Authenticated);

        let host = self.connector.connect(&credential)?;
        let host: &dyn RepositoryHost = &**state.host.insert(host);

        if config.event.is_entity_event() {
            ensure_write_permission(
                host,
                &config.actor,
                &config.allowed_non_write_users,
                config.override_credential_provided(),
            )
            .await?;
            ensure_human_actor(host, &config.actor, &config.allowed_bots).await?;
        }
        advance(&mut state.phase, RunPhase::PermissionChecked);

        state.contains_trigger =
            check_contains_trigger(&config.event, &config.trigger, config.prompt.as_deref());
        if !state.contains_trigger {
            info!("no trigger found, ending run");
            return Ok(Flow::NoTrigger);
        }
        advance(&mut state.phase, RunPhase::TriggerChecked);

        let ctx = PrepareContext {
            config,
            mode,
            host,
            credential: &credential,
        };
        self.preparer.prepare(&ctx, &mut state.prepared).await?;
        advance(&mut state.phase, RunPhase::Prepared);

        let prompt_file = state.prepared.prompt_file.clone().ok_or_else(|| {
            ConfigError::InvalidValue("preparation produced no prompt file".to_string())
        })?;
        let request = WorkloadRequest {
            prompt_file,
            repo_root: config.repo_root.clone(),
            credential,
        };
        let report = self.workload.execute(&request).await?;
        info!(exit_code = report.exit_code, "workload completed");
        advance(&mut state.phase, RunPhase::Executed);

        Ok(Flow::Completed)
    }

    /// Update the tracking comment with the final status. Never fails.
    async fn cleanup(&self, state: &RunState, outcome: &RunOutcome) {
        let (Some(host), Some(comment_id)) = (&state.host, state.prepared.tracking_comment_id)
        else {
            info!("no tracking comment to update");
            return;
        };

        let Some(body) = status_comment_body(
            outcome,
            state.prepared.branch.as_ref().map(|b| b.as_str()),
            self.config.run_url().as_deref(),
        ) else {
            return;
        };

        match host.update_comment(comment_id, &body).await {
            Ok(()) => info!(comment_id, "tracking comment updated"),
            Err(err) => error!(comment_id, error = %err, "failed to update tracking comment"),
        }
    }

    fn emit(
        &self,
        state: &RunState,
        reached: RunPhase,
        outcome: &RunOutcome,
        sink: &mut dyn OutputSink,
    ) -> bool {
        match write_outputs(state, reached, outcome, sink) {
            Ok(()) => true,
            Err(err) => {
                error!(error = %err, "failed to write step outputs");
                false
            }
        }
    }
}

fn write_outputs(
    state: &RunState,
    reached: RunPhase,
    outcome: &RunOutcome,
    sink: &mut dyn OutputSink,
) -> Result<(), OutputError> {
    let flag = |value: bool| if value { "true" } else { "false" };

    sink.set(outputs::CONTAINS_TRIGGER, flag(state.contains_trigger))?;
    sink.set(
        outputs::GITHUB_TOKEN,
        state.credential.as_ref().map_or("", |c| c.expose()),
    )?;
    sink.set(
        outputs::SKIPPED_WORKFLOW_MISMATCH,
        flag(matches!(outcome, RunOutcome::Skipped { .. })),
    )?;
    sink.set(
        outputs::PREPARE_SUCCESS,
        flag(reached.preparation_complete()),
    )?;

    if let RunOutcome::Failed { stage, message, .. } = outcome {
        sink.set(outputs::FAILURE_STAGE, stage.as_str())?;
        if *stage == FailureStage::Preparation {
            sink.set(outputs::PREPARE_ERROR, message)?;
        }
    }

    if let Some(branch) = &state.prepared.branch {
        sink.set(outputs::BRANCH_NAME, branch.as_str())?;
    }

    sink.set(outputs::CONCLUSION, outcome.conclusion())
}

/// One-line status for the tracking comment, with the job link appended
pub fn status_comment_body(
    outcome: &RunOutcome,
    branch: Option<&str>,
    run_url: Option<&str>,
) -> Option<String> {
    let status = match outcome {
        RunOutcome::Completed => match branch {
            Some(branch) => format!("Claude finished the task on branch `{branch}`."),
            None => "Claude finished the task.".to_string(),
        },
        RunOutcome::Failed {
            stage: FailureStage::Preparation,
            message,
            ..
        } => format!("Claude encountered an error during preparation: {message}"),
        RunOutcome::Failed {
            stage: FailureStage::Execution,
            ..
        } => "Claude encountered an error while working on the task.".to_string(),
        RunOutcome::NoTrigger | RunOutcome::Skipped { .. } => return None,
    };

    Some(match run_url {
        Some(url) => format!("{status} [View job run]({url})"),
        None => status,
    })
}

use actionrun::credential::{
    ActionsIdentityProvider, CredentialBroker, CredentialError, IdentityError,
};
use actionrun::github::GithubConnector;
use actionrun::mode::ModePreparer;
use actionrun::orchestrator::{GithubOutputFile, MemoryOutputs, OutputSink};
use actionrun::workload::CommandWorkload;
use actionrun::{Config, PhaseOrchestrator, RunOutcome, exit_codes, logging};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    logging::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            eprintln!("Error: {}", e);
            std::process::exit(exit_codes::FAILED);
        }
    };

    let broker = match build_broker(&config) {
        Ok(broker) => broker,
        Err(e) => {
            error!(error = %e, "failed to build HTTP client");
            eprintln!("Error: {}", e);
            std::process::exit(exit_codes::FAILED);
        }
    };

    let connector = GithubConnector {
        api_base: config.api_url.clone(),
        repo: config.repository.clone(),
    };
    let workload = CommandWorkload::new(&config.workload);

    let mut outputs: Box<dyn OutputSink> = match &config.output_file {
        Some(path) => Box::new(GithubOutputFile::new(path)),
        None => {
            warn!("GITHUB_OUTPUT is not set, step outputs will not be published");
            Box::new(MemoryOutputs::new())
        }
    };

    let orchestrator = PhaseOrchestrator::new(
        config,
        broker,
        Box::new(connector),
        Box::new(ModePreparer),
        Box::new(workload),
    );
    let report = orchestrator.run(outputs.as_mut()).await;

    info!(conclusion = report.outcome.conclusion(), phase = %report.phase, "run finished");
    if let RunOutcome::Failed { stage, message, .. } = &report.outcome {
        eprintln!("Error ({stage}): {message}");
    }

    let code = if report.succeeded() {
        exit_codes::OK
    } else {
        exit_codes::FAILED
    };
    std::process::exit(code);
}

fn build_broker(config: &Config) -> Result<CredentialBroker, CredentialError> {
    let identity = ActionsIdentityProvider::new(
        config.id_token_request_url.clone(),
        config.id_token_request_token.clone(),
    )
    .map_err(|e| match e {
        IdentityError::NetworkError(source) => CredentialError::NetworkError(source),
        other => CredentialError::IdentityUnavailable(other),
    })?;

    Ok(CredentialBroker::new(Box::new(identity))?
        .with_exchange_url(config.exchange_url.clone())
        .with_overlay(config.permission_overlay.clone())
        .with_override(config.override_credential.clone())
        .with_retry(config.retry))
}

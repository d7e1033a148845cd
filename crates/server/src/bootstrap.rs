use std::sync::Arc;
use std::time::Duration;

use herald_core::config::{AppConfig, ConfigError, LoadOptions};
use herald_discord::dispatch::Dispatcher;
use herald_discord::handlers::builtin_descriptors;
use herald_discord::registry::{CommandRegistry, RegistryError};
use herald_discord::responder::{ResponseDelivery, WebhookResponder};
use herald_discord::verify::{SignatureVerifier, VerifierBuildError};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::worker::{DispatchWorker, WorkItem};

pub struct Application {
    pub config: AppConfig,
    pub verifier: Arc<SignatureVerifier>,
    pub work_queue: mpsc::Sender<WorkItem>,
    pub worker: JoinHandle<()>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("command registry is invalid: {0}")]
    Registry(#[from] RegistryError),
    #[error("discord.public_key is not a usable verification key: {0}")]
    Verifier(#[from] VerifierBuildError),
    #[error("http client construction failed: {0}")]
    HttpClient(String),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Builds the full verification-to-delivery pipeline. Registry and key
/// problems surface here, at startup, not on the first request.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let verifier = Arc::new(SignatureVerifier::from_hex(&config.discord.public_key)?);

    let registry = CommandRegistry::from_descriptors(builtin_descriptors())?;
    info!(
        event_name = "system.bootstrap.registry_built",
        command_count = registry.len(),
        "command registry built"
    );

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(registry),
        Duration::from_secs(config.dispatch.handler_timeout_secs),
    ));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|error| BootstrapError::HttpClient(error.to_string()))?;
    let delivery: Arc<dyn ResponseDelivery> =
        Arc::new(WebhookResponder::new(client, config.discord.api_base.clone()));

    let (work_queue, receiver) = mpsc::channel(config.dispatch.queue_depth);
    let worker = DispatchWorker::new(
        dispatcher,
        delivery,
        Duration::from_secs(config.dispatch.token_ttl_secs),
    )
    .spawn(receiver);

    info!(
        event_name = "system.bootstrap.complete",
        queue_depth = config.dispatch.queue_depth,
        "application bootstrap complete"
    );

    Ok(Application { config, verifier, work_queue, worker })
}

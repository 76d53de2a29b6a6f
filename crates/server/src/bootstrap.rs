use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use adweave_core::config::{AppConfig, ConfigError, LoadOptions};
use adweave_core::{FrequencyGate, SafetyGate};
use adweave_pipeline::{
    ChatCompletionsClient, PipelineController, VectorCatalogClient, WorkflowEngine,
};
use adweave_store::MemorySessionStore;

pub struct Application {
    pub config: AppConfig,
    pub store: Arc<MemorySessionStore>,
    pub controller: Arc<PipelineController>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[from] reqwest::Error),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

/// Wires the dependency graph explicitly: config in, fully constructed
/// controller out. Nothing here is process-global, so tests can assemble
/// the same graph around fakes.
pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let policy = config.placement.frequency_policy();
    let store = Arc::new(MemorySessionStore::new(policy));

    let llm = Arc::new(ChatCompletionsClient::new(&config.llm)?);
    let catalog = Arc::new(VectorCatalogClient::new(&config.retrieval)?);

    let engine = WorkflowEngine::new(
        llm.clone(),
        catalog,
        llm.clone(),
        llm,
        config.retrieval.top_k,
    );

    let controller = Arc::new(PipelineController::new(
        store.clone(),
        SafetyGate::new(config.placement.blocked_keywords.clone()),
        FrequencyGate::new(policy),
        engine,
    ));

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        vertical_filterable = true,
        "dependency graph constructed"
    );

    Ok(Application { config, store, controller })
}

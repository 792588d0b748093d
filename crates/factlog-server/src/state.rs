//! Shared application state.

use std::sync::Arc;

use reqwest::Client;
use tracing::info;

use factlog_core::{Error, FactLogConfig, Result};
use factlog_ingest::HttpFetcher;
use factlog_llm::{create_language_model, LLMConfig, LLMStatus};
use factlog_runtime::{Coordinator, PipelineSettings};
use factlog_store::FactStore;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: FactLogConfig,
    pub coordinator: Arc<Coordinator>,
    pub llm_status: LLMStatus,
}

impl AppState {
    pub fn new(config: FactLogConfig, coordinator: Arc<Coordinator>, llm_status: LLMStatus) -> Self {
        Self {
            config,
            coordinator,
            llm_status,
        }
    }

    /// Wire the production store, fetcher and language model from `config`.
    pub fn from_config(config: FactLogConfig) -> Result<Self> {
        let store = Arc::new(FactStore::open(&config.data_paths.facts_file));
        let fetcher = Arc::new(HttpFetcher::new(config.fetch_timeout())?);

        let llm_config = LLMConfig::load(&config.data_paths.llm_config_file);
        let llm_client = Client::builder()
            .timeout(config.llm_timeout())
            .build()
            .map_err(|e| Error::Config(format!("LLM HTTP client: {}", e)))?;
        let model = create_language_model(&llm_config, llm_client);

        let coordinator = Arc::new(Coordinator::new(
            store,
            fetcher,
            model,
            PipelineSettings::from_config(&config),
        ));
        info!(
            "Pipeline ready: fetch timeout {}s, LLM timeout {}s",
            config.fetch_timeout_secs, config.llm_timeout_secs
        );

        Ok(Self::new(config, coordinator, llm_config.status()))
    }

    pub fn store(&self) -> &FactStore {
        self.coordinator.store()
    }
}

//! Language-model capability.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use crate::config::LLMConfig;
use crate::providers;
use crate::types::{ChatMessage, ResolvedProvider, SamplingParams};
use factlog_core::{Error, Result};

/// Turns a prompt into free text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a reply for `prompt`. Provider failures are
    /// [`Error::Generation`].
    async fn generate(&self, prompt: &str, params: SamplingParams) -> Result<String>;

    /// Whether calls can succeed at all (a provider is configured).
    fn is_available(&self) -> bool {
        true
    }
}

/// Chat-API backed model.
pub struct HttpLanguageModel {
    client: Client,
    resolved: ResolvedProvider,
}

impl HttpLanguageModel {
    pub fn new(client: Client, resolved: ResolvedProvider) -> Self {
        Self { client, resolved }
    }

    pub fn resolved(&self) -> &ResolvedProvider {
        &self.resolved
    }
}

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    async fn generate(&self, prompt: &str, params: SamplingParams) -> Result<String> {
        let stream = providers::stream_llm(
            &self.client,
            &self.resolved,
            vec![ChatMessage::user(prompt)],
            params,
        );
        let text = providers::collect_text(stream).await?;
        Ok(text.trim().to_string())
    }
}

/// Placeholder used when no provider is configured; every call fails.
pub struct UnconfiguredModel;

#[async_trait]
impl LanguageModel for UnconfiguredModel {
    async fn generate(&self, _prompt: &str, _params: SamplingParams) -> Result<String> {
        Err(Error::Generation("No LLM provider configured".into()))
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Create the model for the configured provider, or [`UnconfiguredModel`].
pub fn create_language_model(config: &LLMConfig, client: Client) -> Arc<dyn LanguageModel> {
    match config.resolve_provider() {
        Some(resolved) => {
            info!(
                "Using {} language model ({})",
                resolved.provider, resolved.model
            );
            Arc::new(HttpLanguageModel::new(client, resolved))
        }
        None => Arc::new(UnconfiguredModel),
    }
}

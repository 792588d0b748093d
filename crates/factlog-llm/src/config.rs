//! LLM configuration loading and provider selection.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{LLMProvider, LLMStatus, ResolvedProvider};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-20241022";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

/// LLM configuration, read from `llm-config.json` with environment fallback
/// for API keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// `auto`, `openai`, `anthropic`, or `groq`.
    #[serde(default = "default_preferred")]
    pub preferred_provider: String,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default)]
    pub groq_api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
    #[serde(default = "default_groq_model")]
    pub groq_model: String,
}

fn default_preferred() -> String {
    "auto".into()
}
fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.into()
}
fn default_anthropic_model() -> String {
    DEFAULT_ANTHROPIC_MODEL.into()
}
fn default_groq_model() -> String {
    DEFAULT_GROQ_MODEL.into()
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            preferred_provider: default_preferred(),
            openai_api_key: None,
            anthropic_api_key: None,
            groq_api_key: None,
            openai_model: default_openai_model(),
            anthropic_model: default_anthropic_model(),
            groq_model: default_groq_model(),
        }
    }
}

impl LLMConfig {
    /// Load config from file, falling back to env vars and defaults.
    pub fn load(config_path: &Path) -> Self {
        let mut config = Self::from_file(config_path);
        config.fill_keys_from_env(|key| std::env::var(key).ok());

        match config.resolve_provider() {
            Some(resolved) => info!(
                "LLM provider: {} (model {})",
                resolved.provider, resolved.model
            ),
            None => warn!("No LLM provider configured; fact extraction will fail"),
        }

        config
    }

    fn from_file(config_path: &Path) -> Self {
        let Ok(data) = std::fs::read_to_string(config_path) else {
            return Self::default();
        };
        serde_json::from_str(&data).unwrap_or_else(|e| {
            warn!("Ignoring malformed {}: {}", config_path.display(), e);
            Self::default()
        })
    }

    fn fill_keys_from_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        if self.openai_api_key.is_none() {
            self.openai_api_key = non_empty("OPENAI_API_KEY");
        }
        if self.anthropic_api_key.is_none() {
            self.anthropic_api_key = non_empty("ANTHROPIC_API_KEY");
        }
        if self.groq_api_key.is_none() {
            self.groq_api_key = non_empty("GROQ_API_KEY");
        }
    }

    fn candidate(&self, provider: LLMProvider) -> Option<ResolvedProvider> {
        let (key, model) = match provider {
            LLMProvider::OpenAI => (&self.openai_api_key, &self.openai_model),
            LLMProvider::Anthropic => (&self.anthropic_api_key, &self.anthropic_model),
            LLMProvider::Groq => (&self.groq_api_key, &self.groq_model),
        };
        key.as_ref().map(|api_key| ResolvedProvider {
            provider,
            model: model.clone(),
            api_key: api_key.clone(),
        })
    }

    /// Resolve which provider and model to use.
    ///
    /// An explicit preference must have its key configured. In auto mode the
    /// first configured of Anthropic, Groq, OpenAI wins.
    pub fn resolve_provider(&self) -> Option<ResolvedProvider> {
        match self.preferred_provider.as_str() {
            "openai" => self.candidate(LLMProvider::OpenAI),
            "anthropic" => self.candidate(LLMProvider::Anthropic),
            "groq" => self.candidate(LLMProvider::Groq),
            "auto" => [LLMProvider::Anthropic, LLMProvider::Groq, LLMProvider::OpenAI]
                .into_iter()
                .find_map(|p| self.candidate(p)),
            _ => None,
        }
    }

    pub fn status(&self) -> LLMStatus {
        let resolved = self.resolve_provider();
        LLMStatus {
            llm_available: resolved.is_some(),
            llm_provider: resolved.as_ref().map(|r| r.provider.to_string()),
            model: resolved.map(|r| r.model),
        }
    }
}

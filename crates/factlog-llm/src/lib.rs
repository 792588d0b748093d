//! Language-model capability and fact extraction.
//!
//! `LanguageModel` turns a prompt into text using an external chat API
//! (OpenAI, Anthropic, or Groq). `FactExtractor` builds the extraction prompt
//! from a question and a call-log transcript and splits the reply into
//! candidate facts.

pub mod config;
pub mod extractor;
pub mod model;
pub mod providers;
pub mod types;

pub use config::LLMConfig;
pub use extractor::{parse_facts, FactExtractor};
pub use model::{create_language_model, HttpLanguageModel, LanguageModel, UnconfiguredModel};
pub use types::*;

//! Fact extraction: question + transcript → candidate fact strings.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::model::LanguageModel;
use crate::types::SamplingParams;
use factlog_core::Result;
use factlog_ingest::Transcript;

/// Deterministic-leaning sampling for extraction.
pub const EXTRACTION_PARAMS: SamplingParams = SamplingParams {
    temperature: 0.5,
    max_tokens: 256,
};

/// `1. `, `12. `, `a. `, `B. `, `iv. ` list labels.
static LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d+|[A-Za-z]|[ivxlc]{1,5}|[IVXLC]{1,5})\.\s+(\S.*)$").unwrap());

const PROMPT_TEMPLATE: &str = r#"You extract the decisions a team made from a call log, answering the question below. Use only information found in the call log.

Example
Question: "What product design decisions did the team make?"
Call log:
00:00:10 - Alex: Let's choose our app's color scheme today.
00:00:36 - Jordan: I suggest blue for a calm feel.
00:00:51 - Casey: We need to make sure it's accessible to all users.
Answer:
1. The team will use blue for the color scheme of the app.
2. The team will make the app accessible to all users.

Now answer with a numbered list, one decision per line and nothing else.
Question: "{question}"
Call log:
{transcript}
Answer:
"#;

/// Build the extraction prompt for one document.
pub fn build_prompt(question: &str, transcript: &Transcript) -> String {
    PROMPT_TEMPLATE
        .replace("{question}", question)
        .replace("{transcript}", transcript.render().trim_end())
}

/// Split a model reply into candidate facts.
///
/// Blank lines are dropped and list labels stripped. Order is preserved and
/// duplicates are kept.
pub fn parse_facts(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match LABEL_RE.captures(line) {
            Some(caps) => caps[1].to_string(),
            None => line.to_string(),
        })
        .collect()
}

/// Asks the language model for the facts in a transcript.
pub struct FactExtractor {
    model: Arc<dyn LanguageModel>,
    params: SamplingParams,
}

impl FactExtractor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            params: EXTRACTION_PARAMS,
        }
    }

    /// Extract candidate facts answering `question` from `transcript`.
    pub async fn extract(&self, question: &str, transcript: &Transcript) -> Result<Vec<String>> {
        let prompt = build_prompt(question, transcript);
        let reply = self.model.generate(&prompt, self.params).await?;
        let facts = parse_facts(&reply);
        debug!("Extracted {} candidate facts", facts.len());
        Ok(facts)
    }
}

//! External LLM provider streaming.
//!
//! Every provider streams tokens over SSE. OpenAI and Groq share one wire
//! format; Anthropic uses its own event types. Callers that need the whole
//! reply drain the stream with [`collect_text`].

use std::pin::Pin;

use futures::Stream;
use reqwest::Client;
use serde_json::{json, Value};
use tokio_stream::StreamExt;
use tracing::{debug, error};

use crate::types::{ChatMessage, LLMProvider, ResolvedProvider, SamplingParams};
use factlog_core::{Error, Result};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Boxed stream type for returning different stream implementations.
pub type BoxedStream = Pin<Box<dyn Stream<Item = StreamChunk> + Send>>;

/// A single streamed token or error.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    Token(String),
    Done { tokens_used: usize },
    Error(String),
}

/// What one SSE `data:` payload means for the caller.
#[derive(Debug, PartialEq)]
enum SseEvent {
    Token(String),
    Stop,
    Failed(String),
    Ignore,
}

/// Stream tokens from the resolved provider.
pub fn stream_llm(
    client: &Client,
    resolved: &ResolvedProvider,
    messages: Vec<ChatMessage>,
    params: SamplingParams,
) -> BoxedStream {
    let request = match resolved.provider {
        LLMProvider::OpenAI => openai_compat_request(client, OPENAI_URL, resolved, &messages, params),
        LLMProvider::Groq => openai_compat_request(client, GROQ_URL, resolved, &messages, params),
        LLMProvider::Anthropic => anthropic_request(client, resolved, &messages, params),
    };
    let decode: fn(&str) -> SseEvent = match resolved.provider {
        LLMProvider::OpenAI | LLMProvider::Groq => decode_openai_compat,
        LLMProvider::Anthropic => decode_anthropic,
    };

    debug!(
        "Streaming from {} with model {}",
        resolved.provider, resolved.model
    );

    Box::pin(async_stream::stream! {
        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                yield StreamChunk::Error(format!("Request failed: {}", e));
                return;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            yield StreamChunk::Error(format!("API error {}: {}", status, body));
            return;
        }

        let mut bytes = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut token_count = 0usize;

        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(b) => buffer.extend_from_slice(&b),
                Err(e) => {
                    yield StreamChunk::Error(format!("Stream read error: {}", e));
                    return;
                }
            }

            for data in drain_data_lines(&mut buffer) {
                match decode(&data) {
                    SseEvent::Token(text) => {
                        token_count += 1;
                        yield StreamChunk::Token(text);
                    }
                    SseEvent::Stop => {
                        yield StreamChunk::Done { tokens_used: token_count };
                        return;
                    }
                    SseEvent::Failed(msg) => {
                        error!("Provider stream error: {}", msg);
                        yield StreamChunk::Error(msg);
                        return;
                    }
                    SseEvent::Ignore => {}
                }
            }
        }

        yield StreamChunk::Done { tokens_used: token_count };
    })
}

/// Drain a stream into the full reply text.
pub async fn collect_text(mut stream: BoxedStream) -> Result<String> {
    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        match chunk {
            StreamChunk::Token(t) => text.push_str(&t),
            StreamChunk::Done { tokens_used } => {
                debug!("Generation complete: {} tokens", tokens_used);
                break;
            }
            StreamChunk::Error(e) => return Err(Error::Generation(e)),
        }
    }
    Ok(text)
}

fn openai_compat_request(
    client: &Client,
    url: &str,
    resolved: &ResolvedProvider,
    messages: &[ChatMessage],
    params: SamplingParams,
) -> reqwest::RequestBuilder {
    let msgs: Vec<Value> = messages
        .iter()
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();

    client
        .post(url)
        .header("Authorization", format!("Bearer {}", resolved.api_key))
        .header("Content-Type", "application/json")
        .json(&json!({
            "model": resolved.model,
            "messages": msgs,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
            "stream": true,
        }))
}

fn anthropic_request(
    client: &Client,
    resolved: &ResolvedProvider,
    messages: &[ChatMessage],
    params: SamplingParams,
) -> reqwest::RequestBuilder {
    // Anthropic takes the system prompt as a top-level field.
    let system: Option<&str> = messages
        .iter()
        .find(|m| m.role == "system")
        .map(|m| m.content.as_str());

    let conv: Vec<Value> = messages
        .iter()
        .filter(|m| m.role != "system")
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();

    let mut body = json!({
        "model": resolved.model,
        "messages": conv,
        "temperature": params.temperature,
        "max_tokens": params.max_tokens,
        "stream": true,
    });
    if let Some(sys) = system {
        body["system"] = json!(sys);
    }

    client
        .post(ANTHROPIC_URL)
        .header("x-api-key", &resolved.api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .header("Content-Type", "application/json")
        .json(&body)
}

/// Remove every complete line from `buffer`, returning the `data:` payloads.
/// A trailing partial line stays buffered as raw bytes, so a character split
/// across network chunks is decoded only once it is whole.
fn drain_data_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let Some(last_newline) = buffer.iter().rposition(|&b| b == b'\n') else {
        return Vec::new();
    };
    let rest = buffer.split_off(last_newline + 1);
    let complete = std::mem::replace(buffer, rest);

    String::from_utf8_lossy(&complete)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(':'))
        .filter_map(|line| line.strip_prefix("data:").map(|d| d.trim().to_string()))
        .collect()
}

fn decode_openai_compat(data: &str) -> SseEvent {
    if data == "[DONE]" {
        return SseEvent::Stop;
    }
    let Ok(parsed) = serde_json::from_str::<Value>(data) else {
        return SseEvent::Ignore;
    };
    if let Some(msg) = parsed["error"]["message"].as_str() {
        return SseEvent::Failed(msg.to_string());
    }
    match parsed["choices"][0]["delta"]["content"].as_str() {
        Some(content) if !content.is_empty() => SseEvent::Token(content.to_string()),
        _ => SseEvent::Ignore,
    }
}

fn decode_anthropic(data: &str) -> SseEvent {
    let Ok(parsed) = serde_json::from_str::<Value>(data) else {
        return SseEvent::Ignore;
    };
    match parsed["type"].as_str() {
        Some("content_block_delta") => match parsed["delta"]["text"].as_str() {
            Some(text) if !text.is_empty() => SseEvent::Token(text.to_string()),
            _ => SseEvent::Ignore,
        },
        Some("message_stop") => SseEvent::Stop,
        Some("error") => SseEvent::Failed(
            parsed["error"]["message"]
                .as_str()
                .unwrap_or("Unknown error")
                .to_string(),
        ),
        _ => SseEvent::Ignore,
    }
}

//! Chat-completion collaborator: trait seam plus the hosted-API client.
//!
//! The [`ChatCompleter`] trait decouples agents from the actual backend.
//! Production uses [`OpenAiChat`] against an OpenAI-compatible
//! `/v1/chat/completions` endpoint; tests use scripted completers that return
//! predetermined replies without any network.
//!
//! Calls are blocking, untimed, and never retried here: a transport or API
//! failure surfaces as `Err` and the run loop aborts the pipeline.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::io::config::{Credentials, PipelineConfig};

/// One completion call: fixed system instructions plus user content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
}

/// Abstraction over completion backends.
pub trait ChatCompleter {
    /// Obtain the completion text for the given request.
    fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Blocking client for an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiChat {
    client: reqwest::blocking::Client,
    credentials: Credentials,
    temperature: f64,
    max_tokens: u32,
}

impl OpenAiChat {
    pub fn new(credentials: Credentials, config: &PipelineConfig) -> Result<Self> {
        // No timeout: a completion call blocks until it finishes or errors.
        let client = reqwest::blocking::Client::builder()
            .timeout(None::<Duration>)
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            client,
            credentials,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.credentials.model
    }

    fn endpoint(&self) -> String {
        chat_completions_url(&self.credentials.base_url)
    }
}

impl ChatCompleter for OpenAiChat {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let url = self.endpoint();
        let body = ChatRequest {
            model: &self.credentials.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        debug!(model = %self.credentials.model, url = %url, user_bytes = request.user.len(), "sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.credentials.api_key)
            .json(&body)
            .send()
            .context("send completion request")?;

        let status = response.status();
        let text = response.text().context("read completion response body")?;
        if !status.is_success() {
            return Err(anyhow!(
                "completion request failed with {status}: {}",
                excerpt(&text, 300)
            ));
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).context("parse completion response")?;
        let content = first_content(parsed)?;
        debug!(reply_bytes = content.len(), "completion received");
        Ok(content)
    }
}

/// Resolve the chat-completions URL from a base URL. Does not append `/v1`
/// when the base already ends with it.
fn chat_completions_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/v1") {
        format!("{base}/chat/completions")
    } else {
        format!("{base}/v1/chat/completions")
    }
}

fn first_content(response: ChatResponse) -> Result<String> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("completion response contained no choices"))?;
    choice
        .message
        .content
        .filter(|content| !content.is_empty())
        .ok_or_else(|| anyhow!("completion response contained no message content"))
}

fn excerpt(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_appends_v1_when_missing() {
        assert_eq!(
            chat_completions_url("https://api.openai.com"),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn url_keeps_existing_v1_segment() {
        assert_eq!(
            chat_completions_url("https://proxy.example/v1/"),
            "https://proxy.example/v1/chat/completions"
        );
    }

    #[test]
    fn first_content_reads_the_first_choice() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "research"}}]}"#,
        )
        .expect("parse");
        assert_eq!(first_content(response).expect("content"), "research");
    }

    #[test]
    fn empty_choices_are_an_error() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).expect("parse");
        assert!(first_content(response).is_err());
    }

    #[test]
    fn null_content_is_an_error() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#,
        )
        .expect("parse");
        assert!(first_content(response).is_err());
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("héllo", 2), "hé");
        assert_eq!(excerpt("hi", 10), "hi");
    }
}

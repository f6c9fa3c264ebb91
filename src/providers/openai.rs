//! OpenAI-compatible provider implementation for chatrelay
//!
//! This module implements the Provider trait against a `chat/completions`
//! endpoint, both as a single JSON request/response and as a streamed
//! response whose `data:` chunks carry content deltas.

use crate::config::ProviderConfig;
use crate::error::{ChatRelayError, Result};
use crate::providers::{Message, Provider, TokenStream};
use crate::stream::LineBuffer;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// OpenAI-compatible API provider
///
/// # Examples
///
/// ```no_run
/// use chatrelay::config::ProviderConfig;
/// use chatrelay::providers::{Message, OpenAiProvider, Provider};
///
/// # async fn example() -> chatrelay::error::Result<()> {
/// let config = ProviderConfig {
///     api_key: Some("sk-...".to_string()),
///     ..Default::default()
/// };
/// let provider = OpenAiProvider::new(config)?;
/// let answer = provider.complete(&[Message::user("Hello!")]).await?;
/// # Ok(())
/// # }
/// ```
pub struct OpenAiProvider {
    client: Client,
    config: ProviderConfig,
}

/// Request structure for the completions API
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

/// Response structure for a non-streamed completion
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// One `data:` chunk of a streamed completion
#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiProvider {
    /// Create a new provider instance
    ///
    /// No network I/O happens here; a missing API key is reported on the
    /// first request so that the relay can fall back per call.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("chatrelay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChatRelayError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized OpenAI provider: api_base={}, model={}",
            config.api_base,
            config.model
        );

        Ok(Self { client, config })
    }

    /// Bound on a whole JSON exchange, on the wait for response headers and
    /// on the gap between two chunks of a streamed body
    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_seconds)
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        )
    }

    async fn send(&self, messages: &[Message], stream: bool) -> Result<reqwest::Response> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ChatRelayError::MissingCredentials("openai".to_string()))?;

        let request = CompletionRequest {
            model: &self.config.model,
            messages,
            stream,
        };

        tracing::debug!(
            "Sending completion request: {} messages, stream={}",
            messages.len(),
            stream
        );

        let mut builder = self
            .client
            .post(self.completions_url())
            .bearer_auth(api_key)
            .json(&request);
        if !stream {
            // A streamed body may legitimately outlive this; its chunks are
            // bounded one by one instead.
            builder = builder.timeout(self.request_timeout());
        }

        let response = tokio::time::timeout(self.request_timeout(), builder.send())
            .await
            .map_err(|_| {
                tracing::error!("Completion request timed out");
                ChatRelayError::Provider(format!(
                    "Completion request timed out after {}s",
                    self.config.timeout_seconds
                ))
            })?
            .map_err(|e| {
                tracing::error!("Completion request failed: {}", e);
                ChatRelayError::Provider(format!("Completion request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Provider returned error {}: {}", status, error_text);
            return Err(ChatRelayError::Provider(format!(
                "Provider returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        Ok(response)
    }
}

/// Interpret one line of a streamed completion
///
/// Returns `Ok(None)` for lines that carry nothing (blank lines, comments,
/// empty deltas) and `Err` for undecodable chunks. `[DONE]` is handled by
/// the caller.
fn parse_chunk_line(line: &str) -> Result<Option<String>> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim();
    if data.is_empty() {
        return Ok(None);
    }

    let chunk: CompletionChunk = serde_json::from_str(data)
        .map_err(|e| ChatRelayError::Provider(format!("Failed to parse stream chunk: {}", e)))?;

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}

fn is_done_line(line: &str) -> bool {
    line.strip_prefix("data:")
        .map(|data| data.trim() == "[DONE]")
        .unwrap_or(false)
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, messages: &[Message]) -> Result<Option<String>> {
        let response = self.send(messages, false).await?;

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse completion response: {}", e);
            ChatRelayError::Provider(format!("Failed to parse completion response: {}", e))
        })?;

        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content))
    }

    async fn complete_stream(&self, messages: &[Message]) -> Result<TokenStream> {
        let response = self.send(messages, true).await?;
        let body = Box::pin(response.bytes_stream());
        let idle_timeout = self.request_timeout();

        let state = (body, LineBuffer::new(), VecDeque::<String>::new(), false);
        let tokens = futures::stream::unfold(
            Some(state),
            move |state| async move {
                let (mut body, mut lines, mut queued, mut ended) = state?;
                loop {
                    if let Some(line) = queued.pop_front() {
                        if is_done_line(&line) {
                            return None;
                        }
                        match parse_chunk_line(&line) {
                            Ok(Some(content)) => {
                                return Some((Ok(content), Some((body, lines, queued, ended))));
                            }
                            Ok(None) => continue,
                            Err(e) => return Some((Err(e), None)),
                        }
                    }

                    if ended {
                        tracing::warn!("Provider stream ended without [DONE]");
                        let err = ChatRelayError::Provider(
                            "stream ended before [DONE]".to_string(),
                        );
                        return Some((Err(err.into()), None));
                    }

                    let next = match tokio::time::timeout(idle_timeout, body.next()).await {
                        Ok(next) => next,
                        Err(_) => {
                            let err = ChatRelayError::Network(format!(
                                "Provider stream stalled for {}s",
                                idle_timeout.as_secs()
                            ));
                            return Some((Err(err.into()), None));
                        }
                    };

                    match next {
                        Some(Ok(chunk)) => queued.extend(lines.push(&chunk)),
                        Some(Err(e)) => {
                            let err = ChatRelayError::Network(format!(
                                "Provider stream interrupted: {}",
                                e
                            ));
                            return Some((Err(err.into()), None));
                        }
                        None => {
                            ended = true;
                            queued.extend(lines.finish());
                        }
                    }
                }
            },
        );

        Ok(Box::pin(tokens))
    }
}

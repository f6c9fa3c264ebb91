//! Chat client for the relay
//!
//! [`ChatClient`] posts prompts to a running relay and records both sides
//! of the exchange in its [`HistoryStore`]. Event-stream answers are
//! consumed incrementally and reported through a progress callback; only a
//! completed stream is committed to the history.

use crate::error::{ChatRelayError, Result};
use crate::history::{HistoryStore, Message};
use crate::relay::{PromptRequest, PromptResponse, ResponseSource};
use crate::stream::{consume_stream, StreamUpdate};
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;

/// Assistant message recorded when the relay could not be reached
pub const REQUEST_FAILED_MESSAGE: &str = "Sorry, there was an error processing your request.";

/// Outcome of one prompt exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// The committed assistant answer
    pub content: String,
    /// Answer origin as reported by a JSON response; `None` for streams
    pub source: Option<ResponseSource>,
}

/// Client for `POST /ask` with a persistent history
pub struct ChatClient {
    http: Client,
    base_url: String,
    history: HistoryStore,
}

impl ChatClient {
    /// Create a client for the relay at `base_url`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built or the URL is invalid
    pub fn new(base_url: impl Into<String>, history: HistoryStore) -> Result<Self> {
        let base_url = base_url.into();
        url::Url::parse(&base_url).map_err(|e| {
            ChatRelayError::Config(format!("Invalid backend URL '{}': {}", base_url, e))
        })?;

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("chatrelay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChatRelayError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            history,
        })
    }

    /// Relay base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The conversation history
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Mutable access for conversation management
    pub fn history_mut(&mut self) -> &mut HistoryStore {
        &mut self.history
    }

    /// Send `prompt` and record the exchange in the active conversation
    ///
    /// `on_update` receives the accumulated answer after every streamed
    /// fragment. The user message is recorded before the request is made.
    ///
    /// # Errors
    ///
    /// - `NoActiveConversation` if there is nowhere to record the prompt
    /// - `Network` if the relay is unreachable or answers with a non-2xx
    ///   status, `Parse` if a JSON answer cannot be read;
    ///   [`REQUEST_FAILED_MESSAGE`] is recorded as the answer
    /// - `Parse`, `Stream` or `Network` if an event stream fails; nothing
    ///   is recorded as the answer
    pub async fn send_prompt<F>(&mut self, prompt: &str, mut on_update: F) -> Result<Exchange>
    where
        F: FnMut(&str),
    {
        self.history.add_message(Message::user(prompt))?;

        let url = format!("{}/ask", self.base_url);
        tracing::debug!(url = %url, "Sending prompt");

        let response = match self
            .http
            .post(&url)
            .header(ACCEPT, "text/event-stream, application/json")
            .json(&PromptRequest::new(prompt))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                let status = response.status();
                return self.fail_request(format!("relay returned HTTP {}", status));
            }
            Err(e) => return self.fail_request(format!("request to {} failed: {}", url, e)),
        };

        let is_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/event-stream"))
            .unwrap_or(false);

        if !is_stream {
            let answer: PromptResponse = match response.json().await {
                Ok(answer) => answer,
                Err(e) => {
                    tracing::warn!("Relay answered with an unreadable body: {}", e);
                    self.history
                        .add_message(Message::assistant(REQUEST_FAILED_MESSAGE))?;
                    return Err(ChatRelayError::Parse(format!(
                        "invalid JSON response from relay: {}",
                        e
                    ))
                    .into());
                }
            };
            tracing::debug!(source = ?answer.source, "Received JSON answer");
            self.history
                .add_message(Message::assistant(answer.response.clone()))?;
            return Ok(Exchange {
                content: answer.response,
                source: Some(answer.source),
            });
        }

        let updates = consume_stream(response.bytes_stream());
        futures::pin_mut!(updates);

        while let Some(update) = updates.next().await {
            match update? {
                StreamUpdate::Partial(text) => on_update(&text),
                StreamUpdate::Completed(text) => {
                    tracing::debug!(length = text.len(), "Stream completed");
                    self.history.add_message(Message::assistant(text.clone()))?;
                    return Ok(Exchange {
                        content: text,
                        source: None,
                    });
                }
            }
        }

        Err(ChatRelayError::Stream("stream ended before the completion marker".to_string()).into())
    }

    fn fail_request(&mut self, reason: String) -> Result<Exchange> {
        tracing::warn!("Prompt request failed: {}", reason);
        self.history
            .add_message(Message::assistant(REQUEST_FAILED_MESSAGE))?;
        Err(ChatRelayError::Network(reason).into())
    }
}

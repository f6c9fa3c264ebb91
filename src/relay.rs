//! Prompt relay
//!
//! Forwards a prompt to the configured provider as a single user message and
//! never fails outward: any provider error is replaced by a rule-based
//! fallback answer tagged with `source = "fallback"`. One attempt per prompt,
//! no retries.

use crate::providers::{Message, Provider};
use crate::stream::{fallback_stream, frame_stream, EventStream};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Text returned when the provider answered without content
pub const EMPTY_RESPONSE_TEXT: &str = "No response generated";

const FALLBACK_GREETING: &str = "Hello! I'm currently in fallback mode. How can I help you?";
const FALLBACK_STATUS: &str = "I'm functioning in fallback mode, but I'm here to help!";
const FALLBACK_APOLOGY: &str =
    "I apologize, but I'm currently in fallback mode and can't provide detailed answers.";
const FALLBACK_RETRY: &str =
    "I'm currently in fallback mode. Please try again later or rephrase your question.";

/// Body of `POST /ask`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRequest {
    /// The user's prompt, forwarded as-is
    pub prompt: String,
}

impl PromptRequest {
    /// Create a request for `prompt`
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

/// Where an answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    /// The upstream model answered
    Provider,
    /// The provider failed and a canned answer was used
    Fallback,
}

/// JSON answer of `POST /ask`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptResponse {
    /// Answer text
    pub response: String,
    /// Origin of the answer
    pub source: ResponseSource,
}

/// Pick the canned answer for `prompt`
///
/// First matching rule wins: a greeting for prompts containing "hello" or
/// "hi", a status reply for "how are you" (both case-insensitive), an
/// apology for prompts containing "?", and a generic retry message
/// otherwise. Matching is by substring.
///
/// # Examples
///
/// ```
/// use chatrelay::relay::fallback_response;
///
/// assert_eq!(
///     fallback_response("HELLO there"),
///     "Hello! I'm currently in fallback mode. How can I help you?"
/// );
/// ```
pub fn fallback_response(prompt: &str) -> &'static str {
    let prompt_lower = prompt.to_lowercase();

    if prompt_lower.contains("hello") || prompt_lower.contains("hi") {
        FALLBACK_GREETING
    } else if prompt_lower.contains("how are you") {
        FALLBACK_STATUS
    } else if prompt.contains('?') {
        FALLBACK_APOLOGY
    } else {
        FALLBACK_RETRY
    }
}

/// Relay between incoming prompts and the provider
#[derive(Clone)]
pub struct PromptRelay {
    provider: Arc<dyn Provider>,
}

impl PromptRelay {
    /// Create a relay over `provider`
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// The provider behind this relay
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Answer a prompt with a single response
    ///
    /// Never fails: provider errors produce the fallback answer.
    pub async fn handle_prompt(&self, request: &PromptRequest) -> PromptResponse {
        let messages = [Message::user(request.prompt.as_str())];
        tracing::debug!(prompt_length = request.prompt.len(), "Relaying prompt");

        match self.provider.complete(&messages).await {
            Ok(Some(content)) if !content.is_empty() => {
                tracing::debug!(
                    provider = self.provider.name(),
                    length = content.len(),
                    "Provider answered"
                );
                PromptResponse {
                    response: content,
                    source: ResponseSource::Provider,
                }
            }
            Ok(_) => {
                tracing::debug!(provider = self.provider.name(), "Provider returned no content");
                PromptResponse {
                    response: EMPTY_RESPONSE_TEXT.to_string(),
                    source: ResponseSource::Provider,
                }
            }
            Err(e) => {
                tracing::warn!(
                    provider = self.provider.name(),
                    "Provider call failed, using fallback: {:#}",
                    e
                );
                PromptResponse {
                    response: fallback_response(&request.prompt).to_string(),
                    source: ResponseSource::Fallback,
                }
            }
        }
    }

    /// Answer a prompt as a stream of events
    ///
    /// If the provider stream cannot be opened the result is the fallback
    /// text followed by the terminal event. Failures after the stream is
    /// open end it with an error event.
    pub async fn stream_prompt(&self, request: &PromptRequest) -> EventStream {
        let messages = [Message::user(request.prompt.as_str())];
        tracing::debug!(prompt_length = request.prompt.len(), "Relaying prompt as stream");

        match self.provider.complete_stream(&messages).await {
            Ok(tokens) => {
                tracing::debug!(provider = self.provider.name(), "Provider stream opened");
                frame_stream(tokens)
            }
            Err(e) => {
                tracing::warn!(
                    provider = self.provider.name(),
                    "Provider stream failed to open, using fallback: {:#}",
                    e
                );
                fallback_stream(fallback_response(&request.prompt))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{FakeBehavior, FakeProvider};
    use crate::stream::StreamEvent;
    use futures::StreamExt;

    fn relay(provider: FakeProvider) -> (PromptRelay, Arc<FakeProvider>) {
        let provider = Arc::new(provider);
        (PromptRelay::new(provider.clone()), provider)
    }

    #[test]
    fn test_fallback_greeting_case_insensitive() {
        for prompt in ["hello", "HeLLo world", "Hi!", "oh HI there", "say hi?"] {
            assert_eq!(fallback_response(prompt), FALLBACK_GREETING, "prompt: {prompt}");
        }
    }

    #[test]
    fn test_fallback_greeting_matches_substring() {
        // "this" contains "hi"
        assert_eq!(fallback_response("is this working"), FALLBACK_GREETING);
    }

    #[test]
    fn test_fallback_status() {
        assert_eq!(fallback_response("How are you today"), FALLBACK_STATUS);
        assert_eq!(fallback_response("how are you?"), FALLBACK_STATUS);
    }

    #[test]
    fn test_fallback_apology_for_questions() {
        for prompt in ["What is Rust?", "Where is Paris?", "?"] {
            assert_eq!(fallback_response(prompt), FALLBACK_APOLOGY, "prompt: {prompt}");
        }
    }

    #[test]
    fn test_fallback_generic() {
        assert_eq!(fallback_response("Tell me a joke"), FALLBACK_RETRY);
        assert_eq!(fallback_response(""), FALLBACK_RETRY);
    }

    #[test]
    fn test_response_source_serialization() {
        let json = serde_json::to_value(PromptResponse {
            response: "x".to_string(),
            source: ResponseSource::Fallback,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"response": "x", "source": "fallback"}));
    }

    #[tokio::test]
    async fn test_provider_answer_returned_verbatim() {
        let (relay, provider) = relay(FakeProvider::replying("Paris."));
        let response = relay.handle_prompt(&PromptRequest::new("Capital of France?")).await;

        assert_eq!(response.response, "Paris.");
        assert_eq!(response.source, ResponseSource::Provider);
        assert_eq!(
            provider.last_messages(),
            vec![Message::user("Capital of France?")]
        );
    }

    #[tokio::test]
    async fn test_empty_provider_content_uses_sentinel() {
        for behavior in [FakeBehavior::Reply(None), FakeBehavior::Reply(Some(String::new()))] {
            let (relay, _) = relay(FakeProvider::new(behavior));
            let response = relay.handle_prompt(&PromptRequest::new("x")).await;
            assert_eq!(response.response, EMPTY_RESPONSE_TEXT);
            assert_eq!(response.source, ResponseSource::Provider);
        }
    }

    #[tokio::test]
    async fn test_hello_there_with_provider_unavailable() {
        let (relay, provider) = relay(FakeProvider::unavailable("connection refused"));
        let response = relay.handle_prompt(&PromptRequest::new("hello there")).await;

        assert_eq!(
            response,
            PromptResponse {
                response: "Hello! I'm currently in fallback mode. How can I help you?".to_string(),
                source: ResponseSource::Fallback,
            }
        );
        assert_eq!(provider.calls(), 1, "no retry expected");
    }

    #[tokio::test]
    async fn test_empty_prompt_forwarded() {
        let (relay, provider) = relay(FakeProvider::replying("ok"));
        relay.handle_prompt(&PromptRequest::new("")).await;
        assert_eq!(provider.last_messages(), vec![Message::user("")]);
    }

    #[tokio::test]
    async fn test_stream_prompt_frames_fragments() {
        let (relay, _) = relay(FakeProvider::streaming(["Hi", " there", "!"]));
        let events: Vec<_> = relay
            .stream_prompt(&PromptRequest::new("greet me"))
            .await
            .collect()
            .await;

        assert_eq!(
            events,
            vec![
                StreamEvent::Content("Hi".to_string()),
                StreamEvent::Content(" there".to_string()),
                StreamEvent::Content("!".to_string()),
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_prompt_setup_failure_uses_fallback_stream() {
        let (relay, _) = relay(FakeProvider::unavailable("401 Unauthorized"));
        let events: Vec<_> = relay
            .stream_prompt(&PromptRequest::new("Where is Paris?"))
            .await
            .collect()
            .await;

        assert_eq!(
            events,
            vec![
                StreamEvent::Content(FALLBACK_APOLOGY.to_string()),
                StreamEvent::Done
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_prompt_mid_stream_failure_ends_with_error() {
        let (relay, _) = relay(FakeProvider::new(FakeBehavior::FailMidStream(
            vec!["par".to_string()],
            "rate limited".to_string(),
        )));
        let events: Vec<_> = relay
            .stream_prompt(&PromptRequest::new("x"))
            .await
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert!(matches!(&events[1], StreamEvent::Error(m) if m.contains("rate limited")));
    }
}

//! Base provider trait and common types for chatrelay
//!
//! This module defines the Provider trait that completion backends implement,
//! along with the message type sent upstream and the token stream type
//! returned by streaming completions.

use crate::error::Result;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Message sent to the upstream provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (user, assistant, system)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl Message {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use chatrelay::providers::Message;
    ///
    /// let msg = Message::user("Hello, assistant!");
    /// assert_eq!(msg.role, "user");
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Stream of content fragments produced by a streaming completion
///
/// The stream is finite: it ends when the provider signals completion, and
/// yields an `Err` item when the provider fails part way through.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Completion provider
///
/// Implementations are stateless per call: every request carries the full
/// message list and nothing is retained between calls.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &str;

    /// Model identifier requests are sent with
    fn model(&self) -> &str;

    /// Request a single completion
    ///
    /// Returns `Ok(None)` when the provider answered without any content.
    ///
    /// # Errors
    ///
    /// Returns error on transport, authentication, status or decoding failures
    async fn complete(&self, messages: &[Message]) -> Result<Option<String>>;

    /// Open a streaming completion
    ///
    /// # Errors
    ///
    /// Returns error if the stream cannot be opened. Failures after the
    /// stream is open are delivered as `Err` items on the stream.
    async fn complete_stream(&self, messages: &[Message]) -> Result<TokenStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message() {
        let msg = Message::user("hi");
        assert_eq!(msg.role, "user");
        assert_eq!(msg.content, "hi");
    }

    #[test]
    fn test_message_serializes_openai_shape() {
        let json = serde_json::to_value(Message::assistant("ok")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "ok"}));
    }
}

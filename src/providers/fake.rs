//! Scripted provider for tests and offline runs
//!
//! [`FakeProvider`] answers every call according to a fixed
//! [`FakeBehavior`] and counts the calls it received, which lets tests
//! check that the relay makes exactly one attempt per prompt.

use crate::error::{ChatRelayError, Result};
use crate::providers::{Message, Provider, TokenStream};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// What a [`FakeProvider`] does when called
#[derive(Debug, Clone)]
pub enum FakeBehavior {
    /// Answer with the given content (or no content at all)
    Reply(Option<String>),
    /// Stream the given fragments, then complete
    Fragments(Vec<String>),
    /// Stream the given fragments, then fail with the message
    FailMidStream(Vec<String>, String),
    /// Fail every call before producing anything
    Unavailable(String),
}

/// Provider double with scripted behavior
#[derive(Debug)]
pub struct FakeProvider {
    behavior: FakeBehavior,
    calls: AtomicUsize,
    last_messages: Mutex<Vec<Message>>,
}

impl FakeProvider {
    /// Create a provider that always behaves as `behavior`
    pub fn new(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            last_messages: Mutex::new(Vec::new()),
        }
    }

    /// Shorthand for [`FakeBehavior::Reply`] with content
    pub fn replying(content: impl Into<String>) -> Self {
        Self::new(FakeBehavior::Reply(Some(content.into())))
    }

    /// Shorthand for [`FakeBehavior::Fragments`]
    pub fn streaming<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(FakeBehavior::Fragments(
            fragments.into_iter().map(Into::into).collect(),
        ))
    }

    /// Shorthand for [`FakeBehavior::Unavailable`]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::new(FakeBehavior::Unavailable(reason.into()))
    }

    /// Number of `complete`/`complete_stream` calls received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Messages passed on the most recent call
    pub fn last_messages(&self) -> Vec<Message> {
        self.last_messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    fn record(&self, messages: &[Message]) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_messages.lock() {
            *last = messages.to_vec();
        }
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "fake-model"
    }

    async fn complete(&self, messages: &[Message]) -> Result<Option<String>> {
        self.record(messages);
        match &self.behavior {
            FakeBehavior::Reply(content) => Ok(content.clone()),
            FakeBehavior::Fragments(fragments) => Ok(Some(fragments.concat())),
            FakeBehavior::FailMidStream(_, reason) | FakeBehavior::Unavailable(reason) => {
                Err(ChatRelayError::Provider(reason.clone()).into())
            }
        }
    }

    async fn complete_stream(&self, messages: &[Message]) -> Result<TokenStream> {
        self.record(messages);
        let items: Vec<Result<String>> = match &self.behavior {
            FakeBehavior::Reply(content) => content.iter().cloned().map(Ok).collect(),
            FakeBehavior::Fragments(fragments) => fragments.iter().cloned().map(Ok).collect(),
            FakeBehavior::FailMidStream(fragments, reason) => fragments
                .iter()
                .cloned()
                .map(Ok)
                .chain(std::iter::once(Err(
                    ChatRelayError::Provider(reason.clone()).into()
                )))
                .collect(),
            FakeBehavior::Unavailable(reason) => {
                return Err(ChatRelayError::Provider(reason.clone()).into());
            }
        };
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_reply_counts_calls() {
        let provider = FakeProvider::replying("pong");
        let answer = provider.complete(&[Message::user("ping")]).await.unwrap();
        assert_eq!(answer.as_deref(), Some("pong"));
        assert_eq!(provider.calls(), 1);
        assert_eq!(provider.last_messages(), vec![Message::user("ping")]);
    }

    #[tokio::test]
    async fn test_fail_mid_stream_yields_error_last() {
        let provider = FakeProvider::new(FakeBehavior::FailMidStream(
            vec!["a".to_string()],
            "boom".to_string(),
        ));
        let items: Vec<_> = provider
            .complete_stream(&[Message::user("x")])
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }

    #[tokio::test]
    async fn test_unavailable_fails_stream_setup() {
        let provider = FakeProvider::unavailable("down");
        assert!(provider.complete_stream(&[]).await.is_err());
    }
}

//! Event framing for the streaming `/ask` path
//!
//! Provider fragments become `data: {"content": ...}` events, completion
//! becomes `data: {"done": true}`, and a provider failure part way through
//! becomes `data: {"error": ...}` followed by the end of the stream.

use crate::providers::TokenStream;
use futures::{Stream, StreamExt};
use serde_json::json;
use std::pin::Pin;

/// One framed event on the relay's event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A content fragment
    Content(String),
    /// Terminal marker; nothing follows it
    Done,
    /// The provider failed mid-stream; nothing follows it
    Error(String),
}

/// Boxed stream of relay events
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

impl StreamEvent {
    /// JSON payload carried by the event
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Content(content) => json!({ "content": content }),
            Self::Done => json!({ "done": true }),
            Self::Error(error) => json!({ "error": error }),
        }
    }

    /// Wire form: a `data:` line terminated by a blank line
    ///
    /// # Examples
    ///
    /// ```
    /// use chatrelay::stream::StreamEvent;
    ///
    /// assert_eq!(StreamEvent::Done.frame(), "data: {\"done\":true}\n\n");
    /// ```
    pub fn frame(&self) -> String {
        format!("data: {}\n\n", self.to_json())
    }

    /// Whether this event ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }
}

/// Frame a provider token stream
///
/// Empty fragments are dropped. Exhaustion yields [`StreamEvent::Done`]; an
/// error item yields [`StreamEvent::Error`] and ends the stream without a
/// terminal `Done`.
pub fn frame_stream(tokens: TokenStream) -> EventStream {
    Box::pin(futures::stream::unfold(
        Some(tokens),
        |state| async move {
            let mut tokens = state?;
            loop {
                match tokens.next().await {
                    Some(Ok(fragment)) if fragment.is_empty() => continue,
                    Some(Ok(fragment)) => {
                        return Some((StreamEvent::Content(fragment), Some(tokens)));
                    }
                    Some(Err(e)) => {
                        tracing::warn!("Provider stream failed mid-response: {}", e);
                        return Some((StreamEvent::Error(e.to_string()), None));
                    }
                    None => return Some((StreamEvent::Done, None)),
                }
            }
        },
    ))
}

/// Two-event stream used when the provider stream cannot be opened
pub fn fallback_stream(text: impl Into<String>) -> EventStream {
    Box::pin(futures::stream::iter(vec![
        StreamEvent::Content(text.into()),
        StreamEvent::Done,
    ]))
}

//! Incremental consumer for the relay's event stream
//!
//! [`consume_stream`] turns a chunked response body into a lazy sequence of
//! [`StreamUpdate`]s. Each `content` event extends an accumulator and yields
//! the text so far; the `done` event yields the final text and ends the
//! sequence. Any failure yields one `Err` and ends the sequence, discarding
//! whatever had been accumulated.

use crate::error::{ChatRelayError, Result};
use crate::stream::LineBuffer;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

/// Progress reported while consuming an event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamUpdate {
    /// Accumulated content after a `content` event
    Partial(String),
    /// Final content; the terminal marker was seen
    Completed(String),
}

/// Loose view of an event payload; unknown fields are ignored
#[derive(Debug, Default, Deserialize)]
struct EventPayload {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    done: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

struct ConsumerState<S> {
    body: Pin<Box<S>>,
    lines: LineBuffer,
    queued: VecDeque<String>,
    accumulated: String,
    body_ended: bool,
    finished: bool,
}

enum LineOutcome {
    Skip,
    Yield(Result<StreamUpdate>),
}

impl<S> ConsumerState<S> {
    fn handle_line(&mut self, line: &str) -> LineOutcome {
        let Some(data) = line.strip_prefix("data:") else {
            return LineOutcome::Skip;
        };
        let data = data.trim();
        if data.is_empty() {
            return LineOutcome::Skip;
        }

        let payload: EventPayload = match serde_json::from_str(data) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Failed to parse event payload: {}", e);
                self.finished = true;
                return LineOutcome::Yield(Err(ChatRelayError::Parse(format!(
                    "invalid event payload '{}': {}",
                    data, e
                ))
                .into()));
            }
        };

        if let Some(error) = payload.error {
            self.finished = true;
            return LineOutcome::Yield(Err(ChatRelayError::Stream(error).into()));
        }

        if payload.done == Some(true) {
            self.finished = true;
            let content = std::mem::take(&mut self.accumulated);
            tracing::debug!(length = content.len(), "Event stream completed");
            return LineOutcome::Yield(Ok(StreamUpdate::Completed(content)));
        }

        match payload.content {
            Some(content) if !content.is_empty() => {
                self.accumulated.push_str(&content);
                LineOutcome::Yield(Ok(StreamUpdate::Partial(self.accumulated.clone())))
            }
            _ => LineOutcome::Skip,
        }
    }
}

/// Consume a chunked event-stream body
///
/// The body is read sequentially by a single reader. Reading stops (and the
/// body is dropped) after `done`, after an `error` event, after a payload
/// that is not valid JSON, after a read failure, or when the body ends
/// without a terminal marker. The last three surface as `Parse`, `Network`
/// and `Stream` errors respectively.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use chatrelay::stream::{consume_stream, StreamUpdate};
/// use futures::StreamExt;
///
/// # tokio_test::block_on(async {
/// let body = futures::stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from(
///     "data: {\"content\":\"Hi\"}\n\ndata: {\"done\":true}\n\n",
/// ))]);
/// let updates: Vec<_> = consume_stream(body).collect().await;
/// assert_eq!(updates.len(), 2);
/// assert_eq!(updates[1].as_ref().unwrap(), &StreamUpdate::Completed("Hi".into()));
/// # });
/// ```
pub fn consume_stream<S, E>(body: S) -> impl Stream<Item = Result<StreamUpdate>>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Display,
{
    let state = ConsumerState {
        body: Box::pin(body),
        lines: LineBuffer::new(),
        queued: VecDeque::new(),
        accumulated: String::new(),
        body_ended: false,
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }

            if let Some(line) = state.queued.pop_front() {
                match state.handle_line(&line) {
                    LineOutcome::Skip => continue,
                    LineOutcome::Yield(item) => return Some((item, state)),
                }
            }

            if state.body_ended {
                state.finished = true;
                let err = ChatRelayError::Stream(
                    "stream ended before the completion marker".to_string(),
                );
                return Some((Err(err.into()), state));
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let lines = state.lines.push(&chunk);
                    state.queued.extend(lines);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    let err = ChatRelayError::Network(format!("failed to read stream: {}", e));
                    return Some((Err(err.into()), state));
                }
                None => {
                    state.body_ended = true;
                    if let Some(tail) = state.lines.finish() {
                        state.queued.push_back(tail);
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(chunks: Vec<&str>) -> impl Stream<Item = std::result::Result<Bytes, std::io::Error>> {
        let chunks: Vec<_> = chunks
            .into_iter()
            .map(|c| Ok(Bytes::from(c.to_string())))
            .collect();
        futures::stream::iter(chunks)
    }

    async fn collect(
        body: impl Stream<Item = std::result::Result<Bytes, std::io::Error>>,
    ) -> Vec<Result<StreamUpdate>> {
        consume_stream(body).collect().await
    }

    fn error_kind(item: &Result<StreamUpdate>) -> &ChatRelayError {
        item.as_ref()
            .unwrap_err()
            .downcast_ref::<ChatRelayError>()
            .expect("tagged error")
    }

    #[tokio::test]
    async fn test_fragments_accumulate_then_complete() {
        let updates = collect(body(vec![
            "data: {\"content\": \"Hi\"}\n\n",
            "data: {\"content\": \" there\"}\n\n",
            "data: {\"content\": \"!\"}\n\n",
            "data: {\"done\": true}\n\n",
        ]))
        .await;

        let updates: Vec<StreamUpdate> = updates.into_iter().map(|u| u.unwrap()).collect();
        assert_eq!(
            updates,
            vec![
                StreamUpdate::Partial("Hi".to_string()),
                StreamUpdate::Partial("Hi there".to_string()),
                StreamUpdate::Partial("Hi there!".to_string()),
                StreamUpdate::Completed("Hi there!".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_event_split_across_reads() {
        let updates = collect(body(vec![
            "data: {\"cont",
            "ent\": \"Hel",
            "lo\"}\n",
            "\ndata: {\"done\"",
            ": true}\n\n",
        ]))
        .await;

        assert_eq!(updates.len(), 2);
        assert_eq!(
            updates[0].as_ref().unwrap(),
            &StreamUpdate::Partial("Hello".to_string())
        );
        assert_eq!(
            updates[1].as_ref().unwrap(),
            &StreamUpdate::Completed("Hello".to_string())
        );
    }

    #[tokio::test]
    async fn test_reading_stops_after_done() {
        let updates = collect(body(vec![
            "data: {\"content\": \"a\"}\n\ndata: {\"done\": true}\n\n",
            "data: {\"content\": \"ignored\"}\n\n",
        ]))
        .await;

        assert_eq!(updates.len(), 2);
        assert!(matches!(
            updates.last().unwrap(),
            Ok(StreamUpdate::Completed(text)) if text == "a"
        ));
    }

    #[tokio::test]
    async fn test_error_event_aborts() {
        let updates = collect(body(vec![
            "data: {\"content\": \"partial\"}\n\n",
            "data: {\"error\": \"upstream failed\"}\n\n",
            "data: {\"done\": true}\n\n",
        ]))
        .await;

        assert_eq!(updates.len(), 2);
        match error_kind(&updates[1]) {
            ChatRelayError::Stream(message) => assert_eq!(message, "upstream failed"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let updates = collect(body(vec!["data: {not json}\n\n", "data: {\"done\": true}\n\n"])).await;

        assert_eq!(updates.len(), 1);
        assert!(matches!(error_kind(&updates[0]), ChatRelayError::Parse(_)));
    }

    #[tokio::test]
    async fn test_missing_done_is_stream_error() {
        let updates = collect(body(vec!["data: {\"content\": \"cut off\"}\n\n"])).await;

        assert_eq!(updates.len(), 2);
        assert!(matches!(error_kind(&updates[1]), ChatRelayError::Stream(_)));
    }

    #[tokio::test]
    async fn test_unterminated_final_done_line_is_honoured() {
        let updates = collect(body(vec!["data: {\"content\": \"x\"}\n\ndata: {\"done\": true}"])).await;

        assert!(matches!(
            updates.last().unwrap(),
            Ok(StreamUpdate::Completed(text)) if text == "x"
        ));
    }

    #[tokio::test]
    async fn test_read_failure_is_network_error() {
        let chunks: Vec<std::result::Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from("data: {\"content\": \"a\"}\n\n")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ];
        let updates = collect(futures::stream::iter(chunks)).await;

        assert_eq!(updates.len(), 2);
        assert!(matches!(error_kind(&updates[1]), ChatRelayError::Network(_)));
    }

    #[tokio::test]
    async fn test_non_data_lines_ignored() {
        let updates = collect(body(vec![
            ": keep-alive\n\nevent: message\nid: 1\ndata: {\"content\": \"ok\"}\n\n",
            "data: {\"done\": true}\n\n",
        ]))
        .await;

        assert_eq!(updates.len(), 2);
        assert!(updates.iter().all(|u| u.is_ok()));
    }
}

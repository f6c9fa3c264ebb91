//! chatrelay - prompt relay server and chat client library
//!
//! The server side relays single prompts to an OpenAI-compatible chat
//! completion API and answers either with one JSON body or with a stream
//! of framed events. Provider failures never reach the caller: a canned
//! fallback answer is returned instead.
//!
//! The client side consumes those streams and keeps a persistent,
//! multi-conversation chat history.
//!
//! # Architecture
//!
//! - `relay`: prompt handling and fallback answers
//! - `providers`: completion provider abstraction and the OpenAI client
//! - `stream`: event framing (server) and consumption (client)
//! - `server`: axum router for `GET /` and `POST /ask`
//! - `client`: chat client recording exchanges in the history
//! - `history`: conversation history store
//! - `storage`: key-value slots the history is persisted in
//! - `config`, `cli`, `error`: configuration, command line and errors
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chatrelay::providers::FakeProvider;
//! use chatrelay::relay::{PromptRelay, PromptRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let relay = PromptRelay::new(Arc::new(FakeProvider::replying("Hi!")));
//!     let answer = relay.handle_prompt(&PromptRequest::new("hello")).await;
//!     println!("{} ({:?})", answer.response, answer.source);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod history;
pub mod providers;
pub mod relay;
pub mod server;
pub mod storage;
pub mod stream;

// Re-export commonly used types
pub use client::{ChatClient, Exchange};
pub use config::Config;
pub use error::{ChatRelayError, Result};
pub use history::HistoryStore;
pub use relay::{PromptRelay, PromptRequest, PromptResponse, ResponseSource};

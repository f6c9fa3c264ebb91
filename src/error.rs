//! Error types for chatrelay
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for chatrelay operations
///
/// Variants are tagged by kind so that the relay, the stream consumer and
/// the chat client can branch on what went wrong (provider, network,
/// parse, stream) instead of on the mere presence of an error.
#[derive(Error, Debug)]
pub enum ChatRelayError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-related errors (API calls, bad status, malformed payloads)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Missing credentials for provider
    #[error("Missing credentials for provider: {0}")]
    MissingCredentials(String),

    /// Transport failures talking to the backend or reading a body
    #[error("Network error: {0}")]
    Network(String),

    /// An event payload could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// The event stream reported an error or ended abnormally
    #[error("Stream error: {0}")]
    Stream(String),

    /// History storage errors (key-value slot operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// A message was added while no conversation is active
    #[error("No active conversation")]
    NoActiveConversation,

    /// The requested conversation id does not exist
    #[error("Unknown conversation: {0}")]
    UnknownConversation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for chatrelay operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation. Callers that
/// need the kind use `downcast_ref::<ChatRelayError>()`.
pub type Result<T> = anyhow::Result<T>;

//! Configuration management for chatrelay
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//! Precedence is file < environment < command line.

use crate::cli::{Cli, Commands};
use crate::error::{ChatRelayError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Main configuration structure for chatrelay
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Upstream completion provider settings
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Relay server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Chat client settings
    #[serde(default)]
    pub client: ClientConfig,
}

/// Provider configuration
///
/// Points at an OpenAI-compatible `chat/completions` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key sent as a bearer token. Requests fail (and fall back) without it.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL; `/chat/completions` is appended
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Timeout (seconds) for a JSON exchange; for streams, the longest wait
    /// for headers or between two chunks
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_provider_timeout() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            api_base: default_api_base(),
            timeout_seconds: default_provider_timeout(),
        }
    }
}

/// How the `/ask` endpoint answers
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Always a single `application/json` body
    Json,
    /// Always a `text/event-stream` body
    Stream,
    /// Stream when the request accepts `text/event-stream`, JSON otherwise
    #[default]
    Auto,
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Stream => write!(f, "stream"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

impl FromStr for ResponseMode {
    type Err = ChatRelayError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "stream" => Ok(Self::Stream),
            "auto" => Ok(Self::Auto),
            other => Err(ChatRelayError::Config(format!(
                "Invalid response mode: {}. Must be one of: json, stream, auto",
                other
            ))),
        }
    }
}

/// Relay server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Browser origin allowed to call the relay cross-origin
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,

    /// Response mode for `/ask`
    #[serde(default)]
    pub response_mode: ResponseMode,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_allowed_origin() -> String {
    "http://localhost:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origin: default_allowed_origin(),
            response_mode: ResponseMode::default(),
        }
    }
}

/// Where the chat history slot lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    /// Embedded sled database
    #[default]
    Sled,
    /// One JSON file per key in a directory
    File,
    /// Process memory only; nothing survives exit
    Memory,
}

impl FromStr for HistoryBackend {
    type Err = ChatRelayError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sled" => Ok(Self::Sled),
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(ChatRelayError::Config(format!(
                "Invalid history backend: {}. Must be one of: sled, file, memory",
                other
            ))),
        }
    }
}

/// Chat client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the relay the client talks to
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Location of the history store; the user data directory when unset
    #[serde(default)]
    pub history_path: Option<String>,

    /// History storage backend
    #[serde(default)]
    pub history_backend: HistoryBackend,
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            history_path: None,
            history_backend: HistoryBackend::default(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error: defaults are used and a warning is
    /// logged.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file
    /// * `cli` - Parsed command line, used for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ChatRelayError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ChatRelayError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            if !api_key.is_empty() {
                self.provider.api_key = Some(api_key);
            }
        }

        if let Ok(model) = std::env::var("MODEL_NAME") {
            self.provider.model = model;
        }

        if let Ok(api_base) = std::env::var("CHATRELAY_API_BASE") {
            self.provider.api_base = api_base;
        }

        if let Ok(timeout) = std::env::var("CHATRELAY_PROVIDER_TIMEOUT") {
            if let Ok(value) = timeout.parse() {
                self.provider.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid CHATRELAY_PROVIDER_TIMEOUT: {}", timeout);
            }
        }

        if let Ok(host) = std::env::var("CHATRELAY_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(value) = port.parse() {
                self.server.port = value;
            } else {
                tracing::warn!("Invalid PORT: {}", port);
            }
        }

        if let Ok(origin) = std::env::var("FRONTEND_URL") {
            self.server.allowed_origin = origin;
        }

        if let Ok(mode) = std::env::var("CHATRELAY_RESPONSE_MODE") {
            match mode.parse() {
                Ok(value) => self.server.response_mode = value,
                Err(e) => tracing::warn!("{}, using {}", e, self.server.response_mode),
            }
        }

        if let Ok(backend_url) = std::env::var("CHAT_API_URL") {
            self.client.backend_url = backend_url;
        }

        if let Ok(history_path) = std::env::var("CHATRELAY_HISTORY_DB") {
            tracing::debug!(history_path = %history_path, "Env override: CHATRELAY_HISTORY_DB");
            self.client.history_path = Some(history_path);
        }

        if let Ok(backend) = std::env::var("CHATRELAY_HISTORY_BACKEND") {
            match backend.parse() {
                Ok(value) => self.client.history_backend = value,
                Err(e) => tracing::warn!("{}", e),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(path) = &cli.storage_path {
            self.client.history_path = Some(path.clone());
        }

        match &cli.command {
            Commands::Serve { host, port, mode } => {
                if let Some(host) = host {
                    self.server.host = host.clone();
                }
                if let Some(port) = port {
                    self.server.port = *port;
                }
                if let Some(mode) = mode {
                    self.server.response_mode = *mode;
                }
            }
            Commands::Ask { backend_url, .. } | Commands::Chat { backend_url } => {
                if let Some(url) = backend_url {
                    self.client.backend_url = url.clone();
                }
            }
            Commands::History { .. } => {}
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.provider.model.trim().is_empty() {
            return Err(ChatRelayError::Config("provider.model cannot be empty".to_string()).into());
        }

        if self.provider.timeout_seconds == 0 {
            return Err(ChatRelayError::Config(
                "provider.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        url::Url::parse(&self.provider.api_base).map_err(|e| {
            ChatRelayError::Config(format!(
                "Invalid provider.api_base '{}': {}",
                self.provider.api_base, e
            ))
        })?;

        if self.server.port == 0 {
            return Err(
                ChatRelayError::Config("server.port must be greater than 0".to_string()).into(),
            );
        }

        url::Url::parse(&self.server.allowed_origin).map_err(|e| {
            ChatRelayError::Config(format!(
                "Invalid server.allowed_origin '{}': {}",
                self.server.allowed_origin, e
            ))
        })?;

        url::Url::parse(&self.client.backend_url).map_err(|e| {
            ChatRelayError::Config(format!(
                "Invalid client.backend_url '{}': {}",
                self.client.backend_url, e
            ))
        })?;

        Ok(())
    }
}

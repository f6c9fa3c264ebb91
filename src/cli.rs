//! Command-line interface definition for chatrelay
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for serving the relay, chatting against it and
//! managing the local conversation history.

use crate::config::ResponseMode;
use clap::{Parser, Subcommand};

/// chatrelay - prompt relay server and chat client
///
/// Serve a prompt relay in front of an OpenAI-compatible completion API,
/// or talk to a running relay with a persistent local chat history.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatrelay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the history database location
    #[arg(long, env = "CHATRELAY_HISTORY_DB")]
    pub storage_path: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for chatrelay
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP relay server
    Serve {
        /// Address to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// How `/ask` responds: json, stream or auto (negotiated via Accept)
        #[arg(short, long, value_enum)]
        mode: Option<ResponseMode>,
    },

    /// Send a single prompt to the relay and print the answer
    Ask {
        /// Prompt text
        prompt: String,

        /// Relay base URL
        #[arg(short, long)]
        backend_url: Option<String>,

        /// Start a new conversation before asking
        #[arg(short, long)]
        new: bool,
    },

    /// Start an interactive chat session against the relay
    Chat {
        /// Relay base URL
        #[arg(short, long)]
        backend_url: Option<String>,
    },

    /// Manage the local conversation history
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

/// History management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List conversations
    List,

    /// Print the messages of a conversation (the active one by default)
    Show {
        /// Conversation ID
        id: Option<String>,
    },

    /// Create a new conversation and make it active
    New,

    /// Make a conversation active
    Switch {
        /// Conversation ID
        id: String,
    },

    /// Delete a conversation
    Delete {
        /// Conversation ID
        id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

//! Special commands parser for interactive chat
//!
//! Lines starting with `/` manage conversations instead of being sent to
//! the relay. Command names are case-insensitive; conversation ids are
//! passed through as typed.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Commands handled by the chat loop itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Start a new conversation
    New,
    /// List conversations
    List,
    /// Make the conversation with this id (or id prefix) active
    Switch(String),
    /// Delete the conversation with this id (or id prefix)
    Delete(String),
    /// Show help
    Help,
    /// Leave the session
    Exit,
    /// Not a special command; send the line as a prompt
    None,
}

/// Parse a line of chat input
///
/// # Errors
///
/// Returns `CommandError` for unknown commands and for `/switch` or
/// `/delete` without an id.
///
/// # Examples
///
/// ```
/// use chatrelay::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/NEW").unwrap(), SpecialCommand::New);
/// assert_eq!(
///     parse_special_command("/switch 01HX").unwrap(),
///     SpecialCommand::Switch("01HX".to_string())
/// );
/// assert_eq!(parse_special_command("hello").unwrap(), SpecialCommand::None);
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

    match (command.as_str(), arg) {
        ("/new", _) => Ok(SpecialCommand::New),
        ("/list" | "/ls", _) => Ok(SpecialCommand::List),
        ("/switch", Some(id)) => Ok(SpecialCommand::Switch(id.to_string())),
        ("/delete" | "/rm", Some(id)) => Ok(SpecialCommand::Delete(id.to_string())),
        ("/switch", None) => Err(CommandError::MissingArgument {
            command: "/switch".to_string(),
            usage: "/switch <id>".to_string(),
        }),
        ("/delete" | "/rm", None) => Err(CommandError::MissingArgument {
            command: "/delete".to_string(),
            usage: "/delete <id>".to_string(),
        }),
        ("/help" | "/?", _) => Ok(SpecialCommand::Help),
        ("exit" | "quit" | "/exit" | "/quit", _) => Ok(SpecialCommand::Exit),
        (other, _) => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands
================

  /new            - Start a new conversation
  /list           - List conversations (active one marked with *)
  /switch <id>    - Switch to a conversation (an id prefix is enough)
  /delete <id>    - Delete a conversation
  /help           - Show this help
  /exit           - Leave the chat (also: exit, quit, Ctrl-D)

Anything else is sent to the relay as a prompt.
"#
    );
}

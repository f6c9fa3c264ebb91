/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `serve`: Run the relay HTTP server
- `ask`: Send one prompt and print the answer as it arrives
- `chat`: Interactive chat loop with conversation management
- `history`: Inspect and manage the local conversation history
*/

use crate::client::ChatClient;
use crate::config::Config;
use crate::error::Result;
use crate::history::HistoryStore;
use crate::storage::open_store;
use std::io::Write;

// Special commands parser for the chat loop
pub mod special_commands;

// History management commands
pub mod history;

/// Open the configured history and build a client for it
fn build_client(config: &Config) -> Result<ChatClient> {
    let storage = open_store(&config.client)?;
    let history = HistoryStore::load(storage)?;
    ChatClient::new(config.client.backend_url.clone(), history)
}

/// Print the growing answer in place of what was printed before
///
/// Partial updates carry the whole accumulated text, so only the suffix
/// that has not been written yet is printed.
struct ProgressPrinter {
    printed: usize,
}

impl ProgressPrinter {
    fn new() -> Self {
        Self { printed: 0 }
    }

    fn update(&mut self, text: &str) {
        if text.len() < self.printed || !text.is_char_boundary(self.printed) {
            return;
        }
        print!("{}", &text[self.printed..]);
        let _ = std::io::stdout().flush();
        self.printed = text.len();
    }

    /// Print whatever of `text` has not been shown yet and end the line
    fn finish(&mut self, text: &str) {
        if self.printed == 0 {
            println!("{}", text);
        } else {
            self.update(text);
            println!();
        }
    }
}

// Relay server command handler
pub mod serve {
    use super::*;

    /// Run the relay server
    pub async fn run_serve(config: Config) -> Result<()> {
        tracing::info!("Starting relay server");
        crate::server::serve(&config).await
    }
}

// Single prompt command handler
pub mod ask {
    use super::*;

    /// Send `prompt` to the relay and print the answer
    ///
    /// With `new_conversation` the prompt goes to a freshly created
    /// conversation instead of the active one.
    pub async fn run_ask(config: Config, prompt: String, new_conversation: bool) -> Result<()> {
        let mut client = build_client(&config)?;

        if new_conversation || client.history().active_conversation().is_none() {
            client.history_mut().create_conversation()?;
        }

        let mut printer = ProgressPrinter::new();
        let result = client.send_prompt(&prompt, |text| printer.update(text)).await;
        match result {
            Ok(exchange) => {
                printer.finish(&exchange.content);
                Ok(())
            }
            Err(e) => {
                if printer.printed > 0 {
                    println!();
                }
                Err(e)
            }
        }
    }
}

// Chat command handler
pub mod chat {
    //! Interactive chat
    //!
    //! readline-based loop that sends prompts to the relay and handles
    //! the `/` conversation commands locally.

    use super::history::{print_conversation, print_conversations, resolve};
    use super::special_commands::{parse_special_command, print_help, SpecialCommand};
    use super::*;
    use crate::client::REQUEST_FAILED_MESSAGE;
    use crate::history::Role;
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start the interactive chat loop
    pub async fn run_chat(config: Config) -> Result<()> {
        let mut client = build_client(&config)?;
        let mut rl = DefaultEditor::new()?;

        print_welcome_banner(client.base_url());
        if let Some(conversation) = client.history().active_conversation() {
            print_conversation(conversation);
        }

        loop {
            match rl.readline(&format!("{} ", ">>".cyan().bold())) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(trimmed)?;

                    let command = match parse_special_command(trimmed) {
                        Ok(command) => command,
                        Err(e) => {
                            eprintln!("{}\n", e.to_string().yellow());
                            continue;
                        }
                    };

                    match command {
                        SpecialCommand::None => send(&mut client, trimmed).await,
                        SpecialCommand::Exit => break,
                        other => {
                            if let Err(e) = handle_special(&mut client, other) {
                                eprintln!("{}\n", format!("Error: {}", e).red());
                            }
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    async fn send(client: &mut ChatClient, prompt: &str) {
        if client.history().active_conversation().is_none() {
            println!(
                "{}\n",
                "No active conversation. Use /new to start one.".yellow()
            );
            return;
        }

        let mut printer = ProgressPrinter::new();
        println!();
        let result = client.send_prompt(prompt, |text| printer.update(text)).await;
        match result {
            Ok(exchange) => {
                printer.finish(&exchange.content);
                println!();
            }
            Err(e) => {
                if printer.printed > 0 {
                    println!();
                }
                let recorded_apology = client
                    .history()
                    .active_messages()
                    .last()
                    .map(|m| m.role == Role::Assistant && m.content == REQUEST_FAILED_MESSAGE)
                    .unwrap_or(false);
                if recorded_apology {
                    println!("{}\n", REQUEST_FAILED_MESSAGE);
                }
                eprintln!("{}\n", format!("Error: {}", e).red());
            }
        }
    }

    fn handle_special(client: &mut ChatClient, command: SpecialCommand) -> Result<()> {
        match command {
            SpecialCommand::New => {
                let id = client.history_mut().create_conversation()?;
                println!("{}\n", format!("Started conversation {}", id).green());
                if let Some(conversation) = client.history().active_conversation() {
                    print_conversation(conversation);
                }
            }
            SpecialCommand::List => print_conversations(client.history()),
            SpecialCommand::Switch(id) => {
                let id = resolve(client.history(), &id)?;
                client.history_mut().switch_conversation(&id)?;
                if let Some(conversation) = client.history().active_conversation() {
                    print_conversation(conversation);
                }
            }
            SpecialCommand::Delete(id) => {
                let id = resolve(client.history(), &id)?;
                client.history_mut().delete_conversation(&id)?;
                println!("{}\n", format!("Deleted conversation {}", id).green());
                match client.history().active_conversation() {
                    Some(conversation) => {
                        println!("Active conversation is now {}\n", conversation.id.cyan())
                    }
                    None => println!(
                        "{}\n",
                        "No conversations left. Use /new to start one.".yellow()
                    ),
                }
            }
            SpecialCommand::Help => print_help(),
            SpecialCommand::Exit | SpecialCommand::None => {}
        }
        Ok(())
    }

    fn print_welcome_banner(backend_url: &str) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                chatrelay Interactive Chat                    ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Relay:  {}", backend_url.cyan());
        println!("Type '/help' for available commands, '/exit' to quit\n");
    }
}

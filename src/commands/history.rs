use crate::cli::HistoryCommand;
use crate::config::Config;
use crate::error::{ChatRelayError, Result};
use crate::history::{Conversation, HistoryStore, Role};
use crate::storage::open_store;
use colored::Colorize;
use prettytable::{format, Table};

/// Handle history commands against the configured store
pub fn handle_history(config: &Config, command: HistoryCommand) -> Result<()> {
    let storage = open_store(&config.client)?;
    let mut history = HistoryStore::load(storage)?;
    run_history_command(&mut history, command)
}

/// Apply one history command to an already loaded store
pub fn run_history_command(history: &mut HistoryStore, command: HistoryCommand) -> Result<()> {
    match command {
        HistoryCommand::List => print_conversations(history),
        HistoryCommand::Show { id } => {
            let conversation = match id {
                Some(id) => {
                    let id = resolve(history, &id)?;
                    history.state().get(&id).cloned()
                }
                None => history.active_conversation().cloned(),
            };
            match conversation {
                Some(conversation) => print_conversation(&conversation),
                None => println!("{}", "No active conversation.".yellow()),
            }
        }
        HistoryCommand::New => {
            let id = history.create_conversation()?;
            println!("{}", format!("Started conversation {}", id).green());
        }
        HistoryCommand::Switch { id } => {
            let id = resolve(history, &id)?;
            history.switch_conversation(&id)?;
            println!("{}", format!("Switched to conversation {}", id).green());
        }
        HistoryCommand::Delete { id } => {
            let id = resolve(history, &id)?;
            history.delete_conversation(&id)?;
            println!("{}", format!("Deleted conversation {}", id).green());
            if history.active_conversation().is_none() {
                println!(
                    "{}",
                    "No conversations left. Use `chatrelay history new` to start one.".yellow()
                );
            }
        }
    }

    Ok(())
}

/// Resolve a full id or unique prefix, failing on unknown ids
pub(crate) fn resolve(history: &HistoryStore, id: &str) -> Result<String> {
    history
        .resolve_id(id)
        .ok_or_else(|| ChatRelayError::UnknownConversation(id.to_string()).into())
}

/// Print the conversation table, marking the active conversation
pub fn print_conversations(history: &HistoryStore) {
    if history.conversations().is_empty() {
        println!("{}", "No conversation history found.".yellow());
        return;
    }

    let active = history.state().active_conversation_id.as_deref();

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "".bold(),
        "ID".bold(),
        "Title".bold(),
        "Messages".bold(),
        "Last Updated".bold()
    ]);

    for conversation in history.conversations() {
        let marker = if Some(conversation.id.as_str()) == active {
            "*"
        } else {
            ""
        };
        let updated = conversation
            .last_updated
            .format("%Y-%m-%d %H:%M")
            .to_string();

        table.add_row(prettytable::row![
            marker.green(),
            conversation.id.cyan(),
            conversation.title(),
            conversation.messages.len(),
            updated
        ]);
    }

    println!("\nConversations:");
    table.printstd();
    println!();
}

/// Print every message of a conversation
pub fn print_conversation(conversation: &Conversation) {
    println!("\n{} {}\n", "Conversation".bold(), conversation.id.cyan());
    for message in &conversation.messages {
        let author = match message.role {
            Role::User => "you".blue().bold(),
            Role::Assistant => "assistant".green().bold(),
        };
        println!("{}: {}\n", author, message.content);
    }
}

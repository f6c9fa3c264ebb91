use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Assistant greeting every new conversation starts with
pub const GREETING: &str = "Hello! I am your AI assistant. Please, ask me anything!";

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the person using the client
    User,
    /// Produced by the relay
    Assistant,
}

/// One chat message; immutable once appended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message text
    pub content: String,
    /// Author
    pub role: Role,
    /// Creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    /// A user message stamped with the current time
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            role: Role::User,
            timestamp: Some(Utc::now()),
        }
    }

    /// An assistant message stamped with the current time
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            role: Role::Assistant,
            timestamp: Some(Utc::now()),
        }
    }
}

/// An ordered sequence of messages under a unique id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique conversation id
    pub id: String,
    /// Messages in the order they were appended
    pub messages: Vec<Message>,
    /// Time of the last append (or of creation)
    pub last_updated: DateTime<Utc>,
}

impl Conversation {
    /// A conversation holding only the assistant greeting
    pub fn seeded(id: impl Into<String>) -> Self {
        let greeting = Message::assistant(GREETING);
        let last_updated = greeting.timestamp.unwrap_or_else(Utc::now);
        Self {
            id: id.into(),
            messages: vec![greeting],
            last_updated,
        }
    }

    /// Short title: the first user message, or a placeholder
    pub fn title(&self) -> String {
        let first = self
            .messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.trim());
        match first {
            Some(text) if text.chars().count() > 40 => {
                format!("{}...", text.chars().take(37).collect::<String>())
            }
            Some(text) => text.to_string(),
            None => "New chat".to_string(),
        }
    }
}

/// Everything the history store persists
///
/// Conversations are kept in creation order; `active_conversation_id`, when
/// set, always names one of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryState {
    /// Conversations in creation order
    pub conversations: Vec<Conversation>,
    /// The conversation new messages go to
    #[serde(default)]
    pub active_conversation_id: Option<String>,
}

impl HistoryState {
    /// A state with one seeded conversation, active
    pub fn seeded(id: impl Into<String>) -> Self {
        let conversation = Conversation::seeded(id);
        Self {
            active_conversation_id: Some(conversation.id.clone()),
            conversations: vec![conversation],
        }
    }

    /// Look up a conversation by id
    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    /// Whether a conversation with `id` exists
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// The active conversation, if any
    pub fn active(&self) -> Option<&Conversation> {
        self.active_conversation_id
            .as_deref()
            .and_then(|id| self.get(id))
    }

    pub(crate) fn active_mut(&mut self) -> Option<&mut Conversation> {
        let id = self.active_conversation_id.as_deref()?;
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    /// Whether conversation ids are unique
    pub fn has_unique_ids(&self) -> bool {
        let mut seen = HashSet::new();
        self.conversations.iter().all(|c| seen.insert(c.id.as_str()))
    }

    /// Whether the active id is null or names an existing conversation
    pub fn active_is_valid(&self) -> bool {
        match &self.active_conversation_id {
            Some(id) => self.contains(id),
            None => true,
        }
    }
}

//! Conversation history store
//!
//! [`HistoryStore`] owns the [`HistoryState`] for a client session. Every
//! mutation rewrites the whole state as JSON under a single key of the
//! injected [`KeyValueStore`]; the state is read back once, at load.
//! Missing or unreadable data is replaced by one seeded conversation.

use crate::error::{ChatRelayError, Result};
use crate::storage::KeyValueStore;
use chrono::Utc;
use ulid::Generator;

pub mod types;

pub use types::{Conversation, HistoryState, Message, Role, GREETING};

/// Key the history state is stored under
pub const STORAGE_KEY: &str = "chat-history";

/// Persistent, multi-conversation chat history
pub struct HistoryStore {
    state: HistoryState,
    storage: Box<dyn KeyValueStore>,
    key: String,
    ids: Generator,
}

impl HistoryStore {
    /// Load the history from `storage` under [`STORAGE_KEY`]
    ///
    /// # Errors
    ///
    /// Returns error if the storage backend cannot be read or a fresh id
    /// cannot be generated. Corrupt data is not an error.
    pub fn load(storage: Box<dyn KeyValueStore>) -> Result<Self> {
        Self::load_with_key(storage, STORAGE_KEY)
    }

    /// Load the history from `storage` under a custom key
    ///
    /// # Errors
    ///
    /// See [`HistoryStore::load`]
    pub fn load_with_key(storage: Box<dyn KeyValueStore>, key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let mut ids = Generator::new();
        let saved = storage.get(&key)?;

        let parsed = saved
            .as_deref()
            .map(|json| serde_json::from_str::<HistoryState>(json));

        let state = match parsed {
            None => {
                tracing::debug!("No saved history, starting with a seeded conversation");
                HistoryState::seeded(next_id(&mut ids)?)
            }
            Some(Err(e)) => {
                tracing::warn!("Saved history is corrupt ({}), starting fresh", e);
                HistoryState::seeded(next_id(&mut ids)?)
            }
            Some(Ok(state)) if !state.has_unique_ids() => {
                tracing::warn!("Saved history has duplicate conversation ids, starting fresh");
                HistoryState::seeded(next_id(&mut ids)?)
            }
            Some(Ok(mut state)) => {
                if !state.active_is_valid() {
                    tracing::warn!(
                        active = ?state.active_conversation_id,
                        "Saved active conversation does not exist, selecting the first one"
                    );
                    state.active_conversation_id =
                        state.conversations.first().map(|c| c.id.clone());
                }
                tracing::debug!(
                    conversations = state.conversations.len(),
                    "Loaded chat history"
                );
                state
            }
        };

        Ok(Self {
            state,
            storage,
            key,
            ids,
        })
    }

    /// Current state
    pub fn state(&self) -> &HistoryState {
        &self.state
    }

    /// All conversations in creation order
    pub fn conversations(&self) -> &[Conversation] {
        &self.state.conversations
    }

    /// The active conversation, if any
    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.state.active()
    }

    /// Messages of the active conversation; empty when none is active
    pub fn active_messages(&self) -> &[Message] {
        self.state
            .active()
            .map(|c| c.messages.as_slice())
            .unwrap_or(&[])
    }

    /// Append `message` to the active conversation
    ///
    /// # Errors
    ///
    /// Returns `ChatRelayError::NoActiveConversation` when no conversation
    /// is active, or a storage error if persisting fails. The state is
    /// unchanged in both cases.
    pub fn add_message(&mut self, message: Message) -> Result<&HistoryState> {
        let mut next = self.state.clone();
        let conversation = next
            .active_mut()
            .ok_or(ChatRelayError::NoActiveConversation)?;

        conversation.last_updated = message.timestamp.unwrap_or_else(Utc::now);
        conversation.messages.push(message);

        self.commit(next)
    }

    /// Create a seeded conversation and make it active
    ///
    /// Returns the new conversation's id.
    ///
    /// # Errors
    ///
    /// Returns error if an id cannot be generated or persisting fails; the
    /// state is unchanged.
    pub fn create_conversation(&mut self) -> Result<String> {
        let id = next_id(&mut self.ids)?;
        let mut next = self.state.clone();
        next.conversations.push(Conversation::seeded(id.clone()));
        next.active_conversation_id = Some(id.clone());

        self.commit(next)?;
        tracing::debug!(id = %id, "Created conversation");
        Ok(id)
    }

    /// Make conversation `id` active
    ///
    /// # Errors
    ///
    /// Returns `ChatRelayError::UnknownConversation` for ids that do not
    /// exist, or a storage error if persisting fails. The state is
    /// unchanged in both cases.
    pub fn switch_conversation(&mut self, id: &str) -> Result<&HistoryState> {
        if !self.state.contains(id) {
            return Err(ChatRelayError::UnknownConversation(id.to_string()).into());
        }

        if self.state.active_conversation_id.as_deref() == Some(id) {
            return Ok(&self.state);
        }

        let mut next = self.state.clone();
        next.active_conversation_id = Some(id.to_string());
        self.commit(next)
    }

    /// Delete conversation `id`
    ///
    /// When the active conversation is deleted the first remaining one
    /// becomes active, or none if the history is now empty. Deleting an
    /// unknown id changes nothing.
    ///
    /// # Errors
    ///
    /// Returns a storage error if persisting fails; the state is unchanged
    pub fn delete_conversation(&mut self, id: &str) -> Result<&HistoryState> {
        if !self.state.contains(id) {
            tracing::debug!(id = %id, "Delete of unknown conversation ignored");
            return Ok(&self.state);
        }

        let mut next = self.state.clone();
        next.conversations.retain(|c| c.id != id);
        if next.active_conversation_id.as_deref() == Some(id) {
            next.active_conversation_id = next.conversations.first().map(|c| c.id.clone());
        }

        self.commit(next)?;
        tracing::debug!(id = %id, "Deleted conversation");
        Ok(&self.state)
    }

    /// Resolve a full id or a unique id prefix to a conversation id
    pub fn resolve_id(&self, id_or_prefix: &str) -> Option<String> {
        if self.state.contains(id_or_prefix) {
            return Some(id_or_prefix.to_string());
        }
        let needle = id_or_prefix.to_ascii_uppercase();
        let mut matches = self
            .state
            .conversations
            .iter()
            .filter(|c| c.id.starts_with(&needle));
        match (matches.next(), matches.next()) {
            (Some(only), None) if !needle.is_empty() => Some(only.id.clone()),
            _ => None,
        }
    }

    /// Persist `next` and adopt it only once the write succeeded
    fn commit(&mut self, next: HistoryState) -> Result<&HistoryState> {
        let json = serde_json::to_string(&next)?;
        self.storage.set(&self.key, &json)?;
        self.state = next;
        Ok(&self.state)
    }
}

fn next_id(ids: &mut Generator) -> Result<String> {
    ids.generate()
        .map(|ulid| ulid.to_string())
        .map_err(|e| ChatRelayError::Storage(format!("Failed to generate id: {}", e)).into())
}

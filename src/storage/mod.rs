//! Key-value storage for the chat history slot
//!
//! The history store persists its whole state under one key. Where that key
//! lives is decided by the [`KeyValueStore`] injected at construction:
//! process memory, a directory of JSON files, or an embedded `sled`
//! database. Writes are last-writer-wins; there is no versioning.

use crate::config::{ClientConfig, HistoryBackend};
use crate::error::{ChatRelayError, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub mod file;
pub mod memory;
pub mod sled_store;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use sled_store::SledStore;

/// Minimal string key-value slot
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    ///
    /// # Errors
    ///
    /// Returns `ChatRelayError::Storage` if the backend cannot be read
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    ///
    /// # Errors
    ///
    /// Returns `ChatRelayError::Storage` if the write fails
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; removing a missing key is not an error
    ///
    /// # Errors
    ///
    /// Returns `ChatRelayError::Storage` if the backend cannot be written
    fn remove(&self, key: &str) -> Result<()>;
}

/// Default directory for on-disk history data
///
/// # Errors
///
/// Returns `ChatRelayError::Storage` if no home/data directory can be found
pub fn default_data_dir() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "chatrelay", "chatrelay")
        .ok_or_else(|| ChatRelayError::Storage("Could not determine data directory".into()))?;
    Ok(proj_dirs.data_dir().to_path_buf())
}

/// Open the history slot described by the client configuration
///
/// # Errors
///
/// Returns `ChatRelayError::Storage` if the backend cannot be opened
pub fn open_store(config: &ClientConfig) -> Result<Box<dyn KeyValueStore>> {
    let location = || -> Result<PathBuf> {
        match &config.history_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(default_data_dir()?.join("history")),
        }
    };

    let store: Box<dyn KeyValueStore> = match config.history_backend {
        HistoryBackend::Sled => Box::new(SledStore::open(location()?)?),
        HistoryBackend::File => Box::new(FileStore::new(location()?)?),
        HistoryBackend::Memory => Box::new(MemoryStore::new()),
    };

    tracing::debug!(backend = ?config.history_backend, "Opened history store");
    Ok(store)
}

use super::KeyValueStore;
use crate::error::{ChatRelayError, Result};
use sled::Db;
use std::path::Path;

/// Key-value slot in an embedded `sled` database
///
/// Every write is flushed before returning so that the slot survives a
/// crash right after a mutation.
pub struct SledStore {
    db: Db,
}

impl SledStore {
    /// Open or create the database at `path`
    ///
    /// # Errors
    ///
    /// Returns `ChatRelayError::Storage` if the database cannot be opened
    ///
    /// # Examples
    ///
    /// ```
    /// use chatrelay::storage::{KeyValueStore, SledStore};
    ///
    /// # fn main() -> chatrelay::error::Result<()> {
    /// let dir = tempfile::tempdir()?;
    /// let store = SledStore::open(dir.path().join("history"))?;
    /// store.set("chat-history", "{}")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path.as_ref())
            .map_err(|e| ChatRelayError::Storage(format!("Failed to open database: {}", e)))?;
        Ok(Self { db })
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self
            .db
            .get(key.as_bytes())
            .map_err(|e| ChatRelayError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => {
                let value = String::from_utf8(bytes.to_vec())
                    .map_err(|e| ChatRelayError::Storage(format!("Value is not UTF-8: {}", e)))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(|e| ChatRelayError::Storage(format!("Insert failed: {}", e)))?;

        self.db
            .flush()
            .map_err(|e| ChatRelayError::Storage(format!("Flush failed: {}", e)))?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.db
            .remove(key.as_bytes())
            .map_err(|e| ChatRelayError::Storage(format!("Remove failed: {}", e)))?;

        self.db
            .flush()
            .map_err(|e| ChatRelayError::Storage(format!("Flush failed: {}", e)))?;

        Ok(())
    }
}

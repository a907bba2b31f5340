//! Session-scoped key-value context
//!
//! Hands the current document, feedback and approval flag between the
//! orchestrator and collaborators that run in their own tasks. One store per
//! session, passed explicitly. Many readers, one writer, last write wins per
//! key; there are no multi-key transactions.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};

/// Current document content
pub const KEY_CONTENT: &str = "content";
/// Feedback produced by the most recent failed check
pub const KEY_FEEDBACK: &str = "feedback";
/// Whether the session has been approved so far
pub const KEY_APPROVED: &str = "approved";
/// Stage currently being refined
pub const KEY_STAGE: &str = "stage";

/// Shared reference to a [`ContextStore`]
pub type SharedContextStore = Arc<ContextStore>;

/// Lock-guarded key-value map
#[derive(Debug, Default)]
pub struct ContextStore {
    values: RwLock<HashMap<String, Value>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared reference to this store
    pub fn shared(self) -> SharedContextStore {
        Arc::new(self)
    }

    /// Store a serializable value under `key`
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> StoreResult<()> {
        let value = serde_json::to_value(value).map_err(|e| StoreError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        let mut values = self.values.write().map_err(|_| StoreError::LockPoisoned)?;
        values.insert(key.to_string(), value);
        Ok(())
    }

    /// Read and deserialize the value under `key`
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        let values = self.values.read().map_err(|_| StoreError::LockPoisoned)?;
        match values.get(key) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| StoreError::Serialization {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    pub fn remove(&self, key: &str) -> StoreResult<Option<Value>> {
        let mut values = self.values.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(values.remove(key))
    }

    pub fn contains(&self, key: &str) -> StoreResult<bool> {
        let values = self.values.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(values.contains_key(key))
    }

    /// Point-in-time copy of every key
    pub fn snapshot(&self) -> StoreResult<HashMap<String, Value>> {
        let values = self.values.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(values.clone())
    }

    // =========================================================================
    // Well-known keys
    // =========================================================================

    pub fn content(&self) -> StoreResult<Option<String>> {
        self.get(KEY_CONTENT)
    }

    pub fn set_content(&self, content: &str) -> StoreResult<()> {
        self.set(KEY_CONTENT, &content)
    }

    pub fn feedback(&self) -> StoreResult<Option<String>> {
        self.get(KEY_FEEDBACK)
    }

    pub fn set_feedback(&self, feedback: &str) -> StoreResult<()> {
        self.set(KEY_FEEDBACK, &feedback)
    }

    pub fn approved(&self) -> StoreResult<bool> {
        Ok(self.get(KEY_APPROVED)?.unwrap_or(false))
    }

    pub fn set_approved(&self, approved: bool) -> StoreResult<()> {
        self.set(KEY_APPROVED, &approved)
    }
}

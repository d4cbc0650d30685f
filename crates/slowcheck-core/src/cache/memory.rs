use super::{CacheStore, validate_key};
use crate::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-process cache. Nothing survives the process; used by tests and by
/// hosts that manage persistence themselves.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// All keys, sorted
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    // A panic while holding the lock cannot leave the map half-updated.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CacheStore for MemoryCache {
    fn get_value(&self, key: &str) -> Result<Option<Value>> {
        validate_key(key)?;
        Ok(self.lock().get(key).cloned())
    }

    fn set_value(&self, key: &str, value: Value) -> Result<()> {
        validate_key(key)?;
        self.lock().insert(key.to_string(), value);
        Ok(())
    }
}

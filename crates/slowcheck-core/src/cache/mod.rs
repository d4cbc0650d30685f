//! Key-value persistence for data that must survive between runs.
//!
//! Keys are `/`-separated strings such as `duration/test_x`. Values are
//! arbitrary JSON.

mod file;
mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

use crate::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// A key-value store that persists JSON values across runs.
pub trait CacheStore {
    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the store cannot be read.
    fn get_value(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the store cannot be written.
    fn set_value(&self, key: &str, value: Value) -> Result<()>;

    /// Read `key` as `T`, falling back to `default` when it is absent or has
    /// the wrong shape.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T>
    where
        Self: Sized,
    {
        let Some(value) = self.get_value(key)? else {
            return Ok(default);
        };
        match serde_json::from_value(value) {
            Ok(v) => Ok(v),
            Err(e) => {
                warn!("Ignoring cache value for {key}: {e}");
                Ok(default)
            }
        }
    }

    /// Serialize `value` and store it under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the store cannot be written.
    fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()>
    where
        Self: Sized,
    {
        self.set_value(key, serde_json::to_value(value)?)
    }
}

/// Check that `key` is usable as a relative path inside a cache directory.
///
/// # Errors
///
/// Returns [`Error::InvalidKey`] for empty keys, absolute keys, `.`/`..` or
/// empty components, backslashes and NUL bytes.
pub fn validate_key(key: &str) -> Result<()> {
    let invalid = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.contains('\0')
        || key
            .split('/')
            .any(|part| part.is_empty() || part == "." || part == "..");

    if invalid {
        return Err(Error::InvalidKey(key.to_string()));
    }
    Ok(())
}

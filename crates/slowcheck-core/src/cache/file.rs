use super::{CacheStore, validate_key};
use crate::{Error, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

const VALUES_DIR: &str = "v";
const ARTIFACTS_DIR: &str = "d";

const README: &str = "\
# slowcheck cache directory #

This directory contains data from slowcheck's duration tracking.

**Do not** commit this to version control.

Values live under `v/`, one JSON file per key. Remove the whole directory
with `slowcheck clear`.
";

const GITIGNORE: &str = "# Created by slowcheck automatically.\n*\n";

const CACHEDIR_TAG: &str = "\
Signature: 8a477f597d28d172789f06886806bc55
# This file is a cache directory tag created by slowcheck.
# For information about cache directory tags, see:
#\thttps://bford.info/cachedir/spec.html
";

/// Directory-backed cache: every key is a pretty-printed JSON file at
/// `<dir>/v/<key>`.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Open a cache rooted at `dir`. Nothing is created until the first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory of the cache
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn values_dir(&self) -> PathBuf {
        self.dir.join(VALUES_DIR)
    }

    fn value_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(key
            .split('/')
            .fold(self.values_dir(), |path, part| path.join(part)))
    }

    /// Return a scratch directory `<dir>/d/<name>`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a single path component or the
    /// directory cannot be created.
    pub fn make_dir(&self, name: &str) -> Result<PathBuf> {
        validate_key(name)?;
        if name.contains('/') {
            return Err(Error::InvalidKey(format!(
                "{name} (directory names must be a single component)"
            )));
        }

        self.ensure_initialized()?;
        let path = self.dir.join(ARTIFACTS_DIR).join(name);
        std::fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// All stored keys, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the values directory cannot be walked.
    pub fn keys(&self) -> Result<Vec<String>> {
        let root = self.values_dir();
        let mut keys = Vec::new();
        if root.is_dir() {
            collect_keys(&root, "", &mut keys)?;
        }
        keys.sort();
        Ok(keys)
    }

    /// Stored entries whose key matches the glob `pattern`, sorted by key.
    /// Entries that cannot be parsed are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid glob or the cache cannot
    /// be read.
    pub fn entries(&self, pattern: &str) -> Result<Vec<(String, Value)>> {
        let pattern = glob::Pattern::new(pattern)?;
        let mut entries = Vec::new();
        for key in self.keys()? {
            if !pattern.matches(&key) {
                continue;
            }
            if let Some(value) = self.get_value(&key)? {
                entries.push((key, value));
            }
        }
        Ok(entries)
    }

    /// When the value under `key` was last written.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the file metadata cannot be
    /// read.
    pub fn modified(&self, key: &str) -> Result<Option<SystemTime>> {
        let path = self.value_path(key)?;
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(std::fs::metadata(path)?.modified()?))
    }

    /// Remove the cache directory and everything in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be removed.
    pub fn clear(&self) -> Result<()> {
        if !self.dir.exists() {
            debug!("Cache dir {} does not exist, nothing to clear", self.dir.display());
            return Ok(());
        }
        std::fs::remove_dir_all(&self.dir)?;
        info!("Cleared cache dir {}", self.dir.display());
        Ok(())
    }

    /// Create the cache dir with its README, `.gitignore` and `CACHEDIR.TAG`.
    fn ensure_initialized(&self) -> Result<()> {
        if self.dir.is_dir() {
            return Ok(());
        }

        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.dir.join("README.md"), README)?;
        std::fs::write(self.dir.join(".gitignore"), GITIGNORE)?;
        std::fs::write(self.dir.join("CACHEDIR.TAG"), CACHEDIR_TAG)?;
        debug!("Initialized cache dir {}", self.dir.display());
        Ok(())
    }
}

fn collect_keys(dir: &Path, prefix: &str, keys: &mut Vec<String>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let key = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };

        if entry.file_type()?.is_dir() {
            collect_keys(&entry.path(), &key, keys)?;
        } else {
            keys.push(key);
        }
    }
    Ok(())
}

impl CacheStore for FileCache {
    fn get_value(&self, key: &str) -> Result<Option<Value>> {
        let path = self.value_path(key)?;
        if !path.is_file() {
            debug!("Cache miss for {key}");
            return Ok(None);
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to read cache entry {}: {e}", path.display());
                return Ok(None);
            }
        };

        match serde_json::from_str(&content) {
            Ok(value) => {
                debug!("Cache hit for {key}");
                Ok(Some(value))
            }
            Err(e) => {
                warn!(
                    "Failed to parse cache entry {key}: {} (at line {}, column {})",
                    e,
                    e.line(),
                    e.column()
                );
                Ok(None)
            }
        }
    }

    fn set_value(&self, key: &str, value: Value) -> Result<()> {
        let path = self.value_path(key)?;
        self.ensure_initialized()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&value)?;
        std::fs::write(&path, content)?;
        debug!("Wrote cache entry {key}");
        Ok(())
    }
}

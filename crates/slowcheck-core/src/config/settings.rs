use crate::guard::{DEFAULT_FACTOR, GuardPolicy, ZeroBaseline};
use crate::session::DEFAULT_SESSION_KEY;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Cache directory created next to the invocation when none is configured
pub const DEFAULT_CACHE_DIR_NAME: &str = ".slowcheck_cache";

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Cache root; relative paths are resolved against the invocation dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    #[serde(default)]
    pub guard: GuardConfig,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardConfig {
    #[serde(default = "default_factor")]
    pub factor: f64,

    #[serde(default)]
    pub zero_baseline: ZeroBaseline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchConfig {
    #[serde(default = "default_batch_key")]
    pub key: String,

    #[serde(default)]
    pub retain_unseen: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_factor() -> f64 {
    DEFAULT_FACTOR
}

fn default_batch_key() -> String {
    DEFAULT_SESSION_KEY.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            factor: default_factor(),
            zero_baseline: ZeroBaseline::default(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            key: default_batch_key(),
            retain_unseen: false,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Config {
    /// Load config from file, or defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// holds invalid values.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        super::validation::warn_unknown_fields(&content, &path.display().to_string());
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the guard cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        let factor = self.guard.factor;
        if !factor.is_finite() || factor < 1.0 {
            return Err(Error::Config(format!(
                "guard.factor must be a finite number >= 1, got {factor}"
            )));
        }

        if crate::cache::validate_key(&self.batch.key).is_err() {
            return Err(Error::Config(format!(
                "batch.key is not a valid cache key: {:?}",
                self.batch.key
            )));
        }

        if self.log.level.trim().is_empty() {
            return Err(Error::Config("log.level must not be empty".to_string()));
        }
        Ok(())
    }

    /// Cache directory for an invocation from `cwd`.
    #[must_use]
    pub fn resolve_cache_dir(&self, cwd: &Path) -> PathBuf {
        match &self.cache_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => cwd.join(dir),
            None => cwd.join(DEFAULT_CACHE_DIR_NAME),
        }
    }

    /// Threshold rules for the guard
    #[must_use]
    pub fn policy(&self) -> GuardPolicy {
        GuardPolicy {
            factor: self.guard.factor,
            zero_baseline: self.guard.zero_baseline,
        }
    }
}

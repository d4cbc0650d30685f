//! Effective settings: config file merged with command line overrides.

use crate::cli::GlobalArgs;
use anyhow::{Context, Result};
use slowcheck_core::config::{Config, Directories};
use slowcheck_core::{FileCache, GuardPolicy};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Settings {
    pub config: Config,
    pub config_file: PathBuf,
    pub config_file_found: bool,
    pub invocation_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl Settings {
    /// Load the config file and apply overrides from `args`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is invalid or the overrides
    /// produce an invalid configuration.
    pub fn resolve(args: &GlobalArgs, invocation_dir: &Path) -> Result<Self> {
        let config_file = args
            .config
            .clone()
            .unwrap_or_else(|| Directories::new().config_file);
        let config_file_found = config_file.is_file();

        let mut config = Config::load(&config_file)
            .with_context(|| format!("Failed to load config {}", config_file.display()))?;

        if let Some(dir) = &args.cache_dir {
            config.cache_dir = Some(dir.clone());
        }
        if let Some(factor) = args.factor {
            config.guard.factor = factor;
        }
        if let Some(policy) = args.zero_baseline {
            config.guard.zero_baseline = policy;
        }
        if let Some(level) = &args.log_level {
            config.log.level.clone_from(level);
        }
        if let Some(file) = &args.log_file {
            config.log.file = Some(file.clone());
        }
        config.validate().context("Invalid options")?;

        let cache_dir = config.resolve_cache_dir(invocation_dir);

        Ok(Self {
            config,
            config_file,
            config_file_found,
            invocation_dir: invocation_dir.to_path_buf(),
            cache_dir,
        })
    }

    #[must_use]
    pub fn cache(&self) -> FileCache {
        FileCache::new(&self.cache_dir)
    }

    #[must_use]
    pub fn policy(&self) -> GuardPolicy {
        self.config.policy()
    }
}

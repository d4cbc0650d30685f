mod dirs;
mod settings;
mod validation;

pub use dirs::Directories;
pub use settings::{BatchConfig, Config, DEFAULT_CACHE_DIR_NAME, GuardConfig, LogConfig};
pub use validation::warn_unknown_fields;

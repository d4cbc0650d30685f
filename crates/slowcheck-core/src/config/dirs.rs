use directories::ProjectDirs;
use std::path::PathBuf;

/// Per-user directories following the XDG spec
#[derive(Debug, Clone)]
pub struct Directories {
    /// Config directory (~/.config/slowcheck)
    pub config: PathBuf,

    /// Config file path
    pub config_file: PathBuf,
}

impl Directories {
    /// Create a new `Directories` instance with standard XDG paths.
    ///
    /// Falls back to `./.slowcheck` when no home directory can be found.
    #[must_use]
    pub fn new() -> Self {
        match ProjectDirs::from("", "", "slowcheck") {
            Some(project) => {
                let config = project.config_dir().to_path_buf();
                Self {
                    config_file: config.join("config.json"),
                    config,
                }
            }
            None => Self::with_base(PathBuf::from(".slowcheck")),
        }
    }

    #[must_use]
    pub fn with_base(base: PathBuf) -> Self {
        Self {
            config_file: base.join("config.json"),
            config: base,
        }
    }
}

impl Default for Directories {
    fn default() -> Self {
        Self::new()
    }
}

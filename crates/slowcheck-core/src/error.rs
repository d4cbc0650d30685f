use thiserror::Error;

/// A unit of work took more than `factor` times its previous duration.
///
/// The new duration has already been persisted when this is returned.
#[derive(Error, Debug, Clone, PartialEq)]
#[error(
    "test duration over {factor}x last duration: {identity} took {elapsed:.3}s, last run took {prior:.3}s"
)]
pub struct RegressionExceeded {
    pub identity: String,
    pub elapsed: f64,
    pub prior: f64,
    pub factor: f64,
}

impl RegressionExceeded {
    /// How many times slower this run was than the baseline.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        if self.prior > 0.0 {
            self.elapsed / self.prior
        } else {
            f64::INFINITY
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error(transparent)]
    Regression(#[from] RegressionExceeded),
}

impl Error {
    /// The regression details, if this error is a duration regression.
    #[must_use]
    pub fn as_regression(&self) -> Option<&RegressionExceeded> {
        match self {
            Error::Regression(r) => Some(r),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

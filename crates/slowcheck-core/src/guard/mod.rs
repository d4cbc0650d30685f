//! Duration regression guard.
//!
//! Measures a unit of work, compares the measurement with the duration
//! recorded for the same identity on the previous run and stores the new
//! measurement before reporting the comparison. The stored baseline is
//! therefore always the latest measurement, not the last passing one.

mod policy;

pub use policy::{DEFAULT_FACTOR, GuardPolicy, Outcome, Verdict, ZeroBaseline, evaluate};
pub(crate) use policy::usable_baseline;

use crate::cache::{CacheStore, validate_key};
use crate::{Error, Result};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Key namespace for per-identity durations
pub const DURATION_PREFIX: &str = "duration/";

/// Make an identity usable as a cache key below [`DURATION_PREFIX`].
///
/// Identities like `tests/test_a.py::test_b[1]` contain colons, which are not
/// allowed in file names everywhere, so colons become underscores. So do
/// backslashes and NUL bytes. Empty, `.` and `..` path components get a `_`
/// prefix, so `./build.sh` becomes `_./build.sh` and `/usr/bin/true` becomes
/// `_/usr/bin/true`. Anything else is left unchanged.
#[must_use]
pub fn sanitize_key(identity: &str) -> String {
    let replaced = identity.replace([':', '\\', '\0'], "_");
    replaced
        .split('/')
        .map(|part| match part {
            "" => "_",
            "." => "_.",
            ".." => "_..",
            other => other,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Cache key holding the last duration of `identity`.
#[must_use]
pub fn duration_key(identity: &str) -> String {
    format!("{DURATION_PREFIX}{}", sanitize_key(identity))
}

/// Per-identity guard: one cache entry per unit of work.
pub struct DurationGuard<'a, S: CacheStore> {
    store: &'a S,
    policy: GuardPolicy,
}

impl<'a, S: CacheStore> DurationGuard<'a, S> {
    #[must_use]
    pub fn new(store: &'a S, policy: GuardPolicy) -> Self {
        Self { store, policy }
    }

    #[must_use]
    pub fn policy(&self) -> &GuardPolicy {
        &self.policy
    }

    /// Cache key `identity` is recorded under.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the key is not usable by the store.
    pub fn key_for(&self, identity: &str) -> Result<String> {
        let key = duration_key(identity);
        validate_key(&key)?;
        Ok(key)
    }

    /// Previous duration of `identity`, if there is a usable one.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn last_duration(&self, identity: &str) -> Result<Option<f64>> {
        let key = self.key_for(identity)?;
        let stored: Option<f64> = self.store.get(&key, None)?;
        let prior = usable_baseline(stored);
        if stored.is_some() && prior.is_none() {
            warn!("Ignoring unusable baseline for {identity}: {stored:?}");
        }
        Ok(prior)
    }

    /// Check an externally measured duration and store it as the new
    /// baseline.
    ///
    /// The new duration is written before the comparison, so it is stored
    /// even when this returns a regression.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Regression`] if `elapsed` exceeds the previous
    /// duration times the policy factor, or a store error if the cache
    /// cannot be read or written.
    pub fn record(&self, identity: &str, elapsed: Duration) -> Result<Outcome> {
        let key = self.key_for(identity)?;
        let elapsed = elapsed.as_secs_f64();

        let prior = self.last_duration(identity)?;
        self.store.set(&key, &elapsed)?;
        debug!("Stored {elapsed:.3}s for {key}");

        match evaluate(identity, elapsed, prior, &self.policy) {
            Ok(outcome) => {
                if outcome.verdict == Verdict::Baseline {
                    info!("Baseline for {identity}: {elapsed:.3}s");
                }
                Ok(outcome)
            }
            Err(regression) => {
                warn!("{regression}");
                Err(Error::Regression(regression))
            }
        }
    }

    /// Run `work`, measure it and check the measurement.
    ///
    /// An error from `work` is returned unchanged and nothing is recorded.
    ///
    /// # Errors
    ///
    /// Returns the work's own error, or an [`Error`] converted into `E` when
    /// the check or the store fails.
    pub fn run<T, E, F>(&self, identity: &str, work: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> std::result::Result<T, E>,
        E: From<Error>,
    {
        self.key_for(identity)?;
        let start = Instant::now();
        let value = work()?;
        self.record(identity, start.elapsed())?;
        Ok(value)
    }
}

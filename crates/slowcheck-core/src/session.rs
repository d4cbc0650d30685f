//! Batched duration tracking for a whole run.
//!
//! A [`DurationSession`] loads every previous duration from a single cache
//! entry when it is opened, checks measurements against that snapshot in
//! memory and writes the new mapping back once. The write happens in
//! [`DurationSession::finish`] or, if the session is dropped without
//! finishing (early return, `?`, panic), in `Drop`.

use crate::cache::CacheStore;
use crate::guard::{GuardPolicy, Outcome, evaluate, usable_baseline};
use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Default cache key for the batched mapping
pub const DEFAULT_SESSION_KEY: &str = "duration/testdurations";

pub struct DurationSession<'a, S: CacheStore> {
    store: &'a S,
    key: String,
    policy: GuardPolicy,
    last: HashMap<String, f64>,
    current: BTreeMap<String, f64>,
    outcomes: Vec<Outcome>,
    regressions: usize,
    retain_unseen: bool,
    flushed: bool,
}

impl<'a, S: CacheStore> DurationSession<'a, S> {
    /// Load the previous run's durations from `key`.
    ///
    /// A missing or malformed entry starts the session with no baselines.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn open(store: &'a S, key: &str, policy: GuardPolicy) -> Result<Self> {
        let stored: HashMap<String, serde_json::Value> = store.get(key, HashMap::new())?;

        let mut last = HashMap::with_capacity(stored.len());
        for (identity, value) in stored {
            match usable_baseline(value.as_f64()) {
                Some(seconds) => {
                    last.insert(identity, seconds);
                }
                None => warn!("Ignoring unusable baseline for {identity}: {value}"),
            }
        }

        debug!("Opened duration session {key} with {} baselines", last.len());

        Ok(Self {
            store,
            key: key.to_string(),
            policy,
            last,
            current: BTreeMap::new(),
            outcomes: Vec::new(),
            regressions: 0,
            retain_unseen: false,
            flushed: false,
        })
    }

    /// Keep previous durations of identities that are not measured in this
    /// session. By default only this session's measurements are written.
    #[must_use]
    pub fn retain_unseen(mut self, retain: bool) -> Self {
        self.retain_unseen = retain;
        self
    }

    /// Cache key this session reads and writes
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Duration of `identity` from the previous run
    #[must_use]
    pub fn last_duration(&self, identity: &str) -> Option<f64> {
        self.last.get(identity).copied()
    }

    /// Duration of `identity` measured in this session
    #[must_use]
    pub fn current_duration(&self, identity: &str) -> Option<f64> {
        self.current.get(identity).copied()
    }

    /// Passing checks so far, in the order they were recorded
    #[must_use]
    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    /// Number of checks that regressed
    #[must_use]
    pub fn regressions(&self) -> usize {
        self.regressions
    }

    /// Number of identities measured in this session
    #[must_use]
    pub fn len(&self) -> usize {
        self.current.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Record a measurement and compare it with the previous run.
    ///
    /// The measurement is kept for the final write even when this returns a
    /// regression.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Regression`] if `elapsed` exceeds the previous
    /// duration times the policy factor.
    pub fn record(&mut self, identity: &str, elapsed: Duration) -> Result<Outcome> {
        let elapsed = elapsed.as_secs_f64();
        self.current.insert(identity.to_string(), elapsed);

        let prior = self.last.get(identity).copied();
        match evaluate(identity, elapsed, prior, &self.policy) {
            Ok(outcome) => {
                self.outcomes.push(outcome.clone());
                Ok(outcome)
            }
            Err(regression) => {
                self.regressions += 1;
                warn!("{regression}");
                Err(Error::Regression(regression))
            }
        }
    }

    /// Run `work`, measure it and check the measurement.
    ///
    /// The duration is recorded even when `work` fails, so a failing item
    /// keeps its entry in the mapping. The work's own error takes precedence
    /// over a regression.
    ///
    /// # Errors
    ///
    /// Returns the work's own error, or an [`Error`] converted into `E` when
    /// the check fails.
    pub fn run<T, E, F>(&mut self, identity: &str, work: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> std::result::Result<T, E>,
        E: From<Error>,
    {
        let start = Instant::now();
        let result = work();
        let checked = self.record(identity, start.elapsed());
        let value = result?;
        checked?;
        Ok(value)
    }

    /// Write the mapping and close the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the mapping cannot be written.
    pub fn finish(mut self) -> Result<()> {
        self.flush()
    }

    fn flush(&mut self) -> Result<()> {
        if self.flushed {
            return Ok(());
        }
        self.flushed = true;

        let mut mapping = self.current.clone();
        if self.retain_unseen {
            for (identity, seconds) in &self.last {
                mapping.entry(identity.clone()).or_insert(*seconds);
            }
        }

        self.store.set(&self.key, &mapping)?;
        info!(
            "Saved {} durations to {} ({} regressions)",
            mapping.len(),
            self.key,
            self.regressions
        );
        Ok(())
    }
}

impl<S: CacheStore> Drop for DurationSession<'_, S> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            error!("Failed to save durations to {}: {e}", self.key);
        }
    }
}

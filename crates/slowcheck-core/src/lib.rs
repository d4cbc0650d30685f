//! Duration regression guard.
//!
//! Measures units of work, compares each measurement with the duration
//! stored for the same identity by the previous run and fails when a run is
//! more than twice as slow. Durations persist in a [`cache::CacheStore`],
//! either one entry per identity ([`DurationGuard`]) or one mapping per run
//! ([`DurationSession`]).

pub mod cache;
pub mod config;
pub mod guard;
pub mod session;

mod error;

#[cfg(test)]
mod tests;

pub use cache::{CacheStore, FileCache, MemoryCache};
pub use error::{Error, RegressionExceeded, Result};
pub use guard::{
    DurationGuard, GuardPolicy, Outcome, Verdict, ZeroBaseline, duration_key, sanitize_key,
};
pub use session::{DEFAULT_SESSION_KEY, DurationSession};

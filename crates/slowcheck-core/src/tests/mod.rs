//! Test module for slowcheck-core
//!
//! Cross-module tests for:
//! - Per-identity guard against a file-backed cache
//! - Batched sessions and their flush guarantees
//! - Configuration loading and defaults
//! - Threshold and key sanitisation properties

// Test modules use exact float comparisons
#![allow(clippy::float_cmp)]

use crate::error::RegressionExceeded;
use serde::{Deserialize, Serialize};

pub const DEFAULT_FACTOR: f64 = 2.0;

/// What to do when the stored baseline is exactly zero seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroBaseline {
    /// Not comparable: pass and let the new duration become the baseline
    #[default]
    Skip,
    /// Compare literally, so any positive duration regresses
    Flag,
}

/// Threshold rules for a regression check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuardPolicy {
    /// Allowed slowdown multiplier; `elapsed > prior * factor` fails
    pub factor: f64,
    pub zero_baseline: ZeroBaseline,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            factor: DEFAULT_FACTOR,
            zero_baseline: ZeroBaseline::default(),
        }
    }
}

/// How a measurement compared with its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No previous duration; this run establishes the baseline
    Baseline,
    /// Within `factor` of the previous duration
    Within,
    /// Previous duration was zero and [`ZeroBaseline::Skip`] applied
    SkippedZeroBaseline,
}

/// Result of a passing check.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub identity: String,
    pub elapsed: f64,
    pub prior: Option<f64>,
    pub verdict: Verdict,
}

/// Compare a measured duration with the previous one.
///
/// Exactly `prior * factor` passes. `prior` must already be a usable
/// baseline (finite, non-negative) or `None`.
///
/// # Errors
///
/// Returns [`RegressionExceeded`] when `elapsed` is strictly greater than
/// `prior * factor`.
pub fn evaluate(
    identity: &str,
    elapsed: f64,
    prior: Option<f64>,
    policy: &GuardPolicy,
) -> Result<Outcome, RegressionExceeded> {
    let verdict = match prior {
        None => Verdict::Baseline,
        Some(p) if p == 0.0 && policy.zero_baseline == ZeroBaseline::Skip => {
            Verdict::SkippedZeroBaseline
        }
        Some(p) if elapsed > p * policy.factor => {
            return Err(RegressionExceeded {
                identity: identity.to_string(),
                elapsed,
                prior: p,
                factor: policy.factor,
            });
        }
        Some(_) => Verdict::Within,
    };

    Ok(Outcome {
        identity: identity.to_string(),
        elapsed,
        prior,
        verdict,
    })
}

/// Interpret a stored value as a baseline. Anything that is not a finite,
/// non-negative number counts as no baseline.
pub(crate) fn usable_baseline(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

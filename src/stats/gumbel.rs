//! Score-distribution fits used by calibration.
//!
//! Viterbi scores on random sequences follow a Gumbel law whose slope is
//! known analytically, leaving only the location to fit by maximum
//! likelihood. Forward scores have an exponential right tail; its
//! location is set at the score of the tail-mass quantile.

use crate::error::{BuildError, Result};

/// ML Gumbel location for samples with a known slope `lambda`:
///
/// ```text
/// mu = -(1/lambda) * ln( mean( exp(-lambda * x) ) )
/// ```
///
/// The samples are shifted by their minimum before exponentiation so the
/// sum cannot overflow for large negative scores.
pub fn fit_gumbel_location(scores: &[f64], lambda: f64) -> Result<f64> {
    if scores.is_empty() {
        return Err(BuildError::Numerical(
            "Gumbel location fit needs at least one sample".into(),
        ));
    }
    if !(lambda > 0.0) || scores.iter().any(|v| !v.is_finite()) {
        return Err(BuildError::Numerical(
            "Gumbel location fit given non-finite input".into(),
        ));
    }
    let min = scores.iter().cloned().fold(f64::INFINITY, f64::min);
    let mean: f64 = scores
        .iter()
        .map(|&x| (-lambda * (x - min)).exp())
        .sum::<f64>()
        / scores.len() as f64;
    Ok(min - mean.ln() / lambda)
}

/// Exponential-tail location: the score of the `tail_mass` quantile from
/// the high end. With n samples the anchor is the k-th largest score,
/// `k = ceil(tail_mass * n)`, clamped to at least one sample.
pub fn fit_exponential_tail(scores: &[f64], tail_mass: f64) -> Result<f64> {
    if scores.is_empty() {
        return Err(BuildError::Numerical(
            "exponential tail fit needs at least one sample".into(),
        ));
    }
    if !(0.0..=1.0).contains(&tail_mass) {
        return Err(BuildError::Numerical(format!(
            "tail mass {} is outside [0,1]",
            tail_mass
        )));
    }
    if scores.iter().any(|v| !v.is_finite()) {
        return Err(BuildError::Numerical(
            "exponential tail fit given non-finite input".into(),
        ));
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let k = ((tail_mass * scores.len() as f64).ceil() as usize).max(1);
    Ok(sorted[k - 1])
}

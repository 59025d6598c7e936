//! E-value calibration by simulation.
//!
//! The model is scored against i.i.d. background sequences; the Viterbi
//! scores get a Gumbel location fit and the Forward scores an
//! exponential-tail anchor. Sequences are generated serially from the
//! caller's RNG so a fixed seed reproduces the simulation exactly;
//! scoring, the expensive part, fans out over a rayon pool.

use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;

use crate::error::{BuildError, Result};
use crate::hmm::background::Bg;
use crate::hmm::model::{EvalueParams, Hmm};
use crate::hmm::profile::Profile;
use crate::stats::gumbel;

const LN2: f64 = std::f64::consts::LN_2;

/// Simulation sizes for one calibration run.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationParams {
    /// Length of simulated sequences for the Viterbi fit.
    pub ev_l: usize,
    /// Number of simulated sequences for the Viterbi fit.
    pub ev_n: usize,
    /// Length of simulated sequences for the Forward fit.
    pub ef_l: usize,
    /// Number of simulated sequences for the Forward fit.
    pub ef_n: usize,
    /// Tail mass the Forward fit is anchored at.
    pub tail_mass: f64,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        CalibrationParams { ev_l: 100, ev_n: 200, ef_l: 100, ef_n: 200, tail_mass: 0.04 }
    }
}

/// A calibrated model's statistical parameters plus the search profile the
/// simulation used, returned so callers can reuse it.
#[derive(Debug, Clone)]
pub struct Calibration {
    pub evparams: EvalueParams,
    pub profile: Profile,
}

/// Slope shared by both score distributions. The base-2 slope of an
/// information-content-matched model is LN2 plus a small edge correction
/// that shrinks with total model information.
fn calibration_lambda(hmm: &Hmm, bg: &Bg) -> Result<f64> {
    let relent = hmm.mean_relative_entropy(bg);
    let info = hmm.m as f64 * relent;
    if !(info > 0.0) {
        return Err(BuildError::Numerical(
            "cannot calibrate a model with no information content".into(),
        ));
    }
    Ok(LN2 + 1.44 / info)
}

/// Fit E-value parameters for a probability-form model.
pub fn calibrate(
    hmm: &Hmm,
    bg: &Bg,
    rng: &mut Xoshiro256PlusPlus,
    params: &CalibrationParams,
) -> Result<Calibration> {
    if params.ev_n == 0 || params.ef_n == 0 || params.ev_l == 0 || params.ef_l == 0 {
        return Err(BuildError::InvalidConfig(
            "calibration sample counts and lengths must be positive".into(),
        ));
    }

    let lambda = calibration_lambda(hmm, bg)?;
    let profile = Profile::configure(hmm, bg);

    let vit_seqs: Vec<Vec<u8>> = (0..params.ev_n)
        .map(|_| bg.sample_sequence(rng, params.ev_l))
        .collect();
    let vit_scores: Vec<f64> = vit_seqs
        .par_iter()
        .map(|dsq| profile.viterbi_score(dsq))
        .collect();
    let vit_mu = gumbel::fit_gumbel_location(&vit_scores, lambda)?;

    let fwd_seqs: Vec<Vec<u8>> = (0..params.ef_n)
        .map(|_| bg.sample_sequence(rng, params.ef_l))
        .collect();
    let fwd_scores: Vec<f64> = fwd_seqs
        .par_iter()
        .map(|dsq| profile.forward_score(dsq))
        .collect();
    let fwd_tau = gumbel::fit_exponential_tail(&fwd_scores, params.tail_mass)?;

    Ok(Calibration {
        evparams: EvalueParams { lambda, vit_mu, fwd_tau, tail_mass: params.tail_mass },
        profile,
    })
}

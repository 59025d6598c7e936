//! Dirichlet priors and posterior-mean parameter estimation.
//!
//! Each alphabet gets a preset pseudocount distribution: the amino preset
//! spreads a single unit of pseudocount mass proportional to background
//! frequency, the nucleic preset is a weak uniform, and anything else
//! falls back to a Laplace plus-one prior. The estimator converts the
//! rescaled counts of a model into normalized probabilities.

use crate::alphabet::Alphabet;
use crate::error::{BuildError, Result};
use crate::hmm::model::{Hmm, T_DD, T_DM, T_II, T_IM, T_MD, T_MI, T_MM};

/// Robinson-proportional pseudocounts for the amino preset (see
/// [`crate::hmm::background`] for the underlying frequencies).
fn amino_emission_alphas() -> Vec<f64> {
    crate::hmm::background::Bg::new(&Alphabet::Amino).f
}

#[derive(Debug, Clone)]
pub struct Prior {
    /// Match emission pseudocounts, one per canonical residue.
    pub mat_alpha: Vec<f64>,
    /// Insert emission pseudocounts.
    pub ins_alpha: Vec<f64>,
    /// Pseudocounts for the M -> {M, I, D} transition family.
    pub tm_alpha: [f64; 3],
    /// Pseudocounts for the I -> {M, I} family.
    pub ti_alpha: [f64; 2],
    /// Pseudocounts for the D -> {M, D} family.
    pub td_alpha: [f64; 2],
}

/// Transition pseudocounts shared by all presets, favoring match-to-match
/// continuation.
const TM_ALPHA: [f64; 3] = [0.7939, 0.0278, 0.0135];
const TI_ALPHA: [f64; 2] = [0.1551, 0.1331];
const TD_ALPHA: [f64; 2] = [0.9002, 0.5630];

impl Prior {
    pub fn amino() -> Prior {
        let alphas = amino_emission_alphas();
        Prior {
            mat_alpha: alphas.clone(),
            ins_alpha: alphas,
            tm_alpha: TM_ALPHA,
            ti_alpha: TI_ALPHA,
            td_alpha: TD_ALPHA,
        }
    }

    pub fn nucleic() -> Prior {
        Prior {
            mat_alpha: vec![0.25; 4],
            ins_alpha: vec![0.25; 4],
            tm_alpha: TM_ALPHA,
            ti_alpha: TI_ALPHA,
            td_alpha: TD_ALPHA,
        }
    }

    /// Plus-one prior over an arbitrary alphabet.
    pub fn laplace(alphabet: &Alphabet) -> Prior {
        let k = alphabet.k();
        Prior {
            mat_alpha: vec![1.0; k],
            ins_alpha: vec![1.0; k],
            tm_alpha: [1.0; 3],
            ti_alpha: [1.0; 2],
            td_alpha: [1.0; 2],
        }
    }

    /// Preset selection by alphabet identity.
    pub fn for_alphabet(alphabet: &Alphabet) -> Prior {
        match alphabet {
            Alphabet::Amino => Prior::amino(),
            Alphabet::Dna | Alphabet::Rna => Prior::nucleic(),
            other => Prior::laplace(other),
        }
    }
}

fn posterior_mean(counts: &mut [f64], alphas: &[f64]) {
    let csum: f64 = counts.iter().sum();
    let asum: f64 = alphas.iter().sum();
    let total = csum + asum;
    for (c, &a) in counts.iter_mut().zip(alphas) {
        *c = (*c + a) / total;
    }
}

/// Convert the model's counts to probabilities with the prior.
///
/// Fails when the prior is structurally incompatible with the model
/// (emission dimension mismatch).
pub fn parameter_estimation(hmm: &mut Hmm, prior: &Prior) -> Result<()> {
    let k = hmm.alphabet.k();
    if prior.mat_alpha.len() != k || prior.ins_alpha.len() != k {
        return Err(BuildError::InvalidConfig(format!(
            "prior has {} emission pseudocounts, model alphabet has {} residues",
            prior.mat_alpha.len(),
            k
        )));
    }

    for knode in 1..=hmm.m {
        posterior_mean(&mut hmm.mat[knode], &prior.mat_alpha);
    }
    for knode in 0..=hmm.m {
        posterior_mean(&mut hmm.ins[knode], &prior.ins_alpha);
    }

    let m = hmm.m;
    for knode in 0..=m {
        let t = &mut hmm.t[knode];
        if knode < m {
            let mut tm = [t[T_MM], t[T_MI], t[T_MD]];
            posterior_mean(&mut tm, &prior.tm_alpha);
            t[T_MM] = tm[0];
            t[T_MI] = tm[1];
            t[T_MD] = tm[2];

            let mut td = [t[T_DM], t[T_DD]];
            posterior_mean(&mut td, &prior.td_alpha);
            t[T_DM] = td[0];
            t[T_DD] = td[1];
        } else {
            // node M transitions exit to E; there is no D or M to move to
            let mut tm = [t[T_MM], t[T_MI]];
            posterior_mean(&mut tm, &[prior.tm_alpha[0], prior.tm_alpha[1]]);
            t[T_MM] = tm[0];
            t[T_MI] = tm[1];
            t[T_MD] = 0.0;
            t[T_DM] = 1.0;
            t[T_DD] = 0.0;
        }

        let mut ti = [t[T_IM], t[T_II]];
        posterior_mean(&mut ti, &prior.ti_alpha);
        t[T_IM] = ti[0];
        t[T_II] = ti[1];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posterior_mean_normalizes() {
        let mut c = [3.0, 1.0, 0.0];
        posterior_mean(&mut c, &[1.0, 1.0, 1.0]);
        let sum: f64 = c.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(c[0] > c[1] && c[1] > c[2]);
    }

    #[test]
    fn test_estimation_rows_normalized() {
        let mut hmm = Hmm::new(Alphabet::Dna, 3);
        hmm.mat[1][2] = 5.0;
        hmm.t[1][T_MM] = 4.0;
        hmm.t[1][T_MI] = 1.0;
        parameter_estimation(&mut hmm, &Prior::nucleic()).unwrap();
        for k in 1..=3 {
            let msum: f64 = hmm.mat[k].iter().sum();
            assert!((msum - 1.0).abs() < 1e-9);
            let tsum = hmm.t[k][T_MM] + hmm.t[k][T_MI] + hmm.t[k][T_MD];
            assert!((tsum - 1.0).abs() < 1e-9, "node {} M row sums to {}", k, tsum);
        }
        // observed counts pull the posterior toward G at node 1
        assert!(hmm.mat[1][2] > 0.5);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut hmm = Hmm::new(Alphabet::Amino, 2);
        let err = parameter_estimation(&mut hmm, &Prior::nucleic());
        assert!(matches!(err, Err(BuildError::InvalidConfig(_))));
    }
}

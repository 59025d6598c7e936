//! Yu/Altschul back-calculation of a score matrix's probabilistic basis.
//!
//! A valid symmetric log-odds matrix implies a unique scale λ and
//! background frequency vector f satisfying, for every residue a,
//!
//! ```text
//! sum_b f_b * exp(λ * s_ab) = 1
//! ```
//!
//! with f a probability distribution. For a fixed λ the constraint is a
//! linear system `exp(λ S) y = 1`; the implied frequencies are the `y`
//! whose components sum to 1, so λ is found by bracketing and bisecting
//! the scalar residual `g(λ) = Σ y − 1`. The conditional matrix follows as
//! `q[a][b] = f_b * exp(λ s_ab) = P(b | a)`, whose rows sum to 1 by
//! construction.

use crate::error::{BuildError, Result};
use crate::score::matrix::ScoreMatrix;

const LAMBDA_LO: f64 = 0.001;
const LAMBDA_HI: f64 = 2.0;
const GRID_STEPS: usize = 400;
const BISECT_ITERS: usize = 100;
const TOL: f64 = 1e-10;

/// Solve `a x = b` by Gaussian elimination with partial pivoting.
/// Returns `None` for a (numerically) singular system.
fn solve_linear(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot_row][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);
        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut acc = b[row];
        for k in (row + 1)..n {
            acc -= a[row][k] * x[k];
        }
        x[row] = acc / a[row][row];
    }
    Some(x)
}

/// Residual `Σ y − 1` at a candidate λ, with the implied `y`.
fn residual(s: &ScoreMatrix, lambda: f64) -> Option<(f64, Vec<f64>)> {
    let k = s.scores.len();
    let a: Vec<Vec<f64>> = (0..k)
        .map(|i| (0..k).map(|j| (lambda * s.get(i, j) as f64).exp()).collect())
        .collect();
    let y = solve_linear(a, vec![1.0; k])?;
    if y.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let sum: f64 = y.iter().sum();
    Some((sum - 1.0, y))
}

/// Back-calculate the conditional probability matrix of a symmetric score
/// matrix. Returns `(q, f, lambda)` where `q[a][b] = P(b | a)`.
///
/// Fails with a format error when no valid `(λ, f)` pair exists, which is
/// the signature of a matrix that is not a realizable log-odds matrix.
pub fn conditionalize(s: &ScoreMatrix) -> Result<(Vec<Vec<f64>>, Vec<f64>, f64)> {
    let step = (LAMBDA_HI - LAMBDA_LO) / GRID_STEPS as f64;
    let mut prev: Option<(f64, f64)> = None; // (lambda, residual)

    for i in 0..=GRID_STEPS {
        let lambda = LAMBDA_LO + step * i as f64;
        let (g, _) = match residual(s, lambda) {
            Some(r) => r,
            None => {
                prev = None;
                continue;
            }
        };
        if let Some((lo_lambda, lo_g)) = prev {
            if lo_g * g < 0.0 {
                if let Some(result) = bisect(s, lo_lambda, lambda) {
                    return Ok(result);
                }
            }
        }
        prev = Some((lambda, g));
    }
    Err(BuildError::Format(
        "Yu/Altschul method failed to backcalculate probabilistic basis of score matrix".into(),
    ))
}

fn bisect(s: &ScoreMatrix, mut lo: f64, mut hi: f64) -> Option<(Vec<Vec<f64>>, Vec<f64>, f64)> {
    let (mut g_lo, _) = residual(s, lo)?;
    for _ in 0..BISECT_ITERS {
        let mid = 0.5 * (lo + hi);
        let (g_mid, _) = residual(s, mid)?;
        if g_mid.abs() < TOL {
            lo = mid;
            hi = mid;
            break;
        }
        if g_lo * g_mid < 0.0 {
            hi = mid;
        } else {
            lo = mid;
            g_lo = g_mid;
        }
    }
    let lambda = 0.5 * (lo + hi);
    let (_, f) = residual(s, lambda)?;
    if f.iter().any(|&v| v <= 0.0) {
        return None;
    }
    let k = f.len();
    let q: Vec<Vec<f64>> = (0..k)
        .map(|a| {
            (0..k)
                .map(|b| f[b] * (lambda * s.get(a, b) as f64).exp())
                .collect()
        })
        .collect();
    // rows must be conditional distributions
    for row in &q {
        let sum: f64 = row.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return None;
        }
    }
    Some((q, f, lambda))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;

    #[test]
    fn test_blosum62_conditional_rows_sum_to_one() {
        let s = ScoreMatrix::builtin_default(&Alphabet::Amino).unwrap();
        let (q, f, lambda) = conditionalize(&s).unwrap();
        assert!(lambda > 0.0 && lambda < 1.0);
        let fsum: f64 = f.iter().sum();
        assert!((fsum - 1.0).abs() < 1e-6);
        for row in &q {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-6);
        }
        // the implied backgrounds are plausible residue frequencies
        assert!(f.iter().all(|&v| v > 0.001 && v < 0.2));
    }

    #[test]
    fn test_blosum62_lambda_near_published_value() {
        let s = ScoreMatrix::builtin_default(&Alphabet::Amino).unwrap();
        let (_, _, lambda) = conditionalize(&s).unwrap();
        // published ungapped BLOSUM62 lambda is about 0.3176
        assert!((lambda - 0.3176).abs() < 0.02, "lambda = {}", lambda);
    }

    #[test]
    fn test_nucleotide_default_converges() {
        let s = ScoreMatrix::builtin_default(&Alphabet::Dna).unwrap();
        let (q, _, _) = conditionalize(&s).unwrap();
        for row in &q {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_all_positive_matrix_rejected() {
        // a matrix with positive expected score has no probabilistic basis
        let text = "   A C G T\n\
                    A 5 1 1 1\n\
                    C 1 5 1 1\n\
                    G 1 1 5 1\n\
                    T 1 1 1 5\n";
        let s = ScoreMatrix::parse(text, &Alphabet::Dna).unwrap();
        assert!(matches!(conditionalize(&s), Err(BuildError::Format(_))));
    }
}

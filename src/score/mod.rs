//! Substitution score matrices and their probabilistic basis.
//!
//! Used only by the single-sequence build path: a symmetric score matrix
//! is back-calculated into the conditional probabilities that
//! parameterize a one-sequence model.

pub mod matrix;
pub mod probify;

pub use matrix::ScoreMatrix;

/// A configured single-sequence scoring system: the substitution matrix,
/// its derived conditional probability table `q[a][b] = P(b | a)`, and the
/// gap probabilities.
#[derive(Debug, Clone)]
pub struct ScoreSystem {
    pub matrix: ScoreMatrix,
    pub q: Vec<Vec<f64>>,
    pub popen: f64,
    pub pextend: f64,
}

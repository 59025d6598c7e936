//! Structured error types for the build pipeline.
//!
//! Every stage returns a tagged error carrying the most specific available
//! explanation; the pipeline stops at the first failing stage and nothing
//! partial is handed to the caller.

use thiserror::Error;

/// Unified error type for model construction and calibration.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A required file (e.g. a substitution matrix) could not be located.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed input: a non-symmetric score matrix, a missing reference
    /// annotation line, an unparseable matrix file.
    #[error("format error: {0}")]
    Format(String),

    /// Well-formed input that yields an empty result, such as an alignment
    /// with zero usable consensus columns. Not a bug.
    #[error("no result: {0}")]
    NoResult(String),

    /// The builder is not configured for the requested operation, or a
    /// component is structurally incompatible with the model.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A numerical routine (clustering, entropy-target solver, matrix
    /// probabilification) failed to converge.
    #[error("numerical failure: {0}")]
    Numerical(String),

    /// I/O error while reading an alignment, sequence, or matrix file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BuildError>;

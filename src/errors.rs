//! Error types for seriation.

use thiserror::Error;

/// Failures raised by an [`crate::eigenmaps::Embedder`].
///
/// Any of these aborts the whole solve call; there is no retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmbeddingError {
    /// The iterative eigensolver hit its iteration cap.
    #[error("eigensolver did not converge after {iterations} iterations (residual {residual:.3e})")]
    NotConverged { iterations: usize, residual: f64 },

    /// The embedding contains NaN or infinite coordinates.
    #[error("embedding has a non-finite coordinate at ({row}, {col})")]
    NonFinite { row: usize, col: usize },

    /// The embedding does not have one row per item or has no columns.
    #[error("embedding shape {rows}x{cols} does not fit {expected_rows} items")]
    Shape {
        rows: usize,
        cols: usize,
        expected_rows: usize,
    },
}

/// Errors that can occur when scoring or seriating.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriationError {
    /// The similarity matrix is not square.
    #[error("similarity matrix must be square, got {rows}x{cols}")]
    Shape { rows: usize, cols: usize },

    /// A matrix entry is out of range, negative or non-finite.
    #[error("invalid similarity entry at ({row}, {col}): {reason}")]
    InvalidEntry {
        row: usize,
        col: usize,
        reason: String,
    },

    /// Loss name not in {1SUM, 2SUM, Huber, R2S}.
    #[error("unsupported loss kind '{0}', expected one of 1SUM, 2SUM, Huber, R2S")]
    UnsupportedLoss(String),

    /// Solver configuration out of its valid range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Permutation of the wrong length or not a bijection.
    #[error("invalid permutation: {0}")]
    InvalidPermutation(String),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
}

pub type Result<T> = std::result::Result<T, SeriationError>;

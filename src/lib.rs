//! # spectral-eta
//!
//! Seriation of n items from a pairwise similarity matrix with the spectral
//! eta-trick: a spectral (2-SUM) relaxation is solved repeatedly on a
//! reweighted matrix, and each solution is used to reweight the next one so
//! that the sequence of orderings drifts toward a local minimum of a harder
//! cost (1-SUM, Huber or robust 2-SUM).
//!
//! Pipeline:
//!
//! 1. [`similarity::SimilarityMatrix`]: validated dense or sparse input,
//!    consumed through a single weighted-edge iteration.
//! 2. [`score`]: seriation cost of an ordering under a [`score::LossKind`].
//! 3. [`eigenmaps`]: the [`eigenmaps::Embedder`] seam and the default
//!    [`eigenmaps::SpectralEmbedder`] (Laplacian eigenvectors).
//! 4. [`eta`]: next weight per edge from the current embedding.
//! 5. [`solver`]: the eta-trick loop tracking the best ordering.
//!
//! ```ignore
//! use spectral_eta::builder::EtaTrickBuilder;
//! use spectral_eta::score::LossKind;
//! use spectral_eta::similarity::SimilarityMatrix;
//! use spectral_eta::solver::solve;
//!
//! let x = SimilarityMatrix::from_triplets(n, &rows, &cols, &vals)?;
//! let config = EtaTrickBuilder::new()
//!     .with_loss(LossKind::Huber)
//!     .with_band(4)
//!     .with_avg_dim(3)
//!     .build()?;
//! let result = solve(&x, &config)?;
//! println!("ranks: {:?}", result.permutation.ranks());
//! ```

pub mod builder;
pub mod eigenmaps;
pub mod errors;
pub mod eta;
pub mod laplacian;
pub mod permutation;
pub mod score;
pub mod similarity;
pub mod solver;

#[cfg(test)]
mod tests;

pub use errors::{EmbeddingError, Result, SeriationError};

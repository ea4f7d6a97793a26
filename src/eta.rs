//! Eta weights: the distance estimates dividing the similarity matrix.
//!
//! Given an embedding, the next weight of edge `(i, j)` is
//!
//! ```text
//! eta_ij = Σ_{k < D} s_k · max(dh, dist_k(i, j))
//! ```
//!
//! where `D = min(avg_dim, embedding dimensions)`, `dist_k` is the rank
//! distance between `i` and `j` once items are sorted along column `k`
//! (wrapped `min(d, n − d)` on a cycle), and `s_k = 1/sqrt(1 + k)` when
//! `avg_scaling` is set, `1` otherwise. Diagonal edges are fixed at 1.
//!
//! With momentum `gamma` the off-diagonal weights become
//! `max(dh, (1 − gamma)·eta_new + gamma·eta_prev)`, `eta_prev` being the
//! weights of the immediately preceding iteration. The same formula applies
//! for every `avg_dim`; the final floor keeps the `≥ dh` invariant even when
//! blending with the initial all-ones weights.

use log::trace;

use crate::eigenmaps::Embedding;
use crate::errors::{EmbeddingError, Result, SeriationError};
use crate::permutation::{rank_distance, Permutation};
use crate::similarity::SimilarityMatrix;

/// One positive weight per edge of a [`SimilarityMatrix`], aligned with
/// [`SimilarityMatrix::edges`].
#[derive(Clone, Debug, PartialEq)]
pub struct EtaWeights {
    values: Vec<f64>,
}

impl EtaWeights {
    /// Initial weights: all ones.
    pub fn ones(x: &SimilarityMatrix) -> Self {
        Self {
            values: vec![1.0; x.n_edges()],
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }
}

/// Parameters of the eta update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightUpdater {
    pub avg_dim: usize,
    pub avg_scaling: bool,
    pub dh: usize,
    pub circular: bool,
    pub momentum: Option<f64>,
}

impl WeightUpdater {
    /// Next weights from `embedding`, blended with `previous` if momentum is
    /// configured.
    ///
    /// The embedding must have one row per item of `x` and at least one
    /// column; `previous` must hold one weight per edge of `x`.
    pub fn update(
        &self,
        x: &SimilarityMatrix,
        embedding: &Embedding,
        previous: Option<&EtaWeights>,
    ) -> Result<EtaWeights> {
        let n = x.n_items();
        if embedding.n_items() != n || embedding.n_components() == 0 {
            return Err(EmbeddingError::Shape {
                rows: embedding.n_items(),
                cols: embedding.n_components(),
                expected_rows: n,
            }
            .into());
        }
        if let Some(prev) = previous {
            if prev.len() != x.n_edges() {
                return Err(SeriationError::Config(format!(
                    "previous weights have {} entries, matrix enumerates {} edges",
                    prev.len(),
                    x.n_edges()
                )));
            }
        }
        let dims = self.avg_dim.min(embedding.n_components());
        let dh = self.dh as f64;
        trace!(
            "Eta update over {} edges using {} embedding dimensions",
            x.n_edges(),
            dims
        );

        let rankings: Vec<Permutation> = (0..dims)
            .map(|k| Permutation::from_scores(embedding.column(k)))
            .collect();
        let scales: Vec<f64> = (0..dims)
            .map(|k| {
                if self.avg_scaling {
                    1.0 / ((1 + k) as f64).sqrt()
                } else {
                    1.0
                }
            })
            .collect();

        let mut values: Vec<f64> = x
            .edges()
            .map(|e| {
                if e.is_diagonal() {
                    return 1.0;
                }
                rankings
                    .iter()
                    .zip(scales.iter())
                    .map(|(ranks, &s)| {
                        let d = rank_distance(ranks.rank(e.row), ranks.rank(e.col), n, self.circular);
                        s * (d as f64).max(dh)
                    })
                    .sum()
            })
            .collect();

        if let (Some(gamma), Some(prev)) = (self.momentum, previous) {
            for (e, (v, &p)) in x.edges().zip(values.iter_mut().zip(prev.values.iter())) {
                if e.is_diagonal() {
                    continue;
                }
                *v = ((1.0 - gamma) * *v + gamma * p).max(dh);
            }
        }

        Ok(EtaWeights { values })
    }
}

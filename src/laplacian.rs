//! # Graph Laplacian of a similarity matrix
//!
//! ## Algorithm Overview
//!
//! 1. **Symmetrisation**: off-diagonal edges are folded into a symmetric
//!    adjacency `W = (X + Xᵀ) / 2`; self-loops are dropped.
//! 2. **Adjacency normalisation** (optional): Coifman–Lafon
//!    `W ← D⁻¹ W D⁻¹`, compensating non-uniform sampling along the
//!    underlying 1-d manifold.
//! 3. **Degrees**: `d_i = Σ_j W_ij`, computed in parallel over rows.
//! 4. **Laplacian**:
//!    - unnormalised `L = D − W`;
//!    - symmetric `L = I − D^{-1/2} W D^{-1/2}`;
//!    - random walk shares the symmetric operator; its eigenvectors are
//!      mapped back with `D^{-1/2}` by the embedder.
//!
//! Isolated nodes (`d_i = 0`) get a zero row in the normalised operators.

use std::collections::BTreeMap;

use log::{debug, info, trace, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sprs::{CsMat, TriMat};

use crate::similarity::SimilarityMatrix;

/// Rescaling applied to the adjacency before building the Laplacian.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum AdjacencyNorm {
    #[default]
    None,
    Coifman,
}

/// Laplacian normalisation.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum LaplacianNorm {
    #[default]
    Unnormalized,
    Symmetric,
    RandomWalk,
}

/// Sparse Laplacian together with the degrees it was built from.
#[derive(Debug, Clone)]
pub struct GraphLaplacian {
    pub matrix: CsMat<f64>,
    pub degrees: Vec<f64>,
    pub nnodes: usize,
    pub norm: LaplacianNorm,
}

impl GraphLaplacian {
    pub fn shape(&self) -> (usize, usize) {
        self.matrix.shape()
    }

    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    /// `D^{-1/2}` diagonal, zero for isolated nodes.
    pub fn inv_sqrt_degrees(&self) -> Vec<f64> {
        self.degrees
            .iter()
            .map(|&d| if d > 0.0 { 1.0 / d.sqrt() } else { 0.0 })
            .collect()
    }

    /// Gershgorin upper bound on the spectrum.
    pub fn spectral_upper_bound(&self) -> f64 {
        self.matrix
            .outer_iterator()
            .map(|row| row.iter().map(|(_, &v)| v.abs()).sum::<f64>())
            .fold(0.0, f64::max)
    }

    /// `y = L x`.
    pub fn apply(&self, x: &[f64], y: &mut [f64]) {
        for (i, row) in self.matrix.outer_iterator().enumerate() {
            y[i] = row.iter().map(|(j, &v)| v * x[j]).sum();
        }
    }

    /// Number of nodes without any incident edge.
    pub fn isolated(&self) -> usize {
        self.degrees.iter().filter(|&&d| d <= 0.0).count()
    }
}

/// Builds the Laplacian of `x` with the requested normalisations.
pub fn build_laplacian(
    x: &SimilarityMatrix,
    adjacency: AdjacencyNorm,
    norm: LaplacianNorm,
) -> GraphLaplacian {
    let n = x.n_items();
    info!("Building {:?} Laplacian for {} items", norm, n);
    debug!("Adjacency normalisation: {:?}", adjacency);

    let mut adj = symmetric_adjacency(x);
    let mut degrees = row_degrees(&adj);

    if adjacency == AdjacencyNorm::Coifman {
        trace!("Applying Coifman normalisation W <- D^-1 W D^-1");
        for (i, row) in adj.iter_mut().enumerate() {
            for (&j, w) in row.iter_mut() {
                let denom = degrees[i] * degrees[j];
                *w = if denom > 0.0 { *w / denom } else { 0.0 };
            }
        }
        degrees = row_degrees(&adj);
    }

    let mut triplets = TriMat::new((n, n));
    match norm {
        LaplacianNorm::Unnormalized => {
            for (i, row) in adj.iter().enumerate() {
                triplets.add_triplet(i, i, degrees[i]);
                for (&j, &w) in row {
                    triplets.add_triplet(i, j, -w);
                }
            }
        }
        LaplacianNorm::Symmetric | LaplacianNorm::RandomWalk => {
            let inv_sqrt: Vec<f64> = degrees
                .iter()
                .map(|&d| if d > 0.0 { 1.0 / d.sqrt() } else { 0.0 })
                .collect();
            for (i, row) in adj.iter().enumerate() {
                triplets.add_triplet(i, i, if degrees[i] > 0.0 { 1.0 } else { 0.0 });
                for (&j, &w) in row {
                    triplets.add_triplet(i, j, -w * inv_sqrt[i] * inv_sqrt[j]);
                }
            }
        }
    }

    let gl = GraphLaplacian {
        matrix: triplets.to_csr(),
        degrees,
        nnodes: n,
        norm,
    };

    let isolated = gl.isolated();
    if isolated > 0 {
        warn!("{} of {} nodes have no incident similarity", isolated, n);
    }
    debug!("Laplacian {}x{} with {} non-zeros", n, n, gl.nnz());
    gl
}

/// Off-diagonal symmetric adjacency as sorted rows.
fn symmetric_adjacency(x: &SimilarityMatrix) -> Vec<BTreeMap<usize, f64>> {
    let mut adj = vec![BTreeMap::<usize, f64>::new(); x.n_items()];
    for e in x.nonzero_edges() {
        if e.is_diagonal() {
            continue;
        }
        let half = 0.5 * e.weight;
        *adj[e.row].entry(e.col).or_insert(0.0) += half;
        *adj[e.col].entry(e.row).or_insert(0.0) += half;
    }
    adj
}

fn row_degrees(adj: &[BTreeMap<usize, f64>]) -> Vec<f64> {
    adj.par_iter().map(|row| row.values().sum()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn path(n: usize) -> SimilarityMatrix {
        let mut rows = Vec::new();
        let mut cols = Vec::new();
        for i in 0..n - 1 {
            rows.extend([i, i + 1]);
            cols.extend([i + 1, i]);
        }
        let vals = vec![1.0; rows.len()];
        SimilarityMatrix::from_triplets(n, &rows, &cols, &vals).unwrap()
    }

    #[test]
    fn test_unnormalized_rows_sum_to_zero() {
        let gl = build_laplacian(&path(5), AdjacencyNorm::None, LaplacianNorm::Unnormalized);
        assert_eq!(gl.shape(), (5, 5));
        let ones = vec![1.0; 5];
        let mut y = vec![0.0; 5];
        gl.apply(&ones, &mut y);
        for v in y {
            assert_abs_diff_eq!(v, 0.0, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(gl.spectral_upper_bound(), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_symmetric_has_unit_diagonal() {
        let gl = build_laplacian(&path(4), AdjacencyNorm::Coifman, LaplacianNorm::Symmetric);
        for i in 0..4 {
            assert_abs_diff_eq!(*gl.matrix.get(i, i).unwrap(), 1.0, epsilon = 1e-12);
        }
        // D^{1/2} 1 lies in the kernel of the symmetric Laplacian
        let v: Vec<f64> = gl.degrees.iter().map(|d| d.sqrt()).collect();
        let mut y = vec![0.0; 4];
        gl.apply(&v, &mut y);
        for val in y {
            assert_abs_diff_eq!(val, 0.0, epsilon = 1e-12);
        }
    }
}

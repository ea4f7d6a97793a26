//! # Spectral embeddings of a similarity matrix
//!
//! The eta-trick loop treats the embedding step as an opaque, deterministic
//! collaborator behind the [`Embedder`] trait: a reweighted similarity matrix
//! goes in, an n×d coordinate matrix comes out, and sorting column 0
//! approximates the 2-SUM optimal ordering.
//!
//! [`SpectralEmbedder`] is the default implementation. It builds the graph
//! Laplacian (see [`crate::laplacian`]), extracts the eigenvectors attached to
//! the smallest eigenvalues, drops the trivial (constant) one and optionally
//! rescales the remaining coordinates:
//!
//! - `ScaleEmbedding::Heuristic`: dimension k is multiplied by `1/sqrt(k+1)`;
//! - `ScaleEmbedding::CommuteTime`: dimension k is multiplied by
//!   `1/sqrt(λ_k)`, the commute-time-distance scaling.
//!
//! Two eigensolvers are available:
//!
//! - `EigenSolver::Dense`: full symmetric decomposition (nalgebra), exact and
//!   fine up to a few thousand items;
//! - `EigenSolver::SubspaceIteration`: block power iteration on the shifted
//!   operator `σI − L` with Rayleigh–Ritz extraction, only touching the
//!   sparse Laplacian through products. Seeded, so repeated calls agree.
//!   Reports [`EmbeddingError::NotConverged`] when the residual does not
//!   drop below `tol · σ` within `max_iter` sweeps.

use std::cmp::Ordering;

use log::{debug, info, trace};
use nalgebra::{DMatrix, SymmetricEigen};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::errors::EmbeddingError;
use crate::laplacian::{build_laplacian, AdjacencyNorm, GraphLaplacian, LaplacianNorm};
use crate::similarity::SimilarityMatrix;

const TRIVIAL_EIGENVALUE: f64 = 1e-12;

/// Per-dimension rescaling of the embedding.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScaleEmbedding {
    #[default]
    None,
    Heuristic,
    CommuteTime,
}

/// Eigensolver used by [`SpectralEmbedder`].
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub enum EigenSolver {
    #[default]
    Dense,
    SubspaceIteration { max_iter: usize, tol: f64, seed: u64 },
}

impl EigenSolver {
    pub fn subspace_iteration(seed: u64) -> Self {
        EigenSolver::SubspaceIteration {
            max_iter: 5_000,
            tol: 1e-9,
            seed,
        }
    }
}

/// Normalisation and solver choices handed to the embedder on every call.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct EmbedderConfig {
    pub adjacency: AdjacencyNorm,
    pub laplacian: LaplacianNorm,
    pub scaling: ScaleEmbedding,
    pub solver: EigenSolver,
}

/// n×d coordinates; column k is the k-th relaxed ranking signal.
#[derive(Clone, Debug, PartialEq)]
pub struct Embedding {
    nitems: usize,
    ncomponents: usize,
    // column-major
    data: Vec<f64>,
}

impl Embedding {
    /// Build from columns, each of length `nitems`.
    pub fn from_columns(nitems: usize, columns: Vec<Vec<f64>>) -> Result<Self, EmbeddingError> {
        let ncomponents = columns.len();
        let mut data = Vec::with_capacity(nitems * ncomponents);
        for (k, col) in columns.into_iter().enumerate() {
            if col.len() != nitems {
                return Err(EmbeddingError::Shape {
                    rows: col.len(),
                    cols: ncomponents,
                    expected_rows: nitems,
                });
            }
            if let Some(i) = col.iter().position(|v| !v.is_finite()) {
                return Err(EmbeddingError::NonFinite { row: i, col: k });
            }
            data.extend(col);
        }
        Ok(Self {
            nitems,
            ncomponents,
            data,
        })
    }

    pub fn n_items(&self) -> usize {
        self.nitems
    }

    pub fn n_components(&self) -> usize {
        self.ncomponents
    }

    pub fn column(&self, k: usize) -> &[f64] {
        &self.data[k * self.nitems..(k + 1) * self.nitems]
    }

    #[inline]
    pub fn get(&self, item: usize, k: usize) -> f64 {
        self.data[k * self.nitems + item]
    }

    /// Every coordinate negated: each column's ordering is reversed.
    pub fn mirrored(&self) -> Self {
        Self {
            nitems: self.nitems,
            ncomponents: self.ncomponents,
            data: self.data.iter().map(|v| -v).collect(),
        }
    }
}

/// Turns a (reweighted) similarity matrix into coordinates.
///
/// Must be deterministic for a fixed input and configuration.
pub trait Embedder {
    fn embed(
        &self,
        matrix: &SimilarityMatrix,
        config: &EmbedderConfig,
        n_components: usize,
    ) -> Result<Embedding, EmbeddingError>;
}

impl<E: Embedder + ?Sized> Embedder for &E {
    fn embed(
        &self,
        matrix: &SimilarityMatrix,
        config: &EmbedderConfig,
        n_components: usize,
    ) -> Result<Embedding, EmbeddingError> {
        (**self).embed(matrix, config, n_components)
    }
}

/// Laplacian eigenmap embedder.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpectralEmbedder;

impl Embedder for SpectralEmbedder {
    fn embed(
        &self,
        matrix: &SimilarityMatrix,
        config: &EmbedderConfig,
        n_components: usize,
    ) -> Result<Embedding, EmbeddingError> {
        let n = matrix.n_items();
        let k = n_components.min(n.saturating_sub(1));
        if k == 0 {
            return Err(EmbeddingError::Shape {
                rows: n,
                cols: 0,
                expected_rows: n,
            });
        }
        if k < n_components {
            debug!(
                "Requested {} components, {} items allow {}",
                n_components, n, k
            );
        }
        info!(
            "SpectralEmbedder::embed: n={}, components={}, solver={:?}",
            n, k, config.solver
        );

        let gl = build_laplacian(matrix, config.adjacency, config.laplacian);

        // eigenpairs sorted by ascending eigenvalue, k+1 of them
        let (eigenvalues, mut columns) = match config.solver {
            EigenSolver::Dense => dense_eigenpairs(&gl, k + 1),
            EigenSolver::SubspaceIteration {
                max_iter,
                tol,
                seed,
            } => subspace_eigenpairs(&gl, k + 1, max_iter, tol, seed)?,
        };
        trace!("Smallest eigenvalues: {:?}", &eigenvalues[..eigenvalues.len().min(4)]);

        // drop the trivial eigenvector
        let eigenvalues: Vec<f64> = eigenvalues.into_iter().skip(1).collect();
        columns.remove(0);

        if config.laplacian == LaplacianNorm::RandomWalk {
            let inv_sqrt = gl.inv_sqrt_degrees();
            for col in columns.iter_mut() {
                for (v, s) in col.iter_mut().zip(inv_sqrt.iter()) {
                    *v *= s;
                }
            }
        }

        for (dim, col) in columns.iter_mut().enumerate() {
            let factor = match config.scaling {
                ScaleEmbedding::None => 1.0,
                ScaleEmbedding::Heuristic => 1.0 / ((dim + 1) as f64).sqrt(),
                ScaleEmbedding::CommuteTime => {
                    let lambda = eigenvalues[dim];
                    if lambda > TRIVIAL_EIGENVALUE {
                        1.0 / lambda.sqrt()
                    } else {
                        1.0
                    }
                }
            };
            if factor != 1.0 {
                col.iter_mut().for_each(|v| *v *= factor);
            }
        }

        Embedding::from_columns(n, columns)
    }
}

fn ascending(values: &[f64]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.cmp(&b))
    });
    idx
}

fn dense_eigenpairs(gl: &GraphLaplacian, count: usize) -> (Vec<f64>, Vec<Vec<f64>>) {
    let n = gl.nnodes;
    let mut l = DMatrix::<f64>::zeros(n, n);
    for (i, row) in gl.matrix.outer_iterator().enumerate() {
        for (j, &v) in row.iter() {
            l[(i, j)] += v;
        }
    }
    trace!("Dense symmetric eigendecomposition of {}x{}", n, n);
    let eig = SymmetricEigen::new(l);
    let values: Vec<f64> = eig.eigenvalues.iter().copied().collect();
    let order = ascending(&values);

    let picked: Vec<usize> = order.into_iter().take(count).collect();
    let eigenvalues = picked.iter().map(|&c| values[c]).collect();
    let columns = picked
        .iter()
        .map(|&c| eig.eigenvectors.column(c).iter().copied().collect())
        .collect();
    (eigenvalues, columns)
}

fn subspace_eigenpairs(
    gl: &GraphLaplacian,
    count: usize,
    max_iter: usize,
    tol: f64,
    seed: u64,
) -> Result<(Vec<f64>, Vec<Vec<f64>>), EmbeddingError> {
    let n = gl.nnodes;
    let block = (count + 4).min(n);
    let sigma = gl.spectral_upper_bound().max(1.0);
    debug!(
        "Subspace iteration: n={}, block={}, sigma={:.4}, max_iter={}, tol={:.1e}",
        n, block, sigma, max_iter, tol
    );

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let start = DMatrix::<f64>::from_fn(n, block, |_, _| rng.random_range(-1.0..1.0));
    let mut q = start.qr().q();

    // z = (σI − L) q, column by column
    let shifted = |q: &DMatrix<f64>| -> DMatrix<f64> {
        let mut data = Vec::with_capacity(n * block);
        let mut y = vec![0.0; n];
        for c in 0..block {
            let x: Vec<f64> = q.column(c).iter().copied().collect();
            gl.apply(&x, &mut y);
            data.extend(x.iter().zip(y.iter()).map(|(xi, yi)| sigma * xi - yi));
        }
        DMatrix::from_vec(n, block, data)
    };

    let mut residual = f64::INFINITY;
    for iter in 1..=max_iter {
        let z = shifted(&q);

        // Rayleigh–Ritz on span(q)
        let h = q.transpose() * &z;
        let h = (&h + h.transpose()) * 0.5;
        let small = SymmetricEigen::new(h);
        let thetas: Vec<f64> = small.eigenvalues.iter().copied().collect();
        let mut order = ascending(&thetas);
        order.reverse();

        let ritz = &q * &small.eigenvectors;
        let mapped = &z * &small.eigenvectors;

        residual = order
            .iter()
            .take(count)
            .map(|&c| (mapped.column(c) - ritz.column(c) * thetas[c]).norm())
            .fold(0.0, f64::max);

        if residual <= tol * sigma {
            debug!(
                "Subspace iteration converged after {} sweeps (residual {:.3e})",
                iter, residual
            );
            let picked: Vec<usize> = order.into_iter().take(count).collect();
            let eigenvalues = picked.iter().map(|&c| sigma - thetas[c]).collect();
            let columns = picked
                .iter()
                .map(|&c| ritz.column(c).iter().copied().collect())
                .collect();
            return Ok((eigenvalues, columns));
        }

        if iter % 500 == 0 {
            trace!("Subspace iteration sweep {}: residual {:.3e}", iter, residual);
        }
        q = z.qr().q();
    }

    Err(EmbeddingError::NotConverged {
        iterations: max_iter,
        residual,
    })
}

//! Similarity matrix input and weighted-edge iteration.
//!
//! A [`SimilarityMatrix`] is an immutable, validated n×n nonnegative matrix
//! stored either as a dense grid (smartcore `DenseMatrix`) or as a sparse
//! list of `(row, col, weight)` triplets (sprs `TriMat`). Everything
//! downstream (scoring, eta updates, Laplacian assembly) consumes it through
//! [`SimilarityMatrix::edges`], so each loss transform and weight rule is
//! written once for both storages.
//!
//! Edge order is part of the contract: dense matrices enumerate the full grid
//! row-major, sparse matrices enumerate stored entries in insertion order.
//! Per-edge weights ([`crate::eta::EtaWeights`]) are aligned to that order.

use std::collections::HashMap;

use log::{debug, trace};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use sprs::{CsMat, TriMat};

use crate::errors::{Result, SeriationError};

/// A single stored entry of the similarity matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    pub row: usize,
    pub col: usize,
    pub weight: f64,
}

impl Edge {
    #[inline]
    pub fn is_diagonal(&self) -> bool {
        self.row == self.col
    }
}

#[derive(Debug)]
enum Storage {
    Dense(DenseMatrix<f64>),
    Sparse(TriMat<f64>),
}

/// Square, nonnegative similarity matrix.
#[derive(Debug)]
pub struct SimilarityMatrix {
    storage: Storage,
    nitems: usize,
}

impl SimilarityMatrix {
    /// Wrap a dense grid. Fails on a non-square shape or on a negative or
    /// non-finite entry.
    pub fn from_dense(matrix: DenseMatrix<f64>) -> Result<Self> {
        let (rows, cols) = matrix.shape();
        if rows != cols {
            return Err(SeriationError::Shape { rows, cols });
        }
        for i in 0..rows {
            for j in 0..cols {
                check_entry(i, j, *matrix.get((i, j)))?;
            }
        }
        debug!("Dense similarity matrix {}x{}", rows, cols);
        Ok(Self {
            storage: Storage::Dense(matrix),
            nitems: rows,
        })
    }

    /// Build a dense matrix from row vectors.
    ///
    /// An empty input has no dense representation in smartcore and is
    /// stored as an empty sparse matrix, so [`Self::is_sparse`] reports
    /// `true` for it.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n = rows.len();
        if n == 0 {
            return Ok(Self {
                storage: Storage::Sparse(TriMat::new((0, 0))),
                nitems: 0,
            });
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != n) {
            return Err(SeriationError::Shape {
                rows: n,
                cols: bad.len(),
            });
        }
        let matrix = DenseMatrix::from_2d_vec(&rows.to_vec()).map_err(|e| {
            SeriationError::InvalidEntry {
                row: 0,
                col: 0,
                reason: e.to_string(),
            }
        })?;
        Self::from_dense(matrix)
    }

    /// Build a sparse matrix from parallel triplet slices.
    ///
    /// Entries keep the given order; duplicate `(row, col)` pairs are not
    /// merged and are assumed absent.
    pub fn from_triplets(n: usize, rows: &[usize], cols: &[usize], vals: &[f64]) -> Result<Self> {
        if rows.len() != cols.len() || rows.len() != vals.len() {
            return Err(SeriationError::InvalidEntry {
                row: rows.len(),
                col: cols.len(),
                reason: format!(
                    "triplet slices differ in length ({}, {}, {})",
                    rows.len(),
                    cols.len(),
                    vals.len()
                ),
            });
        }
        let mut triplets = TriMat::with_capacity((n, n), vals.len());
        for ((&i, &j), &w) in rows.iter().zip(cols.iter()).zip(vals.iter()) {
            if i >= n || j >= n {
                return Err(SeriationError::InvalidEntry {
                    row: i,
                    col: j,
                    reason: format!("index out of range for {}x{} matrix", n, n),
                });
            }
            check_entry(i, j, w)?;
            triplets.add_triplet(i, j, w);
        }
        debug!("Sparse similarity matrix {}x{} with {} entries", n, n, vals.len());
        Ok(Self {
            storage: Storage::Sparse(triplets),
            nitems: n,
        })
    }

    /// Wrap an existing sprs triplet matrix.
    pub fn from_trimat(triplets: TriMat<f64>) -> Result<Self> {
        let (rows, cols) = triplets.shape();
        if rows != cols {
            return Err(SeriationError::Shape { rows, cols });
        }
        for (&w, (i, j)) in triplets.triplet_iter() {
            check_entry(i, j, w)?;
        }
        Ok(Self {
            storage: Storage::Sparse(triplets),
            nitems: rows,
        })
    }

    /// Number of items (rows = columns).
    pub fn n_items(&self) -> usize {
        self.nitems
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nitems, self.nitems)
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self.storage, Storage::Sparse(_))
    }

    /// Number of enumerated edges: n² for dense, stored entries for sparse.
    pub fn n_edges(&self) -> usize {
        match &self.storage {
            Storage::Dense(_) => self.nitems * self.nitems,
            Storage::Sparse(t) => t.nnz(),
        }
    }

    /// Iterate every edge in storage order, zero weights included.
    pub fn edges(&self) -> Box<dyn Iterator<Item = Edge> + '_> {
        match &self.storage {
            Storage::Dense(m) => {
                let n = self.nitems;
                Box::new((0..n).flat_map(move |i| {
                    (0..n).map(move |j| Edge {
                        row: i,
                        col: j,
                        weight: *m.get((i, j)),
                    })
                }))
            }
            Storage::Sparse(t) => Box::new(t.triplet_iter().map(|(&w, (i, j))| Edge {
                row: i,
                col: j,
                weight: w,
            })),
        }
    }

    /// Iterate the edges carrying a nonzero weight.
    pub fn nonzero_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edges().filter(|e| e.weight != 0.0)
    }

    /// Fraction of zero cells over the full n×n grid.
    pub fn sparsity(&self) -> f64 {
        let total = self.nitems * self.nitems;
        if total == 0 {
            return 0.0;
        }
        let nnz = self.nonzero_edges().count();
        (total - nnz) as f64 / total as f64
    }

    /// Symmetry check up to an absolute tolerance.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        let mut cells: HashMap<(usize, usize), f64> = HashMap::with_capacity(self.n_edges());
        for e in self.nonzero_edges() {
            *cells.entry((e.row, e.col)).or_insert(0.0) += e.weight;
        }
        cells.iter().all(|(&(i, j), &w)| {
            let back = cells.get(&(j, i)).copied().unwrap_or(0.0);
            (w - back).abs() <= tol
        })
    }

    /// Same sparsity pattern, each edge weight divided by its aligned eta.
    pub fn reweighted(&self, eta: &[f64]) -> Result<Self> {
        if eta.len() != self.n_edges() {
            return Err(SeriationError::Config(format!(
                "weight vector has {} entries, matrix enumerates {} edges",
                eta.len(),
                self.n_edges()
            )));
        }
        trace!("Reweighting {} edges", eta.len());
        let n = self.nitems;
        let storage = match &self.storage {
            Storage::Dense(m) => {
                let rows: Vec<Vec<f64>> = (0..n)
                    .map(|i| (0..n).map(|j| *m.get((i, j)) / eta[i * n + j]).collect())
                    .collect();
                let dense = DenseMatrix::from_2d_vec(&rows).map_err(|e| {
                    SeriationError::InvalidEntry {
                        row: 0,
                        col: 0,
                        reason: e.to_string(),
                    }
                })?;
                Storage::Dense(dense)
            }
            Storage::Sparse(t) => {
                let data: Vec<f64> = t
                    .data()
                    .iter()
                    .zip(eta.iter())
                    .map(|(&w, &e)| w / e)
                    .collect();
                Storage::Sparse(TriMat::from_triplets(
                    (n, n),
                    t.row_inds().to_vec(),
                    t.col_inds().to_vec(),
                    data,
                ))
            }
        };
        Ok(Self {
            storage,
            nitems: n,
        })
    }

    /// CSR copy of the matrix; duplicate triplets are summed.
    pub fn to_csr(&self) -> CsMat<f64> {
        match &self.storage {
            Storage::Sparse(t) => t.to_csr(),
            Storage::Dense(_) => {
                let mut triplets = TriMat::new((self.nitems, self.nitems));
                for e in self.nonzero_edges() {
                    triplets.add_triplet(e.row, e.col, e.weight);
                }
                triplets.to_csr()
            }
        }
    }
}

fn check_entry(row: usize, col: usize, w: f64) -> Result<()> {
    if !w.is_finite() {
        return Err(SeriationError::InvalidEntry {
            row,
            col,
            reason: format!("non-finite similarity {}", w),
        });
    }
    if w < 0.0 {
        return Err(SeriationError::InvalidEntry {
            row,
            col,
            reason: format!("negative similarity {}", w),
        });
    }
    Ok(())
}

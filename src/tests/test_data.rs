//! Similarity matrices with a known best ordering.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::permutation::Permutation;
use crate::similarity::SimilarityMatrix;

/// `X_ij = 1` where `|i − j| ≤ bandwidth`, diagonal included.
pub fn banded_rows(n: usize, bandwidth: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| {
            (0..n)
                .map(|j| if i.abs_diff(j) <= bandwidth { 1.0 } else { 0.0 })
                .collect()
        })
        .collect()
}

/// Same as [`banded_rows`] with the distance measured around the cycle.
pub fn circular_banded_rows(n: usize, bandwidth: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| {
            (0..n)
                .map(|j| {
                    let d = i.abs_diff(j);
                    if d.min(n - d) <= bandwidth {
                        1.0
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}

/// Toeplitz-like similarities decaying with `|i − j|` plus seeded noise,
/// symmetric and nonnegative.
pub fn noisy_decaying_rows(n: usize, noise: f64, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut rows = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            let base = 1.0 / (1.0 + i.abs_diff(j) as f64);
            let w = if i == j {
                0.0
            } else {
                base + noise * rng.random_range(0.0..1.0)
            };
            rows[i][j] = w;
            rows[j][i] = w;
        }
    }
    rows
}

/// Random symmetric matrix with roughly half the cells set.
pub fn random_symmetric_rows(n: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut rows = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            if rng.random_bool(0.5) {
                let w = rng.random_range(0.1..3.0);
                rows[i][j] = w;
                rows[j][i] = w;
            }
        }
    }
    rows
}

/// `Y[a][b] = X[σ(a)][σ(b)]` with `σ(a) = shuffle.rank(a)`: ordering `Y`
/// by `shuffle` reproduces `X`.
pub fn shuffled_rows(rows: &[Vec<f64>], shuffle: &Permutation) -> Vec<Vec<f64>> {
    let n = rows.len();
    (0..n)
        .map(|a| (0..n).map(|b| rows[shuffle.rank(a)][shuffle.rank(b)]).collect())
        .collect()
}

pub fn dense(rows: &[Vec<f64>]) -> SimilarityMatrix {
    SimilarityMatrix::from_rows(rows).unwrap()
}

/// Sparse copy of the nonzero cells, stored row-major.
pub fn sparse(rows: &[Vec<f64>]) -> SimilarityMatrix {
    let n = rows.len();
    let (mut r, mut c, mut v) = (Vec::new(), Vec::new(), Vec::new());
    for (i, row) in rows.iter().enumerate() {
        for (j, &w) in row.iter().enumerate() {
            if w != 0.0 {
                r.push(i);
                c.push(j);
                v.push(w);
            }
        }
    }
    SimilarityMatrix::from_triplets(n, &r, &c, &v).unwrap()
}

/// Unweighted path graph as a sparse matrix, both directions stored.
pub fn path(n: usize) -> SimilarityMatrix {
    sparse(&banded_rows(n, 1))
}

//! Seriation cost of an ordering.
//!
//! For every nonzero edge `(i, j, w)` the rank distance
//! `d = |rank(i) − rank(j)|` (wrapped to `min(d, n − d)` on a cycle) is
//! passed through a loss transform and weighted by `w`:
//!
//! | loss     | in band (`d ≤ dh`)  | out of band           |
//! |----------|---------------------|-----------------------|
//! | `OneSum` | `w·d`               | `w·d`                 |
//! | `TwoSum` | `w·d²`              | `w·d²`                |
//! | `Huber`  | `w·d²`              | `w·(2·dh·d − dh²)`    |
//! | `R2S`    | `w·d²`              | `w·dh²`               |
//!
//! On a cycle an edge is also in band when `d ≥ n − dh`. Huber joins
//! continuously at `d = dh`; R2S is flat past the band.

use std::fmt;
use std::str::FromStr;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SeriationError};
use crate::permutation::{rank_distance, Permutation};
use crate::similarity::SimilarityMatrix;

/// Loss shape applied to each rank distance.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LossKind {
    #[default]
    OneSum,
    TwoSum,
    Huber,
    R2S,
}

impl LossKind {
    /// Cost of one unit-weight pair at distance `d`.
    #[inline]
    pub fn transform(self, d: usize, dh: usize, n: usize, circular: bool) -> f64 {
        let df = d as f64;
        let in_band = || d <= dh || (circular && d + dh >= n);
        match self {
            LossKind::OneSum => df,
            LossKind::TwoSum => df * df,
            LossKind::Huber => {
                if in_band() {
                    df * df
                } else {
                    let h = dh as f64;
                    2.0 * h * df - h * h
                }
            }
            LossKind::R2S => {
                if in_band() {
                    df * df
                } else {
                    let h = dh as f64;
                    h * h
                }
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LossKind::OneSum => "1SUM",
            LossKind::TwoSum => "2SUM",
            LossKind::Huber => "Huber",
            LossKind::R2S => "R2S",
        }
    }
}

impl fmt::Display for LossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LossKind {
    type Err = SeriationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1SUM" | "OneSum" => Ok(LossKind::OneSum),
            "2SUM" | "TwoSum" => Ok(LossKind::TwoSum),
            "Huber" | "HUBER" | "huber" => Ok(LossKind::Huber),
            "R2S" | "r2s" => Ok(LossKind::R2S),
            other => Err(SeriationError::UnsupportedLoss(other.to_string())),
        }
    }
}

/// Seriation cost of `x` under `permutation` (identity if `None`).
///
/// `dh` is the band half-width used by `Huber` and `R2S`; it must be ≥ 1.
pub fn score(
    x: &SimilarityMatrix,
    loss: LossKind,
    dh: usize,
    permutation: Option<&Permutation>,
    circular: bool,
) -> Result<f64> {
    if dh == 0 {
        return Err(SeriationError::Config("band dh must be at least 1".into()));
    }
    let n = x.n_items();
    check_permutation(permutation, n)?;

    let total: f64 = x
        .nonzero_edges()
        .map(|e| {
            let d = match permutation {
                Some(p) => p.distance(e.row, e.col, circular),
                None => rank_distance(e.row, e.col, n, circular),
            };
            e.weight * loss.transform(d, dh, n, circular)
        })
        .sum();

    trace!(
        "score: loss={} dh={} circular={} n={} -> {:.6e}",
        loss,
        dh,
        circular,
        n,
        total
    );
    Ok(total)
}

/// Generic p-sum `Σ w·|rank(i) − rank(j)|^p` on the line.
pub fn p_sum_score(x: &SimilarityMatrix, p: u32, permutation: Option<&Permutation>) -> Result<f64> {
    if p == 0 {
        return Err(SeriationError::Config("p-sum exponent must be at least 1".into()));
    }
    let exponent = i32::try_from(p)
        .map_err(|_| SeriationError::Config(format!("p-sum exponent {} is too large", p)))?;
    let n = x.n_items();
    check_permutation(permutation, n)?;
    Ok(x.nonzero_edges()
        .map(|e| {
            let d = match permutation {
                Some(perm) => perm.distance(e.row, e.col, false),
                None => e.row.abs_diff(e.col),
            };
            e.weight * (d as f64).powi(exponent)
        })
        .sum())
}

fn check_permutation(permutation: Option<&Permutation>, n: usize) -> Result<()> {
    match permutation {
        Some(p) if p.len() != n => Err(SeriationError::InvalidPermutation(format!(
            "permutation has {} items, matrix has {}",
            p.len(),
            n
        ))),
        _ => Ok(()),
    }
}

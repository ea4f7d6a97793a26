//! Orderings of items.
//!
//! A [`Permutation`] stores, for each item `i`, its rank position
//! `ranks[i]`. The inverse view (`order[r]` = item at rank `r`) is available
//! through [`Permutation::order`].

use std::cmp::Ordering;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SeriationError};

/// Starting ordering of the eta-trick loop.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum InitialOrdering {
    #[default]
    Identity,
    /// Uniformly random permutation drawn from a seeded ChaCha stream.
    Random { seed: u64 },
}

impl InitialOrdering {
    pub fn permutation(&self, n: usize) -> Permutation {
        match *self {
            InitialOrdering::Identity => Permutation::identity(n),
            InitialOrdering::Random { seed } => Permutation::random(n, seed),
        }
    }
}

/// Bijection from item index to rank position.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permutation {
    ranks: Vec<usize>,
}

impl Permutation {
    pub fn identity(n: usize) -> Self {
        Self {
            ranks: (0..n).collect(),
        }
    }

    /// Random permutation, reproducible for a given `seed`.
    pub fn random(n: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut ranks: Vec<usize> = (0..n).collect();
        ranks.shuffle(&mut rng);
        Self { ranks }
    }

    /// Validate `ranks` as a bijection of `0..ranks.len()`.
    pub fn from_ranks(ranks: Vec<usize>) -> Result<Self> {
        let n = ranks.len();
        let mut seen = vec![false; n];
        for (item, &r) in ranks.iter().enumerate() {
            if r >= n {
                return Err(SeriationError::InvalidPermutation(format!(
                    "item {} has rank {} outside 0..{}",
                    item, r, n
                )));
            }
            if seen[r] {
                return Err(SeriationError::InvalidPermutation(format!(
                    "rank {} assigned twice",
                    r
                )));
            }
            seen[r] = true;
        }
        Ok(Self { ranks })
    }

    /// Build from an order (`order[r]` = item placed at rank `r`).
    pub fn from_order(order: &[usize]) -> Result<Self> {
        let inverse = Self::from_ranks(order.to_vec())?;
        Ok(Self {
            ranks: inverse.order(),
        })
    }

    /// Ranks of the values: ascending sort, ties broken by item index.
    pub fn from_scores(values: &[f64]) -> Self {
        let order = argsort(values);
        let mut ranks = vec![0usize; order.len()];
        for (r, &item) in order.iter().enumerate() {
            ranks[item] = r;
        }
        Self { ranks }
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    #[inline]
    pub fn rank(&self, item: usize) -> usize {
        self.ranks[item]
    }

    pub fn ranks(&self) -> &[usize] {
        &self.ranks
    }

    pub fn into_ranks(self) -> Vec<usize> {
        self.ranks
    }

    /// Item at each rank position.
    pub fn order(&self) -> Vec<usize> {
        let mut order = vec![0usize; self.ranks.len()];
        for (item, &r) in self.ranks.iter().enumerate() {
            order[r] = item;
        }
        order
    }

    /// Same ordering read back to front.
    pub fn reversed(&self) -> Self {
        let n = self.ranks.len();
        Self {
            ranks: self.ranks.iter().map(|&r| n - 1 - r).collect(),
        }
    }

    /// Rank distance between two items, wrapped on the cycle if `circular`.
    #[inline]
    pub fn distance(&self, a: usize, b: usize, circular: bool) -> usize {
        rank_distance(self.ranks[a], self.ranks[b], self.ranks.len(), circular)
    }
}

/// `|ra − rb|`, or `min(d, n − d)` on a cycle of length `n`.
#[inline]
pub fn rank_distance(ra: usize, rb: usize, n: usize, circular: bool) -> usize {
    let d = ra.abs_diff(rb);
    if circular {
        d.min(n - d)
    } else {
        d
    }
}

/// Indices that sort `values` ascending; stable, so ties keep index order.
pub fn argsort(values: &[f64]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.cmp(&b))
    });
    idx
}

//! # Spectral eta-trick
//!
//! Minimises a seriation cost by repeatedly solving the spectral (2-SUM)
//! relaxation on a reweighted similarity matrix:
//!
//! ```text
//! eta ← 1
//! repeat n_iter times:
//!     X_w      ← X / eta                       (entrywise, per edge)
//!     E        ← embed(X_w)                    (≥ max(avg_dim, 8) + 1 dims)
//!     π        ← ranks of E[:, 0]              (mirrored if item 0 ranks after item n−1)
//!     π == best → converged
//!     keep π if score(X, π) < best score
//!     eta      ← update(E, eta)                (clamped ≥ dh, optional momentum)
//! ```
//!
//! The score is always taken on the original matrix under the configured
//! loss, so the returned ordering is the best one visited, not the last.
//! Embedder failures abort the run; nothing partial is returned.
//!
//! The orientation rule (mirror when item 0 would rank after item n−1) is a
//! symmetry-breaking convention that makes runs reproducible. It carries no
//! optimality guarantee.

use log::{debug, info, trace, warn};

use crate::builder::{EtaTrickConfig, MIN_EMBEDDING_DIM};
use crate::eigenmaps::{Embedder, EmbedderConfig, Embedding, SpectralEmbedder};
use crate::errors::{EmbeddingError, Result};
use crate::eta::{EtaWeights, WeightUpdater};
use crate::permutation::Permutation;
use crate::score::score;
use crate::similarity::SimilarityMatrix;

/// Score reported when fewer than three items short-circuit the solver.
pub const TRIVIAL_SCORE: f64 = -1.0;

/// Why the loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// Fewer than three items, identity returned without iterating.
    Trivial,
    /// A candidate matched the best ordering.
    Converged,
    /// `n_iter` iterations ran without convergence.
    Exhausted,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SeriationResult {
    pub permutation: Permutation,
    /// Best score under the configured loss, present when `return_score` is set.
    pub score: Option<f64>,
    /// Embedder invocations performed.
    pub iterations: usize,
    pub termination: Termination,
}

/// What one completed iteration produced.
#[derive(Debug)]
pub struct IterationReport<'a> {
    pub iteration: usize,
    pub candidate: &'a Permutation,
    pub candidate_score: f64,
    pub best_score: f64,
    pub improved: bool,
}

/// Fire-and-forget hook called after every non-converged iteration.
pub trait IterationObserver {
    fn on_iteration(&mut self, report: &IterationReport<'_>);
}

impl<F> IterationObserver for F
where
    F: FnMut(&IterationReport<'_>),
{
    fn on_iteration(&mut self, report: &IterationReport<'_>) {
        self(report)
    }
}

struct SolverState {
    best: Permutation,
    best_score: f64,
    eta: EtaWeights,
    iteration: usize,
}

/// Eta-trick solver bound to a configuration and an embedder.
#[derive(Clone, Debug)]
pub struct EtaTrickSolver<'a, E> {
    config: &'a EtaTrickConfig,
    embedder: E,
}

impl<'a, E: Embedder> EtaTrickSolver<'a, E> {
    pub fn new(config: &'a EtaTrickConfig, embedder: E) -> Self {
        Self { config, embedder }
    }

    pub fn solve(&self, x: &SimilarityMatrix) -> Result<SeriationResult> {
        self.run(x, None)
    }

    pub fn solve_observed(
        &self,
        x: &SimilarityMatrix,
        observer: &mut dyn IterationObserver,
    ) -> Result<SeriationResult> {
        self.run(x, Some(observer))
    }

    fn run(
        &self,
        x: &SimilarityMatrix,
        mut observer: Option<&mut dyn IterationObserver>,
    ) -> Result<SeriationResult> {
        let cfg = self.config;
        cfg.validate()?;
        let n = x.n_items();

        if n < 3 {
            debug!("{} items: returning identity ordering", n);
            return Ok(SeriationResult {
                permutation: Permutation::identity(n),
                score: cfg.return_score.then_some(TRIVIAL_SCORE),
                iterations: 0,
                termination: Termination::Trivial,
            });
        }

        info!(
            "Eta-trick: n={}, edges={}, loss={}, dh={}, n_iter={}, avg_dim={}",
            n,
            x.n_edges(),
            cfg.loss,
            cfg.dh,
            cfg.n_iter,
            cfg.avg_dim
        );
        if !x.is_symmetric(1e-9) {
            warn!("Similarity matrix is not symmetric; the Laplacian uses (X + Xᵀ)/2");
        }

        let updater = WeightUpdater {
            avg_dim: cfg.avg_dim,
            avg_scaling: cfg.avg_scaling,
            dh: cfg.dh,
            circular: cfg.circular,
            momentum: cfg.momentum,
        };
        let n_components = cfg.n_components();

        let best = cfg.initial.permutation(n);
        let best_score = score(x, cfg.loss, cfg.dh, Some(&best), cfg.circular)?;
        debug!("Initial {:?} ordering scores {:.6e}", cfg.initial, best_score);

        let mut state = SolverState {
            best,
            best_score,
            eta: EtaWeights::ones(x),
            iteration: 0,
        };
        let mut termination = Termination::Exhausted;

        while state.iteration < cfg.n_iter {
            state.iteration += 1;

            let reweighted = x.reweighted(state.eta.as_slice())?;
            let embedding = self.embedder.embed(&reweighted, &cfg.embedder, n_components)?;
            let (embedding, candidate) = oriented_candidate(embedding, n)?;

            if candidate == state.best {
                debug!("Iteration {}: candidate equals best, converged", state.iteration);
                termination = Termination::Converged;
                break;
            }

            let candidate_score = score(x, cfg.loss, cfg.dh, Some(&candidate), cfg.circular)?;
            let improved = candidate_score < state.best_score;
            if improved {
                trace!(
                    "Iteration {}: best score {:.6e} -> {:.6e}",
                    state.iteration,
                    state.best_score,
                    candidate_score
                );
                state.best_score = candidate_score;
                state.best = candidate.clone();
            }

            state.eta = updater.update(x, &embedding, Some(&state.eta))?;

            debug!(
                "Iteration {}: candidate {:.6e}, best {:.6e}, min eta {:.3}",
                state.iteration,
                candidate_score,
                state.best_score,
                state.eta.min()
            );

            if let Some(obs) = observer.as_mut() {
                obs.on_iteration(&IterationReport {
                    iteration: state.iteration,
                    candidate: &candidate,
                    candidate_score,
                    best_score: state.best_score,
                    improved,
                });
            }
        }

        info!(
            "Eta-trick finished: {:?} after {} iterations, best score {:.6e}",
            termination, state.iteration, state.best_score
        );

        Ok(SeriationResult {
            permutation: state.best,
            score: cfg.return_score.then_some(state.best_score),
            iterations: state.iteration,
            termination,
        })
    }
}

/// Runs the eta-trick with the default [`SpectralEmbedder`].
pub fn solve(x: &SimilarityMatrix, config: &EtaTrickConfig) -> Result<SeriationResult> {
    EtaTrickSolver::new(config, SpectralEmbedder).solve(x)
}

/// Runs the eta-trick with an injected embedder and optional observer.
pub fn solve_with<E: Embedder>(
    x: &SimilarityMatrix,
    config: &EtaTrickConfig,
    embedder: E,
    observer: Option<&mut dyn IterationObserver>,
) -> Result<SeriationResult> {
    let solver = EtaTrickSolver::new(config, embedder);
    match observer {
        Some(obs) => solver.solve_observed(x, obs),
        None => solver.solve(x),
    }
}

/// Plain spectral ordering: one embedding of the unweighted matrix.
pub fn spectral_ordering<E: Embedder>(
    x: &SimilarityMatrix,
    config: &EmbedderConfig,
    embedder: E,
) -> Result<Permutation> {
    let n = x.n_items();
    if n < 3 {
        return Ok(Permutation::identity(n));
    }
    let embedding = embedder.embed(x, config, MIN_EMBEDDING_DIM + 1)?;
    let (_, candidate) = oriented_candidate(embedding, n)?;
    Ok(candidate)
}

/// Ranks along column 0, mirrored so that item 0 never ranks after item n−1.
fn oriented_candidate(embedding: Embedding, n: usize) -> Result<(Embedding, Permutation)> {
    if embedding.n_items() != n || embedding.n_components() == 0 {
        return Err(EmbeddingError::Shape {
            rows: embedding.n_items(),
            cols: embedding.n_components(),
            expected_rows: n,
        }
        .into());
    }
    let candidate = Permutation::from_scores(embedding.column(0));
    if candidate.rank(0) > candidate.rank(n - 1) {
        trace!("Mirroring embedding to put item 0 before item {}", n - 1);
        let mirrored = embedding.mirrored();
        let candidate = Permutation::from_scores(mirrored.column(0));
        return Ok((mirrored, candidate));
    }
    Ok((embedding, candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oriented_candidate_hands_back_mirrored_embedding() {
        let descending = Embedding::from_columns(
            4,
            vec![vec![3.0, 2.0, 1.0, 0.0], vec![0.5, -1.0, 2.0, 0.0]],
        )
        .unwrap();
        let (embedding, candidate) = oriented_candidate(descending.clone(), 4).unwrap();
        assert_eq!(candidate, Permutation::identity(4));
        assert_eq!(embedding, descending.mirrored());
        assert_eq!(embedding.column(1), &[-0.5, 1.0, -2.0, 0.0]);

        let ascending = descending.mirrored();
        let (kept, candidate) = oriented_candidate(ascending.clone(), 4).unwrap();
        assert_eq!(candidate, Permutation::identity(4));
        assert_eq!(kept, ascending);
    }

    #[test]
    fn test_oriented_candidate_checks_shape() {
        let short = Embedding::from_columns(3, vec![vec![0.0, 1.0, 2.0]]).unwrap();
        assert!(matches!(
            oriented_candidate(short, 4),
            Err(crate::errors::SeriationError::Embedding(
                EmbeddingError::Shape { .. }
            ))
        ));
    }
}

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::eigenmaps::{EigenSolver, EmbedderConfig, ScaleEmbedding};
use crate::errors::{Result, SeriationError};
use crate::laplacian::{AdjacencyNorm, LaplacianNorm};
use crate::permutation::InitialOrdering;
use crate::score::LossKind;

/// Minimum number of embedding components requested per iteration, on top
/// of which one extra is always asked for.
pub const MIN_EMBEDDING_DIM: usize = 8;

/// Immutable configuration of one eta-trick run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EtaTrickConfig {
    pub n_iter: usize,
    /// Band half-width for the Huber/R2S losses and floor of the eta weights.
    pub dh: usize,
    pub loss: LossKind,
    pub circular: bool,
    /// Embedding dimensions aggregated into each eta update.
    pub avg_dim: usize,
    /// Discount dimension k by `1/sqrt(1 + k)` when aggregating.
    pub avg_scaling: bool,
    /// Momentum `gamma ∈ [0, 1]` blending successive eta weights.
    pub momentum: Option<f64>,
    pub return_score: bool,
    pub initial: InitialOrdering,
    pub embedder: EmbedderConfig,
}

impl Default for EtaTrickConfig {
    fn default() -> Self {
        Self {
            n_iter: 50,
            dh: 1,
            loss: LossKind::Huber,
            circular: false,
            avg_dim: 1,
            avg_scaling: true,
            momentum: None,
            return_score: false,
            initial: InitialOrdering::Identity,
            embedder: EmbedderConfig::default(),
        }
    }
}

impl PartialEq for EtaTrickConfig {
    fn eq(&self, other: &Self) -> bool {
        self.n_iter == other.n_iter
            && self.dh == other.dh
            && self.loss == other.loss
            && self.circular == other.circular
            && self.avg_dim == other.avg_dim
            && self.avg_scaling == other.avg_scaling
            && match (self.momentum, other.momentum) {
                (None, None) => true,
                (Some(a), Some(b)) => approx::relative_eq!(a, b),
                _ => false,
            }
            && self.return_score == other.return_score
            && self.initial == other.initial
            && self.embedder == other.embedder
    }
}

impl EtaTrickConfig {
    /// Checks every numeric option against its valid range.
    pub fn validate(&self) -> Result<()> {
        if self.n_iter == 0 {
            return Err(SeriationError::Config("n_iter must be at least 1".into()));
        }
        if self.dh == 0 {
            return Err(SeriationError::Config("band dh must be at least 1".into()));
        }
        if self.avg_dim == 0 {
            return Err(SeriationError::Config("avg_dim must be at least 1".into()));
        }
        if let Some(gamma) = self.momentum {
            if !gamma.is_finite() || !(0.0..=1.0).contains(&gamma) {
                return Err(SeriationError::Config(format!(
                    "momentum must lie in [0, 1], got {}",
                    gamma
                )));
            }
        }
        if let EigenSolver::SubspaceIteration { max_iter, tol, .. } = self.embedder.solver {
            if max_iter == 0 || !tol.is_finite() || tol <= 0.0 {
                return Err(SeriationError::Config(format!(
                    "subspace iteration needs max_iter > 0 and tol > 0, got {} and {}",
                    max_iter, tol
                )));
            }
        }
        Ok(())
    }

    /// Components requested from the embedder at every iteration.
    pub fn n_components(&self) -> usize {
        self.avg_dim.max(MIN_EMBEDDING_DIM) + 1
    }
}

/// Consuming builder for [`EtaTrickConfig`].
#[derive(Clone, Debug, Default)]
pub struct EtaTrickBuilder {
    config: EtaTrickConfig,
}

impl EtaTrickBuilder {
    pub fn new() -> Self {
        debug!("Creating EtaTrickBuilder with default parameters");
        Self::default()
    }

    pub fn with_n_iter(mut self, n_iter: usize) -> Self {
        self.config.n_iter = n_iter;
        self
    }

    /// Band half-width `dh`. Real-valued bands must be truncated toward zero
    /// by the caller.
    pub fn with_band(mut self, dh: usize) -> Self {
        self.config.dh = dh;
        self
    }

    pub fn with_loss(mut self, loss: LossKind) -> Self {
        self.config.loss = loss;
        self
    }

    pub fn with_circular(mut self, circular: bool) -> Self {
        self.config.circular = circular;
        self
    }

    /// Number of embedding dimensions averaged into each eta update and
    /// whether later dimensions are discounted.
    pub fn with_averaging(mut self, avg_dim: usize, avg_scaling: bool) -> Self {
        self.config.avg_dim = avg_dim;
        self.config.avg_scaling = avg_scaling;
        self
    }

    pub fn with_avg_dim(mut self, avg_dim: usize) -> Self {
        self.config.avg_dim = avg_dim;
        self
    }

    pub fn with_momentum(mut self, gamma: f64) -> Self {
        self.config.momentum = Some(gamma);
        self
    }

    pub fn with_return_score(mut self, return_score: bool) -> Self {
        self.config.return_score = return_score;
        self
    }

    pub fn with_initial(mut self, initial: InitialOrdering) -> Self {
        self.config.initial = initial;
        self
    }

    /// Start from a seeded random permutation instead of the identity.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.initial = InitialOrdering::Random { seed };
        self
    }

    pub fn with_embedder(mut self, embedder: EmbedderConfig) -> Self {
        self.config.embedder = embedder;
        self
    }

    pub fn with_normalisation(mut self, adjacency: AdjacencyNorm, laplacian: LaplacianNorm) -> Self {
        self.config.embedder.adjacency = adjacency;
        self.config.embedder.laplacian = laplacian;
        self
    }

    pub fn with_scaling(mut self, scaling: ScaleEmbedding) -> Self {
        self.config.embedder.scaling = scaling;
        self
    }

    pub fn with_eigen_solver(mut self, solver: EigenSolver) -> Self {
        self.config.embedder.solver = solver;
        self
    }

    /// Validate and freeze the configuration.
    pub fn build(self) -> Result<EtaTrickConfig> {
        self.config.validate()?;
        info!(
            "Eta-trick configured: loss={}, dh={}, n_iter={}, avg_dim={}, circular={}, momentum={:?}",
            self.config.loss,
            self.config.dh,
            self.config.n_iter,
            self.config.avg_dim,
            self.config.circular,
            self.config.momentum
        );
        Ok(self.config)
    }
}

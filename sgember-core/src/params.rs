//! Run configuration for the embedding pipeline.
//!
//! [`ParamsBuilder`] validates user-facing settings before producing a
//! [`Params`] record. Two fields are recorded later by the driver rather
//! than set by the user: the effective worker count (after worker-pool
//! resolution, before the graph loads) and the node count (after the graph
//! loads). Both are recorded exactly once.

use std::num::NonZeroUsize;

use crate::error::ParamsError;

const DEFAULT_DIM: usize = 2;
const DEFAULT_LAMBDA: f64 = 1.0;
const DEFAULT_ALPHA: f64 = 12.0;
const DEFAULT_STEP: f64 = 1.0;
const DEFAULT_MAX_ITERS: usize = 1000;
const DEFAULT_EARLY_ITERS: usize = 250;

/// Configures and constructs [`Params`] records.
///
/// # Examples
/// ```
/// use sgember_core::ParamsBuilder;
///
/// let params = ParamsBuilder::new()
///     .with_dim(3)
///     .with_lambda(2.0)
///     .build()
///     .expect("builder configuration is valid");
/// assert_eq!(params.dim().get(), 3);
/// assert_eq!(params.lambda(), 2.0);
/// ```
#[derive(Debug, Clone)]
pub struct ParamsBuilder {
    dim: usize,
    lambda: f64,
    alpha: f64,
    step: f64,
    max_iters: usize,
    early_iters: usize,
    requested_workers: usize,
}

impl Default for ParamsBuilder {
    fn default() -> Self {
        Self {
            dim: DEFAULT_DIM,
            lambda: DEFAULT_LAMBDA,
            alpha: DEFAULT_ALPHA,
            step: DEFAULT_STEP,
            max_iters: DEFAULT_MAX_ITERS,
            early_iters: DEFAULT_EARLY_ITERS,
            requested_workers: 0,
        }
    }
}

impl ParamsBuilder {
    /// Creates a builder populated with the compiled-in defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the embedding dimensionality.
    #[must_use]
    pub fn with_dim(mut self, dim: usize) -> Self {
        self.dim = dim;
        self
    }

    /// Overrides the graph regularization factor.
    #[must_use]
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    /// Overrides the early-exaggeration factor.
    #[must_use]
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Overrides the gradient step size.
    #[must_use]
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    /// Overrides the iteration budget.
    #[must_use]
    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Overrides the early-exaggeration iteration count.
    #[must_use]
    pub fn with_early_iters(mut self, early_iters: usize) -> Self {
        self.early_iters = early_iters;
        self
    }

    /// Overrides the requested worker count. Zero means unspecified.
    #[must_use]
    pub fn with_requested_workers(mut self, workers: usize) -> Self {
        self.requested_workers = workers;
        self
    }

    /// Validates the configuration and constructs a [`Params`] record.
    ///
    /// # Errors
    /// Returns [`ParamsError::InvalidDimension`] when the embedding
    /// dimensionality is zero.
    pub fn build(self) -> Result<Params, ParamsError> {
        let dim = NonZeroUsize::new(self.dim)
            .ok_or(ParamsError::InvalidDimension { got: self.dim })?;

        Ok(Params {
            dim,
            lambda: self.lambda,
            alpha: self.alpha,
            step: self.step,
            max_iters: self.max_iters,
            early_iters: self.early_iters,
            requested_workers: self.requested_workers,
            effective_workers: 0,
            nodes: 0,
        })
    }
}

/// Resolved run configuration handed to the embedding engine.
///
/// # Examples
/// ```
/// use sgember_core::ParamsBuilder;
///
/// let params = ParamsBuilder::new().build().expect("defaults are valid");
/// assert_eq!(params.dim().get(), 2);
/// assert_eq!(params.max_iters(), 1000);
/// assert_eq!(params.effective_workers(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct Params {
    dim: NonZeroUsize,
    lambda: f64,
    alpha: f64,
    step: f64,
    max_iters: usize,
    early_iters: usize,
    requested_workers: usize,
    effective_workers: usize,
    nodes: usize,
}

impl Params {
    /// Embedding dimensionality.
    #[must_use]
    pub fn dim(&self) -> NonZeroUsize {
        self.dim
    }

    /// Graph regularization factor.
    #[must_use]
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Early-exaggeration factor applied during the first
    /// [`Self::early_iters`] iterations.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Gradient step size.
    #[must_use]
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Total iteration budget.
    #[must_use]
    pub fn max_iters(&self) -> usize {
        self.max_iters
    }

    /// Number of early-exaggeration iterations.
    #[must_use]
    pub fn early_iters(&self) -> usize {
        self.early_iters
    }

    /// Worker count requested on the command line. Zero means unspecified.
    #[must_use]
    pub fn requested_workers(&self) -> usize {
        self.requested_workers
    }

    /// Worker count actually honoured by the pool, or zero before
    /// resolution.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        self.effective_workers
    }

    /// Node count of the loaded graph, or zero before the graph loads.
    #[must_use]
    pub fn nodes(&self) -> usize {
        self.nodes
    }

    /// Records the worker count reported back by the pool.
    ///
    /// The driver calls this exactly once, before the graph loads.
    pub fn record_workers(&mut self, effective: usize) {
        self.effective_workers = effective;
    }

    /// Records the node count of the loaded graph.
    ///
    /// The driver calls this exactly once, after the graph loads.
    pub fn record_nodes(&mut self, nodes: usize) {
        self.nodes = nodes;
    }
}

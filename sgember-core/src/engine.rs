//! Embedding invocation seam and the baseline CPU engine.
//!
//! [`EmbeddingEngine`] is the contract between the driver and the
//! computation: the driver owns the graph, parameters, and seed buffer and
//! lends them for the duration of the call; the engine returns a fresh
//! coordinate buffer and retains nothing.

use rand::{Rng, SeedableRng, rngs::SmallRng};
use rayon::prelude::*;
use tracing::{instrument, warn};

use crate::{
    embedding::Embedding,
    error::EngineError,
    graph::AffinityGraph,
    params::Params,
};

/// Computes a low-dimensional embedding of a sparse affinity graph.
pub trait EmbeddingEngine {
    /// Returns a human-readable name for diagnostics.
    fn name(&self) -> &str;

    /// Embeds `graph` into `params.dim()` dimensions starting from `seed`.
    ///
    /// `seed` must hold exactly `graph.nodes() * params.dim()` row-major
    /// values; the documented all-zero fill means "no seed supplied".
    ///
    /// # Errors
    /// Returns [`EngineError`] when the inputs disagree about their extents
    /// or the computation cannot produce finite coordinates.
    fn embed(
        &self,
        graph: &AffinityGraph,
        params: &Params,
        seed: &[f64],
    ) -> Result<Embedding, EngineError>;
}

/// Baseline gradient-descent embedding engine.
///
/// Normalizes the affinity graph to a symmetric joint distribution (with
/// lambda column scaling), then iterates a t-SNE-style gradient: sparse
/// attraction along graph edges, exact pairwise repulsion, amplified by the
/// early-exaggeration factor for the first `early_iters` iterations.
/// Per-node gradient evaluation runs on rayon workers, so callers should
/// invoke it through [`crate::WorkerPool::scope`].
///
/// An all-zero seed would make every pairwise difference vanish and stall
/// the descent, so it is replaced by a small deterministic pseudo-random
/// layout derived from `init_seed`.
#[derive(Debug, Clone)]
pub struct SgdEngine {
    init_seed: u64,
}

impl Default for SgdEngine {
    fn default() -> Self {
        Self { init_seed: 0 }
    }
}

impl SgdEngine {
    /// Creates an engine with the default deterministic initialization.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the seed used for the deterministic initial layout.
    #[must_use]
    pub fn with_init_seed(mut self, init_seed: u64) -> Self {
        self.init_seed = init_seed;
        self
    }

    fn initial_layout(&self, seed: &[f64]) -> Vec<f64> {
        if seed.iter().any(|&v| v != 0.0) {
            return seed.to_vec();
        }
        let mut rng = SmallRng::seed_from_u64(self.init_seed);
        seed.iter()
            .map(|_| (rng.r#gen::<f64>() - 0.5) * 1e-4)
            .collect()
    }
}

/// Symmetric joint distribution derived from the affinity graph, stored as
/// per-node adjacency lists.
fn joint_distribution(graph: &AffinityGraph, lambda: f64) -> Vec<Vec<(usize, f64)>> {
    let nodes = graph.nodes();
    let scale = if lambda.is_finite() && lambda > 0.0 {
        lambda
    } else {
        warn!(lambda, "non-positive lambda, falling back to 1.0");
        1.0
    };

    let col_sums = graph.column_sums();
    let mut entries: Vec<(usize, usize, f64)> = Vec::with_capacity(graph.edge_count() * 2);
    for (row, col, weight) in graph.triplets() {
        if row == col || weight == 0.0 || col_sums[col] == 0.0 {
            continue;
        }
        let stochastic = weight * scale / col_sums[col];
        entries.push((row, col, stochastic / 2.0));
        entries.push((col, row, stochastic / 2.0));
    }

    entries.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); nodes];
    let mut total = 0.0;
    for (row, col, value) in entries {
        total += value;
        let row_entries = &mut adjacency[row];
        let merged = match row_entries.last_mut() {
            Some(last) if last.0 == col => {
                last.1 += value;
                true
            }
            _ => false,
        };
        if !merged {
            row_entries.push((col, value));
        }
    }

    if total > 0.0 {
        for row in &mut adjacency {
            for entry in row {
                entry.1 /= total;
            }
        }
    }
    adjacency
}

impl EmbeddingEngine for SgdEngine {
    fn name(&self) -> &str {
        "sgd"
    }

    #[instrument(
        name = "engine.embed",
        err,
        skip(self, graph, params, seed),
        fields(
            nodes = graph.nodes(),
            dim = params.dim().get(),
            max_iters = params.max_iters(),
            early_iters = params.early_iters(),
        ),
    )]
    fn embed(
        &self,
        graph: &AffinityGraph,
        params: &Params,
        seed: &[f64],
    ) -> Result<Embedding, EngineError> {
        let nodes = graph.nodes();
        let dim = params.dim().get();
        let expected = nodes * dim;
        if seed.len() != expected {
            return Err(EngineError::SeedLength {
                expected,
                got: seed.len(),
            });
        }
        if params.nodes() != 0 && params.nodes() != nodes {
            return Err(EngineError::NodeMismatch {
                recorded: params.nodes(),
                graph: nodes,
            });
        }

        let joint = joint_distribution(graph, params.lambda());
        let mut coords = self.initial_layout(seed);

        for iteration in 0..params.max_iters() {
            let exaggeration = if iteration < params.early_iters() {
                params.alpha()
            } else {
                1.0
            };

            // Collect per-node partials in index order and reduce
            // sequentially: a parallel reduction would make the sum depend
            // on thread scheduling and the output non-deterministic.
            let partials: Vec<f64> = (0..nodes)
                .into_par_iter()
                .map(|i| {
                    let yi = &coords[i * dim..(i + 1) * dim];
                    (0..nodes)
                        .filter(|&j| j != i)
                        .map(|j| {
                            let yj = &coords[j * dim..(j + 1) * dim];
                            kernel(yi, yj)
                        })
                        .sum::<f64>()
                })
                .collect();
            let normaliser = partials.iter().sum::<f64>().max(f64::MIN_POSITIVE);

            let mut next = vec![0.0_f64; expected];
            next.par_chunks_mut(dim).enumerate().for_each(|(i, out)| {
                let yi = &coords[i * dim..(i + 1) * dim];
                let mut gradient = vec![0.0_f64; dim];

                for &(j, p) in &joint[i] {
                    let yj = &coords[j * dim..(j + 1) * dim];
                    let q = kernel(yi, yj);
                    for k in 0..dim {
                        gradient[k] += exaggeration * p * q * (yi[k] - yj[k]);
                    }
                }
                for j in 0..nodes {
                    if j == i {
                        continue;
                    }
                    let yj = &coords[j * dim..(j + 1) * dim];
                    let q = kernel(yi, yj);
                    let repulsion = q * q / normaliser;
                    for k in 0..dim {
                        gradient[k] -= repulsion * (yi[k] - yj[k]);
                    }
                }
                for k in 0..dim {
                    out[k] = yi[k] - 4.0 * params.step() * gradient[k];
                }
            });

            if next.iter().any(|v| !v.is_finite()) {
                return Err(EngineError::Diverged { iteration });
            }
            coords = next;
        }

        Ok(Embedding::from_coords(coords, nodes, dim)
            .expect("descent preserves the buffer extent"))
    }
}

/// Student-t kernel `1 / (1 + ||a - b||^2)`.
fn kernel(a: &[f64], b: &[f64]) -> f64 {
    let dist2: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum();
    1.0 / (1.0 + dist2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_is_one_at_zero_distance() {
        assert_eq!(kernel(&[1.0, 2.0], &[1.0, 2.0]), 1.0);
    }

    #[test]
    fn joint_distribution_sums_to_one() {
        let graph = AffinityGraph::from_triplets(
            3,
            vec![(0, 1, 2.0), (1, 2, 1.0), (2, 0, 0.5)],
        )
        .expect("triplets are valid");
        let joint = joint_distribution(&graph, 1.0);
        let total: f64 = joint.iter().flatten().map(|&(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-12, "total was {total}");
    }

    #[test]
    fn joint_distribution_is_symmetric() {
        let graph = AffinityGraph::from_triplets(3, vec![(0, 1, 4.0), (1, 2, 1.0)])
            .expect("triplets are valid");
        let joint = joint_distribution(&graph, 1.0);
        for (i, row) in joint.iter().enumerate() {
            for &(j, p) in row {
                let mirrored = joint[j]
                    .iter()
                    .find(|&&(col, _)| col == i)
                    .map(|&(_, value)| value);
                assert_eq!(mirrored, Some(p), "entry ({i}, {j}) must mirror");
            }
        }
    }
}

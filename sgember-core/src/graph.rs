//! Sparse affinity graph storage and the loading seam.
//!
//! [`AffinityGraph`] is a compressed-sparse-row weighted graph built once
//! from triplets and immutable afterwards. [`GraphSource`] is the contract
//! boundary behind which concrete loaders (and test stubs) live.

use crate::error::{GraphError, GraphSourceError};

/// Abstraction over anything that can produce an [`AffinityGraph`].
///
/// Production loaders parse an on-disk format; tests implement this trait
/// with in-memory stubs so the pipeline can run without touching the
/// filesystem.
pub trait GraphSource {
    /// Returns a human-readable name for diagnostics.
    fn name(&self) -> &str;

    /// Loads the graph.
    ///
    /// # Errors
    /// Returns [`GraphSourceError`] when the input cannot be read or does
    /// not describe a valid affinity graph.
    fn load(&self) -> Result<AffinityGraph, GraphSourceError>;
}

/// Immutable sparse weighted graph in compressed-sparse-row form.
///
/// Rows and columns both index nodes; an entry `(i, j, w)` encodes the
/// affinity `w` between nodes `i` and `j`. Duplicate triplets are merged by
/// summing their weights.
///
/// # Examples
/// ```
/// use sgember_core::AffinityGraph;
///
/// let graph = AffinityGraph::from_triplets(3, vec![
///     (0, 1, 0.5),
///     (1, 2, 0.25),
/// ]).expect("triplets are valid");
/// assert_eq!(graph.nodes(), 3);
/// assert_eq!(graph.edge_count(), 2);
/// assert_eq!(graph.neighbors(0).collect::<Vec<_>>(), vec![(1, 0.5)]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AffinityGraph {
    nodes: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    weights: Vec<f64>,
}

impl AffinityGraph {
    /// Builds a graph from `(row, col, weight)` triplets.
    ///
    /// Triplets may arrive in any order; duplicates are merged by summing.
    ///
    /// # Errors
    /// Returns [`GraphError::Empty`] for a zero-node graph,
    /// [`GraphError::NodeOutOfRange`] when a triplet references a node at
    /// or beyond `nodes`, and [`GraphError::NonFiniteWeight`] or
    /// [`GraphError::NegativeWeight`] for unusable weights.
    pub fn from_triplets(
        nodes: usize,
        triplets: Vec<(usize, usize, f64)>,
    ) -> Result<Self, GraphError> {
        if nodes == 0 {
            return Err(GraphError::Empty);
        }
        for &(row, col, weight) in &triplets {
            if row >= nodes {
                return Err(GraphError::NodeOutOfRange { index: row, nodes });
            }
            if col >= nodes {
                return Err(GraphError::NodeOutOfRange { index: col, nodes });
            }
            if !weight.is_finite() {
                return Err(GraphError::NonFiniteWeight { row, col });
            }
            if weight < 0.0 {
                return Err(GraphError::NegativeWeight { row, col, weight });
            }
        }

        let mut sorted = triplets;
        sorted.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut row_ptr = vec![0usize; nodes + 1];
        let mut col_idx = Vec::with_capacity(sorted.len());
        let mut weights = Vec::with_capacity(sorted.len());
        let mut previous: Option<(usize, usize)> = None;
        for (row, col, weight) in sorted {
            if previous == Some((row, col)) {
                let last = weights.len() - 1;
                weights[last] += weight;
                continue;
            }
            row_ptr[row + 1] += 1;
            col_idx.push(col);
            weights.push(weight);
            previous = Some((row, col));
        }
        for row in 0..nodes {
            row_ptr[row + 1] += row_ptr[row];
        }

        Ok(Self {
            nodes,
            row_ptr,
            col_idx,
            weights,
        })
    }

    /// Number of nodes (rows and columns).
    #[must_use]
    pub fn nodes(&self) -> usize {
        self.nodes
    }

    /// Number of stored edges after duplicate merging.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.col_idx.len()
    }

    /// Iterates the `(column, weight)` entries of one row.
    ///
    /// # Panics
    /// Panics if `row >= self.nodes()`.
    pub fn neighbors(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let start = self.row_ptr[row];
        let end = self.row_ptr[row + 1];
        self.col_idx[start..end]
            .iter()
            .copied()
            .zip(self.weights[start..end].iter().copied())
    }

    /// Sums the weights of each column.
    ///
    /// # Examples
    /// ```
    /// use sgember_core::AffinityGraph;
    ///
    /// let graph = AffinityGraph::from_triplets(2, vec![
    ///     (0, 1, 1.0),
    ///     (1, 1, 3.0),
    /// ]).expect("triplets are valid");
    /// assert_eq!(graph.column_sums(), vec![0.0, 4.0]);
    /// ```
    #[must_use]
    pub fn column_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0_f64; self.nodes];
        for (&col, &weight) in self.col_idx.iter().zip(&self.weights) {
            sums[col] += weight;
        }
        sums
    }

    /// Iterates all stored `(row, col, weight)` triplets in row-major order.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.nodes).flat_map(move |row| {
            self.neighbors(row).map(move |(col, weight)| (row, col, weight))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    fn from_triplets_sorts_and_merges_duplicates() {
        let graph = AffinityGraph::from_triplets(
            3,
            vec![(2, 0, 1.0), (0, 2, 0.5), (0, 1, 0.25), (0, 2, 0.5)],
        )
        .expect("triplets are valid");
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(
            graph.neighbors(0).collect::<Vec<_>>(),
            vec![(1, 0.25), (2, 1.0)]
        );
        assert_eq!(graph.neighbors(1).count(), 0);
        assert_eq!(graph.neighbors(2).collect::<Vec<_>>(), vec![(0, 1.0)]);
    }

    #[rstest]
    fn from_triplets_rejects_out_of_range_nodes() {
        let err = AffinityGraph::from_triplets(2, vec![(0, 5, 1.0)])
            .expect_err("column 5 is out of range");
        assert_eq!(err, GraphError::NodeOutOfRange { index: 5, nodes: 2 });
    }

    #[rstest]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn from_triplets_rejects_non_finite_weights(#[case] weight: f64) {
        let err = AffinityGraph::from_triplets(2, vec![(0, 1, weight)])
            .expect_err("non-finite weights must be rejected");
        assert_eq!(err, GraphError::NonFiniteWeight { row: 0, col: 1 });
    }

    #[rstest]
    fn from_triplets_rejects_negative_weights() {
        let err = AffinityGraph::from_triplets(2, vec![(1, 0, -0.5)])
            .expect_err("negative weights must be rejected");
        assert!(matches!(err, GraphError::NegativeWeight { row: 1, col: 0, .. }));
    }

    #[rstest]
    fn from_triplets_rejects_empty_graph() {
        let err = AffinityGraph::from_triplets(0, Vec::new())
            .expect_err("zero nodes must be rejected");
        assert_eq!(err, GraphError::Empty);
    }

    #[rstest]
    fn triplets_round_trip_in_row_major_order() {
        let input = vec![(0, 1, 0.5), (1, 0, 0.5), (2, 2, 1.5)];
        let graph =
            AffinityGraph::from_triplets(3, input.clone()).expect("triplets are valid");
        assert_eq!(graph.triplets().collect::<Vec<_>>(), input);
    }
}

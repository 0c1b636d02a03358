//! Dense embedding buffer produced by an engine invocation.

use thiserror::Error;

/// Error returned when a coordinate buffer does not match its declared
/// `nodes x dim` extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("coordinate buffer has {got} values but {nodes} x {dim} requires {expected}")]
pub struct ShapeMismatch {
    /// Declared node count.
    pub nodes: usize,
    /// Declared dimensionality.
    pub dim: usize,
    /// Required buffer length.
    pub expected: usize,
    /// Actual buffer length.
    pub got: usize,
}

/// Row-major `nodes x dim` coordinate buffer.
///
/// # Examples
/// ```
/// use sgember_core::Embedding;
///
/// let embedding = Embedding::from_coords(vec![0.0, 1.0, 2.0, 3.0], 2, 2)
///     .expect("buffer matches the declared extent");
/// assert_eq!(embedding.nodes(), 2);
/// assert_eq!(embedding.row(1), &[2.0, 3.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    coords: Vec<f64>,
    nodes: usize,
    dim: usize,
}

impl Embedding {
    /// Wraps an existing row-major buffer.
    ///
    /// # Errors
    /// Returns [`ShapeMismatch`] when `coords.len() != nodes * dim`.
    pub fn from_coords(
        coords: Vec<f64>,
        nodes: usize,
        dim: usize,
    ) -> Result<Self, ShapeMismatch> {
        let expected = nodes * dim;
        if coords.len() != expected {
            return Err(ShapeMismatch {
                nodes,
                dim,
                expected,
                got: coords.len(),
            });
        }
        Ok(Self { coords, nodes, dim })
    }

    /// Number of embedded nodes.
    #[must_use]
    pub fn nodes(&self) -> usize {
        self.nodes
    }

    /// Dimensionality of each coordinate vector.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The full row-major buffer.
    #[must_use]
    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    /// Coordinates of one node.
    ///
    /// # Panics
    /// Panics if `node >= self.nodes()`.
    #[must_use]
    pub fn row(&self, node: usize) -> &[f64] {
        let start = node * self.dim;
        &self.coords[start..start + self.dim]
    }
}

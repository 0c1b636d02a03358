//! Error types for the sgember core library.
//!
//! Every public error enum carries a stable machine-readable code via
//! `code()` so the CLI can log it alongside the human-readable message.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Error produced while validating run parameters.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ParamsError {
    /// Embedding dimension must be at least one.
    #[error("embedding dimension must be at least 1 (got {got})")]
    InvalidDimension {
        /// The invalid dimension supplied by the caller.
        got: usize,
    },
}

impl ParamsError {
    /// Return the stable machine-readable code for this error.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidDimension { .. } => "PARAMS_INVALID_DIMENSION",
        }
    }
}

/// Error produced while assembling an affinity graph from triplets.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Error)]
pub enum GraphError {
    /// A triplet referenced a node outside the declared node count.
    #[error("node index {index} is out of range for a graph of {nodes} nodes")]
    NodeOutOfRange {
        /// The offending node index.
        index: usize,
        /// Declared number of nodes.
        nodes: usize,
    },
    /// An edge weight was NaN or infinite.
    #[error("edge ({row}, {col}) has a non-finite weight")]
    NonFiniteWeight {
        /// Source node of the edge.
        row: usize,
        /// Target node of the edge.
        col: usize,
    },
    /// Affinities are similarities; a negative weight is meaningless.
    #[error("edge ({row}, {col}) has negative weight {weight}")]
    NegativeWeight {
        /// Source node of the edge.
        row: usize,
        /// Target node of the edge.
        col: usize,
        /// The rejected weight.
        weight: f64,
    },
    /// The graph declared zero nodes.
    #[error("affinity graph must have at least one node")]
    Empty,
}

impl GraphError {
    /// Return the stable machine-readable code for this error.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NodeOutOfRange { .. } => "GRAPH_NODE_OUT_OF_RANGE",
            Self::NonFiniteWeight { .. } => "GRAPH_NON_FINITE_WEIGHT",
            Self::NegativeWeight { .. } => "GRAPH_NEGATIVE_WEIGHT",
            Self::Empty => "GRAPH_EMPTY",
        }
    }
}

/// Error produced by a [`crate::GraphSource`] implementation.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum GraphSourceError {
    /// The underlying file could not be opened or read.
    #[error("failed to read `{path}`: {source}")]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// The input did not conform to the expected format.
    #[error("malformed input at line {line}: {message}")]
    Malformed {
        /// One-based line number of the offending record.
        line: usize,
        /// Description of the violation.
        message: String,
    },
    /// The input is well-formed but describes something the loader cannot
    /// represent (e.g. a non-square matrix).
    #[error("unsupported input: {detail}")]
    Unsupported {
        /// Description of the unsupported construct.
        detail: String,
    },
    /// The parsed triplets failed graph validation.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl GraphSourceError {
    /// Return the stable machine-readable code for this error.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "GRAPH_SOURCE_IO",
            Self::Malformed { .. } => "GRAPH_SOURCE_MALFORMED",
            Self::Unsupported { .. } => "GRAPH_SOURCE_UNSUPPORTED",
            Self::Graph(inner) => inner.code(),
        }
    }
}

/// Error produced by an [`crate::EmbeddingEngine`] invocation.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Error)]
pub enum EngineError {
    /// The seed buffer did not match the expected `nodes x dim` extent.
    #[error("seed buffer has {got} values but {expected} were expected")]
    SeedLength {
        /// Required number of values.
        expected: usize,
        /// Number of values actually supplied.
        got: usize,
    },
    /// The parameter record disagreed with the graph about the node count.
    #[error("parameters record {recorded} nodes but the graph has {graph}")]
    NodeMismatch {
        /// Node count recorded in the parameters.
        recorded: usize,
        /// Node count reported by the graph.
        graph: usize,
    },
    /// The descent produced a non-finite coordinate.
    #[error("embedding diverged at iteration {iteration}")]
    Diverged {
        /// Iteration at which the first non-finite value appeared.
        iteration: usize,
    },
}

impl EngineError {
    /// Return the stable machine-readable code for this error.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::SeedLength { .. } => "ENGINE_SEED_LENGTH",
            Self::NodeMismatch { .. } => "ENGINE_NODE_MISMATCH",
            Self::Diverged { .. } => "ENGINE_DIVERGED",
        }
    }
}

/// Error produced while writing an embedding to disk.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ExportError {
    /// The output path could not be created or written.
    #[error("failed to write `{path}`: {source}")]
    Io {
        /// Destination path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
}

impl ExportError {
    /// Return the stable machine-readable code for this error.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "EXPORT_IO",
        }
    }
}

/// Error produced while constructing a worker pool.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum WorkerPoolError {
    /// The thread pool could not be built.
    #[error("failed to build worker pool: {message}")]
    Build {
        /// Message reported by the pool runtime.
        message: String,
    },
}

impl WorkerPoolError {
    /// Return the stable machine-readable code for this error.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Build { .. } => "WORKER_POOL_BUILD",
        }
    }
}

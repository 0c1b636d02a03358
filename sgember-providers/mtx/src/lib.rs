//! Matrix Market graph source implementing [`GraphSource`].
//!
//! Reads the coordinate (triplet) format: a `%%MatrixMarket` banner, `%`
//! comment lines, a `rows cols nnz` size line, then one one-based
//! `row col [weight]` record per edge. Square matrices only; `symmetric`
//! storage is expanded by mirroring off-diagonal entries; `pattern` fields
//! get unit weights.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use tracing::{info, instrument};

use sgember_core::{AffinityGraph, GraphSource, GraphSourceError};

/// Matrix Market coordinate-format affinity graph source.
///
/// # Examples
/// ```no_run
/// use sgember_core::GraphSource;
/// use sgember_providers_mtx::MtxSource;
///
/// let source = MtxSource::from_path("affinities.mtx");
/// let graph = source.load()?;
/// println!("{} nodes", graph.nodes());
/// # Ok::<(), sgember_core::GraphSourceError>(())
/// ```
#[derive(Debug, Clone)]
pub struct MtxSource {
    path: PathBuf,
    name: String,
}

impl MtxSource {
    /// Creates a source reading from `path`, deriving the diagnostic name
    /// from the file stem.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| "graph".to_owned());
        Self { path, name }
    }

    /// Path this source reads from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GraphSource for MtxSource {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "mtx.load", err, skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> Result<AffinityGraph, GraphSourceError> {
        let file = File::open(&self.path).map_err(|source| GraphSourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        let graph = parse_reader(BufReader::new(file), &self.path)?;
        info!(
            nodes = graph.nodes(),
            edges = graph.edge_count(),
            "graph loaded"
        );
        Ok(graph)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Real,
    Integer,
    Pattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Symmetry {
    General,
    Symmetric,
}

struct Header {
    field: Field,
    symmetry: Symmetry,
}

/// Parses a Matrix Market coordinate stream into an [`AffinityGraph`].
///
/// # Errors
/// Returns [`GraphSourceError`] for I/O failures, banner or record
/// violations, non-square matrices, and triplets that fail graph
/// validation.
pub fn parse_reader(
    reader: impl BufRead,
    path: &Path,
) -> Result<AffinityGraph, GraphSourceError> {
    let mut lines = reader.lines().enumerate();

    let (line_no, banner) = next_line(&mut lines, path)?;
    let header = parse_banner(&banner, line_no)?;

    let (size_line_no, size_line) = loop {
        let (line_no, line) = next_line(&mut lines, path)?;
        if !line.trim_start().starts_with('%') && !line.trim().is_empty() {
            break (line_no, line);
        }
    };
    let (rows, cols, nnz) = parse_size_line(&size_line, size_line_no)?;
    if rows != cols {
        return Err(GraphSourceError::Unsupported {
            detail: format!("affinity graphs must be square, got {rows} x {cols}"),
        });
    }

    let mut triplets = Vec::with_capacity(match header.symmetry {
        Symmetry::General => nnz,
        Symmetry::Symmetric => nnz * 2,
    });
    let mut seen = 0usize;
    for (index, line) in &mut lines {
        let line = line.map_err(|source| GraphSourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }
        if seen == nnz {
            return Err(GraphSourceError::Malformed {
                line: index + 1,
                message: format!("more than the declared {nnz} entries"),
            });
        }
        let (row, col, weight) = parse_entry(trimmed, index + 1, header.field)?;
        triplets.push((row, col, weight));
        if header.symmetry == Symmetry::Symmetric && row != col {
            triplets.push((col, row, weight));
        }
        seen += 1;
    }
    if seen != nnz {
        return Err(GraphSourceError::Malformed {
            line: size_line_no + 1,
            message: format!("declared {nnz} entries but found {seen}"),
        });
    }

    Ok(AffinityGraph::from_triplets(rows, triplets)?)
}

fn next_line(
    lines: &mut impl Iterator<Item = (usize, std::io::Result<String>)>,
    path: &Path,
) -> Result<(usize, String), GraphSourceError> {
    match lines.next() {
        Some((index, Ok(line))) => Ok((index + 1, line)),
        Some((_, Err(source))) => Err(GraphSourceError::Io {
            path: path.to_path_buf(),
            source,
        }),
        None => Err(GraphSourceError::Malformed {
            line: 0,
            message: "unexpected end of input".to_owned(),
        }),
    }
}

fn parse_banner(banner: &str, line: usize) -> Result<Header, GraphSourceError> {
    let malformed = |message: String| GraphSourceError::Malformed { line, message };
    let mut fields = banner.split_whitespace();
    if fields.next() != Some("%%MatrixMarket") {
        return Err(malformed("missing %%MatrixMarket banner".to_owned()));
    }
    if fields.next() != Some("matrix") || fields.next() != Some("coordinate") {
        return Err(malformed(
            "only `matrix coordinate` inputs are supported".to_owned(),
        ));
    }
    let field = match fields.next() {
        Some("real") => Field::Real,
        Some("integer") => Field::Integer,
        Some("pattern") => Field::Pattern,
        other => {
            return Err(malformed(format!(
                "unsupported field type {other:?}; expected real, integer, or pattern"
            )));
        }
    };
    let symmetry = match fields.next() {
        Some("general") => Symmetry::General,
        Some("symmetric") => Symmetry::Symmetric,
        other => {
            return Err(malformed(format!(
                "unsupported symmetry {other:?}; expected general or symmetric"
            )));
        }
    };
    Ok(Header { field, symmetry })
}

fn parse_size_line(line: &str, line_no: usize) -> Result<(usize, usize, usize), GraphSourceError> {
    let malformed = |message: String| GraphSourceError::Malformed {
        line: line_no,
        message,
    };
    let mut parts = line.split_whitespace();
    let mut next_number = |label: &str| {
        parts
            .next()
            .ok_or_else(|| malformed(format!("size line is missing {label}")))?
            .parse::<usize>()
            .map_err(|_| malformed(format!("size line has an unparseable {label}")))
    };
    let rows = next_number("row count")?;
    let cols = next_number("column count")?;
    let nnz = next_number("entry count")?;
    Ok((rows, cols, nnz))
}

fn parse_entry(
    line: &str,
    line_no: usize,
    field: Field,
) -> Result<(usize, usize, f64), GraphSourceError> {
    let malformed = |message: String| GraphSourceError::Malformed {
        line: line_no,
        message,
    };
    let mut parts = line.split_whitespace();
    let mut index = |label: &str| {
        let raw = parts
            .next()
            .ok_or_else(|| malformed(format!("entry is missing its {label}")))?;
        let one_based = raw
            .parse::<usize>()
            .map_err(|_| malformed(format!("entry has an unparseable {label}: `{raw}`")))?;
        // Matrix Market indices are one-based.
        one_based
            .checked_sub(1)
            .ok_or_else(|| malformed(format!("{label} must be at least 1")))
    };
    let row = index("row index")?;
    let col = index("column index")?;
    let weight = match field {
        Field::Pattern => 1.0,
        Field::Real | Field::Integer => {
            let raw = parts
                .next()
                .ok_or_else(|| malformed("entry is missing its weight".to_owned()))?;
            raw.parse::<f64>()
                .map_err(|_| malformed(format!("entry has an unparseable weight: `{raw}`")))?
        }
    };
    Ok((row, col, weight))
}

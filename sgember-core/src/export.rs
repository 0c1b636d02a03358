//! Embedding serialization.
//!
//! Two formats share the same row-major ordering: whitespace text (one
//! node per line) and a flat little-endian `f64` dump. Both are
//! deterministic for a given buffer.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use tracing::info;

use crate::{embedding::Embedding, error::ExportError};

/// On-disk representation of an exported embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Whitespace-separated text, one node per line.
    Text,
    /// Flat little-endian `f64` values, row-major.
    Binary,
}

impl ExportFormat {
    /// Chooses a format from the destination's extension: `bin` selects
    /// [`Self::Binary`], everything else (including no extension) selects
    /// [`Self::Text`].
    ///
    /// # Examples
    /// ```
    /// use std::path::Path;
    /// use sgember_core::ExportFormat;
    ///
    /// assert_eq!(ExportFormat::from_path(Path::new("out.bin")), ExportFormat::Binary);
    /// assert_eq!(ExportFormat::from_path(Path::new("out.txt")), ExportFormat::Text);
    /// assert_eq!(ExportFormat::from_path(Path::new("out")), ExportFormat::Text);
    /// ```
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("bin") => Self::Binary,
            _ => Self::Text,
        }
    }
}

/// Writes the embedding as text, one node per line, values separated by a
/// single space.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
///
/// # Examples
/// ```
/// use sgember_core::{Embedding, write_text};
///
/// let embedding = Embedding::from_coords(vec![1.0, 2.0, 3.0, 4.0], 2, 2)
///     .expect("buffer matches the declared extent");
/// let mut buffer = Vec::new();
/// write_text(&embedding, &mut buffer).expect("writing to a vec cannot fail");
/// assert_eq!(String::from_utf8(buffer).unwrap(), "1 2\n3 4\n");
/// ```
pub fn write_text(embedding: &Embedding, mut writer: impl Write) -> io::Result<()> {
    for node in 0..embedding.nodes() {
        let row = embedding.row(node);
        for (index, value) in row.iter().enumerate() {
            if index > 0 {
                write!(writer, " ")?;
            }
            write!(writer, "{value}")?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Writes the embedding as a flat little-endian `f64` dump in row-major
/// order.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
pub fn write_binary(embedding: &Embedding, mut writer: impl Write) -> io::Result<()> {
    for value in embedding.coords() {
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

/// Creates `path` and writes the embedding in the requested format through
/// a buffered writer.
///
/// # Errors
/// Returns [`ExportError::Io`] when the file cannot be created, written,
/// or flushed.
pub fn export_to_path(
    embedding: &Embedding,
    path: &Path,
    format: ExportFormat,
) -> Result<(), ExportError> {
    let map_io = |source: io::Error| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(map_io)?;
    let mut writer = BufWriter::new(file);
    match format {
        ExportFormat::Text => write_text(embedding, &mut writer).map_err(map_io)?,
        ExportFormat::Binary => write_binary(embedding, &mut writer).map_err(map_io)?,
    }
    writer.flush().map_err(map_io)?;
    info!(
        path = %path.display(),
        nodes = embedding.nodes(),
        dim = embedding.dim(),
        format = ?format,
        "embedding exported"
    );
    Ok(())
}

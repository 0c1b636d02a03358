//! Initial-embedding seeding.
//!
//! The seed is optional. Absence is modelled explicitly with `Option`
//! rather than inferred from a failed file open, but an unreadable path
//! still degrades to the zero fill instead of aborting: seeding is a hint,
//! never a requirement. The buffer is always allocated to the full
//! `nodes x dim` extent and zero-filled before any values are read, so a
//! short or truncated source leaves a deterministic 0.0 tail.

use std::{fs, path::Path};

use tracing::{debug, warn};

/// Loads the optional initial-embedding buffer.
///
/// Reads at most `nodes * dim` whitespace-separated values in row-major
/// order. Reading stops at the first token that does not parse as a real
/// number; everything not covered by the source keeps the 0.0 fill.
///
/// # Examples
/// ```
/// use sgember_core::load_seed;
///
/// let seed = load_seed(None, 3, 2);
/// assert_eq!(seed, vec![0.0; 6]);
/// ```
pub fn load_seed(path: Option<&Path>, nodes: usize, dim: usize) -> Vec<f64> {
    let mut buffer = vec![0.0_f64; nodes * dim];
    let Some(path) = path else {
        return buffer;
    };

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) => {
            warn!(
                path = %path.display(),
                %error,
                "initial embedding unavailable, using zero fill"
            );
            return buffer;
        }
    };

    let mut filled = 0;
    for token in contents.split_whitespace() {
        if filled == buffer.len() {
            break;
        }
        match token.parse::<f64>() {
            Ok(value) => {
                buffer[filled] = value;
                filled += 1;
            }
            Err(_) => {
                warn!(
                    path = %path.display(),
                    token,
                    position = filled,
                    "stopping seed read at unparseable token"
                );
                break;
            }
        }
    }
    if filled < buffer.len() {
        debug!(
            path = %path.display(),
            filled,
            expected = buffer.len(),
            "seed source was short, tail keeps zero fill"
        );
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs::File;
    use std::io::Write;

    use rstest::rstest;
    use tempfile::TempDir;

    fn write_seed(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).expect("temp file must be creatable");
        file.write_all(contents.as_bytes())
            .expect("temp file must be writable");
        path
    }

    #[rstest]
    fn absent_path_yields_zero_fill() {
        let seed = load_seed(None, 4, 2);
        assert_eq!(seed.len(), 8);
        assert!(seed.iter().all(|&v| v == 0.0));
    }

    #[rstest]
    fn unreadable_path_yields_zero_fill() {
        let dir = TempDir::new().expect("temp dir must be creatable");
        let missing = dir.path().join("missing.txt");
        let seed = load_seed(Some(&missing), 2, 3);
        assert_eq!(seed, vec![0.0; 6]);
    }

    #[rstest]
    fn values_round_trip_in_row_major_order() {
        let dir = TempDir::new().expect("temp dir must be creatable");
        let path = write_seed(&dir, "seed.txt", "1.5 -2.0\n3.25 4.0\n0.5 6.0\n");
        let seed = load_seed(Some(&path), 3, 2);
        assert_eq!(seed, vec![1.5, -2.0, 3.25, 4.0, 0.5, 6.0]);
    }

    #[rstest]
    fn short_source_keeps_zero_tail() {
        let dir = TempDir::new().expect("temp dir must be creatable");
        let path = write_seed(&dir, "seed.txt", "1.0 2.0 3.0");
        let seed = load_seed(Some(&path), 3, 2);
        assert_eq!(seed, vec![1.0, 2.0, 3.0, 0.0, 0.0, 0.0]);
    }

    #[rstest]
    fn unparseable_token_stops_the_read() {
        let dir = TempDir::new().expect("temp dir must be creatable");
        let path = write_seed(&dir, "seed.txt", "1.0 2.0 oops 4.0");
        let seed = load_seed(Some(&path), 2, 2);
        assert_eq!(seed, vec![1.0, 2.0, 0.0, 0.0]);
    }

    #[rstest]
    fn excess_values_are_ignored() {
        let dir = TempDir::new().expect("temp dir must be creatable");
        let path = write_seed(&dir, "seed.txt", "1.0 2.0 3.0 4.0 5.0 6.0");
        let seed = load_seed(Some(&path), 2, 2);
        assert_eq!(seed, vec![1.0, 2.0, 3.0, 4.0]);
    }
}

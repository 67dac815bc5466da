//! Scratch directory management.

mod scratch;

pub use scratch::{ScratchSpace, SweepReport};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from scratch storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O failure on a specific path.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source is not a regular file.
    #[error("Not a regular file: {path}")]
    NotAFile { path: PathBuf },

    /// Path is not inside the expected scratch area.
    #[error("Path is outside the scratch area: {path}")]
    OutsideScratch { path: PathBuf },
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

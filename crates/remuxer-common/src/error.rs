//! Common error types used throughout remuxer.

use std::path::PathBuf;

/// Common error type for remuxer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Every `(N)` suffix candidate for an output name is taken.
    #[error("no free output name for {}", stem.display())]
    NameExhausted { stem: PathBuf },

    /// The input path has no file name to derive an output from.
    #[error("invalid input path: {}", path.display())]
    InvalidPath { path: PathBuf },
}

impl Error {
    /// Create a new InvalidPath error.
    pub fn invalid_path(path: impl Into<PathBuf>) -> Self {
        Self::InvalidPath { path: path.into() }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

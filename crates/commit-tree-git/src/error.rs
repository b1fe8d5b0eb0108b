//! Error types for the git layer.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for repository reads.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors raised while reading a repository.
#[derive(Debug, Error)]
pub enum SourceError {
    /// No repository at or above the given path.
    #[error("No git repository found at {path}")]
    NotARepository { path: PathBuf },

    /// The repository has no working tree to watch.
    #[error("Repository at {path} is bare")]
    BareRepository { path: PathBuf },

    /// Git operation error.
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
}

impl SourceError {
    pub(crate) fn open_failed(path: impl Into<PathBuf>, err: git2::Error) -> Self {
        if err.code() == git2::ErrorCode::NotFound {
            Self::NotARepository { path: path.into() }
        } else {
            Self::Git(err)
        }
    }
}

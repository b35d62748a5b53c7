//! Error types for stride-sync.

use std::path::PathBuf;

use thiserror::Error;

use crate::source::SourceError;

/// All errors that can abort a sync run or an archive operation.
///
/// `AlreadyArchived` is a
/// [`WriteOutcome`](crate::archive::WriteOutcome), not a failure.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An archive entry could not be encoded or decoded.
    #[error("archive JSON error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The id cannot be used as an archive file name.
    #[error("invalid activity id {0:?}")]
    InvalidId(String),

    /// Rejected before any remote call is made.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A listing or detail request failed for a reason other than quota.
    #[error("remote request failed after {written} write(s): {source}")]
    Remote {
        written: usize,
        #[source]
        source: SourceError,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`SyncError::Json`].
pub(crate) fn json_err(path: impl Into<PathBuf>, source: serde_json::Error) -> SyncError {
    SyncError::Json {
        path: path.into(),
        source,
    }
}

//! Error types for stride-report.

use std::path::PathBuf;

use thiserror::Error;

use stride_sync::SyncError;

/// All errors that can arise while building a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// JSON serialization error (building tera context).
    #[error("context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV writer error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Reading the archive failed.
    #[error(transparent)]
    Archive(#[from] SyncError),

    /// The archive directory does not exist yet.
    #[error("missing archive directory {path}; run `stride sync` first")]
    MissingArchive { path: PathBuf },

    /// Filesystem error while writing the report.
    #[error("report io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ReportError {
    ReportError::Io {
        path: path.into(),
        source,
    }
}

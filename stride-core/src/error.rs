//! Error types for stride-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from configuration and token persistence.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on config load: includes file path and line context.
    #[error("failed to parse config at {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// JSON error while reading or writing the token file.
    #[error("token JSON error at {path}: {source}")]
    Token {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.stride/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The OAuth token file did not exist at the expected path.
    #[error("token not found at {path}; complete the OAuth exchange first")]
    TokenNotFound { path: PathBuf },

    /// A required API credential was not configured.
    #[error("missing credential {0}; set it in the environment or config.yaml")]
    MissingCredential(&'static str),

    /// A config value was present but unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience constructor for [`CoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}

//! Error types for stride-strava.

use thiserror::Error;

use stride_core::CoreError;

/// Failures while obtaining or refreshing OAuth tokens.
#[derive(Debug, Error)]
pub enum StravaError {
    /// Token file, config or credential problem.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The token endpoint rejected the request.
    #[error("token endpoint returned HTTP {status}: {message}")]
    TokenRejected { status: u16, message: String },

    /// The token endpoint could not be reached.
    #[error("token endpoint unreachable: {0}")]
    Transport(String),

    /// The token endpoint answered with something other than a token.
    #[error("malformed token response: {0}")]
    Decode(String),
}

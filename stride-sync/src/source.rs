//! Remote source boundary.
//!
//! The sync engine only needs two calls from the remote API: a page of the
//! activity listing and the full detail of one activity. Both take `&self` so
//! the driver can fetch details while a listing is still being paged.

use chrono::{DateTime, Utc};
use thiserror::Error;

use stride_core::{ActivityId, ActivitySummary};

/// Filters for one listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    /// Only activities that started strictly before this instant.
    pub before: Option<DateTime<Utc>>,
    /// Summaries per page.
    pub per_page: u32,
}

/// Failure reported by a remote source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The short-window request quota is used up.
    #[error("rate limit exceeded; wait for the quota window to reset, then re-run")]
    QuotaExceeded,

    /// The remote answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body was not what the endpoint documents.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl SourceError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, SourceError::QuotaExceeded)
    }
}

/// A paginated, reverse-chronological activity feed with detail lookup.
pub trait ActivitySource {
    /// One page of summaries, newest first. `page` starts at 1; an empty page
    /// means the history is exhausted.
    fn list_page(&self, query: &ListQuery, page: u32)
        -> Result<Vec<ActivitySummary>, SourceError>;

    /// Full detail payload for `id`. Consumes one unit of remote quota.
    fn fetch_detail(&self, id: &ActivityId) -> Result<serde_json::Value, SourceError>;
}

impl<S: ActivitySource + ?Sized> ActivitySource for &S {
    fn list_page(
        &self,
        query: &ListQuery,
        page: u32,
    ) -> Result<Vec<ActivitySummary>, SourceError> {
        (**self).list_page(query, page)
    }

    fn fetch_detail(&self, id: &ActivityId) -> Result<serde_json::Value, SourceError> {
        (**self).fetch_detail(id)
    }
}

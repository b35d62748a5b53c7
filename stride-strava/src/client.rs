//! Strava REST client implementing [`ActivitySource`].
//!
//! | Call | Endpoint |
//! |------|----------|
//! | [`ActivitySource::list_page`] | `GET /athlete/activities?page&per_page[&before]` |
//! | [`ActivitySource::fetch_detail`] | `GET /activities/{id}` |
//!
//! HTTP 429 maps to [`SourceError::QuotaExceeded`]; every other non-2xx status
//! to [`SourceError::Status`].

use std::time::Duration;

use serde_json::Value;

use stride_core::{ActivityId, ActivitySummary};
use stride_sync::{ActivitySource, ListQuery, SourceError};

pub const DEFAULT_API_BASE: &str = "https://www.strava.com/api/v3";

const TIMEOUT: Duration = Duration::from_secs(30);
const RATE_LIMIT_USAGE: &str = "X-RateLimit-Usage";
/// Error bodies are truncated to this many characters in messages.
const MAX_ERROR_BODY: usize = 200;

/// Authenticated client for one athlete.
pub struct StravaClient {
    agent: ureq::Agent,
    api_base: String,
    access_token: String,
}

impl StravaClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            agent: build_agent(),
            api_base: DEFAULT_API_BASE.to_string(),
            access_token: access_token.into(),
        }
    }

    /// Point the client at a different API root (used by tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn get(&self, path: &str) -> ureq::Request {
        self.agent
            .get(&format!("{}{path}", self.api_base))
            .set("Authorization", &format!("Bearer {}", self.access_token))
            .set("Accept", "application/json")
    }
}

impl ActivitySource for StravaClient {
    fn list_page(
        &self,
        query: &ListQuery,
        page: u32,
    ) -> Result<Vec<ActivitySummary>, SourceError> {
        let mut request = self
            .get("/athlete/activities")
            .query("page", &page.to_string())
            .query("per_page", &query.per_page.to_string());
        if let Some(before) = query.before {
            request = request.query("before", &before.timestamp().to_string());
        }

        let response = request.call().map_err(map_ureq_error)?;
        log_usage(&response);
        response
            .into_json::<Vec<ActivitySummary>>()
            .map_err(|e| SourceError::Decode(format!("activity page {page}: {e}")))
    }

    fn fetch_detail(&self, id: &ActivityId) -> Result<Value, SourceError> {
        let response = self
            .get(&format!("/activities/{id}"))
            .call()
            .map_err(map_ureq_error)?;
        log_usage(&response);
        let payload: Value = response
            .into_json()
            .map_err(|e| SourceError::Decode(format!("activity {id}: {e}")))?;
        if !payload.is_object() {
            return Err(SourceError::Decode(format!(
                "activity {id}: expected a JSON object"
            )));
        }
        Ok(payload)
    }
}

pub(crate) fn build_agent() -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(TIMEOUT)
        .user_agent(concat!("stride/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Translate a `ureq` failure into the engine's error vocabulary.
pub fn map_ureq_error(err: ureq::Error) -> SourceError {
    match err {
        ureq::Error::Status(429, _) => SourceError::QuotaExceeded,
        ureq::Error::Status(status, response) => SourceError::Status {
            status,
            message: error_body(response),
        },
        ureq::Error::Transport(transport) => SourceError::Transport(transport.to_string()),
    }
}

pub(crate) fn error_body(response: ureq::Response) -> String {
    let body = response.into_string().unwrap_or_default();
    let body = body.trim();
    if body.chars().count() > MAX_ERROR_BODY {
        let cut: String = body.chars().take(MAX_ERROR_BODY).collect();
        format!("{cut}...")
    } else {
        body.to_string()
    }
}

fn log_usage(response: &ureq::Response) {
    if let Some(usage) = response.header(RATE_LIMIT_USAGE) {
        tracing::debug!(usage, "rate limit usage");
    }
}

//! OAuth token handling against the Strava token endpoint.
//!
//! A one-time authorization (`authorization_url` → browser → `exchange_code`)
//! produces `~/.stride/token.json`. Every later run calls [`authorize_at`],
//! which refreshes the access token when it has expired and persists the
//! refreshed token before handing the access token back.

use std::path::Path;

use chrono::{DateTime, Utc};

use stride_core::token::{load_token_at, save_token_at};
use stride_core::{ClientCredentials, StoredToken, StrideConfig};

use crate::client::{build_agent, error_body};
use crate::error::StravaError;

pub const DEFAULT_AUTHORIZE_URL: &str = "https://www.strava.com/oauth/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://www.strava.com/oauth/token";
/// Redirect target for the manual copy-the-code flow; nothing needs to listen.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8765/authorization";
/// Read access to every activity, including private ones.
pub const SCOPE: &str = "activity:read_all";

/// Browser URL that asks the athlete to approve access.
///
/// `approval_prompt=force` guarantees a fresh code even if access was granted
/// before.
pub fn authorization_url(client_id: &str, redirect_uri: &str) -> String {
    format!(
        "{DEFAULT_AUTHORIZE_URL}?client_id={}&redirect_uri={}&response_type=code&approval_prompt=force&scope={}",
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(SCOPE),
    )
}

/// The OAuth token endpoint.
pub struct TokenEndpoint {
    agent: ureq::Agent,
    url: String,
}

impl Default for TokenEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_URL)
    }
}

impl TokenEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            agent: build_agent(),
            url: url.into(),
        }
    }

    /// Trade a one-time authorization code for a token.
    pub fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        code: &str,
    ) -> Result<StoredToken, StravaError> {
        self.post(&[
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ])
    }

    /// Trade a refresh token for a new access token.
    pub fn refresh(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<StoredToken, StravaError> {
        self.post(&[
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
    }

    fn post(&self, form: &[(&str, &str)]) -> Result<StoredToken, StravaError> {
        let response = self.agent.post(&self.url).send_form(form).map_err(|err| match err {
            ureq::Error::Status(status, response) => StravaError::TokenRejected {
                status,
                message: error_body(response),
            },
            ureq::Error::Transport(transport) => StravaError::Transport(transport.to_string()),
        })?;
        response
            .into_json::<StoredToken>()
            .map_err(|e| StravaError::Decode(e.to_string()))
    }
}

/// Load the stored token, refreshing and persisting it if it has expired.
///
/// Returns the access token to use for API calls. Credentials are only
/// resolved when a refresh is actually needed.
pub fn authorize_at(
    home: &Path,
    config: &StrideConfig,
    endpoint: &TokenEndpoint,
    now: DateTime<Utc>,
) -> Result<String, StravaError> {
    let token = load_token_at(home)?;
    if !token.is_expired(now) {
        tracing::debug!(expires_at = token.expires_at, "access token still valid");
        return Ok(token.access_token);
    }

    tracing::info!("access token expired; refreshing");
    let credentials = config.credentials()?;
    let refreshed = endpoint.refresh(&credentials, &token.refresh_token)?;
    save_token_at(home, &refreshed)?;
    tracing::debug!(expires_at = refreshed.expires_at, "saved refreshed token");
    Ok(refreshed.access_token)
}

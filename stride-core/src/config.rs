//! Stride configuration and on-disk layout.
//!
//! # Storage layout
//!
//! ```text
//! ~/.stride/
//!   config.yaml              (optional: defaults apply when absent)
//!   token.json               (OAuth tokens: mode 0600)
//!   archive/activities/      (one <id>.json per activity)
//!   reports/                 (derived logs)
//! ```
//!
//! Like the token helpers, every function that touches the filesystem takes an
//! explicit `home`; tests always pass a `TempDir`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};

/// Environment variable carrying the API client id.
pub const CLIENT_ID_ENV: &str = "STRAVA_CLIENT_ID";
/// Environment variable carrying the API client secret.
pub const CLIENT_SECRET_ENV: &str = "STRAVA_CLIENT_SECRET";

/// Overrides the REST API root (local test servers).
pub const API_BASE_ENV: &str = "STRIDE_API_BASE";
/// Overrides the OAuth token endpoint (local test servers).
pub const TOKEN_URL_ENV: &str = "STRIDE_TOKEN_URL";

/// Default number of summaries requested per listing page.
pub const DEFAULT_PER_PAGE: u32 = 100;
/// Largest page size the remote API accepts.
pub const MAX_PER_PAGE: u32 = 200;

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.stride/`
pub fn stride_root(home: &Path) -> PathBuf {
    home.join(".stride")
}

/// `<home>/.stride/config.yaml`
pub fn config_path_at(home: &Path) -> PathBuf {
    stride_root(home).join("config.yaml")
}

/// `<home>/.stride/token.json`
pub fn token_path_at(home: &Path) -> PathBuf {
    stride_root(home).join("token.json")
}

/// `<home>/.stride/archive/activities/`
pub fn default_archive_dir(home: &Path) -> PathBuf {
    stride_root(home).join("archive").join("activities")
}

/// `<home>/.stride/reports/`
pub fn default_reports_dir(home: &Path) -> PathBuf {
    stride_root(home).join("reports")
}

/// The current user's home directory.
pub fn home() -> Result<PathBuf, CoreError> {
    dirs::home_dir().ok_or(CoreError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Contents of `config.yaml`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrideConfig {
    /// Archive directory; defaults to `~/.stride/archive/activities`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_dir: Option<PathBuf>,
    /// Report output directory; defaults to `~/.stride/reports`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reports_dir: Option<PathBuf>,
    /// Pause after each archived activity, in seconds.
    pub sleep_secs: f64,
    /// Listing page size.
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl Default for StrideConfig {
    fn default() -> Self {
        Self {
            archive_dir: None,
            reports_dir: None,
            sleep_secs: 0.0,
            per_page: DEFAULT_PER_PAGE,
            client_id: None,
            client_secret: None,
        }
    }
}

/// OAuth application credentials used for token refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl StrideConfig {
    /// Resolved archive directory for `home`.
    pub fn archive_dir_at(&self, home: &Path) -> PathBuf {
        self.archive_dir
            .clone()
            .unwrap_or_else(|| default_archive_dir(home))
    }

    /// Resolved reports directory for `home`.
    pub fn reports_dir_at(&self, home: &Path) -> PathBuf {
        self.reports_dir
            .clone()
            .unwrap_or_else(|| default_reports_dir(home))
    }

    /// Reject values no run could use.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.sleep_secs.is_finite() || self.sleep_secs < 0.0 {
            return Err(CoreError::InvalidConfig(format!(
                "sleep_secs must be a non-negative number, got {}",
                self.sleep_secs
            )));
        }
        if self.per_page == 0 || self.per_page > MAX_PER_PAGE {
            return Err(CoreError::InvalidConfig(format!(
                "per_page must be between 1 and {MAX_PER_PAGE}, got {}",
                self.per_page
            )));
        }
        Ok(())
    }

    /// Credentials from the process environment, falling back to the file.
    pub fn credentials(&self) -> Result<ClientCredentials, CoreError> {
        self.credentials_with(|key| std::env::var(key).ok())
    }

    /// Credentials resolved through `lookup`, falling back to the file.
    ///
    /// Environment values win over `config.yaml`; empty strings count as unset.
    pub fn credentials_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<ClientCredentials, CoreError> {
        let set = |v: &String| !v.trim().is_empty();
        let pick = |key: &'static str, fallback: &Option<String>| {
            lookup(key)
                .filter(set)
                .or_else(|| fallback.clone().filter(set))
                .ok_or(CoreError::MissingCredential(key))
        };
        Ok(ClientCredentials {
            client_id: pick(CLIENT_ID_ENV, &self.client_id)?,
            client_secret: pick(CLIENT_SECRET_ENV, &self.client_secret)?,
        })
    }
}

/// Load `<home>/.stride/config.yaml`, or defaults when the file is absent.
///
/// Returns `CoreError::Config` (with path + line context) if malformed, and
/// `CoreError::InvalidConfig` if a value is out of range.
pub fn load_at(home: &Path) -> Result<StrideConfig, CoreError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(StrideConfig::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let config: StrideConfig = if contents.trim().is_empty() {
        StrideConfig::default()
    } else {
        serde_yaml::from_str(&contents).map_err(|e| CoreError::Config { path, source: e })?
    };
    config.validate()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

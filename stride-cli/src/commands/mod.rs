//! Subcommand implementations. Each resolves the home directory, loads
//! `config.yaml` and hands off to the library crates.

pub mod auth;
pub mod report;
pub mod status;
pub mod sync;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use stride_core::config::TOKEN_URL_ENV;
use stride_core::{config, StrideConfig};
use stride_strava::TokenEndpoint;

/// Home directory plus the parsed config.
pub(crate) fn load_config() -> Result<(PathBuf, StrideConfig)> {
    let home = config::home()?;
    let config = config::load_at(&home)
        .with_context(|| format!("failed to load {}", config::config_path_at(&home).display()))?;
    Ok((home, config))
}

/// `--archive-dir` if given, else the configured archive.
pub(crate) fn archive_dir(home: &Path, config: &StrideConfig, flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| config.archive_dir_at(home))
}

/// The Strava token endpoint, or `STRIDE_TOKEN_URL` when set.
pub(crate) fn token_endpoint() -> TokenEndpoint {
    match std::env::var(TOKEN_URL_ENV) {
        Ok(url) => TokenEndpoint::new(url),
        Err(_) => TokenEndpoint::default(),
    }
}

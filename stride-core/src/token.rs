//! OAuth token persistence at `<home>/.stride/token.json`.
//!
//! Write flow mirrors every other file Stride owns: serialize → `.json.tmp`
//! sibling → `chmod 0600` → `rename`.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{stride_root, token_path_at};
use crate::error::{io_err, CoreError};

/// Tokens as returned by the OAuth token endpoint.
///
/// Fields the endpoint returns beyond the three Stride uses (athlete summary,
/// `token_type`, `expires_in`, ...) are carried through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry as a unix timestamp in seconds.
    pub expires_at: i64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StoredToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now.timestamp()
    }
}

/// Load the stored token.
///
/// Returns `CoreError::TokenNotFound` if the file is absent.
pub fn load_token_at(home: &Path) -> Result<StoredToken, CoreError> {
    let path = token_path_at(home);
    if !path.exists() {
        return Err(CoreError::TokenNotFound { path });
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    serde_json::from_str(&contents).map_err(|e| CoreError::Token { path, source: e })
}

/// Atomically replace the stored token.
pub fn save_token_at(home: &Path, token: &StoredToken) -> Result<(), CoreError> {
    let root = stride_root(home);
    if !root.exists() {
        std::fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
        set_dir_permissions(&root)?;
    }

    let path = token_path_at(home);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(token).map_err(|e| CoreError::Token {
        path: path.clone(),
        source: e,
    })?;
    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    Ok(())
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), CoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), CoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), CoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), CoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

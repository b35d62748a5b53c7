//! Archive store: one JSON document per activity in a flat directory.
//!
//! ## `write` protocol
//!
//! 1. Validate the id as a file name.
//! 2. If `<id>.json` exists and `force` is off → [`WriteOutcome::AlreadyArchived`].
//! 3. Serialize the payload (pretty JSON, 2-space indent).
//! 4. Write and fsync `<id>.json.tmp`.
//! 5. Rename onto `<id>.json` (atomic on POSIX); on failure remove the `.tmp`.
//!
//! A reader therefore sees either no entry, the previous entry, or the
//! complete new one. Stray `.json.tmp` files left by a killed process are never
//! listed and are overwritten by the next write of the same id.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;

use stride_core::types::parse_utc;
use stride_core::ActivityId;

use crate::error::{io_err, json_err, SyncError};

/// Payload field holding the activity start in UTC.
pub const TIMESTAMP_FIELD: &str = "start_date";

const ENTRY_EXT: &str = "json";
const TMP_SUFFIX: &str = ".json.tmp";

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of [`ArchiveStore::write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The entry was written. `replaced` is true when a forced write
    /// overwrote an existing entry.
    Written { path: PathBuf, replaced: bool },
    /// An entry already exists and `force` was off; nothing was touched.
    AlreadyArchived { path: PathBuf },
}

/// Oldest and newest `start_date` across the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveBounds {
    pub oldest: DateTime<Utc>,
    pub newest: DateTime<Utc>,
}

/// A parsed archive entry, for read-only consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedActivity {
    pub id: ActivityId,
    pub path: PathBuf,
    pub payload: Value,
}

// ---------------------------------------------------------------------------
// ArchiveStore
// ---------------------------------------------------------------------------

/// Filesystem-backed archive rooted at a single directory.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    dir: PathBuf,
}

impl ArchiveStore {
    /// Open (creating if needed) the archive at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, SyncError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<id>.json`: pure, no I/O.
    pub fn entry_path(&self, id: &ActivityId) -> Result<PathBuf, SyncError> {
        validate_id(id)?;
        Ok(self.dir.join(format!("{}.{ENTRY_EXT}", id.as_str())))
    }

    fn tmp_path(&self, id: &ActivityId) -> PathBuf {
        self.dir.join(format!("{}{TMP_SUFFIX}", id.as_str()))
    }

    /// Whether an entry for `id` exists. Filesystem only.
    pub fn exists(&self, id: &ActivityId) -> Result<bool, SyncError> {
        Ok(self.entry_path(id)?.is_file())
    }

    /// All archived ids. Temp files and non-`.json` files are ignored.
    pub fn list_ids(&self) -> Result<BTreeSet<ActivityId>, SyncError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(err) => return Err(io_err(&self.dir, err)),
        };

        let mut ids = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&self.dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXT) || !path.is_file() {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let id = ActivityId::from(stem);
            if validate_id(&id).is_ok() {
                ids.insert(id);
            }
        }
        Ok(ids)
    }

    /// Number of archived entries.
    pub fn count(&self) -> Result<usize, SyncError> {
        Ok(self.list_ids()?.len())
    }

    /// Parse the full payload of an entry.
    pub fn read(&self, id: &ActivityId) -> Result<Value, SyncError> {
        let path = self.entry_path(id)?;
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        serde_json::from_str(&contents).map_err(|e| json_err(&path, e))
    }

    /// `start_date` of an entry, or `None` when the entry is unreadable or
    /// carries no parseable timestamp.
    pub fn read_timestamp(&self, id: &ActivityId) -> Result<Option<DateTime<Utc>>, SyncError> {
        match self.read(id) {
            Ok(payload) => Ok(payload_timestamp(&payload)),
            Err(SyncError::InvalidId(bad)) => Err(SyncError::InvalidId(bad)),
            Err(err) => {
                tracing::debug!(%id, error = %err, "ignoring unreadable archive entry");
                Ok(None)
            }
        }
    }

    /// Oldest and newest timestamps, or `None` for an empty archive.
    pub fn bounds(&self) -> Result<Option<ArchiveBounds>, SyncError> {
        let mut bounds: Option<ArchiveBounds> = None;
        for id in self.list_ids()? {
            let Some(ts) = self.read_timestamp(&id)? else {
                continue;
            };
            bounds = Some(match bounds {
                None => ArchiveBounds {
                    oldest: ts,
                    newest: ts,
                },
                Some(b) => ArchiveBounds {
                    oldest: b.oldest.min(ts),
                    newest: b.newest.max(ts),
                },
            });
        }
        Ok(bounds)
    }

    /// Every entry that parses as a JSON object, ordered by id.
    pub fn entries(&self) -> Result<Vec<ArchivedActivity>, SyncError> {
        let mut out = Vec::new();
        for id in self.list_ids()? {
            let path = self.entry_path(&id)?;
            match self.read(&id) {
                Ok(payload) if payload.is_object() => out.push(ArchivedActivity {
                    id,
                    path,
                    payload,
                }),
                Ok(_) => tracing::debug!(path = %path.display(), "skipping non-object entry"),
                Err(err) => tracing::debug!(error = %err, "skipping unreadable entry"),
            }
        }
        Ok(out)
    }

    /// Atomically persist `payload` under `id`.
    ///
    /// Returns [`WriteOutcome::AlreadyArchived`] without touching the disk when
    /// the entry exists and `force` is false.
    pub fn write(
        &self,
        id: &ActivityId,
        payload: &Value,
        force: bool,
    ) -> Result<WriteOutcome, SyncError> {
        let path = self.entry_path(id)?;
        let tmp = self.tmp_path(id);
        write_with_tmp(&path, &tmp, payload, force)
    }
}

fn write_with_tmp(
    path: &Path,
    tmp: &Path,
    payload: &Value,
    force: bool,
) -> Result<WriteOutcome, SyncError> {
    let existed = path.is_file();
    if existed && !force {
        tracing::debug!("already archived: {}", path.display());
        return Ok(WriteOutcome::AlreadyArchived {
            path: path.to_path_buf(),
        });
    }

    let bytes = serde_json::to_vec_pretty(payload).map_err(|e| json_err(path, e))?;

    if let Err(e) = write_synced(tmp, &bytes) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(tmp, e));
    }

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }

    tracing::debug!(replaced = existed, "wrote: {}", path.display());
    Ok(WriteOutcome::Written {
        path: path.to_path_buf(),
        replaced: existed,
    })
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// `start_date` of a payload, if present and parseable.
pub fn payload_timestamp(payload: &Value) -> Option<DateTime<Utc>> {
    payload.get(TIMESTAMP_FIELD)?.as_str().and_then(parse_utc)
}

fn validate_id(id: &ActivityId) -> Result<(), SyncError> {
    let s = id.as_str();
    let bad = s.is_empty()
        || s.starts_with('.')
        || s.chars()
            .any(|c| c == '/' || c == '\\' || c == '\0' || c.is_control());
    if bad {
        return Err(SyncError::InvalidId(s.to_owned()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Tera rendering engine: [`ReportKind`] and [`ReportRenderer`].
//!
//! | Report       | Output file        |
//! |--------------|--------------------|
//! | ActivityLog  | `activity_log.txt` |
//! | RunLog       | `runs_log.txt`     |
//! | ActivityCsv  | `activities.csv`   |

use std::io::Write;
use std::path::{Path, PathBuf};

use tera::Tera;

use stride_sync::{ArchiveStore, ArchivedActivity};

use crate::context::{ActivityLogContext, RunLogContext};
use crate::error::{io_err, ReportError};
use crate::export::activities_csv;

// ---------------------------------------------------------------------------
// Embedded templates
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    ("activity_log.txt", include_str!("templates/activity_log.txt.tera")),
    ("runs_log.txt", include_str!("templates/runs_log.txt.tera")),
];

fn build_tera() -> Result<Tera, ReportError> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TPLS.iter().copied())?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// ReportKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    /// Every dated activity, newest first.
    ActivityLog,
    /// Runs grouped by month with monthly totals.
    RunLog,
    /// One CSV row per activity. Not template-backed.
    ActivityCsv,
}

impl ReportKind {
    pub fn all() -> &'static [ReportKind] {
        &[
            ReportKind::ActivityLog,
            ReportKind::RunLog,
            ReportKind::ActivityCsv,
        ]
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ReportKind::ActivityLog => "activity_log.txt",
            ReportKind::RunLog => "runs_log.txt",
            ReportKind::ActivityCsv => "activities.csv",
        }
    }

    pub fn output_path(&self, reports_dir: &Path) -> PathBuf {
        reports_dir.join(self.file_name())
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// A report written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenReport {
    pub kind: ReportKind,
    pub path: PathBuf,
    /// Activities (activity log, CSV rows) or month blocks (run log) rendered.
    pub items: usize,
}

/// Renders reports from archive entries. Create once and reuse.
pub struct ReportRenderer {
    tera: Tera,
}

impl ReportRenderer {
    pub fn new() -> Result<Self, ReportError> {
        Ok(Self { tera: build_tera()? })
    }

    /// Render `kind` over `entries`. Text logs always end in exactly one
    /// newline.
    pub fn render(
        &self,
        kind: ReportKind,
        entries: &[ArchivedActivity],
    ) -> Result<(String, usize), ReportError> {
        let (template, ctx, items) = match kind {
            ReportKind::ActivityLog => {
                let ctx = ActivityLogContext::from_entries(entries);
                let items = ctx.activities.len();
                ("activity_log.txt", ctx.to_tera_context()?, items)
            }
            ReportKind::RunLog => {
                let ctx = RunLogContext::from_entries(entries);
                let items = ctx.months.len();
                ("runs_log.txt", ctx.to_tera_context()?, items)
            }
            ReportKind::ActivityCsv => return activities_csv(entries),
        };
        let rendered = self.tera.render(template, &ctx)?;
        Ok((format!("{}\n", rendered.trim_end()), items))
    }

    /// Read the archive at `archive_dir`, render `kind` and write it into
    /// `reports_dir`.
    pub fn generate(
        &self,
        kind: ReportKind,
        archive_dir: &Path,
        reports_dir: &Path,
    ) -> Result<WrittenReport, ReportError> {
        if !archive_dir.is_dir() {
            return Err(ReportError::MissingArchive {
                path: archive_dir.to_path_buf(),
            });
        }
        let entries = ArchiveStore::open(archive_dir)?.entries()?;
        let (contents, items) = self.render(kind, &entries)?;
        let path = kind.output_path(reports_dir);
        write_report(&path, &contents)?;
        tracing::info!(report = kind.file_name(), items, "wrote {}", path.display());
        Ok(WrittenReport { kind, path, items })
    }
}

/// Atomically replace `path` with `contents`, creating parent directories.
pub fn write_report(path: &Path, contents: &str) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    let written = std::fs::File::create(&tmp)
        .and_then(|mut file| {
            file.write_all(contents.as_bytes())?;
            file.sync_all()
        })
        .map_err(|e| io_err(&tmp, e));
    if let Err(err) = written {
        let _ = std::fs::remove_file(&tmp);
        return Err(err);
    }
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

//! `stride report`: render text logs and the CSV export from the archive.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use stride_report::{ReportKind, ReportRenderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportChoice {
    /// Every activity, newest first.
    Activities,
    /// Runs grouped by month.
    Runs,
    /// One CSV row per activity.
    Csv,
    /// Both logs and the CSV export.
    All,
}

impl ReportChoice {
    fn kinds(self) -> &'static [ReportKind] {
        match self {
            ReportChoice::Activities => &[ReportKind::ActivityLog],
            ReportChoice::Runs => &[ReportKind::RunLog],
            ReportChoice::Csv => &[ReportKind::ActivityCsv],
            ReportChoice::All => ReportKind::all(),
        }
    }
}

/// Arguments for `stride report`.
#[derive(Args, Debug)]
pub struct ReportArgs {
    #[arg(value_enum)]
    pub kind: ReportChoice,

    /// Archive directory (overrides `archive_dir`).
    #[arg(long, value_name = "PATH")]
    pub archive_dir: Option<PathBuf>,

    /// Output directory (overrides `reports_dir`).
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,
}

impl ReportArgs {
    pub fn run(self) -> Result<()> {
        let (home, config) = super::load_config()?;
        let archive_dir = super::archive_dir(&home, &config, self.archive_dir.clone());
        let reports_dir = self
            .out
            .clone()
            .unwrap_or_else(|| config.reports_dir_at(&home));

        let renderer = ReportRenderer::new().context("failed to load report templates")?;
        for kind in self.kind.kinds() {
            let written = renderer
                .generate(*kind, &archive_dir, &reports_dir)
                .with_context(|| format!("failed to write {}", kind.file_name()))?;
            let unit = match kind {
                ReportKind::ActivityLog | ReportKind::ActivityCsv => "activities",
                ReportKind::RunLog => "month blocks",
            };
            println!("✎  {} ({} {unit})", written.path.display(), written.items);
        }
        Ok(())
    }
}

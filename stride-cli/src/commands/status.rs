//! `stride status`: archive size, date range and token state.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use stride_core::token::load_token_at;
use stride_core::CoreError;
use stride_sync::ArchiveStore;

/// Arguments for `stride status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Archive directory (overrides `archive_dir`).
    #[arg(long, value_name = "PATH")]
    pub archive_dir: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let (home, config) = super::load_config()?;
        let archive_dir = super::archive_dir(&home, &config, self.archive_dir.clone());
        let report = build_report(&home, &archive_dir)?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status JSON")?
            );
            return Ok(());
        }
        print_table(&report);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    archive_dir: PathBuf,
    entries: usize,
    /// Entries whose payload carries no usable `start_date`.
    undated: usize,
    oldest: Option<DateTime<Utc>>,
    newest: Option<DateTime<Utc>>,
    token: TokenState,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum TokenState {
    Valid,
    Expired,
    Missing,
    Unreadable,
}

impl TokenState {
    fn label(self) -> String {
        match self {
            TokenState::Valid => "valid".green().to_string(),
            TokenState::Expired => "expired (refreshed on next sync)".yellow().to_string(),
            TokenState::Missing => "missing (run `stride auth url`)".red().to_string(),
            TokenState::Unreadable => "unreadable".red().to_string(),
        }
    }
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "field")]
    field: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

fn build_report(home: &Path, archive_dir: &Path) -> Result<StatusReport> {
    let (entries, undated, bounds) = if archive_dir.is_dir() {
        let store = ArchiveStore::open(archive_dir)
            .with_context(|| format!("failed to open archive at {}", archive_dir.display()))?;
        let ids = store.list_ids()?;
        let mut undated = 0;
        for id in &ids {
            if store.read_timestamp(id)?.is_none() {
                undated += 1;
            }
        }
        (ids.len(), undated, store.bounds()?)
    } else {
        (0, 0, None)
    };

    let token = match load_token_at(home) {
        Ok(token) if token.is_expired(Utc::now()) => TokenState::Expired,
        Ok(_) => TokenState::Valid,
        Err(CoreError::TokenNotFound { .. }) => TokenState::Missing,
        Err(err) => {
            tracing::debug!(error = %err, "token file unreadable");
            TokenState::Unreadable
        }
    };

    Ok(StatusReport {
        archive_dir: archive_dir.to_path_buf(),
        entries,
        undated,
        oldest: bounds.map(|b| b.oldest),
        newest: bounds.map(|b| b.newest),
        token,
    })
}

fn print_table(report: &StatusReport) {
    println!("Stride v{}", env!("CARGO_PKG_VERSION"));
    let when = |ts: Option<DateTime<Utc>>| {
        ts.map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    let rows = vec![
        StatusTableRow {
            field: "archive",
            value: report.archive_dir.display().to_string(),
        },
        StatusTableRow {
            field: "activities",
            value: report.entries.to_string(),
        },
        StatusTableRow {
            field: "undated",
            value: report.undated.to_string(),
        },
        StatusTableRow {
            field: "oldest",
            value: when(report.oldest),
        },
        StatusTableRow {
            field: "newest",
            value: when(report.newest),
        },
        StatusTableRow {
            field: "token",
            value: report.token.label(),
        },
    ];
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if report.entries == 0 {
        println!("Archive is empty. Run 'stride sync' to seed it.");
    }
}

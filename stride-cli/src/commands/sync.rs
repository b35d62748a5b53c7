//! `stride sync`: archive activities that are not yet on disk.

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;

use stride_core::config::API_BASE_ENV;
use stride_strava::{authorize_at, StravaClient};
use stride_sync::driver::{self, resolve_direction};
use stride_sync::throttle::pause_from_secs;
use stride_sync::{ArchiveStore, SleepThrottle, SyncOptions, SyncReport};

/// Arguments for `stride sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Write at most N activities.
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Fetch activities newer than the newest archived one (the default).
    #[arg(long = "new")]
    pub newer: bool,

    /// Fetch activities older than the oldest archived one.
    #[arg(long)]
    pub older: bool,

    /// Re-fetch and overwrite activities that are already archived.
    #[arg(long)]
    pub force: bool,

    /// Pause after each archived activity (overrides `sleep_secs`).
    #[arg(long, value_name = "SECONDS")]
    pub sleep: Option<f64>,

    /// Archive directory (overrides `archive_dir`).
    #[arg(long, value_name = "PATH")]
    pub archive_dir: Option<PathBuf>,

    /// Emit the run report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        // Flag conflicts and bad values are rejected before any network use.
        resolve_direction(self.newer, self.older)?;
        let (home, config) = super::load_config()?;
        let pause = pause_from_secs(self.sleep.unwrap_or(config.sleep_secs))
            .context("invalid --sleep value")?;

        let archive_dir = super::archive_dir(&home, &config, self.archive_dir.clone());
        let store = ArchiveStore::open(&archive_dir)
            .with_context(|| format!("failed to open archive at {}", archive_dir.display()))?;

        let access_token = authorize_at(&home, &config, &super::token_endpoint(), Utc::now())
            .context("failed to authorize with Strava; run `stride auth url` to set up access")?;
        let mut client = StravaClient::new(access_token);
        if let Ok(base) = std::env::var(API_BASE_ENV) {
            client = client.with_api_base(base);
        }

        let options = SyncOptions {
            limit: self.limit,
            newer: self.newer,
            older: self.older,
            force: self.force,
            pause,
            per_page: config.per_page,
            cancel: Some(cancel_on_ctrl_c()?),
        };
        let report = driver::run(&store, &client, &mut SleepThrottle, &options)
            .context("sync stopped on a remote error; completed writes were kept, re-run to resume")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize sync report")?
            );
        } else {
            print_report(&report, &archive_dir);
        }

        if !report.stop.is_success() {
            bail!(
                "Strava rate limit reached after {} new activities; wait about 15 minutes for the quota window to reset, then re-run",
                report.written
            );
        }
        Ok(())
    }
}

/// A flag raised by Ctrl-C. The listener runs on its own thread so the
/// blocking driver loop only has to poll the flag between items. A second
/// Ctrl-C exits with status 130 without waiting for the current fetch.
fn cancel_on_ctrl_c() -> Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the signal listener")?;
    let raised = Arc::clone(&flag);
    std::thread::spawn(move || {
        runtime.block_on(async {
            if watch_interrupts(tokio::signal::ctrl_c, &raised).await {
                std::process::exit(130);
            }
        });
    });
    Ok(flag)
}

/// Raise `flag` on the first interrupt. Resolves to `true` once a second
/// interrupt arrives, or `false` if the signal source fails first.
async fn watch_interrupts<F, Fut>(mut interrupt: F, flag: &AtomicBool) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if interrupt().await.is_err() {
        return false;
    }
    tracing::warn!("received ctrl-c, stopping after the current activity (press again to quit now)");
    flag.store(true, Ordering::SeqCst);

    if interrupt().await.is_err() {
        return false;
    }
    tracing::warn!("received second ctrl-c, exiting");
    true
}

fn print_report(report: &SyncReport, archive_dir: &std::path::Path) {
    let boundary = report
        .boundary
        .map(|b| b.to_rfc3339())
        .unwrap_or_else(|| "none (empty archive)".to_string());
    let mark = if report.stop.is_success() {
        "✓".green()
    } else {
        "✗".red()
    };

    println!(
        "{mark} {} sync of {} — {}",
        report.direction,
        archive_dir.display(),
        report.stop.describe().bold()
    );
    println!("  boundary:  {boundary}");
    println!(
        "  listed:    {} ({} outside window)",
        report.listed, report.passed_over
    );
    println!("  written:   {}", report.written.to_string().green());
    println!("  skipped:   {}", report.skipped);
    for id in &report.written_ids {
        println!("  ✎  {id}");
    }
}

//! Sync driver: the run loop.
//!
//! ```text
//! DETERMINE_MODE → DETERMINE_CURSOR → LIST
//!   → { EVALUATE → (FETCH_AND_WRITE | SKIP) → CHECK_BUDGET }*
//!   → DONE
//! ```
//!
//! Every run recomputes its cursor from the archive directory, so a run that
//! was interrupted, rate limited or failed can simply be started again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use stride_core::config::DEFAULT_PER_PAGE;
use stride_core::{ActivityId, Direction};

use crate::archive::{ArchiveStore, WriteOutcome};
use crate::decision::{decide, Decision};
use crate::error::SyncError;
use crate::lister::{check_boundary, ActivityLister, BoundaryCheck};
use crate::source::{ActivitySource, SourceError};
use crate::throttle::Throttle;

/// Progress is logged every this many writes.
const PROGRESS_EVERY: usize = 25;

// ---------------------------------------------------------------------------
// Options and report
// ---------------------------------------------------------------------------

/// Knobs for one run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Maximum number of entries to write; `None` is unlimited.
    pub limit: Option<usize>,
    /// Explicit forward (`--new`).
    pub newer: bool,
    /// Explicit backward (`--older`).
    pub older: bool,
    /// Re-fetch and overwrite entries that already exist.
    pub force: bool,
    /// Pause after each write.
    pub pause: Duration,
    /// Listing page size.
    pub per_page: u32,
    /// Set from outside (Ctrl-C) to stop between items.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            limit: None,
            newer: false,
            older: false,
            force: false,
            pause: Duration::ZERO,
            per_page: DEFAULT_PER_PAGE,
            cancel: None,
        }
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    LimitReached,
    ListingExhausted,
    RateLimited,
    Interrupted,
}

impl StopReason {
    /// Rate limiting is the only stop that counts as a failed run.
    pub fn is_success(self) -> bool {
        !matches!(self, StopReason::RateLimited)
    }

    pub fn describe(self) -> &'static str {
        match self {
            StopReason::LimitReached => "limit reached",
            StopReason::ListingExhausted => "listing exhausted",
            StopReason::RateLimited => "rate limited",
            StopReason::Interrupted => "interrupted",
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub direction: Direction,
    /// Cursor the run was anchored to; `None` for an empty archive.
    pub boundary: Option<DateTime<Utc>>,
    /// Summaries received from the listing.
    pub listed: usize,
    /// Summaries outside the window that were passed over (backward mode).
    pub passed_over: usize,
    pub written: usize,
    /// Existing entries left alone, including write-time conflicts.
    pub skipped: usize,
    /// Ids in the order they were written.
    pub written_ids: Vec<ActivityId>,
    pub stop: StopReason,
}

impl SyncReport {
    fn new(direction: Direction, boundary: Option<DateTime<Utc>>) -> Self {
        Self {
            direction,
            boundary,
            listed: 0,
            passed_over: 0,
            written: 0,
            skipped: 0,
            written_ids: Vec::new(),
            stop: StopReason::ListingExhausted,
        }
    }

    fn finish(mut self, stop: StopReason) -> Self {
        self.stop = stop;
        tracing::info!(
            direction = %self.direction,
            listed = self.listed,
            written = self.written,
            skipped = self.skipped,
            "sync finished: {}",
            stop.describe()
        );
        self
    }
}

// ---------------------------------------------------------------------------
// Mode and cursor
// ---------------------------------------------------------------------------

/// Resolve the run direction from the two explicit flags.
///
/// Neither flag defaults to forward whether or not the archive is empty.
pub fn resolve_direction(newer: bool, older: bool) -> Result<Direction, SyncError> {
    match (newer, older) {
        (true, true) => Err(SyncError::InvalidConfiguration(
            "--new and --older are mutually exclusive".to_string(),
        )),
        (false, true) => Ok(Direction::Backward),
        _ => Ok(Direction::Forward),
    }
}

/// Newest (forward) or oldest (backward) archived timestamp.
pub fn determine_boundary(
    store: &ArchiveStore,
    direction: Direction,
) -> Result<Option<DateTime<Utc>>, SyncError> {
    Ok(store.bounds()?.map(|b| match direction {
        Direction::Forward => b.newest,
        Direction::Backward => b.oldest,
    }))
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Run one sync pass against `store`.
///
/// Returns `Ok` for every orderly stop, including [`StopReason::RateLimited`];
/// check [`StopReason::is_success`]. Any other remote failure aborts with
/// [`SyncError::Remote`]. Completed writes are never rolled back.
pub fn run<S, T>(
    store: &ArchiveStore,
    source: &S,
    throttle: &mut T,
    options: &SyncOptions,
) -> Result<SyncReport, SyncError>
where
    S: ActivitySource + ?Sized,
    T: Throttle + ?Sized,
{
    // DETERMINE_MODE
    let direction = resolve_direction(options.newer, options.older)?;

    // DETERMINE_CURSOR
    let boundary = determine_boundary(store, direction)?;
    match boundary {
        Some(b) => tracing::info!(%direction, boundary = %b.to_rfc3339(), "listing activities"),
        None => tracing::info!(%direction, "archive is empty; listing from newest"),
    }

    let mut report = SyncReport::new(direction, boundary);
    let mut remaining = options.limit;
    if remaining == Some(0) {
        return Ok(report.finish(StopReason::LimitReached));
    }

    // LIST
    let lister = ActivityLister::new(source, options.per_page);
    let mut listing = lister.list(direction, boundary);
    loop {
        // Polled before pulling, so a raised flag never costs another page.
        if is_cancelled(options) {
            return Ok(report.finish(StopReason::Interrupted));
        }

        let summary = match listing.next() {
            None => break,
            Some(Ok(summary)) => summary,
            Some(Err(err)) => return remote_failure(report, err),
        };
        report.listed += 1;
        if report.listed == 1 {
            tracing::debug!(id = %summary.id, "first listed activity");
        }

        // EVALUATE
        match check_boundary(direction, boundary, summary.start_date) {
            BoundaryCheck::Process => {}
            BoundaryCheck::PassOver => {
                report.passed_over += 1;
                continue;
            }
            BoundaryCheck::Stop => break,
        }

        if decide(store, &summary, options.force)? == Decision::Skip {
            report.skipped += 1;
            continue;
        }

        // FETCH_AND_WRITE
        let payload = match source.fetch_detail(&summary.id) {
            Ok(payload) => payload,
            Err(err) => return remote_failure(report, err),
        };
        match store.write(&summary.id, &payload, options.force)? {
            WriteOutcome::AlreadyArchived { .. } => {
                report.skipped += 1;
                continue;
            }
            WriteOutcome::Written { path, replaced } => {
                tracing::info!(id = %summary.id, replaced, "archived {}", path.display());
                report.written += 1;
                report.written_ids.push(summary.id);
                if report.written % PROGRESS_EVERY == 0 {
                    tracing::info!(
                        listed = report.listed,
                        written = report.written,
                        skipped = report.skipped,
                        "progress"
                    );
                }
                throttle.wait(options.pause);
            }
        }

        // CHECK_BUDGET
        if let Some(left) = remaining.as_mut() {
            *left -= 1;
            if *left == 0 {
                return Ok(report.finish(StopReason::LimitReached));
            }
        }
    }

    Ok(report.finish(StopReason::ListingExhausted))
}

fn is_cancelled(options: &SyncOptions) -> bool {
    options
        .cancel
        .as_ref()
        .is_some_and(|flag| flag.load(Ordering::SeqCst))
}

fn remote_failure(report: SyncReport, err: SourceError) -> Result<SyncReport, SyncError> {
    if err.is_quota_exceeded() {
        tracing::warn!(written = report.written, "remote quota exceeded; stopping");
        return Ok(report.finish(StopReason::RateLimited));
    }
    Err(SyncError::Remote {
        written: report.written,
        source: err,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

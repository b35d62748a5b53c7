//! Driver behaviour against an in-memory remote source.

use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use rstest::rstest;
use serde_json::{json, Value};
use tempfile::TempDir;

use stride_core::{ActivityId, ActivitySummary, Direction};
use stride_sync::{
    run, ActivitySource, ArchiveStore, ListQuery, SourceError, StopReason, SyncError,
    SyncOptions, Throttle,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn at(t: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(t)
}

fn id(n: u64) -> ActivityId {
    ActivityId::from(n)
}

/// Remote history held in memory, newest first.
struct FakeSource {
    items: Vec<ActivitySummary>,
    revision: u32,
    fetches: RefCell<Vec<ActivityId>>,
    list_calls: Cell<u32>,
    /// Fetch number (0-based) that answers with a quota error.
    quota_on_fetch: Option<usize>,
    /// Listing answers with a quota error.
    quota_on_list: bool,
    /// Fetching this id fails with a transport error.
    broken: Option<ActivityId>,
    /// Fetching this id writes it to the archive first, as a concurrent
    /// writer would.
    race: Option<(ArchiveStore, ActivityId)>,
}

impl FakeSource {
    /// `(id, t)` pairs in any order; served newest first.
    fn new(history: &[(u64, i64)]) -> Self {
        let mut items: Vec<_> = history
            .iter()
            .map(|&(n, t)| ActivitySummary::new(n, at(t)))
            .collect();
        items.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Self {
            items,
            revision: 1,
            fetches: RefCell::new(Vec::new()),
            list_calls: Cell::new(0),
            quota_on_fetch: None,
            quota_on_list: false,
            broken: None,
            race: None,
        }
    }

    /// Evenly spaced history: ids `1..=n` at `t = 10 * id`.
    fn linear(n: u64) -> Self {
        let history: Vec<_> = (1..=n).map(|i| (i, i as i64 * 10)).collect();
        Self::new(&history)
    }

    fn detail(&self, summary: &ActivitySummary) -> Value {
        json!({
            "id": summary.id.as_str().parse::<u64>().unwrap_or_default(),
            "name": format!("Activity {}", summary.id),
            "start_date": summary.start_date.to_rfc3339(),
            "revision": self.revision,
        })
    }

    fn fetched(&self) -> Vec<ActivityId> {
        self.fetches.borrow().clone()
    }
}

impl ActivitySource for FakeSource {
    fn list_page(
        &self,
        query: &ListQuery,
        page: u32,
    ) -> Result<Vec<ActivitySummary>, SourceError> {
        self.list_calls.set(self.list_calls.get() + 1);
        if self.quota_on_list {
            return Err(SourceError::QuotaExceeded);
        }
        let per_page = query.per_page as usize;
        Ok(self
            .items
            .iter()
            .filter(|s| query.before.map_or(true, |b| s.start_date < b))
            .skip((page as usize - 1) * per_page)
            .take(per_page)
            .cloned()
            .collect())
    }

    fn fetch_detail(&self, activity: &ActivityId) -> Result<Value, SourceError> {
        let n = self.fetches.borrow().len();
        self.fetches.borrow_mut().push(activity.clone());
        if self.quota_on_fetch == Some(n) {
            return Err(SourceError::QuotaExceeded);
        }
        if self.broken.as_ref() == Some(activity) {
            return Err(SourceError::Transport("connection reset by peer".into()));
        }
        let summary = self
            .items
            .iter()
            .find(|s| &s.id == activity)
            .expect("fetch of unlisted id");
        let detail = self.detail(summary);
        if let Some((store, raced)) = &self.race {
            if raced == activity {
                store.write(activity, &json!({"raced": true}), false).unwrap();
            }
        }
        Ok(detail)
    }
}

/// Records every pause; optionally raises a cancel flag after `n` pauses.
#[derive(Default)]
struct RecordingThrottle {
    pauses: Vec<Duration>,
    cancel_after: Option<(usize, Arc<AtomicBool>)>,
}

impl Throttle for RecordingThrottle {
    fn wait(&mut self, delay: Duration) {
        self.pauses.push(delay);
        if let Some((n, flag)) = &self.cancel_after {
            if self.pauses.len() >= *n {
                flag.store(true, Ordering::SeqCst);
            }
        }
    }
}

fn archive() -> (TempDir, ArchiveStore) {
    let tmp = TempDir::new().unwrap();
    let store = ArchiveStore::open(tmp.path().join("activities")).unwrap();
    (tmp, store)
}

fn seed(store: &ArchiveStore, entries: &[(u64, i64)]) {
    for &(n, t) in entries {
        store
            .write(&id(n), &json!({"id": n, "start_date": at(t).to_rfc3339()}), false)
            .unwrap();
    }
}

fn opts() -> SyncOptions {
    SyncOptions {
        per_page: 3,
        pause: Duration::from_millis(600),
        ..SyncOptions::default()
    }
}

fn ids(v: &[u64]) -> Vec<ActivityId> {
    v.iter().map(|&n| id(n)).collect()
}

// ---------------------------------------------------------------------------
// Worked example
// ---------------------------------------------------------------------------

#[test]
fn forward_fetches_only_items_newer_than_cursor() {
    let (_tmp, store) = archive();
    seed(&store, &[(10, 100), (11, 110)]);
    let source = FakeSource::new(&[(9, 90), (10, 100), (11, 110), (12, 120)]);
    let mut throttle = RecordingThrottle::default();

    let report = run(
        &store,
        &source,
        &mut throttle,
        &SyncOptions {
            limit: Some(5),
            newer: true,
            ..opts()
        },
    )
    .unwrap();

    assert_eq!(report.direction, Direction::Forward);
    assert_eq!(report.boundary, Some(at(110)));
    assert_eq!(report.written_ids, ids(&[12]));
    assert_eq!(report.written, 1);
    assert_eq!(report.stop, StopReason::ListingExhausted);
    assert_eq!(source.fetched(), ids(&[12]));
    assert!(store.exists(&id(12)).unwrap());
    assert!(!store.exists(&id(9)).unwrap());
}

// ---------------------------------------------------------------------------
// Idempotency
// ---------------------------------------------------------------------------

#[test]
fn repeated_runs_write_nothing_new() {
    let (_tmp, store) = archive();
    let source = FakeSource::linear(5);
    let mut throttle = RecordingThrottle::default();

    let first = run(&store, &source, &mut throttle, &SyncOptions { limit: Some(2), ..opts() }).unwrap();
    assert_eq!(first.written_ids, ids(&[5, 4]));
    assert_eq!(first.stop, StopReason::LimitReached);

    let older = SyncOptions {
        older: true,
        limit: Some(10),
        ..opts()
    };
    let backfill = run(&store, &source, &mut throttle, &older).unwrap();
    assert_eq!(backfill.written_ids, ids(&[3, 2, 1]));
    assert_eq!(backfill.stop, StopReason::ListingExhausted);

    let fetched_before = source.fetched().len();
    let again_older = run(&store, &source, &mut throttle, &older).unwrap();
    let again_default = run(&store, &source, &mut throttle, &opts()).unwrap();
    assert_eq!(again_older.written, 0);
    assert_eq!(again_default.written, 0);
    assert_eq!(source.fetched().len(), fetched_before, "no detail calls on re-run");
    assert_eq!(store.count().unwrap(), 5);
}

#[test]
fn unbounded_skips_cost_no_remote_calls() {
    // Entries without a timestamp do not move the cursor, so they are listed
    // inside the window and must be skipped by the existence check.
    let (_tmp, store) = archive();
    seed(&store, &[(1, 10)]);
    store.write(&id(4), &json!({"id": 4}), false).unwrap();
    let source = FakeSource::linear(5);
    let mut throttle = RecordingThrottle::default();

    let report = run(&store, &source, &mut throttle, &opts()).unwrap();

    assert_eq!(report.written_ids, ids(&[5, 3, 2]));
    assert_eq!(report.skipped, 1);
    assert_eq!(source.fetched(), ids(&[5, 3, 2]));
    assert_eq!(throttle.pauses, vec![Duration::from_millis(600); 3]);
}

// ---------------------------------------------------------------------------
// Budget
// ---------------------------------------------------------------------------

#[rstest]
#[case(1, StopReason::LimitReached)]
#[case(3, StopReason::LimitReached)]
#[case(7, StopReason::LimitReached)]
#[case(8, StopReason::ListingExhausted)]
#[case(50, StopReason::ListingExhausted)]
fn budget_is_exact(#[case] limit: usize, #[case] stop: StopReason) {
    let (_tmp, store) = archive();
    let source = FakeSource::linear(7);
    let mut throttle = RecordingThrottle::default();

    let report = run(
        &store,
        &source,
        &mut throttle,
        &SyncOptions {
            limit: Some(limit),
            ..opts()
        },
    )
    .unwrap();

    assert_eq!(report.written, limit.min(7));
    assert_eq!(store.count().unwrap(), limit.min(7));
    assert_eq!(source.fetched().len(), limit.min(7));
    assert_eq!(report.stop, stop);
}

#[test]
fn zero_budget_makes_no_remote_calls() {
    let (_tmp, store) = archive();
    let source = FakeSource::linear(3);
    let mut throttle = RecordingThrottle::default();

    let report = run(&store, &source, &mut throttle, &SyncOptions { limit: Some(0), ..opts() }).unwrap();

    assert_eq!(report.written, 0);
    assert_eq!(report.stop, StopReason::LimitReached);
    assert_eq!(source.list_calls.get(), 0);
}

#[test]
fn budget_stops_paging_early() {
    let (_tmp, store) = archive();
    let source = FakeSource::linear(100);
    let mut throttle = RecordingThrottle::default();

    run(&store, &source, &mut throttle, &SyncOptions { limit: Some(4), ..opts() }).unwrap();

    // per_page 3: four writes need exactly two pages.
    assert_eq!(source.list_calls.get(), 2);
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

#[test]
fn backward_writes_only_strictly_older() {
    let (_tmp, store) = archive();
    seed(&store, &[(5, 50), (6, 60), (7, 70)]);
    let source = FakeSource::linear(10);
    let mut throttle = RecordingThrottle::default();

    let report = run(&store, &source, &mut throttle, &SyncOptions { older: true, ..opts() }).unwrap();

    assert_eq!(report.direction, Direction::Backward);
    assert_eq!(report.boundary, Some(at(50)));
    assert_eq!(report.written_ids, ids(&[4, 3, 2, 1]));
    for written in &report.written_ids {
        let ts = store.read_timestamp(written).unwrap().unwrap();
        assert!(ts < at(50), "{written} at {ts} is not older than the cursor");
    }
}

#[test]
fn backward_passes_over_items_the_source_does_not_filter() {
    struct IgnoresBefore(FakeSource);
    impl ActivitySource for IgnoresBefore {
        fn list_page(
            &self,
            query: &ListQuery,
            page: u32,
        ) -> Result<Vec<ActivitySummary>, SourceError> {
            let unfiltered = ListQuery {
                before: None,
                ..*query
            };
            self.0.list_page(&unfiltered, page)
        }
        fn fetch_detail(&self, id: &ActivityId) -> Result<Value, SourceError> {
            self.0.fetch_detail(id)
        }
    }

    let (_tmp, store) = archive();
    seed(&store, &[(6, 60)]);
    let source = IgnoresBefore(FakeSource::linear(8));
    let mut throttle = RecordingThrottle::default();

    let report = run(&store, &source, &mut throttle, &SyncOptions { older: true, ..opts() }).unwrap();

    assert_eq!(report.passed_over, 3);
    assert_eq!(report.written_ids, ids(&[5, 4, 3, 2, 1]));
}

#[test]
fn forward_writes_only_strictly_newer() {
    let (_tmp, store) = archive();
    seed(&store, &[(3, 30), (4, 40)]);
    let source = FakeSource::linear(8);
    let mut throttle = RecordingThrottle::default();

    let report = run(&store, &source, &mut throttle, &SyncOptions { newer: true, ..opts() }).unwrap();

    assert_eq!(report.written_ids, ids(&[8, 7, 6, 5]));
    for written in &report.written_ids {
        assert!(store.read_timestamp(written).unwrap().unwrap() > at(40));
    }
}

#[test]
fn empty_archive_default_matches_explicit_forward() {
    let source = FakeSource::linear(6);
    let limit = SyncOptions { limit: Some(3), ..opts() };

    let (_a, default_store) = archive();
    let default_report = run(&default_store, &source, &mut RecordingThrottle::default(), &limit).unwrap();

    let (_b, forward_store) = archive();
    let forward_report = run(
        &forward_store,
        &source,
        &mut RecordingThrottle::default(),
        &SyncOptions { newer: true, ..limit.clone() },
    )
    .unwrap();

    assert_eq!(default_report, forward_report);
    assert_eq!(default_report.boundary, None);
    assert_eq!(default_report.written_ids, ids(&[6, 5, 4]));
}

#[test]
fn older_on_empty_archive_starts_from_newest() {
    let (_tmp, store) = archive();
    let source = FakeSource::linear(4);

    let report = run(
        &store,
        &source,
        &mut RecordingThrottle::default(),
        &SyncOptions { older: true, limit: Some(2), ..opts() },
    )
    .unwrap();

    assert_eq!(report.direction, Direction::Backward);
    assert_eq!(report.written_ids, ids(&[4, 3]));
}

#[test]
fn both_directions_rejected_before_any_remote_call() {
    let (_tmp, store) = archive();
    let source = FakeSource::linear(3);

    let err = run(
        &store,
        &source,
        &mut RecordingThrottle::default(),
        &SyncOptions { newer: true, older: true, ..opts() },
    )
    .unwrap_err();

    assert!(matches!(err, SyncError::InvalidConfiguration(_)), "got: {err}");
    assert_eq!(source.list_calls.get(), 0);
    assert!(source.fetched().is_empty());
}

// ---------------------------------------------------------------------------
// Force
// ---------------------------------------------------------------------------

#[test]
fn force_refetches_and_replaces_existing_entries() {
    let (_tmp, store) = archive();
    seed(&store, &[(10, 100)]);
    // Archived without a start date, so it sits inside the forward window.
    store.write(&id(12), &json!({"id": 12, "stale": true}), false).unwrap();
    let mut source = FakeSource::new(&[(10, 100), (11, 110), (12, 120)]);
    source.revision = 2;

    let plain = run(&store, &source, &mut RecordingThrottle::default(), &opts()).unwrap();
    assert_eq!(plain.written_ids, ids(&[11]));
    assert_eq!(plain.skipped, 1);
    assert_eq!(store.read(&id(12)).unwrap()["stale"], json!(true));

    let forced = run(
        &store,
        &source,
        &mut RecordingThrottle::default(),
        &SyncOptions { force: true, ..opts() },
    )
    .unwrap();
    // Cursor is now 11's timestamp; 12 is the only item above it.
    assert_eq!(forced.written_ids, ids(&[12]));
    let entry = store.read(&id(12)).unwrap();
    assert_eq!(entry["revision"], json!(2));
    assert!(entry.get("stale").is_none());
    assert!(!store.dir().join("12.json.tmp").exists());
}

#[test]
fn force_with_no_cursor_overwrites_everything_listed() {
    let (_tmp, store) = archive();
    // Undated entries give the archive no cursor at all.
    for n in 1..=3 {
        store.write(&id(n), &json!({"id": n}), false).unwrap();
    }
    let mut source = FakeSource::linear(3);
    source.revision = 9;

    let report = run(
        &store,
        &source,
        &mut RecordingThrottle::default(),
        &SyncOptions { force: true, ..opts() },
    )
    .unwrap();

    assert_eq!(report.boundary, None);
    assert_eq!(report.written_ids, ids(&[3, 2, 1]));
    for n in 1..=3 {
        assert_eq!(store.read(&id(n)).unwrap()["revision"], json!(9));
    }
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn quota_on_fetch_stops_and_keeps_completed_writes() {
    let (_tmp, store) = archive();
    let mut source = FakeSource::linear(6);
    source.quota_on_fetch = Some(2);
    let mut throttle = RecordingThrottle::default();

    let report = run(&store, &source, &mut throttle, &opts()).unwrap();

    assert_eq!(report.stop, StopReason::RateLimited);
    assert!(!report.stop.is_success());
    assert_eq!(report.written_ids, ids(&[6, 5]));
    assert_eq!(store.count().unwrap(), 2);
    assert_eq!(source.fetched().len(), 3, "no fetches after the quota error");
    assert_eq!(throttle.pauses.len(), 2);
}

#[test]
fn quota_on_listing_is_rate_limited() {
    let (_tmp, store) = archive();
    let mut source = FakeSource::linear(2);
    source.quota_on_list = true;

    let report = run(&store, &source, &mut RecordingThrottle::default(), &opts()).unwrap();

    assert_eq!(report.stop, StopReason::RateLimited);
    assert_eq!(report.written, 0);
}

#[test]
fn transient_failure_aborts_without_partial_entry() {
    let (_tmp, store) = archive();
    let mut source = FakeSource::linear(5);
    source.broken = Some(id(3));

    let err = run(&store, &source, &mut RecordingThrottle::default(), &opts()).unwrap_err();

    match err {
        SyncError::Remote { written, source } => {
            assert_eq!(written, 2);
            assert!(matches!(source, SourceError::Transport(_)));
        }
        other => panic!("expected remote error, got {other}"),
    }
    assert!(!store.exists(&id(3)).unwrap());
    assert!(!store.dir().join("3.json.tmp").exists());

    // Forward has nothing newer than 5; the gap is filled going backward.
    source.broken = None;
    let resumed = run(
        &store,
        &source,
        &mut RecordingThrottle::default(),
        &SyncOptions { older: true, ..opts() },
    )
    .unwrap();
    assert_eq!(resumed.written_ids, ids(&[3, 2, 1]));
}

#[test]
fn conflicting_write_is_a_skip_without_budget_or_pause() {
    let (_tmp, store) = archive();
    let mut source = FakeSource::linear(4);
    source.race = Some((store.clone(), id(3)));
    let mut throttle = RecordingThrottle::default();

    let report = run(&store, &source, &mut throttle, &SyncOptions { limit: Some(3), ..opts() }).unwrap();

    assert_eq!(report.written_ids, ids(&[4, 2, 1]));
    assert_eq!(report.skipped, 1);
    assert_eq!(throttle.pauses.len(), 3);
    assert_eq!(store.read(&id(3)).unwrap(), json!({"raced": true}));
}

// ---------------------------------------------------------------------------
// Interruption
// ---------------------------------------------------------------------------

#[test]
fn stray_temp_file_from_interrupted_write_is_not_an_entry() {
    let (_tmp, store) = archive();
    std::fs::write(store.dir().join("2.json.tmp"), "{\"id\": 2, \"start_da").unwrap();
    assert!(store.list_ids().unwrap().is_empty());
    assert!(store.bounds().unwrap().is_none());

    let source = FakeSource::linear(2);
    let report = run(&store, &source, &mut RecordingThrottle::default(), &opts()).unwrap();

    assert_eq!(report.written_ids, ids(&[2, 1]));
    assert_eq!(store.read(&id(2)).unwrap()["id"], json!(2));
    assert!(!store.dir().join("2.json.tmp").exists());
}

#[test]
fn cancellation_between_items_keeps_completed_writes() {
    let (_tmp, store) = archive();
    let source = FakeSource::linear(6);
    let flag = Arc::new(AtomicBool::new(false));
    let mut throttle = RecordingThrottle {
        cancel_after: Some((2, Arc::clone(&flag))),
        ..RecordingThrottle::default()
    };

    let report = run(
        &store,
        &source,
        &mut throttle,
        &SyncOptions {
            cancel: Some(Arc::clone(&flag)),
            ..opts()
        },
    )
    .unwrap();

    assert_eq!(report.stop, StopReason::Interrupted);
    assert!(report.stop.is_success());
    assert_eq!(report.written_ids, ids(&[6, 5]));

    // The interrupted run resumes cleanly.
    let rest = run(
        &store,
        &source,
        &mut RecordingThrottle::default(),
        &SyncOptions { older: true, ..opts() },
    )
    .unwrap();
    assert_eq!(rest.written_ids, ids(&[4, 3, 2, 1]));
}

#[test]
fn raised_cancel_flag_stops_before_any_listing_request() {
    let (_tmp, store) = archive();
    let source = FakeSource::linear(3);

    let report = run(
        &store,
        &source,
        &mut RecordingThrottle::default(),
        &SyncOptions {
            cancel: Some(Arc::new(AtomicBool::new(true))),
            ..opts()
        },
    )
    .unwrap();

    assert_eq!(report.stop, StopReason::Interrupted);
    assert_eq!(report.written, 0);
    assert_eq!(source.list_calls.get(), 0);
    assert!(source.fetches.borrow().is_empty());
}

//! Template contexts built from archived entries.
//!
//! Column padding and number formatting happen here so the templates only
//! lay out lines.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;

use stride_sync::ArchivedActivity;

use crate::activity::{activity_type, is_run, start_local};
use crate::error::ReportError;
use crate::units::{
    meters_to_miles, pace_mmss, safe_float, safe_int, seconds_per_mile, seconds_to_hhmmss,
    seconds_to_mmss,
};

const RULE_WIDTH: usize = 46;

// ---------------------------------------------------------------------------
// Activity log
// ---------------------------------------------------------------------------

/// One line of the activity log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityLine {
    pub date: String,
    /// Activity type, left-aligned to four columns.
    pub kind: String,
    /// Miles, right-aligned to five columns.
    pub distance: String,
    pub is_run: bool,
    /// `m:ss/mi`; runs only.
    pub pace: String,
    /// `m:ssmin`; runs only.
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityLogContext {
    /// Newest first.
    pub activities: Vec<ActivityLine>,
}

impl ActivityLogContext {
    /// Every entry with a parseable start, newest first. Entries sharing a
    /// start keep archive order.
    pub fn from_entries(entries: &[ArchivedActivity]) -> Self {
        let mut dated: Vec<(NaiveDateTime, &Value)> = entries
            .iter()
            .filter_map(|e| start_local(&e.payload).map(|dt| (dt, &e.payload)))
            .collect();
        dated.sort_by(|a, b| b.0.cmp(&a.0));

        let activities = dated
            .into_iter()
            .map(|(start, payload)| activity_line(start, payload))
            .collect();
        Self { activities }
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, ReportError> {
        tera::Context::from_serialize(self).map_err(ReportError::from)
    }
}

fn activity_line(start: NaiveDateTime, payload: &Value) -> ActivityLine {
    let miles = meters_to_miles(safe_float(payload.get("distance")));
    let run = is_run(payload);
    let (pace, time) = if run {
        let seconds = safe_int(payload.get("moving_time"));
        (
            format!("{:>5}/mi", pace_mmss(miles, seconds)),
            format!("{:>6}min", seconds_to_mmss(seconds)),
        )
    } else {
        (String::new(), String::new())
    };
    ActivityLine {
        date: start.date().format("%Y-%m-%d").to_string(),
        kind: format!("{:<4}", activity_type(payload)),
        distance: format!("{miles:>5.2}"),
        is_run: run,
        pace,
        time,
    }
}

// ---------------------------------------------------------------------------
// Run log
// ---------------------------------------------------------------------------

/// One run inside a month block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunLine {
    pub date: String,
    /// `dd.ddmi`, right-aligned.
    pub distance: String,
    /// `m:ss/mi`, or blank padding when the pace is undefined.
    pub pace: String,
    pub time: String,
}

/// Runs of one calendar month with their totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthBlock {
    /// e.g. `January 2026`.
    pub title: String,
    /// Newest first.
    pub runs: Vec<RunLine>,
    pub count: usize,
    pub miles: String,
    pub time: String,
    /// Average pace, or `N/A`.
    pub pace: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunLogContext {
    pub rule_major: String,
    pub rule_minor: String,
    /// Newest month first.
    pub months: Vec<MonthBlock>,
}

struct RunRow {
    date: NaiveDate,
    miles: f64,
    seconds: i64,
}

impl RunLogContext {
    /// Runs with a parseable start, grouped by local calendar month.
    pub fn from_entries(entries: &[ArchivedActivity]) -> Self {
        let mut by_month: BTreeMap<(i32, u32), Vec<RunRow>> = BTreeMap::new();
        for entry in entries {
            let payload = &entry.payload;
            if !is_run(payload) {
                continue;
            }
            let Some(start) = start_local(payload) else {
                continue;
            };
            let date = start.date();
            by_month
                .entry((date.year(), date.month()))
                .or_default()
                .push(RunRow {
                    date,
                    miles: meters_to_miles(safe_float(payload.get("distance"))),
                    seconds: safe_int(payload.get("moving_time")),
                });
        }

        let months = by_month
            .into_iter()
            .rev()
            .filter_map(|((year, month), runs)| month_block(year, month, runs))
            .collect();
        Self {
            rule_major: "=".repeat(RULE_WIDTH),
            rule_minor: "-".repeat(RULE_WIDTH),
            months,
        }
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, ReportError> {
        tera::Context::from_serialize(self).map_err(ReportError::from)
    }
}

fn month_block(year: i32, month: u32, mut runs: Vec<RunRow>) -> Option<MonthBlock> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    runs.sort_by(|a, b| b.date.cmp(&a.date));

    let total_miles: f64 = runs.iter().map(|r| r.miles).sum();
    let total_seconds: i64 = runs.iter().map(|r| r.seconds).sum();
    let lines = runs
        .iter()
        .map(|r| {
            let pace = pace_mmss(r.miles, r.seconds);
            RunLine {
                date: r.date.format("%Y-%m-%d").to_string(),
                distance: format!("{:>5.2}mi", r.miles),
                pace: if pace.is_empty() {
                    " ".repeat(5)
                } else {
                    format!("{pace:>5}/mi")
                },
                time: format!("{:>6}min", seconds_to_mmss(r.seconds)),
            }
        })
        .collect();

    Some(MonthBlock {
        title: first.format("%B %Y").to_string(),
        count: runs.len(),
        runs: lines,
        miles: format!("{total_miles:.2}"),
        time: seconds_to_hhmmss(total_seconds),
        pace: seconds_per_mile(total_miles, total_seconds)
            .map(|s| format!("{}/mi", seconds_to_mmss(s)))
            .unwrap_or_else(|| "N/A".to_string()),
    })
}

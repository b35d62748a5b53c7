//! `activities.csv`: one row per archived activity for spreadsheets and
//! plotting.
//!
//! Numbers are rounded to a fixed number of decimals and then written in
//! their shortest form (`3.0`, `8.33`). Zero or missing measurements leave
//! the cell blank. Pace columns are filled for runs only.

use serde::Serialize;
use serde_json::Value;

use stride_sync::ArchivedActivity;

use crate::activity::{activity_type, is_run, start_local};
use crate::error::ReportError;
use crate::units::{meters_to_feet, meters_to_miles, mps_to_mph, pace_mmss, safe_float, safe_int};

const DISTANCE_MI_DECIMALS: usize = 2;
const MINUTES_DECIMALS: usize = 2;
const ELEV_FT_DECIMALS: usize = 0;
const SPEED_MPH_DECIMALS: usize = 2;
const PACE_DECIMALS: usize = 2;

/// One CSV row. Field order is column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityRow {
    pub id: String,
    pub date_local: String,
    pub start_time_local: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub distance_mi: String,
    pub moving_time_min: String,
    pub elapsed_time_min: String,
    pub total_elev_gain_ft: String,
    pub avg_speed_mph: String,
    pub pace_mmss: String,
    pub pace_min_per_mi: String,
    pub name: String,
}

impl ActivityRow {
    /// Column names, written on their own when there are no rows.
    pub const HEADER: [&'static str; 12] = [
        "id",
        "date_local",
        "start_time_local",
        "type",
        "distance_mi",
        "moving_time_min",
        "elapsed_time_min",
        "total_elev_gain_ft",
        "avg_speed_mph",
        "pace_mmss",
        "pace_min_per_mi",
        "name",
    ];

    /// `None` for payloads that are not JSON objects.
    pub fn from_entry(entry: &ArchivedActivity) -> Option<Self> {
        let payload = &entry.payload;
        if !payload.is_object() {
            return None;
        }

        let id = match payload.get("id") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => entry.id.to_string(),
        };
        let start = start_local(payload);

        let miles = meters_to_miles(safe_float(payload.get("distance")));
        let moving = safe_int(payload.get("moving_time")).max(0);
        let elapsed = safe_int(payload.get("elapsed_time")).max(0);
        let elev_ft = meters_to_feet(safe_float(payload.get("total_elevation_gain")));
        let speed_mph = mps_to_mph(safe_float(payload.get("average_speed")));

        let (pace, pace_min) = if is_run(payload) && miles > 0.0 && moving > 0 {
            (
                pace_mmss(miles, moving),
                rounded(moving as f64 / miles / 60.0, PACE_DECIMALS),
            )
        } else {
            (String::new(), String::new())
        };

        Some(Self {
            id,
            date_local: start
                .map(|dt| dt.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            start_time_local: start
                .map(|dt| dt.format("%H:%M:%S").to_string())
                .unwrap_or_default(),
            kind: activity_type(payload),
            distance_mi: rounded(miles, DISTANCE_MI_DECIMALS),
            moving_time_min: rounded(moving as f64 / 60.0, MINUTES_DECIMALS),
            elapsed_time_min: rounded(elapsed as f64 / 60.0, MINUTES_DECIMALS),
            total_elev_gain_ft: rounded(elev_ft, ELEV_FT_DECIMALS),
            avg_speed_mph: rounded(speed_mph, SPEED_MPH_DECIMALS),
            pace_mmss: pace,
            pace_min_per_mi: pace_min,
            name: payload
                .get("name")
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
        })
    }

    fn sort_key(&self) -> (&str, &str, &str) {
        (&self.date_local, &self.start_time_local, &self.id)
    }
}

/// Rows for every object entry, newest first by local date, then start time,
/// then id. All three compare as text.
pub fn activity_rows(entries: &[ArchivedActivity]) -> Vec<ActivityRow> {
    let mut rows: Vec<ActivityRow> = entries.iter().filter_map(ActivityRow::from_entry).collect();
    rows.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
    rows
}

/// The full CSV document (header included) and its row count.
pub fn activities_csv(entries: &[ArchivedActivity]) -> Result<(String, usize), ReportError> {
    let rows = activity_rows(entries);
    let mut writer = csv::Writer::from_writer(Vec::new());
    if rows.is_empty() {
        writer.write_record(ActivityRow::HEADER)?;
    }
    for row in &rows {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ReportError::Csv(e.into_error().into()))?;
    let text = String::from_utf8(bytes).map_err(|e| {
        ReportError::Csv(std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
    })?;
    Ok((text, rows.len()))
}

/// `value` rounded to `decimals` places in shortest form; blank unless
/// positive.
fn rounded(value: f64, decimals: usize) -> String {
    if !value.is_finite() || value <= 0.0 {
        return String::new();
    }
    let fixed = format!("{value:.decimals$}");
    fixed
        .parse::<f64>()
        .map(|v| format!("{v:?}"))
        .unwrap_or(fixed)
}

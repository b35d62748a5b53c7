//! Lenient number extraction and unit conversion for archived payloads.

use serde_json::Value;

pub const METERS_PER_MILE: f64 = 1609.344;
pub const FEET_PER_METER: f64 = 3.280839895;
pub const MPS_TO_MPH: f64 = 2.2369362920544;

/// A float from a JSON number or numeric string; `0.0` for anything else.
pub fn safe_float(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite()).unwrap_or(0.0)
}

/// An integer from a JSON number or numeric string, truncating fractions;
/// `0` for anything else, booleans included.
pub fn safe_int(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map_or(0, |f| f.trunc() as i64),
        _ => 0,
    }
}

pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}

pub fn meters_to_feet(meters: f64) -> f64 {
    meters * FEET_PER_METER
}

pub fn mps_to_mph(mps: f64) -> f64 {
    mps * MPS_TO_MPH
}

/// `m:ss`, or an empty string for non-positive input.
pub fn seconds_to_mmss(seconds: i64) -> String {
    if seconds <= 0 {
        return String::new();
    }
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// `hh:mm:ss`; non-positive input is `00:00:00`.
pub fn seconds_to_hhmmss(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Seconds per mile, rounded half to even.
pub fn seconds_per_mile(miles: f64, seconds: i64) -> Option<i64> {
    if miles <= 0.0 || seconds <= 0 {
        return None;
    }
    Some((seconds as f64 / miles).round_ties_even() as i64)
}

/// Pace per mile as `m:ss`, or an empty string when undefined.
pub fn pace_mmss(miles: f64, seconds: i64) -> String {
    seconds_per_mile(miles, seconds)
        .map(seconds_to_mmss)
        .unwrap_or_default()
}

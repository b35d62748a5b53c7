//! Accessors over raw archived activity payloads.

use chrono::NaiveDateTime;
use serde_json::Value;

use stride_core::types::parse_isoish;

/// Activity types that count as runs.
pub const RUN_TYPES: &[&str] = &["Run", "TrailRun", "VirtualRun"];

/// Unwrap type strings of the form `root='Walk'`; trim everything else.
///
/// `null` and a missing field become the empty string.
pub fn normalize_root_string(value: Option<&Value>) -> String {
    let raw = match value {
        None | Some(Value::Null) => return String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    if let Some(start) = raw.find("root='") {
        let rest = &raw[start + "root='".len()..];
        if let Some(end) = rest.find('\'') {
            if end > 0 {
                return rest[..end].to_string();
            }
        }
    }
    raw.trim().to_string()
}

/// `type`, falling back to `sport_type`.
pub fn activity_type(activity: &Value) -> String {
    let kind = normalize_root_string(activity.get("type"));
    if !kind.is_empty() {
        return kind;
    }
    normalize_root_string(activity.get("sport_type"))
}

pub fn is_run(activity: &Value) -> bool {
    RUN_TYPES.contains(&activity_type(activity).as_str())
}

/// Wall-clock start: `start_date_local`, falling back to `start_date`.
///
/// The time is read in whatever offset the string carries, so a `Z` on
/// `start_date_local` does not shift the local date.
pub fn start_local(activity: &Value) -> Option<NaiveDateTime> {
    ["start_date_local", "start_date"]
        .iter()
        .find_map(|key| activity.get(*key)?.as_str().and_then(parse_isoish))
        .map(|dt| dt.naive_local())
}

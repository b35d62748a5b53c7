//! # stride-report
//!
//! Human-readable logs and a CSV export derived from the activity archive. Read-only with
//! respect to the archive; the sync engine never calls into this crate.
//!
//! - [`activity`]: type, run detection and local start of a raw payload
//! - [`units`]: lenient number extraction, unit conversion, clock formats
//! - [`context`]: template contexts for each report
//! - [`export`]: `activities.csv` rows
//! - [`engine`]: [`ReportRenderer`] and [`ReportKind`]

pub mod activity;
pub mod context;
pub mod engine;
pub mod error;
pub mod export;
pub mod units;

pub use engine::{write_report, ReportKind, ReportRenderer, WrittenReport};
pub use error::ReportError;

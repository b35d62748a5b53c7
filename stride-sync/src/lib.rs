//! # stride-sync
//!
//! The sync engine: an atomic per-activity archive, a lazy paginated lister,
//! a skip-or-fetch decision and the driver loop that ties them together.
//!
//! Call [`driver::run`] with an [`ArchiveStore`], any [`ActivitySource`] and a
//! [`Throttle`]. The returned [`SyncReport`] says how many entries were written
//! and why the run stopped.

pub mod archive;
pub mod decision;
pub mod driver;
pub mod error;
pub mod lister;
pub mod source;
pub mod throttle;

pub use archive::{ArchiveBounds, ArchiveStore, ArchivedActivity, WriteOutcome};
pub use decision::Decision;
pub use driver::{run, StopReason, SyncOptions, SyncReport};
pub use error::SyncError;
pub use source::{ActivitySource, ListQuery, SourceError};
pub use throttle::{SleepThrottle, Throttle};

//! Skip-or-fetch decision.
//!
//! Existence is always checked on the local filesystem before any detail
//! request, so already-archived activities cost zero remote calls.

use stride_core::ActivitySummary;

use crate::archive::ArchiveStore;
use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Skip,
    Fetch,
}

impl Decision {
    /// `Fetch` when forced or not yet archived.
    pub fn from_flags(exists: bool, force: bool) -> Self {
        if force || !exists {
            Decision::Fetch
        } else {
            Decision::Skip
        }
    }
}

/// Decide what to do with `summary` given the current archive contents.
pub fn decide(
    store: &ArchiveStore,
    summary: &ActivitySummary,
    force: bool,
) -> Result<Decision, SyncError> {
    Ok(Decision::from_flags(store.exists(&summary.id)?, force))
}

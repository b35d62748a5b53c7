//! Lazy, page-at-a-time activity listing.
//!
//! [`Listing`] requests one page only when the previous one is drained, so a
//! run that hits its write budget early never pages through the rest of the
//! history. Each call to [`ActivityLister::list`] starts again from page 1.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use stride_core::{ActivitySummary, Direction};

use crate::source::{ActivitySource, ListQuery, SourceError};

/// What the consumer should do with a summary relative to the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryCheck {
    /// Inside the requested window.
    Process,
    /// Outside the window but older items may still follow (backward mode).
    PassOver,
    /// Outside the window and nothing further can qualify (forward mode).
    Stop,
}

/// Apply the directional cursor rule to one summary timestamp.
///
/// Forward keeps only items strictly newer than the boundary and stops at the
/// first one that is not. Backward keeps only items strictly older and passes
/// over the rest. No boundary means everything qualifies.
pub fn check_boundary(
    direction: Direction,
    boundary: Option<DateTime<Utc>>,
    timestamp: DateTime<Utc>,
) -> BoundaryCheck {
    match (direction, boundary) {
        (_, None) => BoundaryCheck::Process,
        (Direction::Forward, Some(b)) if timestamp <= b => BoundaryCheck::Stop,
        (Direction::Backward, Some(b)) if timestamp >= b => BoundaryCheck::PassOver,
        _ => BoundaryCheck::Process,
    }
}

/// Builds [`Listing`]s over a source.
pub struct ActivityLister<'a, S: ActivitySource + ?Sized> {
    source: &'a S,
    per_page: u32,
}

impl<'a, S: ActivitySource + ?Sized> ActivityLister<'a, S> {
    pub fn new(source: &'a S, per_page: u32) -> Self {
        Self {
            source,
            per_page: per_page.max(1),
        }
    }

    /// Fresh listing for `direction`. In backward mode the boundary is passed
    /// to the source as a `before` filter; the consumer still applies
    /// [`check_boundary`] since sources may ignore it.
    pub fn list(&self, direction: Direction, boundary: Option<DateTime<Utc>>) -> Listing<'a, S> {
        let before = match direction {
            Direction::Backward => boundary,
            Direction::Forward => None,
        };
        Listing {
            source: self.source,
            query: ListQuery {
                before,
                per_page: self.per_page,
            },
            next_page: 1,
            buffer: VecDeque::new(),
            finished: false,
        }
    }
}

/// Iterator over summaries, newest first, fetching pages on demand.
///
/// A page error is yielded once and ends the iteration.
pub struct Listing<'a, S: ActivitySource + ?Sized> {
    source: &'a S,
    query: ListQuery,
    next_page: u32,
    buffer: VecDeque<ActivitySummary>,
    finished: bool,
}

impl<'a, S: ActivitySource + ?Sized> Listing<'a, S> {
    /// Pages requested so far.
    pub fn pages_fetched(&self) -> u32 {
        self.next_page - 1
    }
}

impl<'a, S: ActivitySource + ?Sized> Iterator for Listing<'a, S> {
    type Item = Result<ActivitySummary, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(summary) = self.buffer.pop_front() {
            return Some(Ok(summary));
        }
        if self.finished {
            return None;
        }

        let page = self.next_page;
        self.next_page += 1;
        match self.source.list_page(&self.query, page) {
            Ok(items) => {
                tracing::debug!(page, count = items.len(), "listed page");
                if items.len() < self.query.per_page as usize {
                    self.finished = true;
                }
                self.buffer.extend(items);
                self.buffer.pop_front().map(Ok)
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

//! Backends the gateway talks to.
//!
//! Handlers only see the traits below, so tests can swap in fakes.

use crate::models::error::Result;
use crate::models::log_event::EventFields;
use crate::models::log_record::RecentRows;
use crate::models::queue_entry::{EntryId, QueueEntry};
use std::time::Instant;

pub mod queue;
pub mod sqlite;
pub mod store;

/// Append-only, ordered log of admitted events
pub trait EventQueue: Send + Sync {
    /// Append one entry and return the id the queue assigned to it.
    ///
    /// Nothing may be left in the queue when this returns an error. Once
    /// `deadline` passes the append must be abandoned and
    /// `DeadlineExceeded` returned.
    fn append(&self, stream: &str, fields: &EventFields, deadline: Instant) -> Result<EntryId>;

    /// Number of entries currently retained for `stream`.
    fn len(&self, stream: &str) -> Result<u64>;

    /// Up to `count` entries newer than `after`, oldest first.
    fn read_after(
        &self,
        stream: &str,
        after: Option<EntryId>,
        count: usize,
    ) -> Result<Vec<QueueEntry>>;
}

/// Read side of the processed-log store
pub trait LogStore: Send + Sync {
    /// Newest rows first, at most `limit`. Rows that fail to decode are
    /// left out and counted in `RecentRows::skipped`.
    fn recent(&self, limit: usize) -> Result<RecentRows>;
}

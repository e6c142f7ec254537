use crate::models::log_event::{EventFields, LogEvent};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Queue-assigned entry identifier, rendered as `<millis>-<seq>`.
///
/// Ordering is by millisecond first and sequence second, so ids compare the
/// same way they were handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId {
    pub ms: u64,
    pub seq: u64,
}

impl EntryId {
    pub fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }

    /// Next id for a stream whose newest id is `last`, given the current
    /// wall clock. A clock that stands still or steps back keeps the last
    /// millisecond and bumps the sequence.
    pub fn next_after(last: Option<EntryId>, now_ms: u64) -> Self {
        match last {
            Some(last) if now_ms <= last.ms => Self::new(last.ms, last.seq + 1),
            _ => Self::new(now_ms, 0),
        }
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEntryIdError(String);

impl fmt::Display for ParseEntryIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid entry id '{}'", self.0)
    }
}

impl std::error::Error for ParseEntryIdError {}

impl FromStr for EntryId {
    type Err = ParseEntryIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseEntryIdError(s.to_string());
        let (ms, seq) = s.split_once('-').ok_or_else(invalid)?;
        Ok(Self {
            ms: ms.parse().map_err(|_| invalid())?,
            seq: seq.parse().map_err(|_| invalid())?,
        })
    }
}

impl Serialize for EntryId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// An admitted event as the queue holds it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueEntry {
    pub id: EntryId,
    pub fields: EventFields,
}

impl QueueEntry {
    pub fn event(&self) -> LogEvent {
        LogEvent::from_fields(&self.fields)
    }

    pub fn admitted_at(&self) -> Option<i64> {
        LogEvent::admitted_at(&self.fields)
    }
}

use crate::models::queue_entry::EntryId;
use serde::{Deserialize, Serialize};

/// Status reported for every acknowledged ingest
pub const QUEUED_STATUS: &str = "queued";

/// Response for POST /ingest
#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    pub id: EntryId,
}

impl IngestResponse {
    pub fn queued(id: EntryId) -> Self {
        Self {
            status: QUEUED_STATUS,
            id,
        }
    }
}

/// Generic API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Counters exposed on GET /stats
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatsResponse {
    /// Events acknowledged as queued
    pub ingested: u64,

    /// Payloads rejected as malformed
    pub rejected: u64,

    /// Appends that failed or timed out
    pub queue_failures: u64,

    /// Recent-logs queries that failed or timed out
    pub store_failures: u64,

    /// Store rows dropped from responses because they could not be decoded
    pub skipped_rows: u64,

    /// Entries currently held in the stream, absent when the queue cannot be reached
    pub queue_length: Option<u64>,
}

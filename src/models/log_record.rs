use crate::models::log_event::LogEvent;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A processed row as read back from the store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub id: i64,
    pub log_id: String,
    #[serde(flatten)]
    pub event: LogEvent,
    pub is_anomaly: bool,
    pub created_at: DateTime<Utc>,
}

/// A row as the downstream consumer writes it
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct ProcessedLog {
    pub log_id: String,
    pub event: LogEvent,
    pub is_anomaly: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct RecentRows {
    pub records: Vec<LogRecord>,
    pub skipped: usize,
}

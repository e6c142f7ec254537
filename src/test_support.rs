//! Fakes and fixtures shared by the unit tests.

use crate::api_state::AppState;
use crate::models::config::Config;
use crate::models::error::{GatewayError, Result};
use crate::models::log_event::{EventFields, LogEvent};
use crate::models::log_record::{LogRecord, RecentRows};
use crate::models::queue_entry::{EntryId, QueueEntry};
use crate::repo::queue::SqliteQueue;
use crate::repo::sqlite::open_pool;
use crate::repo::store::SqliteLogStore;
use crate::repo::{EventQueue, LogStore};
use crate::utils::backend_call::time_left;
use chrono::DateTime;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;

pub fn fake_state(queue: Arc<dyn EventQueue>, store: Arc<dyn LogStore>) -> AppState {
    AppState::new(queue, store, &Config::default())
}

/// SQLite queue and store living in `temp_dir`
pub fn sqlite_backends(temp_dir: &TempDir) -> (Arc<SqliteQueue>, Arc<SqliteLogStore>) {
    let queue_path = temp_dir.path().join("queue.db");
    let store_path = temp_dir.path().join("logs.db");
    let timeout = Duration::from_secs(5);

    let queue_pool = open_pool(queue_path.to_str().unwrap(), timeout).unwrap();
    let store_pool = open_pool(store_path.to_str().unwrap(), timeout).unwrap();
    let queue = SqliteQueue::new(queue_pool).unwrap();
    let store = SqliteLogStore::new(store_pool).unwrap();
    (Arc::new(queue), Arc::new(store))
}

/// A deadline no test append will reach
pub fn generous_deadline() -> Instant {
    Instant::now() + Duration::from_secs(30)
}

pub fn record(id: i64, created_secs: i64) -> LogRecord {
    LogRecord {
        id,
        log_id: format!("{}-0", created_secs * 1000),
        event: LogEvent {
            service: "shipping-worker".to_string(),
            level: "info".to_string(),
            message: format!("shipment {}", id),
        },
        is_anomaly: false,
        created_at: DateTime::from_timestamp(created_secs, 0).unwrap(),
    }
}

/// The error a SQLite backend reports when its file cannot be opened
pub fn unreachable_backend(operation: &str) -> GatewayError {
    GatewayError::DatabaseQuery {
        operation: operation.to_string(),
        cause: rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
            Some("unable to open database file".to_string()),
        ),
    }
}

/// In-memory queue that remembers every append
#[derive(Default)]
pub struct FakeQueue {
    entries: Mutex<Vec<(String, EntryId, EventFields)>>,
}

impl FakeQueue {
    pub fn appended(&self) -> Vec<(String, EntryId, EventFields)> {
        self.entries.lock().unwrap().clone()
    }
}

impl EventQueue for FakeQueue {
    fn append(&self, stream: &str, fields: &EventFields, _deadline: Instant) -> Result<EntryId> {
        let mut entries = self.entries.lock().unwrap();
        let id = EntryId::new(1, entries.len() as u64);
        entries.push((stream.to_string(), id, fields.clone()));
        Ok(id)
    }

    fn len(&self, stream: &str) -> Result<u64> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.iter().filter(|(s, _, _)| s == stream).count() as u64)
    }

    fn read_after(
        &self,
        stream: &str,
        after: Option<EntryId>,
        count: usize,
    ) -> Result<Vec<QueueEntry>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .iter()
            .filter(|(s, id, _)| s == stream && after.map_or(true, |after| *id > after))
            .take(count)
            .map(|(_, id, fields)| QueueEntry {
                id: *id,
                fields: fields.clone(),
            })
            .collect())
    }
}

/// Queue whose backend is unreachable
pub struct UnavailableQueue;

impl EventQueue for UnavailableQueue {
    fn append(&self, _stream: &str, _fields: &EventFields, _deadline: Instant) -> Result<EntryId> {
        Err(unreachable_backend("append"))
    }

    fn len(&self, _stream: &str) -> Result<u64> {
        Err(unreachable_backend("count stream entries"))
    }

    fn read_after(
        &self,
        _stream: &str,
        _after: Option<EntryId>,
        _count: usize,
    ) -> Result<Vec<QueueEntry>> {
        Err(unreachable_backend("read stream entries"))
    }
}

/// Queue whose backend stalls for `delay` before every append
pub struct DelayedQueue {
    pub inner: Arc<dyn EventQueue>,
    pub delay: Duration,
}

impl EventQueue for DelayedQueue {
    fn append(&self, stream: &str, fields: &EventFields, deadline: Instant) -> Result<EntryId> {
        std::thread::sleep(self.delay);
        self.inner.append(stream, fields, deadline)
    }

    fn len(&self, stream: &str) -> Result<u64> {
        self.inner.len(stream)
    }

    fn read_after(
        &self,
        stream: &str,
        after: Option<EntryId>,
        count: usize,
    ) -> Result<Vec<QueueEntry>> {
        self.inner.read_after(stream, after, count)
    }
}

/// In-memory queue that stalls for `delay` and honours the deadline
pub fn slow_queue(delay: Duration) -> DelayedQueue {
    DelayedQueue {
        inner: Arc::new(DeadlineQueue::default()),
        delay,
    }
}

/// `FakeQueue` that refuses appends once their deadline has passed
#[derive(Default)]
pub struct DeadlineQueue(pub FakeQueue);

impl EventQueue for DeadlineQueue {
    fn append(&self, stream: &str, fields: &EventFields, deadline: Instant) -> Result<EntryId> {
        time_left("append", deadline)?;
        self.0.append(stream, fields, deadline)
    }

    fn len(&self, stream: &str) -> Result<u64> {
        self.0.len(stream)
    }

    fn read_after(
        &self,
        stream: &str,
        after: Option<EntryId>,
        count: usize,
    ) -> Result<Vec<QueueEntry>> {
        self.0.read_after(stream, after, count)
    }
}

/// Store that serves a fixed set of rows
#[derive(Default)]
pub struct FakeStore {
    records: Vec<LogRecord>,
    skipped: usize,
    limits: Mutex<Vec<usize>>,
}

impl FakeStore {
    pub fn with_records(records: Vec<LogRecord>, skipped: usize) -> Self {
        Self {
            records,
            skipped,
            limits: Mutex::new(Vec::new()),
        }
    }

    pub fn requested_limits(&self) -> Vec<usize> {
        self.limits.lock().unwrap().clone()
    }
}

impl LogStore for FakeStore {
    fn recent(&self, limit: usize) -> Result<RecentRows> {
        self.limits.lock().unwrap().push(limit);
        Ok(RecentRows {
            records: self.records.clone(),
            skipped: self.skipped,
        })
    }
}

/// Store whose query always fails
pub struct UnavailableStore;

impl LogStore for UnavailableStore {
    fn recent(&self, _limit: usize) -> Result<RecentRows> {
        Err(unreachable_backend("query recent logs"))
    }
}

/// Store whose query stalls for the given duration
pub struct SlowStore(pub Duration);

impl LogStore for SlowStore {
    fn recent(&self, _limit: usize) -> Result<RecentRows> {
        std::thread::sleep(self.0);
        Ok(RecentRows::default())
    }
}

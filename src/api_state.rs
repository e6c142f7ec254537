use crate::models::api::StatsResponse;
use crate::models::config::Config;
use crate::repo::{EventQueue, LogStore};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared application state
///
/// Built once at startup and handed to Rocket as managed state. Cloning is
/// cheap; all clones share the same backends and counters.
#[derive(Clone)]
pub struct AppState {
    /// Durable queue that ingested events are appended to
    queue: Arc<dyn EventQueue>,

    /// Store of processed rows read by the dashboard
    store: Arc<dyn LogStore>,

    /// Stream name appends go to
    stream: Arc<str>,

    /// Upper bound for any single backend call
    backend_timeout: Duration,

    /// Largest request body accepted by /ingest
    max_body_bytes: u64,

    /// Request counters
    stats: Arc<GatewayStats>,
}

impl AppState {
    pub fn new(queue: Arc<dyn EventQueue>, store: Arc<dyn LogStore>, config: &Config) -> Self {
        Self {
            queue,
            store,
            stream: Arc::from(config.stream.as_str()),
            backend_timeout: config.backend_timeout(),
            max_body_bytes: config.max_body_bytes,
            stats: Arc::new(GatewayStats::default()),
        }
    }

    pub fn queue(&self) -> Arc<dyn EventQueue> {
        Arc::clone(&self.queue)
    }

    pub fn store(&self) -> Arc<dyn LogStore> {
        Arc::clone(&self.store)
    }

    pub fn stream(&self) -> Arc<str> {
        Arc::clone(&self.stream)
    }

    pub fn backend_timeout(&self) -> Duration {
        self.backend_timeout
    }

    pub fn max_body_bytes(&self) -> u64 {
        self.max_body_bytes
    }

    pub fn stats(&self) -> &GatewayStats {
        &self.stats
    }
}

/// Counters for what the gateway accepted, rejected and dropped
#[derive(Debug, Default)]
pub struct GatewayStats {
    ingested: AtomicU64,
    rejected: AtomicU64,
    queue_failures: AtomicU64,
    store_failures: AtomicU64,
    skipped_rows: AtomicU64,
}

impl GatewayStats {
    pub fn record_ingested(&self) {
        self.ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_queue_failure(&self) {
        self.queue_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped_rows(&self, count: usize) {
        self.skipped_rows.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsResponse {
        StatsResponse {
            ingested: self.ingested.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            queue_failures: self.queue_failures.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            skipped_rows: self.skipped_rows.load(Ordering::Relaxed),
            queue_length: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_recorded_counts() {
        let stats = GatewayStats::default();
        stats.record_ingested();
        stats.record_ingested();
        stats.record_rejected();
        stats.record_queue_failure();
        stats.record_skipped_rows(3);

        assert_eq!(
            stats.snapshot(),
            StatsResponse {
                ingested: 2,
                rejected: 1,
                queue_failures: 1,
                store_failures: 0,
                skipped_rows: 3,
                queue_length: None,
            }
        );
    }
}

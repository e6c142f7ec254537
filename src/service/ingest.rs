use crate::api_state::AppState;
use crate::models::error::{GatewayError, Result};
use crate::models::log_event::LogEvent;
use crate::models::queue_entry::EntryId;
use crate::utils::backend_call::call_before_deadline;
use chrono::Utc;
use log::{debug, error};
use std::time::Instant;

/// Parse a raw request body and append it to the queue.
///
/// A body that does not parse never reaches the queue. A parsed event is
/// appended exactly once; failures are not retried.
pub async fn ingest(state: &AppState, raw_body: &[u8]) -> Result<EntryId> {
    let event = LogEvent::from_json_slice(raw_body)
        .map_err(|cause| reject(state, cause.to_string()))?;
    admit(state, event).await
}

/// Append an already parsed event, stamped with the current wall clock.
///
/// The queue is given `backend_timeout` to finish. An append that misses it
/// is rolled back by the queue, so an error here always means nothing was
/// queued.
pub async fn admit(state: &AppState, event: LogEvent) -> Result<EntryId> {
    let fields = event.to_fields(Utc::now().timestamp());
    let queue = state.queue();
    let stream = state.stream();
    let deadline = Instant::now() + state.backend_timeout();

    let appended = call_before_deadline("queue append", move || {
        queue.append(&stream, &fields, deadline)
    })
    .await;

    match appended {
        Ok(id) => {
            state.stats().record_ingested();
            debug!("Queued {} event from '{}' as {}", event.level, event.service, id);
            Ok(id)
        }
        Err(cause) => {
            state.stats().record_queue_failure();
            error!("Queue append failed: {}", cause);
            Err(GatewayError::QueueUnavailable(cause.to_string()))
        }
    }
}

/// Count and log a payload that will not be queued.
pub fn reject(state: &AppState, reason: String) -> GatewayError {
    state.stats().record_rejected();
    debug!("Rejected ingest payload: {}", reason);
    GatewayError::MalformedInput(reason)
}

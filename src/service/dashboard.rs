use crate::api_state::AppState;
use crate::models::error::{GatewayError, Result};
use crate::models::log_record::LogRecord;
use crate::utils::backend_call::call_with_timeout;
use log::{error, warn};

/// Rows served to the dashboard per request
pub const RECENT_LOGS_LIMIT: usize = 50;

/// The newest processed rows, newest first.
///
/// Rows that fail to decode are dropped from the response; the drop is
/// logged and counted rather than failing the whole request.
pub async fn recent_logs(state: &AppState) -> Result<Vec<LogRecord>> {
    let store = state.store();

    let recent = call_with_timeout("recent logs query", state.backend_timeout(), move || {
        store.recent(RECENT_LOGS_LIMIT)
    })
    .await
    .map_err(|cause| {
        state.stats().record_store_failure();
        error!("Query Error: {}", cause);
        GatewayError::StoreUnavailable(cause.to_string())
    })?;

    if recent.skipped > 0 {
        warn!(
            "Dropped {} undecodable log rows from the recent logs response",
            recent.skipped
        );
        state.stats().record_skipped_rows(recent.skipped);
    }

    let mut records = recent.records;
    records.truncate(RECENT_LOGS_LIMIT);
    Ok(records)
}

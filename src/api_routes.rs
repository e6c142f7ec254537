use crate::api_state::AppState;
use crate::models::api::{IngestResponse, StatsResponse};
use crate::models::error::GatewayError;
use crate::models::log_record::LogRecord;
use crate::service::{dashboard, ingest};
use crate::utils::backend_call::call_with_timeout;
use log::warn;
use rocket::data::{Data, ToByteUnit};
use rocket::serde::json::Json;
use rocket::State;

/// POST /ingest - Queue a log event
#[post("/ingest", data = "<body>")]
pub async fn ingest_event(
    body: Data<'_>,
    state: &State<AppState>,
) -> Result<Json<IngestResponse>, GatewayError> {
    let limit = state.max_body_bytes();
    let raw_body = match body.open(limit.bytes()).into_bytes().await {
        Ok(capped) if capped.is_complete() => capped.into_inner(),
        Ok(_) => {
            return Err(ingest::reject(
                state,
                format!("request body exceeds {} bytes", limit),
            ))
        }
        Err(e) => {
            return Err(ingest::reject(
                state,
                format!("failed to read request body: {}", e),
            ))
        }
    };

    let id = ingest::ingest(state, &raw_body).await?;
    Ok(Json(IngestResponse::queued(id)))
}

/// GET /logs - Most recent processed logs, newest first
#[get("/logs")]
pub async fn recent_logs(
    state: &State<AppState>,
) -> Result<Json<Vec<LogRecord>>, GatewayError> {
    dashboard::recent_logs(state).await.map(Json)
}

/// GET /stats - Gateway counters and current queue depth
#[get("/stats")]
pub async fn gateway_stats(state: &State<AppState>) -> Json<StatsResponse> {
    let queue = state.queue();
    let stream = state.stream();
    let queue_length =
        match call_with_timeout("count stream entries", state.backend_timeout(), move || {
            queue.len(&stream)
        })
        .await
        {
            Ok(length) => Some(length),
            Err(e) => {
                warn!("Could not read queue length: {}", e);
                None
            }
        };

    let mut stats = state.stats().snapshot();
    stats.queue_length = queue_length;
    Json(stats)
}

/// GET /health - Health check endpoint
#[get("/health")]
pub fn health_check() -> &'static str {
    "OK"
}

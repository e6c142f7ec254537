use crate::models::api::ErrorResponse;
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Body returned for any payload that does not parse into a log event.
pub const MALFORMED_INPUT_MESSAGE: &str = "Invalid JSON";

/// Body returned when the queue rejects an append. Kept identical to the
/// message existing dashboard clients already match on.
pub const QUEUE_UNAVAILABLE_MESSAGE: &str = "Redis unavailable";

/// Body returned when the recent-logs query cannot run.
pub const STORE_UNAVAILABLE_MESSAGE: &str = "DB Query failed";

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Failed to read config file '{path}': {cause}")]
    ConfigRead { path: PathBuf, cause: io::Error },

    #[error("Failed to parse config file '{path}': {cause}")]
    ConfigParse {
        path: PathBuf,
        cause: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to open database '{path}': {cause}")]
    DatabaseConnection { path: String, cause: r2d2::Error },

    #[error("Failed to get database connection from pool: {0}")]
    DatabasePool(#[from] r2d2::Error),

    #[error("Database query failed for '{operation}': {cause}")]
    DatabaseQuery {
        operation: String,
        cause: rusqlite::Error,
    },

    #[error("Failed to encode fields for stream '{stream}': {cause}")]
    FieldEncoding {
        stream: String,
        cause: serde_json::Error,
    },

    #[error("'{operation}' did not finish within {after:?}")]
    BackendTimeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("'{operation}' passed its deadline and was abandoned")]
    DeadlineExceeded { operation: &'static str },

    #[error("'{operation}' task failed: {cause}")]
    BackendTask {
        operation: &'static str,
        cause: String,
    },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Queue unavailable: {0}")]
    QueueUnavailable(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl GatewayError {
    pub fn status(&self) -> Status {
        match self {
            GatewayError::MalformedInput(_) => Status::BadRequest,
            _ => Status::InternalServerError,
        }
    }

    /// Message exposed to HTTP callers. Internal details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            GatewayError::MalformedInput(_) => MALFORMED_INPUT_MESSAGE,
            GatewayError::QueueUnavailable(_) => QUEUE_UNAVAILABLE_MESSAGE,
            GatewayError::StoreUnavailable(_) => STORE_UNAVAILABLE_MESSAGE,
            _ => "Internal server error",
        }
    }
}

impl<'r> Responder<'r, 'static> for GatewayError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let body = Json(ErrorResponse {
            error: self.public_message().to_string(),
        });
        (self.status(), body).respond_to(request)
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

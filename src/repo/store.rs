use crate::models::error::{GatewayError, Result};
use crate::models::log_event::LogEvent;
use crate::models::log_record::{LogRecord, RecentRows};
use crate::repo::sqlite::{execute_schema, DbPool};
use crate::repo::LogStore;
use chrono::DateTime;
use log::{info, warn};
use rusqlite::types::{FromSqlError, Type};
use rusqlite::Row;

const STORE_SCHEMA: &str = "BEGIN;
    PRAGMA ENCODING = 'UTF-8';

    CREATE TABLE IF NOT EXISTS Logs(
        ID            integer not null
            constraint Logs_ID_pk
                primary key autoincrement,
        Log_ID        TEXT    not null,
        Service       TEXT,
        Level         TEXT,
        Message       TEXT,
        Is_Anomaly    integer not null default 0,
        Created_At    integer not null);

    CREATE INDEX IF NOT EXISTS Logs_Created_At_index
            on Logs (Created_At DESC, ID DESC);

    COMMIT;";

const CREATED_AT_COLUMN: usize = 6;

/// Processed-log table, written by the downstream consumer and read by the
/// dashboard.
pub struct SqliteLogStore {
    pool: DbPool,
}

impl SqliteLogStore {
    pub fn new(pool: DbPool) -> Result<Self> {
        info!("Initializing log store schema");
        execute_schema(&pool, "create log tables", STORE_SCHEMA)?;
        Ok(Self { pool })
    }

    /// Write one processed row the way the downstream consumer does. The
    /// gateway itself never writes the store.
    #[cfg(test)]
    pub fn insert_record(
        &self,
        record: &crate::models::log_record::ProcessedLog,
    ) -> Result<i64> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO Logs (Log_ID, Service, Level, Message, Is_Anomaly, Created_At)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                &record.log_id,
                &record.event.service,
                &record.event.level,
                &record.event.message,
                record.is_anomaly,
                record.created_at.timestamp(),
            ),
        )
        .map_err(|cause| GatewayError::DatabaseQuery {
            operation: "insert log record".to_string(),
            cause,
        })?;
        Ok(conn.last_insert_rowid())
    }
}

fn decode_log_record(row: &Row<'_>) -> rusqlite::Result<LogRecord> {
    let created_secs: i64 = row.get(CREATED_AT_COLUMN)?;
    let created_at = DateTime::from_timestamp(created_secs, 0).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            CREATED_AT_COLUMN,
            Type::Integer,
            Box::new(FromSqlError::OutOfRange(created_secs)),
        )
    })?;

    Ok(LogRecord {
        id: row.get(0)?,
        log_id: row.get(1)?,
        event: LogEvent {
            service: row.get(2)?,
            level: row.get(3)?,
            message: row.get(4)?,
        },
        is_anomaly: row.get(5)?,
        created_at,
    })
}

impl LogStore for SqliteLogStore {
    fn recent(&self, limit: usize) -> Result<RecentRows> {
        let query_error = |cause| GatewayError::DatabaseQuery {
            operation: "query recent logs".to_string(),
            cause,
        };

        let conn = self.pool.get()?;
        let mut stmt = conn
            .prepare(
                "SELECT ID, Log_ID, Service, Level, Message, Is_Anomaly, Created_At
                    FROM Logs
                    ORDER BY Created_At DESC, ID DESC
                    LIMIT ?1",
            )
            .map_err(query_error)?;

        let mut rows = stmt.query([limit as i64]).map_err(query_error)?;

        let mut recent = RecentRows::default();
        while let Some(row) = rows.next().map_err(query_error)? {
            match decode_log_record(row) {
                Ok(record) => recent.records.push(record),
                Err(cause) => {
                    let id: Option<i64> = row.get(0).ok();
                    warn!("Skipping undecodable log row {:?}: {}", id, cause);
                    recent.skipped += 1;
                }
            }
        }

        Ok(recent)
    }
}

use crate::models::error::{GatewayError, Result};
use crate::models::log_event::EventFields;
use crate::models::queue_entry::{EntryId, QueueEntry};
use crate::repo::sqlite::{execute_schema, DbPool};
use crate::repo::EventQueue;
use crate::utils::backend_call::time_left;
use chrono::Utc;
use log::{debug, info};
use rusqlite::{OptionalExtension, TransactionBehavior};
use std::time::Instant;

const APPEND: &str = "queue append";

const QUEUE_SCHEMA: &str = "BEGIN;
    PRAGMA ENCODING = 'UTF-8';

    CREATE TABLE IF NOT EXISTS Streams(
        Name          TEXT    not null
            constraint Streams_Name_pk
                primary key,
        Last_Ms       integer not null,
        Last_Seq      integer not null);

    CREATE TABLE IF NOT EXISTS Stream_Entries(
        Stream        TEXT    not null
            constraint Stream_Entries_Streams_Name_fk
                references Streams,
        Ms            integer not null,
        Seq           integer not null,
        Fields        TEXT    not null,
        constraint Stream_Entries_pk
            primary key (Stream, Ms, Seq));

    COMMIT;";

/// Durable queue kept in SQLite, one row per entry.
///
/// The newest id handed out per stream lives in `Streams`, so ids never
/// repeat even after entries are removed.
pub struct SqliteQueue {
    pool: DbPool,
}

impl SqliteQueue {
    pub fn new(pool: DbPool) -> Result<Self> {
        info!("Initializing queue schema");
        execute_schema(&pool, "create queue tables", QUEUE_SCHEMA)?;
        Ok(Self { pool })
    }
}

fn query_error(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> GatewayError {
    move |cause| GatewayError::DatabaseQuery {
        operation: operation.to_string(),
        cause,
    }
}

impl EventQueue for SqliteQueue {
    fn append(&self, stream: &str, fields: &EventFields, deadline: Instant) -> Result<EntryId> {
        let encoded = serde_json::to_string(fields).map_err(|cause| GatewayError::FieldEncoding {
            stream: stream.to_string(),
            cause,
        })?;

        // Checkout and lock waits share what is left of the caller's budget.
        let mut conn = self.pool.get_timeout(time_left(APPEND, deadline)?)?;
        conn.busy_timeout(time_left(APPEND, deadline)?)
            .map_err(query_error("set busy timeout"))?;

        // IMMEDIATE takes the write lock up front, so concurrent appends are
        // serialized before the last id is read.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(query_error("begin append"))?;

        let last = tx
            .query_row(
                "SELECT Last_Ms, Last_Seq FROM Streams WHERE Name=?1",
                [stream],
                |row| {
                    Ok(EntryId::new(
                        row.get::<_, i64>(0)? as u64,
                        row.get::<_, i64>(1)? as u64,
                    ))
                },
            )
            .optional()
            .map_err(query_error("select last entry id"))?;

        let id = EntryId::next_after(last, Utc::now().timestamp_millis().max(0) as u64);

        tx.execute(
            "INSERT INTO Streams (Name, Last_Ms, Last_Seq)
                VALUES (?1, ?2, ?3)
                ON CONFLICT (Name) DO UPDATE SET
                Last_Ms=excluded.Last_Ms,
                Last_Seq=excluded.Last_Seq;",
            (stream, id.ms as i64, id.seq as i64),
        )
        .map_err(query_error("update last entry id"))?;

        tx.execute(
            "INSERT INTO Stream_Entries (Stream, Ms, Seq, Fields) VALUES (?1, ?2, ?3, ?4)",
            (stream, id.ms as i64, id.seq as i64, &encoded),
        )
        .map_err(query_error("insert stream entry"))?;

        if let Err(expired) = time_left(APPEND, deadline) {
            tx.rollback().map_err(query_error("roll back append"))?;
            debug!("Rolled back entry {} on stream {}: deadline passed", id, stream);
            return Err(expired);
        }
        tx.commit().map_err(query_error("commit append"))?;

        debug!("Appended entry {} to stream {}", id, stream);
        Ok(id)
    }

    fn len(&self, stream: &str) -> Result<u64> {
        let conn = self.pool.get()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM Stream_Entries WHERE Stream=?1",
                [stream],
                |row| row.get(0),
            )
            .map_err(query_error("count stream entries"))?;
        Ok(count as u64)
    }

    fn read_after(
        &self,
        stream: &str,
        after: Option<EntryId>,
        count: usize,
    ) -> Result<Vec<QueueEntry>> {
        let after = after.unwrap_or(EntryId::new(0, 0));
        let conn = self.pool.get()?;
        let mut stmt = conn
            .prepare(
                "SELECT Ms, Seq, Fields
                    FROM Stream_Entries
                    WHERE Stream=?1
                        AND (Ms > ?2 OR (Ms = ?2 AND Seq > ?3))
                    ORDER BY Ms, Seq
                    LIMIT ?4",
            )
            .map_err(query_error("read stream entries"))?;

        let rows = stmt
            .query_map(
                (stream, after.ms as i64, after.seq as i64, count as i64),
                |row| {
                    let id = EntryId::new(
                        row.get::<_, i64>(0)? as u64,
                        row.get::<_, i64>(1)? as u64,
                    );
                    let fields: String = row.get(2)?;
                    Ok((id, fields))
                },
            )
            .map_err(query_error("read stream entries"))?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, fields) = row.map_err(query_error("read stream entry"))?;
            let fields = serde_json::from_str(&fields).map_err(|cause| GatewayError::FieldEncoding {
                stream: stream.to_string(),
                cause,
            })?;
            entries.push(QueueEntry { id, fields });
        }
        Ok(entries)
    }
}

use crate::models::config::is_in_memory;
use crate::models::error::{GatewayError, Result};
use log::info;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::time::Duration;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Build a connection pool for `db_file` with the pragmas every backend uses.
///
/// `busy_timeout` bounds both SQLite lock waits and pool checkout.
pub fn open_pool(db_file: &str, busy_timeout: Duration) -> Result<DbPool> {
    if db_file.is_empty() {
        return Err(GatewayError::InvalidConfig(
            "Database file path cannot be empty. Use ':memory:' for an in-memory database."
                .to_string(),
        ));
    }

    info!("Initializing database connection pool: {}", db_file);

    let in_memory = is_in_memory(db_file);
    let busy_ms = busy_timeout.as_millis();

    let manager = SqliteConnectionManager::file(db_file).with_init(move |conn| {
        let mut pragmas = format!(
            "PRAGMA busy_timeout = {};
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;",
            busy_ms
        );

        if !in_memory {
            pragmas.push_str(" PRAGMA journal_mode = WAL;");
        }

        conn.execute_batch(&pragmas)
    });

    // Every connection to a plain ":memory:" path is its own database, so
    // those pools are pinned to a single connection.
    let pool_size = if in_memory {
        1
    } else {
        num_cpus::get_physical() + 7
    };

    let pool = Pool::builder()
        .max_size(pool_size as u32)
        .connection_timeout(busy_timeout)
        .build(manager)
        .map_err(|cause| GatewayError::DatabaseConnection {
            path: db_file.to_string(),
            cause,
        })?;

    info!("Database pool for {} created with {} connections", db_file, pool_size);
    Ok(pool)
}

pub fn execute_schema(pool: &DbPool, operation: &str, schema: &str) -> Result<()> {
    let conn = pool.get()?;
    conn.execute_batch(schema)
        .map_err(|cause| GatewayError::DatabaseQuery {
            operation: operation.to_string(),
            cause,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rejects_empty_path() {
        assert!(matches!(
            open_pool("", Duration::from_secs(1)),
            Err(GatewayError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_in_memory_pool_shares_one_database() {
        let pool = open_pool(":memory:", Duration::from_secs(1)).unwrap();
        assert_eq!(pool.max_size(), 1);

        execute_schema(&pool, "create table", "CREATE TABLE Scratch(Value integer);").unwrap();
        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM Scratch", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_file_pool_uses_wal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("scratch.db");
        let pool = open_pool(path.to_str().unwrap(), Duration::from_secs(1)).unwrap();

        let conn = pool.get().unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn test_unopenable_path_is_connection_error() {
        let result = open_pool("/this/does/not/exist/scratch.db", Duration::from_millis(200));
        assert!(matches!(result, Err(GatewayError::DatabaseConnection { .. })));
    }
}

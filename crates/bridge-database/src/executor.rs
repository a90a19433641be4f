//! Async SQLite executor on a dedicated background thread.
//!
//! Every statement runs on one thread owned by `tokio_rusqlite`; callers await
//! the result without blocking a runtime worker. Calls execute in FIFO order.
//!
//! Only SQL and row mapping belong inside `call()`. File I/O, network calls
//! and locking stay outside, or they stall every queued query.

use crate::{migrations, DatabaseError, DatabaseResult};
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::debug;

fn from_tokio_rusqlite(e: tokio_rusqlite::Error) -> DatabaseError {
    match e {
        tokio_rusqlite::Error::Rusqlite(e) => DatabaseError::Sqlite(e),
        tokio_rusqlite::Error::Close(_) => {
            DatabaseError::Connection("connection closed".to_string())
        }
        other => DatabaseError::Connection(other.to_string()),
    }
}

/// Handle to the executor thread. Clones share the same connection.
#[derive(Clone)]
pub struct AsyncDatabase {
    conn: Connection,
}

impl AsyncDatabase {
    /// Open the database file with durable pragmas and run migrations.
    pub async fn open(path: &Path) -> DatabaseResult<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        let db = Self { conn };

        // FULL sync so a committed enqueue survives power loss, not just a crash.
        db.call(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = FULL;
                PRAGMA busy_timeout = 5000;
                ",
            )?;
            Ok(())
        })
        .await?;

        db.call(|conn| migrations::run_migrations(conn)).await?;
        debug!(path = %path.display(), "Executor thread ready");
        Ok(db)
    }

    /// In-memory database for tests.
    pub async fn open_in_memory() -> DatabaseResult<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        let db = Self { conn };
        db.call(|conn| migrations::run_migrations(conn)).await?;
        Ok(db)
    }

    /// Run `f` on the executor thread and await its result.
    pub async fn call<F, T>(&self, f: F) -> DatabaseResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> DatabaseResult<T> + Send + 'static,
        T: Send + 'static,
    {
        // Our own result rides inside tokio_rusqlite's Ok so both error
        // types survive the channel hop.
        match self.conn.call(move |conn| Ok(f(conn))).await {
            Ok(inner) => inner,
            Err(e) => Err(from_tokio_rusqlite(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_applies_pragmas_and_schema() {
        let dir = tempdir().unwrap();
        let db = AsyncDatabase::open(&dir.path().join("queue.db")).await.unwrap();

        let (mode, sync): (String, i64) = db
            .call(|conn| {
                let mode = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
                let sync = conn.query_row("PRAGMA synchronous", [], |row| row.get(0))?;
                Ok((mode, sync))
            })
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        // FULL
        assert_eq!(sync, 2);

        let tables: i64 = db
            .call(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE name = 'event_queue'",
                    [],
                    |row| row.get(0),
                )
                .map_err(DatabaseError::from)
            })
            .await
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[tokio::test]
    async fn test_call_propagates_sqlite_errors() {
        let db = AsyncDatabase::open_in_memory().await.unwrap();
        let result = db
            .call(|conn| {
                conn.execute("INSERT INTO missing_table (x) VALUES (1)", [])?;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(DatabaseError::Sqlite(_))));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_busy_database_does_not_stall_runtime() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.db");
        let db = AsyncDatabase::open(&path).await.unwrap();

        // A second connection holds the write lock for a while.
        let blocker = rusqlite::Connection::open(&path).unwrap();
        blocker.execute_batch("BEGIN IMMEDIATE").unwrap();
        let release = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(300));
            blocker.execute_batch("COMMIT").unwrap();
        });

        let ticks = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let ticker = {
            let ticks = ticks.clone();
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    ticks.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                }
            })
        };

        db.call(|conn| {
            conn.execute("INSERT INTO event_queue (event_json) VALUES ('{}')", [])?;
            Ok(())
        })
        .await
        .unwrap();
        ticker.abort();
        release.join().unwrap();

        assert!(ticks.load(std::sync::atomic::Ordering::SeqCst) > 5);
    }
}

//! Durable FIFO queue store.

use crate::{queries, AsyncDatabase, DatabaseResult, QueueRecord};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Ordered, retry-tracked event queue backed by a SQLite file.
///
/// The store is the single coordination point between producers and the
/// delivery worker. Every operation is one SQL statement executed on the
/// database thread, so each is atomic and none blocks the async runtime.
#[derive(Clone)]
pub struct QueueStore {
    db: AsyncDatabase,
    path: Option<PathBuf>,
}

impl QueueStore {
    /// Open the queue at `path`, creating the file and schema if needed.
    pub async fn open(path: &Path) -> DatabaseResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Self {
            db: AsyncDatabase::open(path).await?,
            path: Some(path.to_path_buf()),
        };

        info!(
            path = %path.display(),
            pending = store.count_pending().await?,
            "Queue store opened"
        );
        Ok(store)
    }

    /// Open an in-memory queue for testing.
    pub async fn open_in_memory() -> DatabaseResult<Self> {
        Ok(Self {
            db: AsyncDatabase::open_in_memory().await?,
            path: None,
        })
    }

    /// File backing this store, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Persist a new record with `retries = 0` and return its id.
    pub async fn enqueue(&self, payload: &str) -> DatabaseResult<i64> {
        let payload = payload.to_owned();
        let id = self
            .db
            .call(move |conn| queries::insert_event(conn, &payload))
            .await?;
        debug!(event_id = id, "Enqueued event");
        Ok(id)
    }

    /// The lowest-id pending record, without removing it.
    pub async fn peek_oldest(&self) -> DatabaseResult<Option<QueueRecord>> {
        self.db.call(queries::get_oldest_event).await
    }

    /// Up to `limit` pending records in delivery order.
    pub async fn list_pending(&self, limit: usize) -> DatabaseResult<Vec<QueueRecord>> {
        self.db
            .call(move |conn| queries::list_events(conn, limit))
            .await
    }

    /// Add one to the record's retry counter.
    ///
    /// No-op when the record is gone; the return value says whether it existed.
    pub async fn increment_retry(&self, id: i64) -> DatabaseResult<bool> {
        let updated = self
            .db
            .call(move |conn| queries::increment_event_retries(conn, id))
            .await?;
        if !updated {
            debug!(event_id = id, "Retry increment skipped, record already removed");
        }
        Ok(updated)
    }

    /// Remove the record. Deleting an absent id is not an error.
    pub async fn delete(&self, id: i64) -> DatabaseResult<bool> {
        self.db
            .call(move |conn| queries::delete_event(conn, id))
            .await
    }

    /// Number of records currently stored.
    pub async fn count_pending(&self) -> DatabaseResult<u64> {
        self.db.call(queries::count_events).await
    }
}

//! Database model types.

use serde::{Deserialize, Serialize};

/// A pending event in the queue.
///
/// `id` is assigned by SQLite at insert time, strictly increasing and never
/// reused. `retries` counts failed delivery attempts so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueRecord {
    pub id: i64,
    pub payload: String,
    pub retries: u32,
}

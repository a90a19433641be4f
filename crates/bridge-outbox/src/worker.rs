//! Delivery worker: one drain cycle with retry/drop policy.

use crate::{AuditLog, DeliveryOutcome, DeliveryStatus, EventPacket, OutboxResult, Sink};
use bridge_database::{QueueRecord, QueueStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a single drain cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The queue was empty.
    Idle,
    /// The oldest record was delivered and removed.
    Delivered { id: i64 },
    /// Delivery failed; the record stays queued with `retries` failed attempts.
    Retried { id: i64, retries: u32 },
    /// Delivery failed with the retry budget exhausted; the record was removed.
    Dropped { id: i64 },
    /// Delivery failed but the record was removed by someone else before its
    /// retry could be counted. Nothing is audited.
    Vanished { id: i64 },
}

impl DrainOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::Retried { .. } | Self::Dropped { .. } | Self::Vanished { .. }
        )
    }
}

/// Applies the accept/retry/drop decision to the head of the queue.
///
/// Not safe to run concurrently against the same store; callers serialize
/// drain cycles (see `Bridge`).
pub struct DeliveryWorker {
    store: Arc<QueueStore>,
    sink: Arc<dyn Sink>,
    audit: Arc<AuditLog>,
    max_retries: u32,
}

impl DeliveryWorker {
    pub fn new(
        store: Arc<QueueStore>,
        sink: Arc<dyn Sink>,
        audit: Arc<AuditLog>,
        max_retries: u32,
    ) -> Self {
        Self {
            store,
            sink,
            audit,
            max_retries,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Attempt delivery of the oldest pending record.
    ///
    /// Sink failures are handled here. Only storage failures are returned.
    /// Dropping the future after the sink call returns can leave the queue
    /// mutated without its audit entry; `Bridge::run_until` only interrupts
    /// the sink call itself.
    pub async fn drain_one(&self) -> OutboxResult<DrainOutcome> {
        let Some(record) = self.store.peek_oldest().await? else {
            return Ok(DrainOutcome::Idle);
        };

        let outcome = self.attempt(&record).await;
        self.apply(&record, outcome).await
    }

    /// Apply the retry/drop policy for one attempt's outcome.
    pub(crate) async fn apply(
        &self,
        record: &QueueRecord,
        outcome: DeliveryOutcome,
    ) -> OutboxResult<DrainOutcome> {
        match outcome {
            DeliveryOutcome::Success => {
                self.store.delete(record.id).await?;
                self.audit.record(record.id, DeliveryStatus::Success);
                info!(event_id = record.id, retries = record.retries, "Event delivered");
                Ok(DrainOutcome::Delivered { id: record.id })
            }
            DeliveryOutcome::Failure(reason) => {
                let new_retries = record.retries.saturating_add(1);

                if new_retries <= self.max_retries {
                    if !self.store.increment_retry(record.id).await? {
                        warn!(
                            event_id = record.id,
                            reason = %reason,
                            "Delivery failed for a record that is no longer queued"
                        );
                        return Ok(DrainOutcome::Vanished { id: record.id });
                    }
                    self.audit.record(record.id, DeliveryStatus::Retry(new_retries));
                    warn!(
                        event_id = record.id,
                        attempt = new_retries,
                        max_retries = self.max_retries,
                        reason = %reason,
                        "Delivery failed, will retry"
                    );
                    Ok(DrainOutcome::Retried {
                        id: record.id,
                        retries: new_retries,
                    })
                } else {
                    self.store.delete(record.id).await?;
                    self.audit.record(record.id, DeliveryStatus::FailedMaxRetries);
                    warn!(
                        event_id = record.id,
                        max_retries = self.max_retries,
                        reason = %reason,
                        "Retry budget exhausted, event dropped"
                    );
                    Ok(DrainOutcome::Dropped { id: record.id })
                }
            }
        }
    }

    /// One sink call for `record`. Touches neither the queue nor the audit log.
    pub(crate) async fn attempt(&self, record: &QueueRecord) -> DeliveryOutcome {
        let packet: EventPacket = match serde_json::from_str(&record.payload) {
            Ok(packet) => packet,
            Err(e) => {
                debug!(event_id = record.id, error = %e, "Stored payload is not a JSON object");
                return DeliveryOutcome::Failure(format!("undecodable payload: {}", e));
            }
        };

        debug!(event_id = record.id, retries = record.retries, "Attempting delivery");
        self.sink.deliver(&packet).await
    }
}

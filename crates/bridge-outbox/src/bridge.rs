//! Bridge service: owns the queue, audit log and sink.

use crate::ingest::EventSender;
use crate::{
    AuditLog, DeliveryWorker, DrainOutcome, EventPacket, HttpSink, OutboxResult, RetryPacing, Sink,
};
use bridge_config_and_utils::{Config, Paths};
use bridge_database::{QueueRecord, QueueStore};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Runtime settings for the drain loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeSettings {
    pub max_retries: u32,
    pub pacing: RetryPacing,
    pub poll_interval: Duration,
}

impl BridgeSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            pacing: RetryPacing::from_config(config),
            poll_interval: config.poll_interval(),
        }
    }
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Tally of one `drain_until_empty` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub delivered: u64,
    pub retried: u64,
    pub dropped: u64,
}

impl DrainSummary {
    fn add(&mut self, outcome: DrainOutcome) {
        match outcome {
            DrainOutcome::Idle | DrainOutcome::Vanished { .. } => {}
            DrainOutcome::Delivered { .. } => self.delivered += 1,
            DrainOutcome::Retried { .. } => self.retried += 1,
            DrainOutcome::Dropped { .. } => self.dropped += 1,
        }
    }

    pub fn attempts(&self) -> u64 {
        self.delivered + self.retried + self.dropped
    }
}

/// Store-and-forward bridge.
///
/// Producers call `enqueue` (or push through `spawn_ingest`); a scheduling
/// loop calls `drain_one`/`drain_until_empty`/`run_until`. At most one drain
/// cycle runs at a time per bridge.
pub struct Bridge {
    store: Arc<QueueStore>,
    audit: Arc<AuditLog>,
    worker: DeliveryWorker,
    settings: BridgeSettings,
    drain_lock: Mutex<()>,
}

impl Bridge {
    /// Open the queue, audit log and HTTP sink described by `config`.
    pub async fn open(config: &Config, paths: &Paths) -> OutboxResult<Self> {
        let store = Arc::new(QueueStore::open(&config.storage_location(paths)).await?);
        let audit = Arc::new(AuditLog::new(config.audit_log_path(paths)));
        let sink = Arc::new(HttpSink::new(
            &config.endpoint_url,
            config.request_timeout(),
        )?);

        info!(
            endpoint = %config.endpoint_url,
            max_retries = config.max_retries,
            audit_log = %audit.path().display(),
            "Bridge opened"
        );

        Ok(Self::new(
            store,
            audit,
            sink,
            BridgeSettings::from_config(config),
        ))
    }

    pub fn new(
        store: Arc<QueueStore>,
        audit: Arc<AuditLog>,
        sink: Arc<dyn Sink>,
        settings: BridgeSettings,
    ) -> Self {
        let worker = DeliveryWorker::new(store.clone(), sink, audit.clone(), settings.max_retries);
        Self {
            store,
            audit,
            worker,
            settings,
            drain_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<QueueStore> {
        &self.store
    }

    pub fn audit(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    /// Durably persist a packet and return its queue id.
    ///
    /// Storage failures are returned as `OutboxError::Storage`.
    pub async fn enqueue(&self, packet: &EventPacket) -> OutboxResult<i64> {
        let payload = serde_json::to_string(packet)?;
        Ok(self.store.enqueue(&payload).await?)
    }

    pub async fn count_pending(&self) -> OutboxResult<u64> {
        Ok(self.store.count_pending().await?)
    }

    pub async fn peek_oldest(&self) -> OutboxResult<Option<QueueRecord>> {
        Ok(self.store.peek_oldest().await?)
    }

    /// Run one drain cycle. Waits for any drain cycle already in progress.
    pub async fn drain_one(&self) -> OutboxResult<DrainOutcome> {
        let _guard = self.drain_lock.lock().await;
        self.worker.drain_one().await
    }

    /// Drain until the queue is empty, pacing after failed attempts.
    pub async fn drain_until_empty(&self) -> OutboxResult<DrainSummary> {
        let (summary, _) = self.drain_loop(&mut std::future::pending::<()>()).await?;
        Ok(summary)
    }

    /// Service loop: drain, sleep the poll interval, repeat until `shutdown`
    /// resolves.
    ///
    /// Shutdown only interrupts a sink call or a sleep. A record whose sink
    /// call was interrupted stays queued untouched; a finished attempt always
    /// gets both its queue mutation and its audit entry.
    pub async fn run_until<F>(&self, shutdown: F) -> OutboxResult<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            poll_interval_ms = self.settings.poll_interval.as_millis() as u64,
            "Bridge service loop started"
        );

        loop {
            let (_, stopped) = self.drain_loop(&mut shutdown).await?;
            if stopped {
                break;
            }

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }

        let pending = self.store.count_pending().await?;
        info!(pending, "Bridge service loop stopped");
        Ok(())
    }

    /// Drain cycles until the queue is empty or `shutdown` fires. The flag
    /// says whether it fired; once it has, `shutdown` must not be polled again.
    async fn drain_loop<S>(&self, shutdown: &mut S) -> OutboxResult<(DrainSummary, bool)>
    where
        S: Future<Output = ()> + Unpin,
    {
        let mut summary = DrainSummary::default();
        let mut consecutive_failures: u32 = 0;
        let mut stopped = false;

        while self.store.count_pending().await? > 0 {
            let outcome = {
                let _guard = self.drain_lock.lock().await;
                let Some(record) = self.store.peek_oldest().await? else {
                    break;
                };
                let delivery = tokio::select! {
                    _ = &mut *shutdown => {
                        stopped = true;
                        break;
                    }
                    delivery = self.worker.attempt(&record) => delivery,
                };
                self.worker.apply(&record, delivery).await?
            };
            summary.add(outcome);

            match outcome {
                DrainOutcome::Idle => break,
                DrainOutcome::Retried { .. } => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    let delay = self.settings.pacing.delay_for(consecutive_failures);
                    debug!(
                        consecutive_failures,
                        delay_ms = delay.as_millis() as u64,
                        "Pausing before next drain cycle"
                    );
                    if delay.is_zero() {
                        tokio::task::yield_now().await;
                    } else {
                        tokio::select! {
                            _ = &mut *shutdown => {
                                stopped = true;
                                break;
                            }
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                }
                DrainOutcome::Delivered { .. }
                | DrainOutcome::Dropped { .. }
                | DrainOutcome::Vanished { .. } => {
                    consecutive_failures = 0;
                    tokio::task::yield_now().await;
                }
            }
        }

        if summary.attempts() > 0 {
            info!(
                delivered = summary.delivered,
                retried = summary.retried,
                dropped = summary.dropped,
                "Drain finished"
            );
        }
        Ok((summary, stopped))
    }

    /// Start the ingest task and return its producer handle.
    ///
    /// The task persists packets in arrival order and exits once every
    /// `EventSender` clone is dropped. Storage failures are logged there,
    /// since the producer has already moved on.
    pub fn spawn_ingest(self: &Arc<Self>, capacity: usize) -> (EventSender, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<EventPacket>(capacity.max(1));
        let bridge = Arc::clone(self);

        let handle = tokio::spawn(async move {
            while let Some(packet) = rx.recv().await {
                match bridge.enqueue(&packet).await {
                    Ok(id) => debug!(event_id = id, "Ingested event"),
                    Err(e) => error!(error = %e, "Failed to persist ingested event"),
                }
            }
            debug!("Ingest channel closed");
        });

        (EventSender::new(tx), handle)
    }
}

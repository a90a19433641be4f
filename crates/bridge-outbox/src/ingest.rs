//! Producer hand-off channel.
//!
//! Producers push packets into a bounded channel; a single ingest task owned
//! by the bridge persists them in arrival order.

use crate::{EventPacket, OutboxError, OutboxResult};
use tokio::sync::mpsc;

/// Default channel capacity for the ingest task.
pub const DEFAULT_INGEST_CAPACITY: usize = 1024;

/// Cloneable producer handle returned by `Bridge::spawn_ingest`.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<EventPacket>,
}

impl EventSender {
    pub(crate) fn new(tx: mpsc::Sender<EventPacket>) -> Self {
        Self { tx }
    }

    /// Queue a packet for persistence, waiting for channel capacity.
    pub async fn send(&self, packet: EventPacket) -> OutboxResult<()> {
        self.tx
            .send(packet)
            .await
            .map_err(|_| OutboxError::ChannelClosed)
    }

    /// Queue a packet without waiting. Fails when the channel is full or closed.
    pub fn try_send(&self, packet: EventPacket) -> OutboxResult<()> {
        self.tx.try_send(packet).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => OutboxError::IngestFull,
            mpsc::error::TrySendError::Closed(_) => OutboxError::ChannelClosed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

//! Store-and-forward delivery of telemetry events.
//!
//! This crate provides:
//! - Bridge: owns the queue, audit log and sink; enqueue and drain entry points
//! - DeliveryWorker: one drain cycle with retry/drop policy
//! - HttpSink: single-attempt HTTP POST delivery with a bounded timeout
//! - AuditLog: append-only JSONL record of every attempt's outcome
//! - RetryPacing: delay applied between drain cycles after a failure

mod audit;
mod bridge;
mod error;
mod ingest;
mod pacing;
mod sink;
mod worker;

pub use audit::{AuditEntry, AuditLog, DeliveryStatus};
pub use bridge::{Bridge, BridgeSettings, DrainSummary};
pub use error::{OutboxError, OutboxResult};
pub use ingest::{EventSender, DEFAULT_INGEST_CAPACITY};
pub use pacing::RetryPacing;
pub use sink::{DeliveryOutcome, HttpSink, Sink};
pub use worker::{DeliveryWorker, DrainOutcome};

/// An ordered JSON object handed to the bridge by producers.
///
/// The bridge never interprets it; it is stored and delivered verbatim.
pub type EventPacket = serde_json::Map<String, serde_json::Value>;

//! Simulated InsightCore producer.

use crate::{generate_telemetry_event, EventStream, DEFAULT_CONTEXT};
use bridge_outbox::{EventPacket, EventSender, OutboxResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub const SIMULATED_USERS: &[&str] = &["Priya", "Vijay", "Raj"];

pub const SIMULATED_STATES: &[&str] = &[
    "completed",
    "positive_feedback",
    "negative_feedback",
    "skipped",
];

const DEFAULT_PROCESSING_MS: RangeInclusive<u64> = 10..=100;

/// Generates task updates for random users and hands them to a bridge.
pub struct Simulator {
    sender: EventSender,
    stream: Option<Arc<EventStream>>,
    rng: StdRng,
    processing_ms: RangeInclusive<u64>,
}

impl Simulator {
    pub fn new(sender: EventSender) -> Self {
        Self {
            sender,
            stream: None,
            rng: StdRng::from_entropy(),
            processing_ms: DEFAULT_PROCESSING_MS,
        }
    }

    /// Also copy every structured packet to `stream`.
    pub fn with_stream(mut self, stream: Arc<EventStream>) -> Self {
        self.stream = Some(stream);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Simulated processing time per task, in milliseconds.
    pub fn with_processing_ms(mut self, range: RangeInclusive<u64>) -> Self {
        self.processing_ms = range;
        self
    }

    /// Produce `events` task updates, numbered from 1.
    ///
    /// Returns once every packet is handed off; persistence happens on the
    /// bridge's ingest task.
    pub async fn run(&mut self, events: u32) -> OutboxResult<u32> {
        info!(events, "Starting simulation");

        for i in 1..=events {
            let user = SIMULATED_USERS[self.rng.gen_range(0..SIMULATED_USERS.len())];
            let processing = Duration::from_millis(self.rng.gen_range(self.processing_ms.clone()));
            tokio::time::sleep(processing).await;

            let state = SIMULATED_STATES[self.rng.gen_range(0..SIMULATED_STATES.len())];
            let mut raw = EventPacket::new();
            raw.insert("user_id".into(), user.into());
            raw.insert("task_id".into(), format!("Task {}", i).into());
            raw.insert("state".into(), state.into());

            let packet = generate_telemetry_event(&raw, "task_update", DEFAULT_CONTEXT);
            if let Some(stream) = &self.stream {
                stream.append(&packet);
            }
            self.sender.send(packet).await?;

            info!(user, task = i, state, "Task event handed off to bridge");
        }

        Ok(events)
    }
}

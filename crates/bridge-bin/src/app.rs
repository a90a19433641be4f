//! Command implementations.

use bridge_config_and_utils::{Config, Paths};
use bridge_outbox::{Bridge, DrainSummary, EventPacket, OutboxError, OutboxResult};
use event_structurer::{generate_telemetry_event, EventStream, Simulator};
use std::sync::Arc;
use tracing::info;

/// Run the delivery loop until Ctrl-C.
pub async fn run_service(config: &Config, paths: &Paths) -> OutboxResult<()> {
    let bridge = Bridge::open(config, paths).await?;
    info!(pending = bridge.count_pending().await?, "Starting telemetry bridge");

    bridge
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for Ctrl-C, shutting down");
            }
        })
        .await
}

pub async fn drain_once(config: &Config, paths: &Paths) -> OutboxResult<()> {
    let bridge = Bridge::open(config, paths).await?;
    let summary = bridge.drain_until_empty().await?;
    print_summary(&summary, bridge.count_pending().await?);
    Ok(())
}

/// Enqueue one packet. With `event_type`, the payload is treated as raw
/// insight data and structured first.
pub async fn enqueue(
    config: &Config,
    paths: &Paths,
    payload: &str,
    event_type: Option<&str>,
    context: &str,
) -> OutboxResult<()> {
    let raw: EventPacket = serde_json::from_str(payload)
        .map_err(|e| OutboxError::Config(format!("payload must be a JSON object: {}", e)))?;

    let packet = match event_type {
        Some(event_type) => {
            let packet = generate_telemetry_event(&raw, event_type, context);
            EventStream::new(config.event_stream_path(paths)).append(&packet);
            packet
        }
        None => raw,
    };

    let bridge = Bridge::open(config, paths).await?;
    let id = bridge.enqueue(&packet).await?;
    println!("Enqueued event {}", id);
    Ok(())
}

/// Produce simulated events through the ingest channel, then drain.
pub async fn simulate(config: &Config, paths: &Paths, events: u32) -> OutboxResult<()> {
    let bridge = Arc::new(Bridge::open(config, paths).await?);
    let stream = Arc::new(EventStream::new(config.event_stream_path(paths)));

    let (sender, ingest) = bridge.spawn_ingest(bridge_outbox::DEFAULT_INGEST_CAPACITY);
    let mut simulator = Simulator::new(sender).with_stream(stream);
    let produced = simulator.run(events).await?;
    drop(simulator);
    ingest.await?;

    println!("Produced {} events, draining buffer", produced);
    let summary = bridge.drain_until_empty().await?;
    print_summary(&summary, bridge.count_pending().await?);
    Ok(())
}

pub async fn status(config: &Config, paths: &Paths) -> OutboxResult<()> {
    let bridge = Bridge::open(config, paths).await?;

    println!("Endpoint: {}", config.endpoint_url);
    println!("Queue:    {}", config.storage_location(paths).display());
    println!("Audit:    {}", bridge.audit().path().display());
    println!("Pending:  {}", bridge.count_pending().await?);

    match bridge.peek_oldest().await? {
        Some(record) => println!(
            "Oldest:   #{} (retries {}) {}",
            record.id, record.retries, record.payload
        ),
        None => println!("Oldest:   -"),
    }
    Ok(())
}

fn print_summary(summary: &DrainSummary, pending: u64) {
    println!(
        "Delivered {}, retried {}, dropped {}; {} pending",
        summary.delivered, summary.retried, summary.dropped, pending
    );
}
